//! Server feature names with case-insensitive identity.
//!
//! Feature names compare case-insensitively but keep the case they were
//! declared with. A name carrying a namespace separator (`usr:myFeature-1.0`)
//! is a custom feature and is kept out of scanner input.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    // lowercased name -> declared name
    entries: BTreeMap<String, String>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: &str) {
        self.entries
            .entry(feature.to_ascii_lowercase())
            .or_insert_with(|| feature.to_string());
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.entries.contains_key(&feature.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared names in deterministic (case-insensitive) order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    pub fn difference(&self, other: &FeatureSet) -> FeatureSet {
        let entries = self
            .entries
            .iter()
            .filter(|(key, _)| !other.entries.contains_key(*key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        FeatureSet { entries }
    }

    pub fn is_superset_of(&self, other: &FeatureSet) -> bool {
        other
            .entries
            .keys()
            .all(|key| self.entries.contains_key(key))
    }

    /// Features the scanner understands: everything without a namespace
    /// separator.
    pub fn non_custom(&self) -> FeatureSet {
        let entries = self
            .entries
            .iter()
            .filter(|(_, name)| !name.contains(':'))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        FeatureSet { entries }
    }
}

impl PartialEq for FeatureSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries.keys().eq(other.entries.keys())
    }
}

impl Eq for FeatureSet {}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, name) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "]")
    }
}

impl<S: AsRef<str>> FromIterator<S> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = FeatureSet::new();
        for feature in iter {
            set.insert(feature.as_ref());
        }
        set
    }
}

impl<S: AsRef<str>> Extend<S> for FeatureSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for feature in iter {
            self.insert(feature.as_ref());
        }
    }
}
