//! Predicate logic deciding whether a candidate component matches a
//! requested coordinate. Supports exact matching plus a single trailing
//! wildcard on the name and classifier patterns.

/// A prepared filter for scanning a project dependency set. The group is
/// compared exactly; the name and classifier patterns have a single trailing
/// `*` trimmed at construction time (a bare `*` matches anything).
#[derive(Debug, Clone)]
pub struct ArtifactFilter {
    group: String,
    name: Option<String>,
    name_wildcard: bool,
    classifier: Option<String>,
    classifier_wildcard: bool,
}

fn trim_wildcard(pattern: Option<&str>) -> (Option<String>, bool) {
    match pattern {
        None => (None, false),
        Some(p) => match p.strip_suffix('*') {
            Some("") => (None, true),
            Some(prefix) => (Some(prefix.to_string()), true),
            None => (Some(p.to_string()), false),
        },
    }
}

impl ArtifactFilter {
    pub fn new(group: &str, name_pattern: Option<&str>, classifier_pattern: Option<&str>) -> Self {
        let (name, name_wildcard) = trim_wildcard(name_pattern);
        let (classifier, classifier_wildcard) = trim_wildcard(classifier_pattern);
        Self {
            group: group.to_string(),
            name,
            name_wildcard,
            classifier,
            classifier_wildcard,
        }
    }

    pub fn matches(&self, group: &str, name: &str, classifier: Option<&str>) -> bool {
        if group != self.group {
            return false;
        }
        if self.name.is_none() && self.classifier.is_none() {
            // group-only request
            return true;
        }
        self.name_matches(name) && self.classifier_matches(classifier)
    }

    fn name_matches(&self, name: &str) -> bool {
        match &self.name {
            None => true,
            Some(prefix) if self.name_wildcard => name.starts_with(prefix.as_str()),
            Some(exact) => name == exact,
        }
    }

    fn classifier_matches(&self, candidate: Option<&str>) -> bool {
        if self.classifier_wildcard {
            match (&self.classifier, candidate) {
                (None, _) => return true,
                (Some(prefix), Some(c)) if c.starts_with(prefix.as_str()) => return true,
                _ => {}
            }
        }
        match candidate {
            Some(c) => self.classifier.as_deref() == Some(c),
            None => self.classifier.is_none(),
        }
    }
}
