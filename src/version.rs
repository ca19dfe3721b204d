//! Version ordering and range handling for repository coordinates.
//!
//! Versions compare the way Maven orders them for the cases this tool
//! meets: dot/dash tokenization, numeric segments compare numerically,
//! `1.0` equals `1.0.0`, and a release orders above the same release with a
//! qualifier (`1.0-alpha < 1.0`). Ranges use the bracket notation
//! (`[1.0,2.0)`, `(,1.0]`, `[1.0,)`, `[1.0]`).

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RangeError {
    #[error("invalid version range: {0}")]
    InvalidRange(String),
    #[error("could not get the highest version from the range {range} for {group}:{name}")]
    NoMatch {
        group: String,
        name: String,
        range: String,
    },
    #[error("failed to list available versions for {group}:{name}")]
    VersionListing {
        group: String,
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Qualifier(String),
}

#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    tokens: Vec<Token>,
}

impl Version {
    pub fn new(raw: &str) -> Self {
        let tokens = raw
            .split(['.', '-'])
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<u64>() {
                Ok(n) => Token::Number(n),
                Err(_) => Token::Qualifier(part.to_ascii_lowercase()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn cmp_token(a: Option<&Token>, b: Option<&Token>) -> Ordering {
    use Token::*;
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(Number(x)), Some(Number(y))) => x.cmp(y),
        (Some(Number(_)), Some(Qualifier(_))) => Ordering::Greater,
        (Some(Qualifier(_)), Some(Number(_))) => Ordering::Less,
        (Some(Qualifier(x)), Some(Qualifier(y))) => x.cmp(y),
        // missing segments pad with zero: 1.0 == 1.0.0, 1.0 < 1.0.1
        (None, Some(Number(y))) => 0.cmp(y),
        (Some(Number(x)), None) => x.cmp(&0),
        // a trailing qualifier orders below the bare release: 1.0-alpha < 1.0
        (None, Some(Qualifier(_))) => Ordering::Greater,
        (Some(Qualifier(_)), None) => Ordering::Less,
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        for i in 0..len {
            let ord = cmp_token(self.tokens.get(i), other.tokens.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

/// True when the version string opens a range rather than naming a concrete
/// version.
pub fn is_range(version: &str) -> bool {
    let v = version.trim_start();
    v.starts_with('[') || v.starts_with('(')
}

#[derive(Debug, Clone)]
pub struct VersionRange {
    lower: Option<Version>,
    lower_inclusive: bool,
    upper: Option<Version>,
    upper_inclusive: bool,
}

impl VersionRange {
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let invalid = || RangeError::InvalidRange(raw.to_string());
        let s = raw.trim();
        let lower_inclusive = match s.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid()),
        };
        let upper_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };
        let inner = &s[1..s.len() - 1];

        if let Some((lo, hi)) = inner.split_once(',') {
            let lower = match lo.trim() {
                "" => None,
                v => Some(Version::new(v)),
            };
            let upper = match hi.trim() {
                "" => None,
                v => Some(Version::new(v)),
            };
            if lower.is_none() && upper.is_none() {
                return Err(invalid());
            }
            Ok(Self {
                lower,
                lower_inclusive,
                upper,
                upper_inclusive,
            })
        } else {
            // [1.0] pins an exact version
            if inner.trim().is_empty() || !lower_inclusive || !upper_inclusive {
                return Err(invalid());
            }
            let v = Version::new(inner.trim());
            Ok(Self {
                lower: Some(v.clone()),
                lower_inclusive: true,
                upper: Some(v),
                upper_inclusive: true,
            })
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(lower) {
                Ordering::Less => return false,
                Ordering::Equal if !self.lower_inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match version.cmp(upper) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.upper_inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

/// Picks the highest available version satisfying the range.
pub fn highest_in(range: &VersionRange, available: Vec<Version>) -> Option<Version> {
    available.into_iter().filter(|v| range.contains(v)).max()
}
