use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_TYPE: &str = "jar";

fn default_type() -> String {
    DEFAULT_TYPE.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Compile,
    Runtime,
    Provided,
    Test,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Compile => "compile",
            Scope::Runtime => "runtime",
            Scope::Provided => "provided",
            Scope::Test => "test",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested component. Identity for resolution purposes is
/// (group, name, type); version and classifier refine a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub group: String,
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub classifier: Option<String>,
}

impl Coordinate {
    pub fn new(group: &str, name: &str, kind: &str, version: Option<&str>) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            version: version.map(str::to_string),
            classifier: None,
        }
    }

    /// Parses `group:name[:type[:version[:classifier]]]`.
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() < 2 || parts.len() > 5 || parts.iter().take(2).any(|p| p.is_empty()) {
            bail!("invalid coordinate {raw}, expected group:name[:type[:version[:classifier]]]");
        }
        let part = |i: usize| parts.get(i).filter(|p| !p.is_empty()).map(|p| p.to_string());
        Ok(Self {
            group: parts[0].to_string(),
            name: parts[1].to_string(),
            kind: part(2).unwrap_or_else(default_type),
            version: part(3),
            classifier: part(4),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.kind)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        if let Some(classifier) = &self.classifier {
            write!(f, ":{classifier}")?;
        }
        Ok(())
    }
}

/// A bulk-resolution request. `name` and `classifier` are patterns and may
/// carry a trailing wildcard; omitting `name` asks for a group-only match.
#[derive(Debug, Clone)]
pub struct CoordinateQuery {
    pub group: String,
    pub name: Option<String>,
    pub kind: String,
    pub version: Option<String>,
    pub classifier: Option<String>,
}

impl CoordinateQuery {
    /// Parses `group[:name-pattern[:type[:version[:classifier-pattern]]]]`,
    /// with empty segments standing for "unspecified".
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.is_empty() || parts.len() > 5 || parts[0].is_empty() {
            bail!("invalid coordinate query {raw}, expected group[:name[:type[:version[:classifier]]]]");
        }
        let part = |i: usize| parts.get(i).filter(|p| !p.is_empty()).map(|p| p.to_string());
        Ok(Self {
            group: parts[0].to_string(),
            name: part(1),
            kind: part(2).unwrap_or_else(default_type),
            version: part(3),
            classifier: part(4),
        })
    }
}

/// A dependency as declared in the module's build file, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredDependency {
    pub group: String,
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    pub version: String,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub scope: Scope,
}

/// A component from the project's resolved dependency set, carrying the
/// recorded dependency trail of the build that produced it. Set identity is
/// (group, name, version, classifier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedArtifact {
    pub group: String,
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    pub version: String,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default)]
    pub trail: Vec<String>,
}

impl ResolvedArtifact {
    fn key(&self) -> (&str, &str, &str, Option<&str>) {
        (
            self.group.as_str(),
            self.name.as_str(),
            self.version.as_str(),
            self.classifier.as_deref(),
        )
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            group: self.group.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            version: Some(self.version.clone()),
            classifier: self.classifier.clone(),
        }
    }

    /// The `group:name:` prefix under which this artifact appears in
    /// dependency trails.
    pub fn trail_prefix(&self) -> String {
        format!("{}:{}:", self.group, self.name)
    }
}

impl fmt::Display for ResolvedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl PartialEq for ResolvedArtifact {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ResolvedArtifact {}

impl PartialOrd for ResolvedArtifact {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ResolvedArtifact {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Resolved components keyed by (group, name, version, classifier). Built
/// fresh per resolution call.
pub type DependencySet = BTreeSet<ResolvedArtifact>;
