//! Local artifact repository layout.
//!
//! Artifacts live under the standard Maven directory structure:
//! `<root>/<group path>/<name>/<version>/<name>-<version>[-classifier].<type>`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::version::{RangeError, Version, VersionRange, highest_in};

pub fn default_repository() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("failed to resolve home directory"))?;
    Ok(home.join(".m2").join("repository"))
}

#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, group: &str, name: &str) -> PathBuf {
        self.root.join(group.replace('.', "/")).join(name)
    }

    pub fn artifact_file_name(
        name: &str,
        version: &str,
        classifier: Option<&str>,
        kind: &str,
    ) -> String {
        match classifier {
            Some(c) => format!("{name}-{version}-{c}.{kind}"),
            None => format!("{name}-{version}.{kind}"),
        }
    }

    /// The cache path a coordinate maps to, whether or not it exists.
    pub fn artifact_path(
        &self,
        group: &str,
        name: &str,
        version: &str,
        classifier: Option<&str>,
        kind: &str,
    ) -> PathBuf {
        self.artifact_dir(group, name)
            .join(version)
            .join(Self::artifact_file_name(name, version, classifier, kind))
    }

    /// All versions of (group, name) present in the repository for which the
    /// main artifact file of the given type exists.
    pub fn available_versions(
        &self,
        group: &str,
        name: &str,
        kind: &str,
    ) -> std::io::Result<Vec<Version>> {
        let dir = self.artifact_dir(group, name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let version = entry.file_name().to_string_lossy().to_string();
            if self
                .artifact_path(group, name, &version, None, kind)
                .exists()
            {
                versions.push(Version::new(&version));
            }
        }
        Ok(versions)
    }

    /// Resolves a version range to the highest available version.
    pub fn resolve_range(
        &self,
        group: &str,
        name: &str,
        kind: &str,
        range: &str,
    ) -> Result<Version, RangeError> {
        let parsed = VersionRange::parse(range)?;
        let available =
            self.available_versions(group, name, kind)
                .map_err(|source| RangeError::VersionListing {
                    group: group.to_string(),
                    name: name.to_string(),
                    source,
                })?;
        debug!(
            "available versions for {group}:{name}: {:?}",
            available.iter().map(Version::as_str).collect::<Vec<_>>()
        );
        highest_in(&parsed, available).ok_or_else(|| RangeError::NoMatch {
            group: group.to_string(),
            name: name.to_string(),
            range: range.to_string(),
        })
    }
}
