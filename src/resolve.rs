//! Artifact resolution against the project dependency set and the local
//! repository.
//!
//! A versionless request is answered first from the project's resolved
//! dependencies, then from its dependency-management defaults. Explicit
//! versions (including ranges) resolve straight against the repository.
//! Bulk requests expand each match with the transitive dependencies
//! recorded in the project's dependency trails.

use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact::{
    Coordinate, CoordinateQuery, DeclaredDependency, DependencySet, ResolvedArtifact, Scope,
};
use crate::matcher::ArtifactFilter;
use crate::project::ProjectModel;
use crate::repo::Repository;
use crate::version::{self, RangeError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(
        "unable to find artifact version of {group}:{name} in either project dependencies or in project dependency management"
    )]
    NotFound { group: String, name: String },
    #[error("unable to resolve artifact without a version: {group}:{name}")]
    MissingVersion { group: String, name: String },
    #[error(transparent)]
    Range(#[from] RangeError),
}

pub struct Resolver<'a> {
    repo: &'a Repository,
    project: &'a ProjectModel,
}

impl<'a> Resolver<'a> {
    pub fn new(repo: &'a Repository, project: &'a ProjectModel) -> Self {
        Self { repo, project }
    }

    /// Resolves a coordinate, looking up the version from the project
    /// dependency set or the dependency-management defaults when the request
    /// does not carry one.
    pub fn resolve(&self, item: &Coordinate) -> Result<ResolvedArtifact, ResolveError> {
        if item.version.is_some() {
            // an explicit version always overrides the project dependency
            return self.create(item.clone(), None);
        }

        if let Some(dependency) = self.from_project_dependencies(item) {
            debug!("found {item} in project dependencies: {dependency}");
            if dependency.resolved {
                return Ok(dependency.clone());
            }
            let mut item = item.clone();
            item.version = Some(dependency.version.clone());
            return self.create(item, dependency.path.clone());
        }

        if let Some(default) = self.from_dependency_management(item) {
            debug!(
                "found {item} in project dependency management: {}:{}:{}",
                default.group, default.name, default.version
            );
            let mut item = item.clone();
            item.version = Some(default.version.clone());
            return self.create(item, None);
        }

        Err(ResolveError::NotFound {
            group: item.group.clone(),
            name: item.name.clone(),
        })
    }

    /// Resolves matching dependencies and collects their transitive
    /// dependencies. With an explicit version a failed resolution is
    /// non-fatal and yields an empty set; without one, the project
    /// dependency set and then the dependency-management defaults are
    /// scanned with wildcard expansion, omitting test-scoped matches.
    pub fn resolve_with_transitive(
        &self,
        query: &CoordinateQuery,
    ) -> Result<DependencySet, ResolveError> {
        let mut resolved = DependencySet::new();

        if let Some(version) = &query.version {
            let item = Coordinate {
                group: query.group.clone(),
                name: query.name.clone().unwrap_or_default(),
                kind: query.kind.clone(),
                version: Some(version.clone()),
                classifier: query.classifier.clone(),
            };
            match self.resolve(&item) {
                Ok(artifact) => {
                    self.find_transitive(&artifact, &mut resolved);
                    resolved.insert(artifact);
                }
                Err(e) => {
                    warn!(
                        "unable to find artifact matching {}:{:?}:{version} ({}) in configured repositories: {e}",
                        query.group, query.name, query.kind
                    );
                }
            }
            return Ok(resolved);
        }

        let filter = ArtifactFilter::new(
            &query.group,
            query.name.as_deref(),
            query.classifier.as_deref(),
        );

        for artifact in &self.project.artifacts {
            if !filter.matches(&artifact.group, &artifact.name, artifact.classifier.as_deref()) {
                continue;
            }
            // test-scoped matches are never collected
            if artifact.scope == Scope::Test {
                continue;
            }
            let artifact = if artifact.resolved {
                artifact.clone()
            } else {
                let mut fresh = self.create(artifact.coordinate(), artifact.path.clone())?;
                fresh.scope = artifact.scope;
                fresh.trail = artifact.trail.clone();
                fresh
            };
            debug!("found resolved dependency from project dependencies: {artifact}");
            self.find_transitive(&artifact, &mut resolved);
            resolved.insert(artifact);
        }

        if resolved.is_empty() {
            for dependency in &self.project.dependency_management {
                if !filter.matches(
                    &dependency.group,
                    &dependency.name,
                    dependency.classifier.as_deref(),
                ) || dependency.scope == Scope::Test
                {
                    continue;
                }
                let item = Coordinate {
                    group: dependency.group.clone(),
                    name: dependency.name.clone(),
                    kind: dependency.kind.clone(),
                    version: Some(dependency.version.clone()),
                    classifier: dependency.classifier.clone(),
                };
                let artifact = self.create(item, None)?;
                debug!("found resolved dependency from project dependency management: {artifact}");
                self.find_transitive(&artifact, &mut resolved);
                resolved.insert(artifact);
            }
        }

        if resolved.is_empty() {
            warn!(
                "unable to find artifact matching group {} and artifact id {:?} of any version in either project dependencies or in project dependency management (test-scoped dependencies are excluded)",
                query.group, query.name
            );
        }
        Ok(resolved)
    }

    // Resolves a coordinate that carries a version, turning a range into the
    // highest available version first. Prefers the repository cache path the
    // coordinate maps to; a recorded build-output path stands in when the
    // cache copy is absent.
    fn create(
        &self,
        mut item: Coordinate,
        reported_path: Option<PathBuf>,
    ) -> Result<ResolvedArtifact, ResolveError> {
        let Some(version) = item.version.clone() else {
            return Err(ResolveError::MissingVersion {
                group: item.group,
                name: item.name,
            });
        };
        let version = if version::is_range(&version) {
            let concrete = self
                .repo
                .resolve_range(&item.group, &item.name, &item.kind, &version)?;
            item.version = Some(concrete.as_str().to_string());
            concrete.as_str().to_string()
        } else {
            version
        };

        let cached = self.repo.artifact_path(
            &item.group,
            &item.name,
            &version,
            item.classifier.as_deref(),
            &item.kind,
        );
        let reported = reported_path.filter(|p| p.exists());
        let (path, resolved) = if cached.exists() {
            debug!("{item} is resolved from the local repository");
            (Some(cached), true)
        } else if let Some(reported) = reported {
            debug!("{item} is resolved from the build output");
            (Some(reported), true)
        } else {
            warn!("artifact {item} has no attached file");
            (None, false)
        };

        Ok(ResolvedArtifact {
            group: item.group,
            name: item.name,
            kind: item.kind,
            version,
            classifier: item.classifier,
            scope: Scope::Provided,
            path,
            resolved,
            trail: Vec::new(),
        })
    }

    fn from_project_dependencies(&self, item: &Coordinate) -> Option<&ResolvedArtifact> {
        self.project.artifacts.iter().find(|a| {
            a.group == item.group && a.name == item.name && a.kind == item.kind
        })
    }

    fn from_dependency_management(&self, item: &Coordinate) -> Option<&DeclaredDependency> {
        self.project.dependency_management.iter().find(|d| {
            d.group == item.group && d.name == item.name && d.kind == item.kind
        })
    }

    // Adds every component from the project dependency set whose recorded
    // trail passes through the anchor. Provided-scope components stay out of
    // the closure unless the anchor itself is provided.
    fn find_transitive(&self, anchor: &ResolvedArtifact, resolved: &mut DependencySet) {
        let provided_allowed = anchor.scope == Scope::Provided;
        let prefix = anchor.trail_prefix();
        for candidate in &self.project.artifacts {
            if candidate == anchor {
                continue;
            }
            if candidate.scope == Scope::Provided && !provided_allowed {
                continue;
            }
            if trail_contains(&prefix, Some(&anchor.version), &candidate.trail) {
                info!(
                    "adding transitive dependency with scope {} and coordinate {candidate}",
                    candidate.scope
                );
                resolved.insert(candidate.clone());
            }
        }
    }
}

/// True when any trail segment starts with the `group:name:` prefix and, if
/// a version is given, ends with `:version`.
pub fn trail_contains(prefix: &str, version: Option<&str>, trail: &[String]) -> bool {
    trail.iter().any(|segment| {
        segment.starts_with(prefix)
            && version.is_none_or(|v| segment.ends_with(&format!(":{v}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_repo(name: &str) -> Repository {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        Repository::new(std::env::temp_dir().join(format!(
            "feature_gen_resolve_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        )))
    }

    fn install(repo: &Repository, group: &str, name: &str, version: &str) -> PathBuf {
        let path = repo.artifact_path(group, name, version, None, "jar");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"jar").unwrap();
        path
    }

    fn artifact(
        name: &str,
        version: &str,
        scope: Scope,
        trail: &[&str],
    ) -> ResolvedArtifact {
        ResolvedArtifact {
            group: "org.example".into(),
            name: name.into(),
            kind: "jar".into(),
            version: version.into(),
            classifier: None,
            scope,
            path: None,
            resolved: true,
            trail: trail.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn project(artifacts: Vec<ResolvedArtifact>) -> ProjectModel {
        ProjectModel {
            group: "org.example".into(),
            name: "app".into(),
            version: "1.0".into(),
            output_dir: None,
            config_dir: None,
            primary_config: None,
            dependencies: Vec::new(),
            dependency_management: Vec::new(),
            artifacts,
            descriptor_path: PathBuf::from("/nonexistent/module.json"),
        }
    }

    #[test]
    fn explicit_version_resolves_from_the_repository() -> anyhow::Result<()> {
        let repo = temp_repo("explicit");
        let path = install(&repo, "org.example", "demo", "1.0");
        let model = project(Vec::new());
        let resolver = Resolver::new(&repo, &model);

        let resolved =
            resolver.resolve(&Coordinate::new("org.example", "demo", "jar", Some("1.0")))?;
        assert!(resolved.resolved);
        assert_eq!(resolved.path.as_deref(), Some(path.as_path()));
        assert_eq!(resolved.scope, Scope::Provided);

        let _ = fs::remove_dir_all(repo.root());
        Ok(())
    }

    #[test]
    fn version_range_resolves_to_the_highest_cached() -> anyhow::Result<()> {
        let repo = temp_repo("range");
        install(&repo, "org.example", "demo", "1.1");
        install(&repo, "org.example", "demo", "1.5");
        install(&repo, "org.example", "demo", "2.0");
        let model = project(Vec::new());
        let resolver = Resolver::new(&repo, &model);

        let resolved = resolver.resolve(&Coordinate::new(
            "org.example",
            "demo",
            "jar",
            Some("[1.0,2.0)"),
        ))?;
        assert_eq!(resolved.version, "1.5");

        let _ = fs::remove_dir_all(repo.root());
        Ok(())
    }

    #[test]
    fn versionless_request_promotes_the_project_dependency_version() -> anyhow::Result<()> {
        let repo = temp_repo("promote");
        install(&repo, "org.example", "demo", "3.2");
        let mut unresolved = artifact("demo", "3.2", Scope::Compile, &[]);
        unresolved.resolved = false;
        let model = project(vec![unresolved]);
        let resolver = Resolver::new(&repo, &model);

        let resolved = resolver.resolve(&Coordinate::new("org.example", "demo", "jar", None))?;
        assert_eq!(resolved.version, "3.2");
        assert!(resolved.resolved);

        let _ = fs::remove_dir_all(repo.root());
        Ok(())
    }

    #[test]
    fn versionless_request_falls_back_to_dependency_management() -> anyhow::Result<()> {
        let repo = temp_repo("depmgmt");
        install(&repo, "org.example", "demo", "2.7");
        let mut model = project(Vec::new());
        model.dependency_management.push(DeclaredDependency {
            group: "org.example".into(),
            name: "demo".into(),
            kind: "jar".into(),
            version: "2.7".into(),
            classifier: None,
            scope: Scope::Compile,
        });
        let resolver = Resolver::new(&repo, &model);

        let resolved = resolver.resolve(&Coordinate::new("org.example", "demo", "jar", None))?;
        assert_eq!(resolved.version, "2.7");

        let _ = fs::remove_dir_all(repo.root());
        Ok(())
    }

    #[test]
    fn unknown_coordinate_is_not_found() {
        let repo = temp_repo("notfound");
        let model = project(Vec::new());
        let resolver = Resolver::new(&repo, &model);

        let err = resolver
            .resolve(&Coordinate::new("org.example", "ghost", "jar", None))
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }

    #[test]
    fn failed_versioned_bulk_request_yields_an_empty_set() -> anyhow::Result<()> {
        let repo = temp_repo("bulk_missing");
        let model = project(Vec::new());
        let resolver = Resolver::new(&repo, &model);

        let set = resolver.resolve_with_transitive(&CoordinateQuery {
            group: "org.example".into(),
            name: Some("ghost".into()),
            kind: "jar".into(),
            version: Some("[9.0,)".into()),
            classifier: None,
        })?;
        assert!(set.is_empty());
        Ok(())
    }

    #[test]
    fn wildcard_scan_expands_transitives_and_skips_test_scope() -> anyhow::Result<()> {
        let repo = temp_repo("wildcard");
        let anchor = artifact("demo-core", "1.0", Scope::Compile, &[]);
        let transitive = artifact(
            "demo-util",
            "1.0",
            Scope::Runtime,
            &["org.example:app:jar:1.0", "org.example:demo-core:jar:1.0"],
        );
        let unrelated = artifact("other", "1.0", Scope::Compile, &["org.example:app:jar:1.0"]);
        let test_scoped = artifact("demo-test", "1.0", Scope::Test, &[]);
        let model = project(vec![anchor, transitive, unrelated, test_scoped]);
        let resolver = Resolver::new(&repo, &model);

        let set = resolver.resolve_with_transitive(&CoordinateQuery {
            group: "org.example".into(),
            name: Some("demo-*".into()),
            kind: "jar".into(),
            version: None,
            classifier: None,
        })?;
        let names: Vec<&str> = set.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["demo-core", "demo-util"]);
        Ok(())
    }

    #[test]
    fn provided_components_stay_out_of_a_compile_anchor_closure() {
        let repo = temp_repo("provided");
        let provided = artifact(
            "demo-api",
            "1.0",
            Scope::Provided,
            &["org.example:anchor:jar:1.0"],
        );
        let model = project(vec![provided]);
        let resolver = Resolver::new(&repo, &model);

        let compile_anchor = artifact("anchor", "1.0", Scope::Compile, &[]);
        let mut closure = DependencySet::new();
        resolver.find_transitive(&compile_anchor, &mut closure);
        assert!(closure.is_empty());

        let provided_anchor = artifact("anchor", "1.0", Scope::Provided, &[]);
        let mut closure = DependencySet::new();
        resolver.find_transitive(&provided_anchor, &mut closure);
        assert_eq!(closure.len(), 1);
    }

    #[test]
    fn trail_match_requires_the_anchor_version_suffix_when_given() {
        let trail = vec!["org.example:demo:jar:1.0".to_string()];
        assert!(trail_contains("org.example:demo:", Some("1.0"), &trail));
        assert!(!trail_contains("org.example:demo:", Some("2.0"), &trail));
        assert!(trail_contains("org.example:demo:", None, &trail));
        assert!(!trail_contains("org.example:other:", None, &trail));
    }
}
