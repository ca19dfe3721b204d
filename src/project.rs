//! Module descriptors and workspace loading.
//!
//! A module descriptor is a JSON file emitted by the build. It records the
//! module identity, the declared dependency list in declaration order, the
//! dependency-management defaults, and the fully resolved dependency set
//! with recorded dependency trails.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::artifact::{DeclaredDependency, ResolvedArtifact};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectModel {
    pub group: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub config_dir: Option<PathBuf>,
    #[serde(default)]
    pub primary_config: Option<PathBuf>,
    #[serde(default)]
    pub dependencies: Vec<DeclaredDependency>,
    #[serde(default)]
    pub dependency_management: Vec<DeclaredDependency>,
    #[serde(default)]
    pub artifacts: Vec<ResolvedArtifact>,
    #[serde(skip)]
    pub descriptor_path: PathBuf,
}

impl ProjectModel {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read module descriptor: {}", path.display()))?;
        let mut model: ProjectModel = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse module descriptor: {}", path.display()))?;
        model.descriptor_path = path.to_path_buf();

        let base = model.base_dir();
        model.output_dir = model.output_dir.take().map(|p| absolutize(&base, p));
        model.config_dir = model.config_dir.take().map(|p| absolutize(&base, p));
        model.primary_config = model.primary_config.take().map(|p| absolutize(&base, p));
        for artifact in &mut model.artifacts {
            artifact.path = artifact.path.take().map(|p| absolutize(&base, p));
        }
        Ok(model)
    }

    pub fn base_dir(&self) -> PathBuf {
        self.descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The server configuration directory this module targets.
    pub fn server_config_dir(&self) -> PathBuf {
        match &self.config_dir {
            Some(dir) => dir.clone(),
            None => self.base_dir().join("src/main/liberty/config"),
        }
    }

    pub fn ga(&self) -> (&str, &str) {
        (self.group.as_str(), self.name.as_str())
    }
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[derive(Debug, Deserialize)]
struct WorkspaceFile {
    modules: Vec<PathBuf>,
}

/// The modules of a multi-module build, in build order.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub modules: Vec<ProjectModel>,
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read workspace descriptor: {}", path.display()))?;
        let file: WorkspaceFile = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse workspace descriptor: {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut modules = Vec::with_capacity(file.modules.len());
        for module_path in file.modules {
            let module_path = absolutize(&base, module_path);
            modules.push(ProjectModel::load(&module_path)?);
        }
        Ok(Self { modules })
    }

    pub fn single(module: ProjectModel) -> Self {
        Self {
            modules: vec![module],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "feature_gen_project_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    #[test]
    fn load_resolves_relative_paths_against_descriptor_dir() -> Result<()> {
        let base = temp_dir("load");
        fs::create_dir_all(&base)?;
        let descriptor = base.join("module.json");
        fs::write(
            &descriptor,
            r#"{
                "group": "org.example",
                "name": "app",
                "version": "1.0",
                "output_dir": "target/classes",
                "dependencies": [
                    {"group": "jakarta.platform", "name": "jakarta.jakartaee-api",
                     "version": "9.1.0", "scope": "provided"}
                ]
            }"#,
        )?;

        let model = ProjectModel::load(&descriptor)?;
        assert_eq!(model.ga(), ("org.example", "app"));
        assert_eq!(model.output_dir, Some(base.join("target/classes")));
        assert_eq!(
            model.server_config_dir(),
            base.join("src/main/liberty/config")
        );
        assert_eq!(model.dependencies.len(), 1);
        assert_eq!(model.dependencies[0].kind, "jar");

        let _ = fs::remove_dir_all(base);
        Ok(())
    }

    #[test]
    fn workspace_preserves_build_order() -> Result<()> {
        let base = temp_dir("workspace");
        fs::create_dir_all(base.join("lib"))?;
        fs::create_dir_all(base.join("app"))?;
        fs::write(
            base.join("lib/module.json"),
            r#"{"group": "org.example", "name": "lib", "version": "1.0"}"#,
        )?;
        fs::write(
            base.join("app/module.json"),
            r#"{"group": "org.example", "name": "app", "version": "1.0"}"#,
        )?;
        fs::write(
            base.join("workspace.json"),
            r#"{"modules": ["lib/module.json", "app/module.json"]}"#,
        )?;

        let workspace = Workspace::load(&base.join("workspace.json"))?;
        let names: Vec<&str> = workspace.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["lib", "app"]);

        let _ = fs::remove_dir_all(base);
        Ok(())
    }
}
