//! Multi-module project graph walk.
//!
//! Feature generation runs once per build, at the most downstream consumer:
//! a module with dependents defers the work to them. Upstream modules are
//! re-read from disk so in-session dependency changes are picked up, falling
//! back to the last resolved model when a re-read fails.

use tracing::{debug, info};

use crate::project::{ProjectModel, Workspace};
use crate::store;

#[derive(Debug)]
pub enum Walk {
    Skip { reason: String },
    Proceed { upstream: Vec<ProjectModel> },
}

#[derive(Debug)]
pub struct ModuleGraph {
    modules: Vec<ProjectModel>,
}

impl ModuleGraph {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            modules: workspace.modules,
        }
    }

    pub fn modules(&self) -> &[ProjectModel] {
        &self.modules
    }

    pub fn module(&self, index: usize) -> &ProjectModel {
        &self.modules[index]
    }

    /// Finds the module loaded from the given descriptor path.
    pub fn position(&self, descriptor: &std::path::Path) -> Option<usize> {
        let wanted = std::fs::canonicalize(descriptor).unwrap_or_else(|_| descriptor.to_path_buf());
        self.modules.iter().position(|m| {
            let have = std::fs::canonicalize(&m.descriptor_path)
                .unwrap_or_else(|_| m.descriptor_path.clone());
            have == wanted
        })
    }

    // True when `dependent` declares or resolves a dependency on `dependency`.
    fn depends_on(dependent: &ProjectModel, dependency: &ProjectModel) -> bool {
        let ga = dependency.ga();
        dependent
            .dependencies
            .iter()
            .any(|d| (d.group.as_str(), d.name.as_str()) == ga)
            || dependent
                .artifacts
                .iter()
                .any(|a| (a.group.as_str(), a.name.as_str()) == ga)
    }

    fn closure(&self, start: usize, edge: impl Fn(usize, usize) -> bool) -> Vec<usize> {
        let mut seen = vec![false; self.modules.len()];
        seen[start] = true;
        let mut queue = vec![start];
        let mut found = Vec::new();
        while let Some(current) = queue.pop() {
            for candidate in 0..self.modules.len() {
                if !seen[candidate] && edge(current, candidate) {
                    seen[candidate] = true;
                    found.push(candidate);
                    queue.push(candidate);
                }
            }
        }
        found.sort_unstable();
        found
    }

    /// Modules that (transitively) depend on the given module.
    pub fn downstream(&self, index: usize) -> Vec<usize> {
        self.closure(index, |current, candidate| {
            Self::depends_on(&self.modules[candidate], &self.modules[current])
        })
    }

    /// Modules the given module (transitively) depends on, in build order.
    pub fn upstream(&self, index: usize) -> Vec<usize> {
        self.closure(index, |current, candidate| {
            Self::depends_on(&self.modules[current], &self.modules[candidate])
        })
    }

    pub fn walk(&self, current: usize) -> Walk {
        let downstream = self.downstream(current);
        if !downstream.is_empty() {
            let names: Vec<&str> = downstream
                .iter()
                .map(|&i| self.modules[i].name.as_str())
                .collect();
            debug!("downstream modules: {names:?}");
            return Walk::Skip {
                reason: format!(
                    "modules {names:?} depend on this module; feature generation runs at the most downstream module"
                ),
            };
        }

        let mut upstream = Vec::new();
        for index in self.upstream(current) {
            let cached = &self.modules[index];
            match ProjectModel::load(&cached.descriptor_path) {
                Ok(fresh) => upstream.push(fresh),
                Err(e) => {
                    debug!(
                        "could not re-resolve upstream module {}: {e:#}; falling back to the last resolved model",
                        cached.descriptor_path.display()
                    );
                    upstream.push(cached.clone());
                }
            }
        }

        // Another module earlier in the build writing the same overlay path
        // would race this one; defer to it. Best-effort check, not a lock.
        let overlay = store::overlay_path(&self.modules[current].server_config_dir());
        for earlier in self.modules.iter().take(current) {
            if store::overlay_path(&earlier.server_config_dir()) == overlay {
                info!(
                    "module {} already generates {}",
                    earlier.name,
                    overlay.display()
                );
                return Walk::Skip {
                    reason: format!(
                        "module {} earlier in the build generates the same features file",
                        earlier.name
                    ),
                };
            }
        }

        Walk::Proceed { upstream }
    }
}
