//! Feature generation: reconciles declared server features with the feature
//! set the binary scanner derives from compiled application code, then keeps
//! the generated configuration overlay in sync.

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::artifact::Coordinate;
use crate::features::FeatureSet;
use crate::graph::{ModuleGraph, Walk};
use crate::project::ProjectModel;
use crate::repo::Repository;
use crate::resolve::Resolver;
use crate::scanner::{
    SCANNER_GROUP, SCANNER_NAME, SCANNER_TYPE, SCANNER_VERSION_RANGE, ScanOutcome, ScanRequest,
    Scanner,
};
use crate::store;

pub const OVERLAY_HEADER: &str = "This file was generated by feature-gen and will be overwritten on subsequent runs of the generate command.\nIt is recommended that you do not edit this file and that you commit it to your version control.";
pub const GENERATED_FEATURES_COMMENT: &str =
    "The following features were generated based on API usage detected in your application";
pub const NO_NEW_FEATURES_COMMENT: &str = "No additional features generated";
pub const FEATURES_FILE_MESSAGE: &str = "feature-gen has generated server features necessary for your application in configDropins/overrides/generated-features.toml";

const NO_CLASSES_DIR_WARNING: &str = "could not find a classes directory to generate features against; ensure the project has been compiled first";

// EE and MicroProfile platform umbrella dependencies.
const EE_UMBRELLAS: &[(&str, &str)] = &[
    ("javax", "javaee-api"),
    ("jakarta.platform", "jakarta.jakartaee-api"),
];
const MP_UMBRELLAS: &[(&str, &str)] = &[("org.eclipse.microprofile", "microprofile")];

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub optimize: bool,
    pub class_files: Vec<PathBuf>,
    pub scanner: Option<Coordinate>,
    pub log_dir: Option<PathBuf>,
}

/// One build invocation's view of the world, passed by reference through
/// resolution and reconciliation.
pub struct BuildContext<'a> {
    pub repo: &'a Repository,
    pub graph: &'a ModuleGraph,
    pub current: usize,
}

#[derive(Debug, Serialize)]
pub struct GenerateSummary {
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub ee_version: Option<String>,
    pub mp_version: Option<String>,
    pub scanned: Vec<String>,
    pub generated: Vec<String>,
    pub overlay: Option<String>,
    pub written: bool,
}

impl GenerateSummary {
    pub fn skipped(reason: &str) -> Self {
        Self {
            skipped: true,
            reason: Some(reason.to_string()),
            ee_version: None,
            mp_version: None,
            scanned: Vec::new(),
            generated: Vec::new(),
            overlay: None,
            written: false,
        }
    }
}

pub fn generate(ctx: &BuildContext<'_>, options: &GenerateOptions) -> Result<GenerateSummary> {
    let upstream = match ctx.graph.walk(ctx.current) {
        Walk::Skip { reason } => {
            info!("skipping feature generation: {reason}");
            return Ok(GenerateSummary::skipped(&reason));
        }
        Walk::Proceed { upstream } => upstream,
    };
    let project = ctx.graph.module(ctx.current);
    let config_dir = project.server_config_dir();
    let resolver = Resolver::new(ctx.repo, project);

    let scanner_jar = resolve_scanner_jar(&resolver, options.scanner.as_ref())?;
    debug!("binary scanner jar: {}", scanner_jar.display());
    debug!("optimize generate features: {}", options.optimize);
    if !options.class_files.is_empty() {
        debug!("generate features for class files: {:?}", options.class_files);
    }

    let generated_files: BTreeSet<String> = [store::GENERATED_FEATURES_FILE_NAME.to_string()].into();
    let primary = store::find_primary_config(&config_dir, project.primary_config.as_deref());

    // with optimize on, the scanner re-derives previously generated features
    // instead of trusting them, so they are left out of its input
    let existing = store::read_features(
        &config_dir,
        primary.as_deref(),
        options.optimize.then_some(&generated_files),
    )?;
    let user_defined = if options.optimize {
        existing.clone()
    } else {
        store::read_features(&config_dir, primary.as_deref(), Some(&generated_files))?
    };
    let non_custom = existing.non_custom();

    let mut modules: Vec<&ProjectModel> = upstream.iter().collect();
    modules.push(project);

    let class_dirs = classes_directories(&modules);
    if class_dirs.is_empty() && options.class_files.is_empty() {
        // warn and still call the scanner so conflicts in the configured
        // features are detected
        warn!("{NO_CLASSES_DIR_WARNING}");
    }

    let ee_version = detect_platform_version(&modules, EE_UMBRELLAS, "Java/Jakarta EE");
    let mp_version = detect_platform_version(&modules, MP_UMBRELLAS, "MicroProfile");

    let log_dir = options
        .log_dir
        .clone()
        .or_else(|| project.output_dir.as_ref().and_then(|d| d.parent().map(Path::to_path_buf)))
        .unwrap_or_else(|| project.base_dir().join("target"));

    let outcome = Scanner::new(scanner_jar)
        .scan(&ScanRequest {
            features: non_custom.to_vec(),
            class_files: &options.class_files,
            class_dirs: &class_dirs,
            log_dir: &log_dir,
            ee_version: ee_version.as_deref(),
            mp_version: mp_version.as_deref(),
            optimize: options.optimize,
        })
        .context("failed to generate a working set of features")?;

    let scanned = reconcile(
        outcome,
        &user_defined,
        ee_version.as_deref(),
        mp_version.as_deref(),
    )?;

    let missing = scanned.difference(&user_defined);
    debug!("features detected by the scanner and not configured: {missing}");

    let overlay = store::overlay_path(&config_dir);
    let written = sync_overlay(&overlay, primary.as_deref(), &missing)?;

    Ok(GenerateSummary {
        skipped: false,
        reason: None,
        ee_version,
        mp_version,
        scanned: scanned.to_vec(),
        generated: missing.to_vec(),
        overlay: Some(overlay.to_string_lossy().to_string()),
        written,
    })
}

fn resolve_scanner_jar(
    resolver: &Resolver<'_>,
    override_coordinate: Option<&Coordinate>,
) -> Result<PathBuf> {
    let coordinate = override_coordinate.cloned().unwrap_or_else(|| {
        Coordinate::new(
            SCANNER_GROUP,
            SCANNER_NAME,
            SCANNER_TYPE,
            Some(SCANNER_VERSION_RANGE),
        )
    });
    let artifact = resolver.resolve(&coordinate).map_err(|e| {
        anyhow!(
            "could not retrieve the artifact {coordinate} needed for feature generation; ensure a repository containing it is reachable from this build: {e}"
        )
    })?;
    artifact
        .path
        .filter(|p| p.exists())
        .ok_or_else(|| anyhow!("the binary scanner artifact {coordinate} has no backing file"))
}

/// Applies the scanner outcome decision table, returning the feature set to
/// merge on success. Every non-success outcome is terminal.
pub fn reconcile(
    outcome: ScanOutcome,
    user_defined: &FeatureSet,
    ee_version: Option<&str>,
    mp_version: Option<&str>,
) -> Result<FeatureSet> {
    match outcome {
        ScanOutcome::Success { features } => Ok(features.into_iter().collect()),
        ScanOutcome::NoRecommendation { conflicts } => {
            let conflicts: FeatureSet = conflicts.into_iter().collect();
            bail!(
                "a working set of features could not be generated: the features {conflicts} are in conflict and no resolution could be recommended"
            );
        }
        ScanOutcome::FeatureModified {
            features,
            suggestions,
        } => {
            let modified: FeatureSet = features.into_iter().collect();
            if modified.is_superset_of(user_defined) {
                // only previously generated features were altered
                warn!(
                    "the scanner modified previously generated features to obtain a working set: {modified}"
                );
                Ok(modified)
            } else {
                let mut all: FeatureSet = suggestions.into_iter().collect();
                all.extend(user_defined.iter());
                bail!(
                    "a working set of features could not be generated: the features {all} are in conflict; consider using the working set {modified} instead"
                );
            }
        }
        ScanOutcome::RecommendationSet {
            existing_conflict,
            conflicts,
            suggestions,
        } => {
            let conflicts: FeatureSet = conflicts.into_iter().collect();
            let suggestions: FeatureSet = suggestions.into_iter().collect();
            if existing_conflict {
                bail!(
                    "the features configured in the server configuration are in conflict with the detected API usage: {conflicts}; consider using the feature set {suggestions} instead"
                );
            }
            bail!(
                "a working set of features could not be generated: the features {conflicts} are in conflict; consider using the feature set {suggestions} instead"
            );
        }
        ScanOutcome::FeatureUnavailable {
            conflicts,
            mp_level,
            ee_level,
            unavailable,
        } => {
            let conflicts: FeatureSet = conflicts.into_iter().collect();
            let unavailable: FeatureSet = unavailable.into_iter().collect();
            bail!(
                "the features {conflicts} conflict for MicroProfile {} and Java/Jakarta EE {}: the features {unavailable} are not available at those platform levels",
                mp_level.as_deref().unwrap_or("unspecified"),
                ee_level.as_deref().unwrap_or("unspecified"),
            );
        }
        ScanOutcome::IllegalTargetCombo => bail!(
            "the detected Java/Jakarta EE version {} and MicroProfile version {} are not mutually compatible",
            ee_version.unwrap_or("unspecified"),
            mp_version.unwrap_or("unspecified"),
        ),
        ScanOutcome::IllegalTarget { ee_level, mp_level } => bail!(
            "the detected platform versions (Java/Jakarta EE {}, MicroProfile {}) are out of the supported range (Java/Jakarta EE {}, MicroProfile {})",
            ee_version.unwrap_or("unspecified"),
            mp_version.unwrap_or("unspecified"),
            ee_level.as_deref().unwrap_or("unspecified"),
            mp_level.as_deref().unwrap_or("unspecified"),
        ),
    }
}

/// Brings the overlay in line with the missing feature set. Content
/// equality, not file presence, decides whether anything is written; the
/// return value reports whether a write happened.
pub fn sync_overlay(
    overlay: &Path,
    primary: Option<&Path>,
    missing: &FeatureSet,
) -> Result<bool> {
    let write_context = || {
        format!(
            "automatic generation of features failed: error writing {}; ensure your id has write permission to the server configuration directory",
            overlay.display()
        )
    };

    if !missing.is_empty() {
        let previous = store::read_generated_features(overlay)?;
        if *missing != previous {
            info!("generated the following features: {missing}");
            store::write_overlay(overlay, OVERLAY_HEADER, GENERATED_FEATURES_COMMENT, missing)
                .with_context(write_context)?;
            debug!("created {}", overlay.display());
            if let Some(primary) = primary {
                if !store::has_marker_comment(primary, FEATURES_FILE_MESSAGE)? {
                    store::add_marker_comment(primary, FEATURES_FILE_MESSAGE)?;
                }
            }
            return Ok(true);
        }
        info!("regenerated the following features: {missing}");
        return Ok(false);
    }

    info!("no additional features were generated");
    if overlay.exists() {
        let placeholder = store::render_overlay(OVERLAY_HEADER, NO_NEW_FEATURES_COMMENT, missing);
        let current = std::fs::read_to_string(overlay).ok();
        if current.as_deref() != Some(placeholder.as_str()) {
            store::write_overlay(overlay, OVERLAY_HEADER, NO_NEW_FEATURES_COMMENT, missing)
                .with_context(write_context)?;
            return Ok(true);
        }
    }
    Ok(false)
}

// Existing class output directories of the given modules, canonicalized
// where possible.
fn classes_directories(modules: &[&ProjectModel]) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    for module in modules {
        let Some(output_dir) = &module.output_dir else {
            continue;
        };
        if output_dir.exists() {
            let dir = std::fs::canonicalize(output_dir).unwrap_or_else(|_| output_dir.clone());
            debug!("found classes directory: {}", dir.display());
            dirs.insert(dir);
        }
    }
    dirs
}

// The first provided-scope umbrella dependency in declaration order, per
// module; across modules the highest version string wins.
fn umbrella_version(module: &ProjectModel, umbrellas: &[(&str, &str)]) -> Option<String> {
    module
        .dependencies
        .iter()
        .find(|d| {
            d.scope == crate::artifact::Scope::Provided
                && umbrellas.contains(&(d.group.as_str(), d.name.as_str()))
        })
        .map(|d| d.version.clone())
}

pub(crate) fn detect_platform_version(
    modules: &[&ProjectModel],
    umbrellas: &[(&str, &str)],
    platform: &str,
) -> Option<String> {
    let mut detected = BTreeSet::new();
    for module in modules {
        if let Some(version) = umbrella_version(module, umbrellas) {
            debug!("{platform} umbrella dependency found in module {}", module.name);
            detected.insert(version);
        }
    }
    if detected.len() > 1 {
        debug!(
            "multiple {platform} versions found across project modules; using the highest version to generate features"
        );
    }
    detected.into_iter().next_back()
}
