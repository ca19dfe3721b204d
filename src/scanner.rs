//! Binary scanner invocation.
//!
//! The scanner is an external jar, run synchronously through `java -jar`.
//! It inspects compiled class files together with the currently configured
//! features and prints a single JSON object on stdout describing either a
//! working feature set or one of the conflict outcomes.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

pub const SCANNER_GROUP: &str = "com.ibm.websphere.appmod.tools";
pub const SCANNER_NAME: &str = "binary-app-scanner";
pub const SCANNER_TYPE: &str = "jar";
/// Highest cached release wins.
pub const SCANNER_VERSION_RANGE: &str = "[21.0.0.3,)";

/// One scan produces exactly one outcome; the engine never retries across
/// variants.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum ScanOutcome {
    Success {
        #[serde(default)]
        features: Vec<String>,
    },
    NoRecommendation {
        #[serde(default)]
        conflicts: Vec<String>,
    },
    FeatureModified {
        #[serde(default)]
        features: Vec<String>,
        #[serde(default)]
        suggestions: Vec<String>,
    },
    RecommendationSet {
        #[serde(default)]
        existing_conflict: bool,
        #[serde(default)]
        conflicts: Vec<String>,
        #[serde(default)]
        suggestions: Vec<String>,
    },
    FeatureUnavailable {
        #[serde(default)]
        conflicts: Vec<String>,
        #[serde(default)]
        mp_level: Option<String>,
        #[serde(default)]
        ee_level: Option<String>,
        #[serde(default)]
        unavailable: Vec<String>,
    },
    IllegalTargetCombo,
    IllegalTarget {
        #[serde(default)]
        ee_level: Option<String>,
        #[serde(default)]
        mp_level: Option<String>,
    },
}

#[derive(Debug)]
pub struct ScanRequest<'a> {
    pub features: Vec<String>,
    pub class_files: &'a [PathBuf],
    pub class_dirs: &'a BTreeSet<PathBuf>,
    pub log_dir: &'a Path,
    pub ee_version: Option<&'a str>,
    pub mp_version: Option<&'a str>,
    pub optimize: bool,
}

fn java_command(args: &[String]) -> Result<std::process::Output> {
    let java_bin = std::env::var("FEATURE_GEN_JAVA").unwrap_or_else(|_| "java".to_string());
    Command::new(&java_bin)
        .args(args)
        .output()
        .context("failed to execute java (ensure a JRE/JDK is installed)")
}

fn join_paths<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> String {
    paths
        .into_iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Debug, Clone)]
pub struct Scanner {
    jar: PathBuf,
}

impl Scanner {
    pub fn new(jar: PathBuf) -> Self {
        Self { jar }
    }

    pub fn scan(&self, request: &ScanRequest<'_>) -> Result<ScanOutcome> {
        let mut args = vec![
            "-jar".to_string(),
            self.jar.to_string_lossy().to_string(),
            "--logDir".to_string(),
            request.log_dir.to_string_lossy().to_string(),
            "--optimize".to_string(),
            request.optimize.to_string(),
        ];
        if !request.features.is_empty() {
            args.push("--currentFeatures".to_string());
            args.push(request.features.join(","));
        }
        if !request.class_dirs.is_empty() {
            args.push("--binaryInputs".to_string());
            args.push(join_paths(request.class_dirs));
        }
        if !request.class_files.is_empty() {
            args.push("--classFiles".to_string());
            args.push(join_paths(request.class_files));
        }
        if let Some(ee) = request.ee_version {
            args.push("--targetJavaEE".to_string());
            args.push(ee.to_string());
        }
        if let Some(mp) = request.mp_version {
            args.push("--targetMicroP".to_string());
            args.push(mp.to_string());
        }
        debug!("scanner arguments: {args:?}");

        let output = java_command(&args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("binary scanner failed: {}", stderr.trim());
        }
        serde_json::from_slice(&output.stdout).context("failed to parse binary scanner output")
    }
}
