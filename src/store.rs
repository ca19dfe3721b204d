//! Server configuration store.
//!
//! Feature lists live in TOML configuration files: a primary `server.toml`
//! in the configuration directory plus drop-in fragments under
//! `configDropins/defaults` and `configDropins/overrides`. The generated
//! overlay is one of those overrides; content equality, not file presence or
//! mtime, decides whether it gets rewritten.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::features::FeatureSet;

pub const PRIMARY_CONFIG_FILE_NAME: &str = "server.toml";
pub const GENERATED_FEATURES_FILE_NAME: &str = "generated-features.toml";

/// The fixed overlay location under a configuration directory.
pub fn overlay_path(config_dir: &Path) -> PathBuf {
    config_dir
        .join("configDropins")
        .join("overrides")
        .join(GENERATED_FEATURES_FILE_NAME)
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    features: Vec<String>,
}

fn read_config_file(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read server configuration: {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&text)
        .with_context(|| format!("failed to parse server configuration: {}", path.display()))?;
    Ok(config.features)
}

/// Returns `specific` if it exists, else the default-named file in the
/// configuration directory if that exists.
pub fn find_primary_config(config_dir: &Path, specific: Option<&Path>) -> Option<PathBuf> {
    if let Some(file) = specific {
        if file.exists() {
            return Some(file.to_path_buf());
        }
    }
    let fallback = config_dir.join(PRIMARY_CONFIG_FILE_NAME);
    fallback.exists().then_some(fallback)
}

fn dropin_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}

/// Reads the declared feature set from the primary configuration and all
/// drop-in fragments, skipping any file whose name is in `exclude`.
pub fn read_features(
    config_dir: &Path,
    primary: Option<&Path>,
    exclude: Option<&BTreeSet<String>>,
) -> Result<FeatureSet> {
    let mut files = Vec::new();
    if let Some(primary) = find_primary_config(config_dir, primary) {
        files.push(primary);
    }
    for dropins in ["defaults", "overrides"] {
        files.extend(dropin_files(&config_dir.join("configDropins").join(dropins)));
    }

    let mut features = FeatureSet::new();
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if exclude.is_some_and(|set| set.contains(&name)) {
            continue;
        }
        features.extend(read_config_file(&file)?);
    }
    Ok(features)
}

/// The feature set recorded in the generated overlay; empty when the overlay
/// does not exist.
pub fn read_generated_features(overlay: &Path) -> Result<FeatureSet> {
    if !overlay.exists() {
        return Ok(FeatureSet::new());
    }
    Ok(read_config_file(overlay)?.into_iter().collect())
}

/// Renders overlay content: header and comment lines, then the feature list.
pub fn render_overlay(header: &str, comment: &str, features: &FeatureSet) -> String {
    let mut out = String::new();
    for line in header.lines().chain(comment.lines()) {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    if features.is_empty() {
        out.push_str("features = []\n");
    } else {
        out.push_str("features = [\n");
        for feature in features.iter() {
            out.push_str(&format!("    {feature:?},\n"));
        }
        out.push_str("]\n");
    }
    out
}

pub fn write_overlay(
    path: &Path,
    header: &str,
    comment: &str,
    features: &FeatureSet,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create overlay directory: {}", parent.display()))?;
    }
    std::fs::write(path, render_overlay(header, comment, features))
        .with_context(|| format!("failed to write generated features file: {}", path.display()))
}

/// Whether the primary configuration already carries the cross-reference
/// marker comment.
pub fn has_marker_comment(config: &Path, marker: &str) -> Result<bool> {
    if !config.exists() {
        return Ok(false);
    }
    let text = std::fs::read_to_string(config)
        .with_context(|| format!("failed to read server configuration: {}", config.display()))?;
    Ok(text.contains(marker))
}

/// Prepends the cross-reference marker comment to the primary configuration
/// if it is not already present.
pub fn add_marker_comment(config: &Path, marker: &str) -> Result<()> {
    if !config.exists() || has_marker_comment(config, marker)? {
        return Ok(());
    }
    let text = std::fs::read_to_string(config)
        .with_context(|| format!("failed to read server configuration: {}", config.display()))?;
    std::fs::write(config, format!("# {marker}\n{text}"))
        .with_context(|| format!("failed to update server configuration: {}", config.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_config_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "feature_gen_store_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn read_features_merges_primary_and_dropins() -> Result<()> {
        let dir = temp_config_dir("merge");
        fs::write(
            dir.join("server.toml"),
            "features = [\"servlet-5.0\"]\n",
        )?;
        let overrides = dir.join("configDropins/overrides");
        fs::create_dir_all(&overrides)?;
        fs::write(
            overrides.join(GENERATED_FEATURES_FILE_NAME),
            "features = [\"jsonp-2.1\"]\n",
        )?;

        let all = read_features(&dir, None, None)?;
        assert_eq!(all.to_vec(), vec!["jsonp-2.1", "servlet-5.0"]);

        let exclude: BTreeSet<String> = [GENERATED_FEATURES_FILE_NAME.to_string()].into();
        let user_only = read_features(&dir, None, Some(&exclude))?;
        assert_eq!(user_only.to_vec(), vec!["servlet-5.0"]);

        let _ = fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn overlay_round_trips_through_render_and_read() -> Result<()> {
        let dir = temp_config_dir("roundtrip");
        let overlay = overlay_path(&dir);
        let features: FeatureSet = ["jsonp-2.1", "servlet-5.0"].into_iter().collect();

        write_overlay(&overlay, "generated file\nsecond line", "detected", &features)?;
        let text = fs::read_to_string(&overlay)?;
        assert!(text.starts_with("# generated file\n# second line\n# detected\n"));

        let read_back = read_generated_features(&overlay)?;
        assert_eq!(read_back, features);

        let _ = fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn empty_overlay_renders_an_empty_list() {
        let rendered = render_overlay("h", "no features", &FeatureSet::new());
        assert!(rendered.ends_with("features = []\n"));
        let parsed: ConfigFile = toml::from_str(&rendered).unwrap();
        assert!(parsed.features.is_empty());
    }

    #[test]
    fn marker_comment_is_added_once() -> Result<()> {
        let dir = temp_config_dir("marker");
        let config = dir.join("server.toml");
        fs::write(&config, "features = []\n")?;

        assert!(!has_marker_comment(&config, "see generated file")?);
        add_marker_comment(&config, "see generated file")?;
        assert!(has_marker_comment(&config, "see generated file")?);

        let before = fs::read_to_string(&config)?;
        add_marker_comment(&config, "see generated file")?;
        assert_eq!(before, fs::read_to_string(&config)?);

        let _ = fs::remove_dir_all(dir);
        Ok(())
    }

    #[test]
    fn missing_overlay_reads_as_empty() -> Result<()> {
        let dir = temp_config_dir("missing");
        assert!(read_generated_features(&overlay_path(&dir))?.is_empty());
        let _ = fs::remove_dir_all(dir);
        Ok(())
    }
}
