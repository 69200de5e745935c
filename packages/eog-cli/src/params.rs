use anyhow::{Context, Result};
use eog_rs::{archive, AnalysisConfig, Analyzer, ScalingMode, StudyReport};
use std::path::Path;

pub const ARCHIVE_EXTENSION: &str = "oeog";

/// Validate that an input file exists and is a regular file.
pub fn validate_file(path: &str) -> Result<(), String> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(format!("File not found: {}", path));
    }
    if !p.is_file() {
        return Err(format!("Not a file: {}", path));
    }
    Ok(())
}

/// Build the analysis configuration: defaults, then the config file, then
/// `EOG_*` variables, then command-line flags.
pub fn build_config(config: Option<&str>, scaling: Option<ScalingMode>) -> Result<AnalysisConfig, String> {
    let base = match config {
        Some(path) => AnalysisConfig::from_file(path)
            .map_err(|e| format!("Invalid configuration '{}': {}", path, e))?,
        None => AnalysisConfig::default(),
    };
    let mut config = base
        .with_env_overrides()
        .map_err(|e| format!("Invalid EOG_* environment override: {}", e))?;
    if let Some(scaling) = scaling {
        config.scaling = scaling;
    }
    Ok(config)
}

pub fn build_analyzer(config: Option<&str>, scaling: Option<ScalingMode>) -> Result<Analyzer, String> {
    let config = build_config(config, scaling)?;
    Analyzer::new(config).map_err(|e| format!("Invalid configuration: {}", e))
}

/// Load and analyze one archive.
pub fn analyze_archive(path: &str, analyzer: &Analyzer) -> Result<StudyReport> {
    let study = archive::load_study(path).with_context(|| format!("Failed to load study archive '{}'", path))?;
    log::info!("{}: {} ({} protocol)", path, study, study.protocol);
    Ok(analyzer.analyze(&study))
}

/// Output file for `input` inside `dir`: `<stem>_biomarkers.json`.
pub fn report_path(dir: &str, input: &str) -> std::path::PathBuf {
    let stem = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("study");
    Path::new(dir).join(format!("{}_biomarkers.json", stem))
}
