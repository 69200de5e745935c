use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EogError, Result};

/// How a Test's horizontal channel is brought to degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Multiply raw counts by the Study's calibration gain.
    Calibrated,
    /// Stretch the channel's peak-to-peak excursion to the Test angle.
    TargetAngle,
}

impl FromStr for ScalingMode {
    type Err = EogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "calibrated" => Ok(ScalingMode::Calibrated),
            "target_angle" | "target-angle" => Ok(ScalingMode::TargetAngle),
            other => Err(EogError::InvalidInput(format!("unknown scaling mode: {other}"))),
        }
    }
}

/// Analysis parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sampling rate of every channel, in Hz
    pub sample_rate: f64,
    /// Minimum absolute velocity inside a movement, in degrees per second
    pub velocity_threshold: f64,
    /// Minimum movement duration, in samples
    pub min_duration: usize,
    /// Wavelet width of the velocity peak search, in samples
    pub peak_width: usize,
    /// Samples ignored at each end of a Test
    pub edge_trim: usize,
    /// Accepted calibration amplitudes lie within this fraction of their median
    pub calibration_tolerance: f64,
    /// Drift error (percent) above which a quality warning is raised
    pub max_drift_error: f64,
    pub scaling: ScalingMode,
    /// Largest stimulus delay tried when aligning pursuit waveforms, in samples
    pub pursuit_max_shift: usize,
    /// Shortest Welch segment for pursuit coherence; grown to one stimulus period, at most half the Test
    pub coherence_segment: usize,
    /// Number of low-frequency bins averaged into the coherence
    pub coherence_bins: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::SAMPLE_RATE,
            velocity_threshold: 15.0,
            min_duration: 15,
            peak_width: 30,
            edge_trim: 100,
            calibration_tolerance: 0.2,
            max_drift_error: 50.0,
            scaling: ScalingMode::Calibrated,
            pursuit_max_shift: 2000,
            coherence_segment: 256,
            coherence_bins: 10,
        }
    }
}

impl AnalysisConfig {
    /// Load a JSON configuration; absent fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `EOG_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| env::var(name).ok())
    }

    /// Apply overrides looked up by variable name.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        override_from(&lookup, "EOG_SAMPLE_RATE", &mut self.sample_rate)?;
        override_from(&lookup, "EOG_VELOCITY_THRESHOLD", &mut self.velocity_threshold)?;
        override_from(&lookup, "EOG_MIN_DURATION", &mut self.min_duration)?;
        override_from(&lookup, "EOG_PEAK_WIDTH", &mut self.peak_width)?;
        override_from(&lookup, "EOG_EDGE_TRIM", &mut self.edge_trim)?;
        override_from(&lookup, "EOG_CALIBRATION_TOLERANCE", &mut self.calibration_tolerance)?;
        override_from(&lookup, "EOG_MAX_DRIFT_ERROR", &mut self.max_drift_error)?;
        override_from(&lookup, "EOG_SCALING", &mut self.scaling)?;
        override_from(&lookup, "EOG_PURSUIT_MAX_SHIFT", &mut self.pursuit_max_shift)?;
        override_from(&lookup, "EOG_COHERENCE_SEGMENT", &mut self.coherence_segment)?;
        override_from(&lookup, "EOG_COHERENCE_BINS", &mut self.coherence_bins)?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EogError::InvalidInput(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if !(self.velocity_threshold.is_finite() && self.velocity_threshold >= 0.0) {
            return Err(EogError::InvalidInput(format!(
                "velocity_threshold must be non-negative, got {}",
                self.velocity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.calibration_tolerance) {
            return Err(EogError::InvalidInput(format!(
                "calibration_tolerance must lie in [0, 1], got {}",
                self.calibration_tolerance
            )));
        }
        if self.max_drift_error < 0.0 {
            return Err(EogError::InvalidInput(
                "max_drift_error must be non-negative".to_string(),
            ));
        }
        if self.peak_width == 0 || self.coherence_segment < 2 || self.coherence_bins == 0 {
            return Err(EogError::InvalidInput(
                "peak_width, coherence_segment and coherence_bins must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Seconds per sample.
    pub fn step(&self) -> f64 {
        1.0 / self.sample_rate
    }
}

fn override_from<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|_| EogError::InvalidInput(format!("{name} has an invalid value: {raw}")))?;
        log::debug!("Configuration override from {}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.sample_rate, 1000.0);
        assert_eq!(config.velocity_threshold, 15.0);
        assert_eq!(config.min_duration, 15);
        assert_eq!(config.edge_trim, 100);
        assert_eq!(config.scaling, ScalingMode::Calibrated);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"velocity_threshold": 20.0, "scaling": "target_angle"}"#).unwrap();
        assert_eq!(config.velocity_threshold, 20.0);
        assert_eq!(config.scaling, ScalingMode::TargetAngle);
        assert_eq!(config.min_duration, 15);
    }

    #[test]
    fn test_overrides_apply() {
        let config = AnalysisConfig::default()
            .with_overrides(lookup(&[
                ("EOG_VELOCITY_THRESHOLD", "25"),
                ("EOG_EDGE_TRIM", " 50 "),
                ("EOG_SCALING", "target-angle"),
            ]))
            .unwrap();
        assert_eq!(config.velocity_threshold, 25.0);
        assert_eq!(config.edge_trim, 50);
        assert_eq!(config.scaling, ScalingMode::TargetAngle);
    }

    #[test]
    fn test_bad_override_rejected() {
        let err = AnalysisConfig::default()
            .with_overrides(lookup(&[("EOG_MIN_DURATION", "fifteen")]))
            .unwrap_err();
        assert!(err.to_string().contains("EOG_MIN_DURATION"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AnalysisConfig {
            sample_rate: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            velocity_threshold: -1.0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AnalysisConfig {
            peak_width: 0,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"edge_trim": 0}"#).unwrap();
        assert_eq!(AnalysisConfig::from_file(&path).unwrap().edge_trim, 0);

        std::fs::write(&path, r#"{"sample_rate": -5}"#).unwrap();
        assert!(AnalysisConfig::from_file(&path).is_err());
    }
}
