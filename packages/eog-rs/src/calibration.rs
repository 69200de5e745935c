//! Raw-unit to degree gain estimation from bracketing calibration Tests.

use serde::{Deserialize, Serialize};

use crate::conditioning::{center_signal, denoise, trim_edges};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::impulses::ImpulseDetector;
use crate::stats::{mean, median};

/// Gain and drift of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEstimate {
    /// Degrees per raw amplifier unit.
    pub gain: f64,
    /// Ratio between the initial and final scales; 1.0 is a stable session.
    pub drift: f64,
}

impl Default for CalibrationEstimate {
    fn default() -> Self {
        Self::UNCALIBRATED
    }
}

impl CalibrationEstimate {
    /// Used when no calibration impulse was accepted: unit gain and a
    /// drift that reads as a 100 % error.
    pub const UNCALIBRATED: CalibrationEstimate = CalibrationEstimate {
        gain: 1.0,
        drift: 0.0,
    };

    /// Distance of the drift from a stable session, in percent.
    pub fn drift_error(&self) -> f64 {
        (1.0 - self.drift).abs() * 100.0
    }

    pub fn is_within(&self, max_drift_error: f64) -> bool {
        self.drift_error() <= max_drift_error
    }
}

/// Amplitudes within `tolerance` (a fraction) of their own median.
pub fn valid_amplitudes(amplitudes: &[f64], tolerance: f64) -> Vec<f64> {
    let center = median(amplitudes);
    let delta = center * tolerance;
    let (low, high) = (center - delta, center + delta);
    amplitudes
        .iter()
        .copied()
        .filter(|a| (low..=high).contains(a))
        .collect()
}

/// Gain and drift from the impulse amplitudes of the initial and final
/// calibration Tests, both recorded at `angle` degrees.
pub fn estimate_gain(initial: &[f64], final_: &[f64], angle: f64, tolerance: f64) -> CalibrationEstimate {
    let initial_mean = mean(&valid_amplitudes(initial, tolerance));
    let final_mean = mean(&valid_amplitudes(final_, tolerance));

    let initial_scale = angle / initial_mean;
    let final_scale = angle / final_mean;
    if !(initial_scale.is_finite() && final_scale.is_finite()) || initial_scale <= 0.0 || final_scale <= 0.0 {
        log::warn!("No usable calibration impulses; falling back to unit gain");
        return CalibrationEstimate::UNCALIBRATED;
    }

    CalibrationEstimate {
        gain: (initial_scale + final_scale) / 2.0,
        drift: initial_scale / final_scale,
    }
}

/// Runs impulse detection over raw calibration channels.
#[derive(Debug, Clone)]
pub struct CalibrationEstimator {
    detector: ImpulseDetector,
    tolerance: f64,
    sample_rate: f64,
    edge_trim: usize,
}

impl Default for CalibrationEstimator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl CalibrationEstimator {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            detector: ImpulseDetector::from_config(config),
            tolerance: config.calibration_tolerance,
            sample_rate: config.sample_rate,
            edge_trim: config.edge_trim,
        }
    }

    /// Impulse amplitudes of a raw channel, in raw units.
    pub fn amplitudes(&self, raw: &[u16]) -> Result<Vec<f64>> {
        let values: Vec<f64> = raw.iter().map(|&v| v as f64).collect();
        let window = trim_edges(&values, self.edge_trim);
        let denoised = denoise(&center_signal(window));
        let impulses = self.detector.detect_in(&denoised, self.sample_rate)?;
        Ok(impulses.iter().map(|impulse| impulse.amplitude).collect())
    }

    pub fn estimate(&self, initial: &[u16], final_: &[u16], angle: f64) -> Result<CalibrationEstimate> {
        let initial_amplitudes = self.amplitudes(initial)?;
        let final_amplitudes = self.amplitudes(final_)?;
        log::debug!(
            "Calibration impulses: {} initial, {} final",
            initial_amplitudes.len(),
            final_amplitudes.len()
        );

        let estimate = estimate_gain(&initial_amplitudes, &final_amplitudes, angle, self.tolerance);
        log::info!(
            "Calibration gain {:.6} deg/unit, drift {:.3} ({:.1}% error)",
            estimate.gain,
            estimate.drift,
            estimate.drift_error()
        );
        Ok(estimate)
    }
}
