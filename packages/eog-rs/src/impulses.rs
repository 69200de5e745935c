//! Velocity-threshold segmentation of a position channel into movements.

use serde::{Deserialize, Serialize};

use crate::conditioning::denoise_smooth;
use crate::config::AnalysisConfig;
use crate::differentiation::differentiate_at;
use crate::error::{EogError, Result};
use crate::peaks::{find_peaks_cwt, CwtPeakOptions};
use crate::transitions::Direction;

/// Movements below this amplitude (degrees) are discarded.
pub const MIN_AMPLITUDE: f64 = 1.0;

/// Movements at or above this amplitude (degrees) are `Large`.
pub const LARGE_AMPLITUDE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    Small,
    Large,
    Invalid,
}

impl Size {
    pub fn from_amplitude(amplitude: f64) -> Self {
        if amplitude < MIN_AMPLITUDE {
            Size::Invalid
        } else if amplitude < LARGE_AMPLITUDE {
            Size::Small
        } else {
            Size::Large
        }
    }
}

/// A detected movement window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    pub onset: usize,
    pub offset: usize,
    pub amplitude: f64,
    /// Maximum absolute velocity over the inclusive `[onset, offset]`.
    pub peak_velocity: f64,
    pub direction: Direction,
    pub size: Size,
}

impl Impulse {
    pub fn duration(&self) -> usize {
        self.offset - self.onset
    }

    /// The same impulse with both ends moved `by` samples later.
    pub fn shifted(self, by: usize) -> Self {
        Self {
            onset: self.onset + by,
            offset: self.offset + by,
            ..self
        }
    }
}

/// Smoothed position and absolute velocity of a channel, the inputs of
/// [`ImpulseDetector::detect`].
#[derive(Debug, Clone)]
pub struct MotionProfile {
    pub position: Vec<f64>,
    pub abs_velocity: Vec<f64>,
}

impl MotionProfile {
    pub fn new(channel: &[f64], sample_rate: f64) -> Result<Self> {
        let position = denoise_smooth(channel);
        let abs_velocity = differentiate_at(&position, sample_rate)?
            .into_iter()
            .map(f64::abs)
            .collect();
        Ok(Self {
            position,
            abs_velocity,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ImpulseDetector {
    /// Minimum absolute velocity inside a movement, in units per second.
    pub velocity_threshold: f64,
    /// Minimum `offset - onset`, in samples.
    pub min_duration: usize,
    /// Wavelet width of the peak search, in samples.
    pub peak_width: f64,
}

impl Default for ImpulseDetector {
    fn default() -> Self {
        Self {
            velocity_threshold: 15.0,
            min_duration: 15,
            peak_width: 30.0,
        }
    }
}

impl ImpulseDetector {
    pub fn new(velocity_threshold: f64, min_duration: usize) -> Self {
        Self {
            velocity_threshold,
            min_duration,
            ..Self::default()
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            velocity_threshold: config.velocity_threshold,
            min_duration: config.min_duration,
            peak_width: config.peak_width as f64,
        }
    }

    pub fn with_velocity_threshold(mut self, velocity_threshold: f64) -> Self {
        self.velocity_threshold = velocity_threshold;
        self
    }

    /// Candidate `(onset, offset)` windows of an absolute-velocity channel,
    /// unique and ordered by onset.
    pub fn windows(&self, abs_velocity: &[f64]) -> Vec<(usize, usize)> {
        let threshold = self.velocity_threshold;
        let peaks = find_peaks_cwt(abs_velocity, &[self.peak_width], &CwtPeakOptions::default());

        let mut windows: Vec<(usize, usize)> = peaks
            .into_iter()
            .filter(|&peak| abs_velocity[peak] >= threshold)
            .map(|peak| {
                let mut onset = peak;
                while onset > 0 && abs_velocity[onset - 1] >= threshold {
                    onset -= 1;
                }
                let mut offset = peak;
                while offset + 1 < abs_velocity.len() && abs_velocity[offset + 1] >= threshold {
                    offset += 1;
                }
                (onset, offset)
            })
            .filter(|(onset, offset)| offset - onset >= self.min_duration)
            .collect();

        // several peaks may surface inside one excursion
        windows.sort_unstable();
        windows.dedup();
        windows
    }

    /// Movements of `position`, sized and oriented, sub-degree ones dropped.
    pub fn detect(&self, position: &[f64], abs_velocity: &[f64]) -> Result<Vec<Impulse>> {
        if position.len() != abs_velocity.len() {
            return Err(EogError::InvalidInput(format!(
                "position has {} samples but velocity has {}",
                position.len(),
                abs_velocity.len()
            )));
        }

        let impulses: Vec<Impulse> = self
            .windows(abs_velocity)
            .into_iter()
            .filter_map(|(onset, offset)| {
                let (start, end) = (position[onset], position[offset]);
                let amplitude = (end - start).abs();
                match Size::from_amplitude(amplitude) {
                    Size::Invalid => None,
                    size => Some(Impulse {
                        onset,
                        offset,
                        amplitude,
                        peak_velocity: abs_velocity[onset..=offset]
                            .iter()
                            .fold(0.0, |peak, &v| f64::max(peak, v)),
                        direction: Direction::between(start, end),
                        size,
                    }),
                }
            })
            .collect();

        log::debug!(
            "Detected {} impulses above {:.1}/s",
            impulses.len(),
            self.velocity_threshold
        );
        Ok(impulses)
    }

    /// Runs the full profile and detection over a position channel.
    pub fn detect_in(&self, channel: &[f64], sample_rate: f64) -> Result<Vec<Impulse>> {
        let profile = MotionProfile::new(channel, sample_rate)?;
        self.detect(&profile.position, &profile.abs_velocity)
    }
}
