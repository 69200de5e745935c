//! Per-event samples and their aggregation into biomarker dictionaries.
//!
//! Every dictionary maps metric names to values; metrics with no samples
//! are NaN rather than missing.

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::differentiation::differentiate_at;
use crate::error::{EogError, Result};
use crate::impulses::ImpulseDetector;
use crate::models::Annotation;
use crate::spectral::low_band_coherence;
use crate::stats::{mean, ratio, MeanStd};

pub type Biomarkers = BTreeMap<String, f64>;

fn insert_mean_std(map: &mut Biomarkers, name: &str, samples: &[f64]) {
    let summary = MeanStd::of(samples);
    map.insert(format!("{name}_mean"), summary.mean);
    map.insert(format!("{name}_std"), summary.std);
}

/// Correction latency of every antisaccade in `annotations`, in seconds.
///
/// The latency is the gap from the offset of the immediately preceding
/// event when that event is a saccade on the same transition, and 0
/// otherwise. `annotations` must be in onset order.
pub fn correction_latencies(annotations: &[Annotation], sample_rate: f64) -> Vec<f64> {
    annotations
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_antisaccade())
        .map(|(idx, antisaccade)| {
            match idx.checked_sub(1).map(|prev| &annotations[prev]) {
                Some(prev)
                    if prev.is_saccade() && prev.transition_index == antisaccade.transition_index =>
                {
                    antisaccade.onset.saturating_sub(prev.offset) as f64 / sample_rate
                }
                _ => 0.0,
            }
        })
        .collect()
}

/// Samples behind the antisaccadic biomarkers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntisaccadicSamples {
    pub latencies: Vec<f64>,
    pub memories: Vec<f64>,
    pub peak_velocities: Vec<f64>,
    pub durations: Vec<f64>,
    pub correction_latencies: Vec<f64>,
    pub saccades: usize,
    pub antisaccades: usize,
}

impl AntisaccadicSamples {
    /// Collect samples from the retained events of one Test.
    ///
    /// `expected_half_amplitude` is half the stimulus excursion in degrees.
    pub fn from_annotations(annotations: &[Annotation], expected_half_amplitude: f64, sample_rate: f64) -> Self {
        let antisaccades: Vec<&Annotation> = annotations.iter().filter(|a| a.is_antisaccade()).collect();

        let memories = antisaccades
            .iter()
            .map(|a| {
                if expected_half_amplitude == 0.0 {
                    f64::NAN
                } else {
                    (expected_half_amplitude - a.amplitude).abs() / expected_half_amplitude
                }
            })
            .collect();

        Self {
            latencies: antisaccades.iter().map(|a| a.latency_secs(sample_rate)).collect(),
            memories,
            peak_velocities: antisaccades.iter().map(|a| a.peak_velocity).collect(),
            durations: antisaccades.iter().map(|a| a.duration_secs(sample_rate)).collect(),
            correction_latencies: correction_latencies(annotations, sample_rate),
            saccades: annotations.iter().filter(|a| a.is_saccade()).count(),
            antisaccades: antisaccades.len(),
        }
    }

    /// Pool another Test's samples into these.
    pub fn extend(&mut self, other: &AntisaccadicSamples) {
        self.latencies.extend_from_slice(&other.latencies);
        self.memories.extend_from_slice(&other.memories);
        self.peak_velocities.extend_from_slice(&other.peak_velocities);
        self.durations.extend_from_slice(&other.durations);
        self.correction_latencies.extend_from_slice(&other.correction_latencies);
        self.saccades += other.saccades;
        self.antisaccades += other.antisaccades;
    }

    /// Saccades per antisaccade; NaN without antisaccades.
    pub fn response_inhibition(&self) -> f64 {
        ratio(self.saccades as f64, self.antisaccades as f64)
    }

    pub fn summary(&self) -> Biomarkers {
        let mut map = Biomarkers::new();
        insert_mean_std(&mut map, "latency", &self.latencies);
        insert_mean_std(&mut map, "memory", &self.memories);
        insert_mean_std(&mut map, "velocity_peak", &self.peak_velocities);
        insert_mean_std(&mut map, "duration", &self.durations);
        insert_mean_std(&mut map, "correction_latency", &self.correction_latencies);
        map.insert("response_inhibition".to_string(), self.response_inhibition());
        map
    }
}

/// Samples behind the saccadic biomarkers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaccadicSamples {
    pub latencies: Vec<f64>,
    pub durations: Vec<f64>,
    pub amplitudes: Vec<f64>,
    pub deviations: Vec<f64>,
    pub peak_velocities: Vec<f64>,
}

impl SaccadicSamples {
    pub fn from_annotations(annotations: &[Annotation], sample_rate: f64) -> Self {
        let saccades: Vec<&Annotation> = annotations.iter().filter(|a| a.is_saccade()).collect();
        Self {
            latencies: saccades.iter().map(|a| a.latency_secs(sample_rate)).collect(),
            durations: saccades.iter().map(|a| a.duration_secs(sample_rate)).collect(),
            amplitudes: saccades.iter().map(|a| a.amplitude).collect(),
            deviations: saccades.iter().map(|a| a.deviation).collect(),
            peak_velocities: saccades.iter().map(|a| a.peak_velocity).collect(),
        }
    }

    pub fn extend(&mut self, other: &SaccadicSamples) {
        self.latencies.extend_from_slice(&other.latencies);
        self.durations.extend_from_slice(&other.durations);
        self.amplitudes.extend_from_slice(&other.amplitudes);
        self.deviations.extend_from_slice(&other.deviations);
        self.peak_velocities.extend_from_slice(&other.peak_velocities);
    }

    pub fn summary(&self) -> Biomarkers {
        let mut map = Biomarkers::new();
        insert_mean_std(&mut map, "latency", &self.latencies);
        insert_mean_std(&mut map, "duration", &self.durations);
        insert_mean_std(&mut map, "amplitude", &self.amplitudes);
        insert_mean_std(&mut map, "deviation", &self.deviations);
        insert_mean_std(&mut map, "velocity_peak", &self.peak_velocities);
        map.insert("saccades_count".to_string(), self.latencies.len() as f64);
        map
    }
}

/// Smooth-pursuit metrics of one Test.
#[derive(Debug, Clone, PartialEq)]
pub struct PursuitBiomarkers {
    /// Smallest mean squared error over the tried stimulus delays, in deg².
    pub waveform_mse: f64,
    /// Tracking latencies at each stimulus reversal, in seconds.
    pub latencies: Vec<f64>,
    pub corrective_saccades: usize,
    /// Mean absolute eye velocity, in deg/s.
    pub velocity_mean: f64,
    pub velocity_gain: f64,
    /// `1 - coherence` over the lowest frequency bins.
    pub coherence_deficit: f64,
}

impl PursuitBiomarkers {
    /// `response` and `stimulus` are equal-length position channels in degrees.
    pub fn compute(response: &[f64], stimulus: &[f64], angle: f64, config: &AnalysisConfig) -> Result<Self> {
        if response.len() != stimulus.len() {
            return Err(EogError::InvalidInput(format!(
                "pursuit response has {} samples but stimulus has {}",
                response.len(),
                stimulus.len()
            )));
        }
        let fs = config.sample_rate;

        let response_velocity = differentiate_at(response, fs)?;
        let stimulus_velocity = differentiate_at(stimulus, fs)?;
        let interior = crate::differentiation::HALF_WIDTH..response.len() - crate::differentiation::HALF_WIDTH;
        let response_speed = mean_abs(&response_velocity[interior.clone()]);
        let stimulus_speed = mean_abs(&stimulus_velocity[interior]);
        let peak_stimulus_speed = stimulus_velocity.iter().fold(0.0, |peak: f64, v| peak.max(v.abs()));

        let threshold = config.velocity_threshold.max(2.0 * peak_stimulus_speed);
        let detector = ImpulseDetector::from_config(config).with_velocity_threshold(threshold);
        let corrective_saccades = detector
            .detect_in(response, fs)?
            .iter()
            .filter(|impulse| response[impulse.onset].abs() <= angle / 2.0)
            .count();

        let coherence = low_band_coherence(
            stimulus,
            response,
            fs,
            coherence_segment_len(stimulus, config.coherence_segment),
            config.coherence_bins,
        )?;

        Ok(Self {
            waveform_mse: best_alignment_mse(response, stimulus, config.pursuit_max_shift),
            latencies: tracking_latencies(response, stimulus)
                .into_iter()
                .map(|lag| lag as f64 / fs)
                .collect(),
            corrective_saccades,
            velocity_mean: response_speed,
            velocity_gain: ratio(response_speed, stimulus_speed),
            coherence_deficit: 1.0 - coherence,
        })
    }

    pub fn summary(&self) -> Biomarkers {
        let mut map = Biomarkers::new();
        map.insert("waveform_mse".to_string(), self.waveform_mse);
        map.insert("latency_mean".to_string(), mean(&self.latencies));
        map.insert("corrective_saccades_count".to_string(), self.corrective_saccades as f64);
        map.insert("velocity_mean".to_string(), self.velocity_mean);
        map.insert("velocity_gain".to_string(), self.velocity_gain);
        map.insert("spectral_coherence".to_string(), self.coherence_deficit);
        map
    }

    /// Study-level dictionary: pooled latencies, summed corrective
    /// saccades and the per-Test mean of every other metric.
    pub fn pooled_summary(tests: &[PursuitBiomarkers]) -> Biomarkers {
        let collect = |f: fn(&PursuitBiomarkers) -> f64| tests.iter().map(f).collect::<Vec<f64>>();
        let latencies: Vec<f64> = tests.iter().flat_map(|t| t.latencies.iter().copied()).collect();

        let mut map = Biomarkers::new();
        map.insert("waveform_mse".to_string(), mean(&collect(|t| t.waveform_mse)));
        map.insert("latency_mean".to_string(), mean(&latencies));
        map.insert(
            "corrective_saccades_count".to_string(),
            tests.iter().map(|t| t.corrective_saccades).sum::<usize>() as f64,
        );
        map.insert("velocity_mean".to_string(), mean(&collect(|t| t.velocity_mean)));
        map.insert("velocity_gain".to_string(), mean(&collect(|t| t.velocity_gain)));
        map.insert("spectral_coherence".to_string(), mean(&collect(|t| t.coherence_deficit)));
        map
    }
}

/// Welch segment length for pursuit coherence: one stimulus period, at
/// least `min_len` samples and at most half the channel so that three
/// half-overlapping segments are averaged.
///
/// A stimulus with fewer than two reversals takes the longest segment.
pub fn coherence_segment_len(stimulus: &[f64], min_len: usize) -> usize {
    let longest = (stimulus.len() / 2).max(2);
    let turns = reversals(stimulus);
    let period = match (turns.first(), turns.last()) {
        (Some(&(first, _)), Some(&(last, _))) if turns.len() >= 2 => 2 * (last - first) / (turns.len() - 1),
        _ => longest,
    };
    period.max(min_len).min(longest)
}

fn mean_abs(values: &[f64]) -> f64 {
    mean(&values.iter().map(|v| v.abs()).collect::<Vec<_>>())
}

/// Minimum mean squared error between `response` and `stimulus` delayed
/// by 0 to `max_shift` samples. The delay pads with the first stimulus
/// sample.
pub fn best_alignment_mse(response: &[f64], stimulus: &[f64], max_shift: usize) -> f64 {
    let n = response.len().min(stimulus.len());
    if n == 0 {
        return f64::NAN;
    }

    (0..=max_shift.min(n - 1))
        .map(|shift| {
            let head = stimulus[0];
            let sum: f64 = (0..n)
                .map(|i| {
                    let target = if i < shift { head } else { stimulus[i - shift] };
                    (response[i] - target).powi(2)
                })
                .sum();
            sum / n as f64
        })
        .fold(f64::INFINITY, f64::min)
}

/// Reversal points of a channel: `(index, is_maximum)` wherever the slope
/// changes sign. Flat stretches carry the previous slope.
pub fn reversals(channel: &[f64]) -> Vec<(usize, bool)> {
    let mut result = Vec::new();
    let mut last_sign = 0.0;
    let mut last_change = 0;

    for i in 1..channel.len() {
        let delta = channel[i] - channel[i - 1];
        if delta == 0.0 {
            continue;
        }
        let sign = delta.signum();
        if last_sign != 0.0 && sign != last_sign {
            result.push((last_change, last_sign > 0.0));
        }
        last_sign = sign;
        last_change = i;
    }
    result
}

/// Delay, in samples, from each stimulus reversal to the matching response
/// extremum before the next reversal.
pub fn tracking_latencies(response: &[f64], stimulus: &[f64]) -> Vec<usize> {
    let turns = reversals(stimulus);
    let end = response.len().min(stimulus.len());

    turns
        .iter()
        .enumerate()
        .filter_map(|(k, &(start, is_maximum))| {
            let stop = turns.get(k + 1).map_or(end, |&(next, _)| next.min(end));
            if start >= stop {
                return None;
            }
            let window = &response[start..stop];
            let extremum = window
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| {
                    if is_maximum {
                        a.total_cmp(b)
                    } else {
                        b.total_cmp(a)
                    }
                })
                .map(|(offset, _)| offset)?;
            Some(extremum)
        })
        .collect()
}
