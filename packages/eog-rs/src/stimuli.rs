//! Stimulus waveforms driving the visual tasks.
//!
//! Saccadic stimuli are steps between fixation points, pursuit stimuli a
//! constant-speed triangle wave. Values are normalized to [-1, 1] and
//! converted to DAC counts with [`encode`].

use rand::Rng;

/// DAC count of the central fixation point.
pub const STIMULUS_OFFSET: f64 = 32768.0;

/// DAC counts per normalized unit.
pub const STIMULUS_GAIN: f64 = 20000.0;

/// Fixation lengths of a saccadic stimulus: `saccades + 3` segments that
/// sum to exactly `length` samples.
///
/// Interior segments are drawn uniformly within `variability` (a fraction)
/// of the mean segment length. The first and last segments absorb the
/// remainder.
pub fn saccadic_segments<R: Rng + ?Sized>(
    length: usize,
    saccades: usize,
    variability: f64,
    rng: &mut R,
) -> Vec<usize> {
    let count = saccades + 3;
    let mean = length / count;
    let delta = (mean as f64 * variability) as usize;

    let mut segments: Vec<usize> = (0..count)
        .map(|_| {
            if delta == 0 {
                mean
            } else {
                rng.random_range(mean - delta.min(mean)..mean + delta)
            }
        })
        .collect();

    let interior: usize = segments[1..count - 1].iter().sum();
    if interior > length {
        // keep the edges non-negative
        for segment in &mut segments[1..count - 1] {
            *segment = *segment * length / interior;
        }
    }

    let interior: usize = segments[1..count - 1].iter().sum();
    let edges = length - interior;
    segments[0] = edges / 2;
    segments[count - 1] = edges / 2 + edges % 2;

    assert_eq!(segments.iter().sum::<usize>(), length);
    segments
}

/// Waveform built from [`saccadic_segments`]: the edge segments sit at 0,
/// interior segments alternate between +1 and -1.
pub fn saccadic_stimuli<R: Rng + ?Sized>(
    length: usize,
    saccades: usize,
    variability: f64,
    rng: &mut R,
) -> Vec<f64> {
    let segments = saccadic_segments(length, saccades, variability, rng);
    let last = segments.len() - 1;

    segments
        .iter()
        .enumerate()
        .flat_map(|(idx, &segment)| {
            let value = if idx == 0 || idx == last {
                0.0
            } else if idx % 2 == 1 {
                1.0
            } else {
                -1.0
            };
            std::iter::repeat(value).take(segment)
        })
        .collect()
}

/// Triangle wave starting at 0 and moving at `speed` normalized units per
/// second, reflecting at +1 and -1.
pub fn pursuit_stimuli(length: usize, speed: f64, rate: f64) -> Vec<f64> {
    let per_sample = speed / rate;
    (0..length)
        .map(|i| {
            let phase = (i as f64 * per_sample).rem_euclid(4.0);
            if phase < 1.0 {
                phase
            } else if phase < 3.0 {
                2.0 - phase
            } else {
                phase - 4.0
            }
        })
        .collect()
}

/// Normalized stimulus values to DAC counts.
pub fn encode(values: &[f64]) -> Vec<u16> {
    values
        .iter()
        .map(|v| (STIMULUS_OFFSET + STIMULUS_GAIN * v.clamp(-1.0, 1.0)).round() as u16)
        .collect()
}
