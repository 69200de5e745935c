//! Signal conditioning: denoising, centering and angle scaling.
//!
//! Every function here is pure. Callers compose them in the order
//! scale → center → denoise.

use crate::error::{EogError, Result};
use crate::filters::ButterworthFilter;

/// Median window used by [`denoise`].
pub const MEDIAN_WINDOW: usize = 101;

/// Cutoff of [`denoise_smooth`], normalized to the Nyquist frequency.
pub const SMOOTH_CUTOFF: f64 = 0.035;

/// Order of the Butterworth low-pass used by [`denoise_smooth`].
pub const SMOOTH_ORDER: usize = 3;

/// Median filter with an odd `window`, zero-padded at both edges.
pub fn median_filter(channel: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = channel.len();
    let mut scratch = Vec::with_capacity(window);

    (0..n)
        .map(|i| {
            scratch.clear();
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(n);
            scratch.extend_from_slice(&channel[start..end]);
            // samples falling outside the channel count as zeros
            scratch.resize(window, 0.0);
            let (_, median, _) = scratch.select_nth_unstable_by(half, |a, b| a.total_cmp(b));
            *median
        })
        .collect()
}

/// Removes impulsive noise while roughly preserving step edges.
pub fn denoise(channel: &[f64]) -> Vec<f64> {
    median_filter(channel, MEDIAN_WINDOW)
}

/// Aggressive zero-phase low-pass used ahead of velocity-threshold detection.
///
/// Recovers a clean movement shape at the cost of edge sharpness.
pub fn denoise_smooth(channel: &[f64]) -> Vec<f64> {
    let mut filter = ButterworthFilter::lowpass_normalized(SMOOTH_CUTOFF, SMOOTH_ORDER);
    filter.filtfilt(channel)
}

/// Subtracts the sample mean. An empty channel stays empty.
pub fn center_signal(channel: &[f64]) -> Vec<f64> {
    if channel.is_empty() {
        return Vec::new();
    }
    let mean = channel.iter().sum::<f64>() / channel.len() as f64;
    channel.iter().map(|v| v - mean).collect()
}

/// Peak-to-peak excursion of a channel; zero when empty.
pub fn peak_to_peak(channel: &[f64]) -> f64 {
    let (min, max) = channel
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if channel.is_empty() {
        0.0
    } else {
        max - min
    }
}

/// Rescales so the peak-to-peak excursion equals `target_angle` degrees.
///
/// Fails with [`EogError::DegenerateScale`] on a flat or empty channel.
pub fn scale_channel(channel: &[f64], target_angle: f64) -> Result<Vec<f64>> {
    let excursion = peak_to_peak(channel);
    if excursion == 0.0 || !excursion.is_finite() {
        return Err(EogError::DegenerateScale);
    }
    let scale = target_angle / excursion;
    Ok(channel.iter().map(|v| v * scale).collect())
}

/// Raw amplifier counts to a centred, denoised channel in degrees.
pub fn derive_channel(raw: &[u16], gain: f64) -> Vec<f64> {
    let scaled: Vec<f64> = raw.iter().map(|&v| v as f64 * gain).collect();
    denoise(&center_signal(&scaled))
}

/// Raw amplifier counts stretched to `target_angle`, centred and denoised.
///
/// Used when no calibration gain is trusted; fails on a flat channel.
pub fn derive_channel_to_angle(raw: &[u16], target_angle: f64) -> Result<Vec<f64>> {
    let values: Vec<f64> = raw.iter().map(|&v| v as f64).collect();
    let scaled = scale_channel(&values, target_angle)?;
    Ok(denoise(&center_signal(&scaled)))
}

/// Raw stimulus counts to a centred channel spanning `angle` degrees.
///
/// A flat stimulus carries no transitions and is returned as zeros.
pub fn derive_stimulus(raw: &[u16], angle: f64) -> Vec<f64> {
    let centered = center_signal(&raw.iter().map(|&v| v as f64).collect::<Vec<_>>());
    match scale_channel(&centered, angle) {
        Ok(scaled) => scaled,
        Err(_) => vec![0.0; centered.len()],
    }
}

/// `channel` without `edge` samples at each end; untouched when too short.
pub fn trim_edges(channel: &[f64], edge: usize) -> &[f64] {
    if channel.len() > 2 * edge {
        &channel[edge..channel.len() - edge]
    } else {
        channel
    }
}
