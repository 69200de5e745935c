//! Summary statistics with not-a-number semantics for empty samples.

use serde::{Deserialize, Serialize};

/// Arithmetic mean; NaN for an empty sample.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population standard deviation; NaN for an empty sample.
pub fn std_dev(samples: &[f64]) -> f64 {
    let m = mean(samples);
    if m.is_nan() {
        return m;
    }
    let variance = samples.iter().map(|v| (v - m).powi(2)).sum::<f64>() / samples.len() as f64;
    variance.sqrt()
}

/// Median with the two middle values averaged; NaN for an empty sample.
pub fn median(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// `numerator / denominator`, NaN when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    #[serde(with = "crate::nan")]
    pub mean: f64,
    #[serde(with = "crate::nan")]
    pub std: f64,
}

impl MeanStd {
    pub fn of(samples: &[f64]) -> Self {
        Self {
            mean: mean(samples),
            std: std_dev(samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_population_std() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&samples), 5.0);
        assert_eq!(std_dev(&samples), 2.0);
    }

    #[test]
    fn test_empty_samples_are_nan() {
        assert!(mean(&[]).is_nan());
        assert!(std_dev(&[]).is_nan());
        assert!(median(&[]).is_nan());
        let summary = MeanStd::of(&[]);
        assert!(summary.mean.is_nan() && summary.std.is_nan());
    }

    #[test]
    fn test_single_sample_has_zero_spread() {
        let summary = MeanStd::of(&[3.5]);
        assert_eq!(summary.mean, 3.5);
        assert_eq!(summary.std, 0.0);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_ratio_by_zero_is_nan() {
        assert_eq!(ratio(1.0, 4.0), 0.25);
        assert!(ratio(1.0, 0.0).is_nan());
    }
}
