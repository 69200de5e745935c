//! Numerical differentiation of position channels.
//!
//! Uses an 11-tap smoothing differentiator ("super Lanczos") which trades a
//! little bandwidth for strong rejection of sample-level noise.

use crate::error::{ensure_len, Result};

/// Stencil weights, applied from `x[i - 5]` to `x[i + 5]`.
pub const STENCIL: [f64; 11] = [
    300.0, -294.0, -532.0, -503.0, -296.0, 0.0, 296.0, 503.0, 532.0, 294.0, -300.0,
];

/// Normalization of [`STENCIL`] so that a unit ramp yields unit slope.
pub const STENCIL_NORM: f64 = 5148.0;

/// Half width of the stencil; this many samples at each edge are zeroed.
pub const HALF_WIDTH: usize = 5;

/// Velocity of `channel` in units per second, sampled at `sample_rate` Hz.
///
/// The output has the same length as the input. The first and last
/// [`HALF_WIDTH`] samples are always zero and carry no information.
pub fn differentiate_at(channel: &[f64], sample_rate: f64) -> Result<Vec<f64>> {
    ensure_len(channel, STENCIL.len())?;

    let mut result = vec![0.0; channel.len()];
    for i in HALF_WIDTH..channel.len() - HALF_WIDTH {
        let window = &channel[i - HALF_WIDTH..=i + HALF_WIDTH];
        let acc: f64 = window.iter().zip(STENCIL.iter()).map(|(x, w)| x * w).sum();
        result[i] = acc / STENCIL_NORM * sample_rate;
    }

    Ok(result)
}

/// Velocity of a channel recorded at the nominal 1000 Hz rate.
pub fn differentiate(channel: &[f64]) -> Result<Vec<f64>> {
    differentiate_at(channel, crate::SAMPLE_RATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EogError;

    #[test]
    fn test_constant_channel_has_zero_velocity() {
        let channel = vec![42.0; 200];
        let velocity = differentiate(&channel).unwrap();
        assert_eq!(velocity.len(), channel.len());
        assert!(velocity.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_ramp_slope_in_units_per_second() {
        // 0.01 units per sample at 1000 Hz is 10 units/s
        let channel: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
        let velocity = differentiate(&channel).unwrap();

        for v in &velocity[HALF_WIDTH..channel.len() - HALF_WIDTH] {
            assert!((v - 10.0).abs() < 1e-9, "got {}", v);
        }
        assert!(velocity[..HALF_WIDTH].iter().all(|&v| v == 0.0));
        assert!(velocity[channel.len() - HALF_WIDTH..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_short_channel_rejected() {
        let err = differentiate(&[1.0; 10]).unwrap_err();
        assert!(matches!(
            err,
            EogError::ChannelTooShort {
                required: 11,
                actual: 10
            }
        ));
        assert!(differentiate(&[1.0; 11]).is_ok());
    }
}
