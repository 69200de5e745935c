//! Welch cross-spectral estimation and magnitude-squared coherence.

use std::cell::RefCell;
use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{EogError, Result};

// Thread-local FFT planner so repeated segment lengths reuse their plan
thread_local! {
    static FFT_PLANNER: RefCell<FftPlanner<f64>> = RefCell::new(FftPlanner::new());
}

/// Magnitude-squared coherence per frequency bin.
#[derive(Debug, Clone)]
pub struct Coherence {
    pub frequencies: Vec<f64>,
    pub values: Vec<f64>,
}

/// Periodic Hann window of `n` samples.
fn hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n as f64).cos()))
        .collect()
}

/// Windowed, mean-removed spectrum of one segment (non-negative bins only).
fn segment_spectrum(segment: &[f64], window: &[f64]) -> Vec<Complex<f64>> {
    let n = segment.len();
    let mean = segment.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = segment
        .iter()
        .zip(window)
        .map(|(&x, &w)| Complex::new((x - mean) * w, 0.0))
        .collect();

    FFT_PLANNER.with(|planner| {
        let fft = planner.borrow_mut().plan_fft_forward(n);
        fft.process(&mut buffer);
    });

    buffer.truncate(n / 2 + 1);
    buffer
}

/// Welch estimate of the coherence between `x` and `y`.
///
/// Segments of `segment_len` samples (shortened to the signal length when
/// needed) overlap by half and are Hann-windowed after constant detrending.
pub fn coherence(x: &[f64], y: &[f64], sample_rate: f64, segment_len: usize) -> Result<Coherence> {
    if x.len() != y.len() {
        return Err(EogError::InvalidInput(format!(
            "coherence needs equal lengths, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 || segment_len < 2 {
        return Err(EogError::ChannelTooShort {
            required: 2,
            actual: x.len().min(segment_len),
        });
    }

    let nperseg = segment_len.min(x.len());
    let step = nperseg - nperseg / 2;
    let bins = nperseg / 2 + 1;
    let window = hann(nperseg);

    let mut pxx = vec![0.0; bins];
    let mut pyy = vec![0.0; bins];
    let mut pxy = vec![Complex::new(0.0, 0.0); bins];

    for start in (0..=x.len() - nperseg).step_by(step) {
        let fx = segment_spectrum(&x[start..start + nperseg], &window);
        let fy = segment_spectrum(&y[start..start + nperseg], &window);
        for k in 0..bins {
            pxx[k] += fx[k].norm_sqr();
            pyy[k] += fy[k].norm_sqr();
            pxy[k] += fx[k].conj() * fy[k];
        }
    }

    // scaling and segment averaging cancel in the ratio
    let values = (0..bins)
        .map(|k| {
            let denominator = pxx[k] * pyy[k];
            if denominator == 0.0 {
                f64::NAN
            } else {
                pxy[k].norm_sqr() / denominator
            }
        })
        .collect();
    let frequencies = (0..bins)
        .map(|k| k as f64 * sample_rate / nperseg as f64)
        .collect();

    Ok(Coherence {
        frequencies,
        values,
    })
}

/// Mean coherence over the `bins` lowest non-DC frequency bins.
pub fn low_band_coherence(x: &[f64], y: &[f64], sample_rate: f64, segment_len: usize, bins: usize) -> Result<f64> {
    let estimate = coherence(x, y, sample_rate, segment_len)?;
    let band: Vec<f64> = estimate.values.iter().skip(1).take(bins).copied().collect();
    Ok(crate::stats::mean(&band))
}
