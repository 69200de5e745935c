//! Digital Filter Implementations
//!
//! IIR low-pass filters built from second-order sections (biquads) for
//! numerical stability, plus a zero-phase forward/backward runner.

use std::f64::consts::PI;

/// Second-order section (biquad) coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// DC gain of the section, H(z = 1).
    fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

/// State for a single biquad section (Direct Form II Transposed)
#[derive(Debug, Clone, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}

/// Single biquad filter section
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}

impl BiquadFilter {
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }

    /// Process a single sample using Direct Form II Transposed
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;
        output
    }

    /// Load the state a constant input `x` would settle into.
    /// Returns the settled output so sections can be chained.
    fn settle(&mut self, x: f64) -> f64 {
        let c = self.coeffs;
        let y = c.dc_gain() * x;
        self.state.z2 = c.b2 * x - c.a2 * y;
        self.state.z1 = c.b1 * x - c.a1 * y + self.state.z2;
        y
    }

    pub fn reset(&mut self) {
        self.state = BiquadState::default();
    }
}

/// Cascaded second-order sections filter
#[derive(Debug, Clone)]
pub struct SosFilter {
    sections: Vec<BiquadFilter>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        Self {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        }
    }

    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    /// Process a single sample through all sections
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut output = input;
        for section in &mut self.sections {
            output = section.process(output);
        }
        output
    }

    /// Process a signal and return a new array (original unchanged)
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        signal.iter().map(|&s| self.process(s)).collect()
    }

    /// Put every section in the steady state for a constant input `x`.
    fn settle(&mut self, x: f64) {
        let mut value = x;
        for section in &mut self.sections {
            value = section.settle(value);
        }
    }

    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }

    /// Zero-phase filtering: forward pass, then backward pass.
    ///
    /// The signal is extended at both ends by odd reflection and each pass
    /// starts from the steady state of its first sample, which suppresses
    /// the start-up transient at the edges.
    pub fn filtfilt(&mut self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let padlen = (3 * (2 * self.sections.len() + 1)).min(n - 1);
        let mut extended = Vec::with_capacity(n + 2 * padlen);
        let (first, last) = (signal[0], signal[n - 1]);
        extended.extend((1..=padlen).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=padlen).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.reset();
        self.settle(extended[0]);
        let mut forward = self.filter(&extended);

        forward.reverse();
        self.reset();
        self.settle(forward[0]);
        let mut backward = self.filter(&forward);
        backward.reverse();

        backward.drain(..padlen);
        backward.truncate(n);
        backward
    }
}

/// Butterworth filter designer
pub struct ButterworthFilter;

impl ButterworthFilter {
    /// Design a Butterworth lowpass filter
    pub fn lowpass(cutoff: f64, sample_rate: f64, order: usize) -> SosFilter {
        let wn = Self::prewarp(cutoff, sample_rate);
        SosFilter::new(Self::design_lowpass(wn, order))
    }

    /// Design a lowpass from a cutoff normalized to Nyquist (0 < wn < 1).
    pub fn lowpass_normalized(wn: f64, order: usize) -> SosFilter {
        Self::lowpass(wn, 2.0, order)
    }

    /// Prewarp frequency for bilinear transform
    fn prewarp(freq: f64, sample_rate: f64) -> f64 {
        (PI * freq / sample_rate).tan()
    }

    /// Design lowpass second-order sections
    fn design_lowpass(wn: f64, order: usize) -> Vec<BiquadCoeffs> {
        let num_sections = (order + 1) / 2;
        let mut sections = Vec::with_capacity(num_sections);

        for k in 0..num_sections {
            // For odd order, last section is first-order
            if order % 2 == 1 && k == num_sections - 1 {
                // H(s) = wn / (s + wn)
                let k_coeff = wn / (1.0 + wn);
                sections.push(BiquadCoeffs {
                    b0: k_coeff,
                    b1: k_coeff,
                    b2: 0.0,
                    a1: (wn - 1.0) / (wn + 1.0),
                    a2: 0.0,
                });
            } else {
                // Conjugate pole pair: s^2 + damping*s + 1
                let theta = PI * (2.0 * k as f64 + 1.0) / (2.0 * order as f64);
                let damping = 2.0 * theta.sin();

                let wn2 = wn * wn;
                let denom = 1.0 + damping * wn + wn2;

                sections.push(BiquadCoeffs {
                    b0: wn2 / denom,
                    b1: 2.0 * wn2 / denom,
                    b2: wn2 / denom,
                    a1: 2.0 * (wn2 - 1.0) / denom,
                    a2: (1.0 - damping * wn + wn2) / denom,
                });
            }
        }

        sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(signal: &[f64]) -> f64 {
        (signal.iter().map(|x| x * x).sum::<f64>() / signal.len() as f64).sqrt()
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = ButterworthFilter::lowpass(10.0, 100.0, 3);
        let mut out = 0.0;
        for _ in 0..500 {
            out = filter.process(1.0);
        }
        assert!((out - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lowpass_attenuates_high_frequency() {
        let sample_rate = 1000.0;
        let mut filter = ButterworthFilter::lowpass(17.5, sample_rate, 3);
        let signal: Vec<f64> = (0..2000)
            .map(|i| (2.0 * PI * 200.0 * i as f64 / sample_rate).sin())
            .collect();
        let filtered = filter.filtfilt(&signal);
        assert!(rms(&filtered[100..1900]) < rms(&signal) * 0.01);
    }

    #[test]
    fn test_filtfilt_keeps_constant_signal() {
        let mut filter = ButterworthFilter::lowpass_normalized(0.035, 3);
        let filtered = filter.filtfilt(&vec![7.5; 300]);
        assert_eq!(filtered.len(), 300);
        assert!(filtered.iter().all(|v| (v - 7.5).abs() < 1e-9));
    }

    #[test]
    fn test_filtfilt_is_zero_phase() {
        // A symmetric bump must stay centred after forward/backward filtering
        let signal: Vec<f64> = (0..401)
            .map(|i| {
                let x = (i as f64 - 200.0) / 20.0;
                (-x * x).exp()
            })
            .collect();
        let mut filter = ButterworthFilter::lowpass_normalized(0.035, 3);
        let filtered = filter.filtfilt(&signal);

        let peak = filtered
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 200);
    }
}
