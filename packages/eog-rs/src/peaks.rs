//! Continuous-wavelet peak detection.
//!
//! Peaks are local maxima of the signal convolved with a Ricker ("mexican
//! hat") wavelet at one or more widths. Maxima are linked across widths into
//! ridge lines; a ridge survives when it is long enough and its wavelet
//! response stands above the local noise floor.

/// Tuning for [`find_peaks_cwt`].
#[derive(Debug, Clone)]
pub struct CwtPeakOptions {
    /// Minimum ratio between the ridge response and the local noise floor.
    pub min_snr: f64,
    /// Percentile of the smallest-width response used as noise floor.
    pub noise_percentile: f64,
    /// Noise window in samples; `None` uses `ceil(n / 20)`.
    pub window_size: Option<usize>,
}

impl Default for CwtPeakOptions {
    fn default() -> Self {
        Self {
            min_snr: 1.0,
            noise_percentile: 10.0,
            window_size: None,
        }
    }
}

/// Ricker wavelet with `points` samples and width parameter `a`.
pub fn ricker(points: usize, a: f64) -> Vec<f64> {
    let amplitude = 2.0 / ((3.0 * a).sqrt() * std::f64::consts::PI.powf(0.25));
    let wsq = a * a;
    let center = (points as f64 - 1.0) / 2.0;

    (0..points)
        .map(|i| {
            let x = i as f64 - center;
            let xsq = x * x;
            amplitude * (1.0 - xsq / wsq) * (-xsq / (2.0 * wsq)).exp()
        })
        .collect()
}

/// Convolution trimmed to the length of `signal`, centred like `mode="same"`.
fn convolve_same(signal: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = signal.len();
    let m = kernel.len();
    let offset = (m - 1) / 2;

    (0..n)
        .map(|i| {
            // full-convolution index j = i + offset; y[j] = sum x[j - k] h[k]
            let j = i + offset;
            let k_start = j.saturating_sub(n - 1);
            let k_end = j.min(m - 1);
            (k_start..=k_end).map(|k| signal[j - k] * kernel[k]).sum()
        })
        .collect()
}

/// Wavelet transform: one row per width.
pub fn cwt(signal: &[f64], widths: &[f64]) -> Vec<Vec<f64>> {
    widths
        .iter()
        .map(|&width| {
            let points = ((10.0 * width) as usize).min(signal.len()).max(1);
            let mut wavelet = ricker(points, width);
            wavelet.reverse();
            convolve_same(signal, &wavelet)
        })
        .collect()
}

/// Indices strictly greater than both neighbours. Edge samples compare
/// against themselves and therefore never qualify.
fn relative_maxima(row: &[f64]) -> Vec<usize> {
    if row.len() < 3 {
        return Vec::new();
    }
    (1..row.len() - 1)
        .filter(|&i| row[i] > row[i - 1] && row[i] > row[i + 1])
        .collect()
}

/// Linearly interpolated percentile of `values`, `per` in [0, 100].
fn percentile(values: &mut [f64], per: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = per / 100.0 * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    values[lower] + (values[upper] - values[lower]) * fraction
}

#[derive(Debug)]
struct Ridge {
    /// (row, column) pairs, from the largest width down to the smallest.
    points: Vec<(usize, usize)>,
    gap: usize,
}

/// Link per-row maxima into ridge lines, starting from the widest row.
fn identify_ridge_lines(
    matrix: &[Vec<f64>],
    max_distances: &[f64],
    gap_threshold: usize,
) -> Vec<Vec<(usize, usize)>> {
    let rows = matrix.len();
    let maxima: Vec<Vec<usize>> = matrix.iter().map(|row| relative_maxima(row)).collect();

    let mut open: Vec<Ridge> = maxima[rows - 1]
        .iter()
        .map(|&col| Ridge {
            points: vec![(rows - 1, col)],
            gap: 0,
        })
        .collect();
    let mut closed = Vec::new();

    for row in (0..rows.saturating_sub(1)).rev() {
        let mut this_row: Vec<usize> = maxima[row].clone();
        let mut continuing = Vec::new();

        for mut ridge in open.drain(..) {
            let (_, last_col) = *ridge.points.last().unwrap_or(&(row, 0));
            let nearest = this_row
                .iter()
                .enumerate()
                .min_by_key(|(_, &col)| col.abs_diff(last_col))
                .map(|(idx, &col)| (idx, col));

            match nearest {
                Some((idx, col)) if (col.abs_diff(last_col) as f64) <= max_distances[row] => {
                    ridge.points.push((row, col));
                    ridge.gap = 0;
                    this_row.remove(idx);
                    continuing.push(ridge);
                }
                _ => {
                    ridge.gap += 1;
                    if ridge.gap > gap_threshold {
                        closed.push(ridge);
                    } else {
                        continuing.push(ridge);
                    }
                }
            }
        }

        continuing.extend(this_row.into_iter().map(|col| Ridge {
            points: vec![(row, col)],
            gap: 0,
        }));
        open = continuing;
    }

    closed
        .into_iter()
        .chain(open)
        .map(|ridge| {
            let mut points = ridge.points;
            // smallest width first
            points.reverse();
            points
        })
        .collect()
}

/// Peak indices of `signal` found through the wavelet transform at `widths`.
///
/// The returned indices are sorted and unique.
pub fn find_peaks_cwt(signal: &[f64], widths: &[f64], options: &CwtPeakOptions) -> Vec<usize> {
    if signal.len() < 3 || widths.is_empty() {
        return Vec::new();
    }

    let matrix = cwt(signal, widths);
    let max_distances: Vec<f64> = widths.iter().map(|w| w / 4.0).collect();
    let gap_threshold = widths[0].ceil() as usize;
    let ridges = identify_ridge_lines(&matrix, &max_distances, gap_threshold);

    let num_points = signal.len();
    let min_length = (widths.len() as f64 / 4.0).ceil() as usize;
    let window_size = options
        .window_size
        .unwrap_or_else(|| (num_points as f64 / 20.0).ceil() as usize);
    let (half_window, odd) = (window_size / 2, window_size % 2);
    let row_one = &matrix[0];

    let noise_at = |col: usize| {
        let start = col.saturating_sub(half_window);
        let end = (col + half_window + odd).min(num_points);
        let mut window = row_one[start..end].to_vec();
        percentile(&mut window, options.noise_percentile)
    };

    let mut peaks: Vec<usize> = ridges
        .into_iter()
        .filter(|points| points.len() >= min_length)
        .filter_map(|points| {
            let (row, col) = *points.first()?;
            let snr = (matrix[row][col] / noise_at(col)).abs();
            // NaN (0 / 0) is not below the threshold and survives
            if snr < options.min_snr {
                None
            } else {
                Some(col)
            }
        })
        .collect();

    peaks.sort_unstable();
    peaks.dedup();
    peaks
}
