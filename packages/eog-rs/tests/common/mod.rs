#![allow(dead_code)]

use eog_rs::calibration::CalibrationEstimate;
use eog_rs::models::{Protocol, Study, Test, TestKind};
use eog_rs::stimuli::{encode, pursuit_stimuli};

pub const CENTER: u16 = 32768;

/// Raw channel holding `base`, then moving by `delta` counts over `ramp`
/// samples starting at `start`.
pub fn raw_step(len: usize, start: usize, ramp: usize, base: u16, delta: i32) -> Vec<u16> {
    (0..len)
        .map(|i| {
            let moved = if i < start {
                0
            } else if i >= start + ramp {
                delta
            } else {
                delta * (i - start) as i32 / ramp as i32
            };
            (base as i32 + moved) as u16
        })
        .collect()
}

/// Square wave between `low` and `high` with a linear ramp of `ramp`
/// samples at every edge.
pub fn raw_square(len: usize, period: usize, low: u16, high: u16, ramp: usize) -> Vec<u16> {
    (0..len)
        .map(|i| {
            let (k, phase) = (i / period, i % period);
            let (from, to) = if k % 2 == 1 { (low, high) } else { (high, low) };
            if k > 0 && phase < ramp {
                let span = to as i32 - from as i32;
                (from as i32 + span * phase as i32 / ramp as i32) as u16
            } else {
                to
            }
        })
        .collect()
}

pub fn flat(len: usize) -> Vec<u16> {
    vec![CENTER; len]
}

/// 4000-sample antisaccadic Test: the stimulus steps left at 1500 and the
/// eye moves 1000 counts right from 1600.
pub fn antisaccadic_step_test() -> Test {
    let len = 4000;
    let stimulus: Vec<u16> = (0..len).map(|i| if i < 1500 { CENTER } else { CENTER + 20000 }).collect();
    Test::new(
        TestKind::HorizontalAntisaccadic,
        10,
        stimulus,
        raw_step(len, 1600, 40, 30000, -1000),
        flat(len),
        flat(len),
    )
    .unwrap()
}

/// Horizontal calibration Test with five 300-count eye steps.
pub fn calibration_test() -> Test {
    let len = 6000;
    Test::new(
        TestKind::HorizontalCalibration,
        30,
        raw_square(len, 1000, CENTER - 20000, CENTER + 20000, 1),
        raw_square(len, 1000, 32618, 32918, 30),
        flat(len),
        flat(len),
    )
    .unwrap()
}

/// Pursuit Test at 20 degrees whose eye trails the stimulus by `delay` samples.
pub fn pursuit_test(delay: usize) -> Test {
    let len = 6000;
    let stimulus = pursuit_stimuli(len, 1.0, 1000.0);
    let eye: Vec<f64> = (0..len)
        .map(|i| if i < delay { stimulus[0] } else { stimulus[i - delay] })
        .collect();
    Test::new(
        TestKind::HorizontalPursuit,
        20,
        encode(&stimulus),
        encode(&eye),
        flat(len),
        flat(len),
    )
    .unwrap()
}

pub fn study_with_gain(protocol: Protocol, tests: Vec<Test>, gain: f64) -> Study {
    Study::with_calibration(
        protocol,
        tests,
        CalibrationEstimate { gain, drift: 1.0 },
        CalibrationEstimate { gain: 1.0, drift: 1.0 },
    )
}
