mod common;

use common::*;
use eog_rs::biomarkers::correction_latencies;
use eog_rs::calibration::estimate_gain;
use eog_rs::classifier::{classify_all, correction_pairing};
use eog_rs::impulses::{Impulse, Size};
use eog_rs::models::{AnnotationKind, Protocol, Study, Test, TestKind};
use eog_rs::transitions::{Direction, StimulusTransitions};
use eog_rs::{AnalysisConfig, Analyzer};

fn assert_emitted_invariants(test: &Test, analyzer: &Analyzer) {
    for annotation in analyzer.annotate(test).unwrap().annotations {
        assert!(annotation.onset < annotation.offset);
        assert!(annotation.duration >= 15);
        assert!(annotation.amplitude >= 1.0);
    }
}

#[test]
fn test_flat_recording_yields_no_annotations() {
    let len = 3000;
    let test = Test::new(
        TestKind::HorizontalAntisaccadic,
        10,
        vec![0; len],
        vec![0; len],
        vec![0; len],
        vec![0; len],
    )
    .unwrap();
    let study = study_with_gain(Protocol::Antisaccadic, vec![test], 0.01);

    let report = Analyzer::default().analyze(&study);

    assert!(report.skipped.is_empty());
    assert_eq!(report.tests.len(), 1);
    assert!(report.tests[0].annotations.is_empty());
    assert!(report.summary["response_inhibition"].is_nan());
    assert!(report.summary["latency_mean"].is_nan());
}

#[test]
fn test_step_opposite_to_stimulus_is_one_antisaccade() {
    let study = study_with_gain(Protocol::Antisaccadic, vec![antisaccadic_step_test()], 0.01);
    let analyzer = Analyzer::default();

    let annotated = analyzer.annotate(&study.tests()[0]).unwrap();
    assert_eq!(annotated.annotations.len(), 1, "{:?}", annotated.annotations);

    let antisaccade = &annotated.annotations[0];
    assert_eq!(antisaccade.kind, AnnotationKind::AntiSaccade);
    assert_eq!(antisaccade.size, Size::Large);
    assert_eq!(antisaccade.direction, Direction::Right);
    assert_eq!(antisaccade.transition_index, 1);
    assert_eq!(antisaccade.transition_position, 1500);
    assert_eq!(antisaccade.transition_direction, Direction::Left);
    assert!((antisaccade.amplitude - 10.0).abs() < 0.8, "amplitude {}", antisaccade.amplitude);
    assert!((antisaccade.deviation - 1.0).abs() < 0.08, "deviation {}", antisaccade.deviation);
    assert!((1570..1600).contains(&antisaccade.onset), "onset {}", antisaccade.onset);
    assert_eq!(antisaccade.latency, antisaccade.onset - 1500);
    assert!((annotated.expected_half_amplitude - 5.0).abs() < 1e-9);

    let report = analyzer.analyze(&study);
    assert_eq!(report.summary["response_inhibition"], 0.0);
    let latency = report.summary["latency_mean"];
    assert!((latency - antisaccade.latency as f64 / 1000.0).abs() < 1e-12);
    assert_eq!(report.summary["latency_std"], 0.0);
    assert_eq!(report.summary["correction_latency_mean"], 0.0);
}

#[test]
fn test_movement_before_first_stimulus_change_is_not_scored() {
    let len = 4000;
    let stimulus: Vec<u16> = (0..len).map(|i| if i < 2500 { CENTER } else { CENTER + 20000 }).collect();
    let test = Test::new(
        TestKind::HorizontalAntisaccadic,
        10,
        stimulus,
        raw_step(len, 1000, 40, 30000, -1000),
        flat(len),
        flat(len),
    )
    .unwrap();
    let study = study_with_gain(Protocol::Antisaccadic, vec![test], 0.01);
    let analyzer = Analyzer::default();

    let annotated = analyzer.annotate(&study.tests()[0]).unwrap();
    assert!(annotated.annotations.is_empty(), "{:?}", annotated.annotations);

    let report = analyzer.analyze(&study);
    assert!(report.summary["latency_mean"].is_nan());
    assert!(report.summary["response_inhibition"].is_nan());
}

#[test]
fn test_calibration_amplitudes_of_300_give_gain_one_tenth() {
    let estimate = estimate_gain(&[300.0; 6], &[300.0; 4], 30.0, 0.2);
    assert!((estimate.gain - 0.1).abs() < 1e-12);
    assert!((estimate.drift - 1.0).abs() < 1e-12);
    assert!(estimate.drift_error() < 1e-9);
}

#[test]
fn test_glance_and_correction_are_paired() {
    let mut stimulus = vec![0.0; 1000];
    stimulus.extend(std::iter::repeat(5.0).take(2000));
    let transitions = StimulusTransitions::new(&stimulus);

    let glance = Impulse {
        onset: 1150,
        offset: 1190,
        amplitude: 3.0,
        peak_velocity: 120.0,
        direction: Direction::Left,
        size: Size::Small,
    };
    let correction = Impulse {
        onset: 1250,
        offset: 1300,
        amplitude: 10.0,
        peak_velocity: 300.0,
        direction: Direction::Right,
        size: Size::Large,
    };

    // classification orders by onset whatever the input order
    let classified = classify_all(&[correction, glance], &transitions, 10.0);
    assert_eq!(classified[0].kind, AnnotationKind::Saccade);
    assert_eq!(classified[1].kind, AnnotationKind::AntiSaccade);

    let retained = correction_pairing(&classified);
    assert_eq!(retained.len(), 2);

    let latencies = correction_latencies(&retained, 1000.0);
    assert_eq!(latencies.len(), 1);
    assert!((latencies[0] - 0.060).abs() < 1e-12);
}

#[test]
fn test_annotation_is_deterministic() {
    let study = study_with_gain(Protocol::Antisaccadic, vec![antisaccadic_step_test()], 0.01);
    let analyzer = Analyzer::default();
    let test = &study.tests()[0];

    let first = analyzer.annotate(test).unwrap().annotations;
    let second = analyzer.annotate(&test.clone()).unwrap().annotations;
    assert_eq!(first, second);
    assert_emitted_invariants(test, &analyzer);
}

#[test]
fn test_study_calibrates_from_bracketing_tests() {
    let mut antisaccadic = antisaccadic_step_test();
    // 100 counts at roughly 0.1 deg per count
    antisaccadic = Test::new(
        antisaccadic.kind(),
        antisaccadic.angle(),
        antisaccadic.hor_stimuli_raw().to_vec(),
        raw_step(4000, 1600, 50, 30000, -100),
        flat(4000),
        flat(4000),
    )
    .unwrap();

    let study = Study::new(
        Protocol::Antisaccadic,
        vec![calibration_test(), antisaccadic, calibration_test()],
    )
    .unwrap();

    let gain = study.hor_calibration().gain;
    assert!((0.099..0.103).contains(&gain), "gain {}", gain);
    assert_eq!(study.hor_calibration().drift, 1.0);
    assert_eq!(study.ver_calibration().gain, 1.0);
    assert!(study.tests().iter().all(|t| t.hor_gain() == Some(gain)));

    let report = Analyzer::default().analyze(&study);
    assert!(report.calibration.warnings.is_empty());
    assert_eq!(report.tests.len(), 3);

    let retained = &report.tests[1].annotations;
    assert_eq!(retained.len(), 1);
    assert!(retained[0].is_antisaccade());
    assert_eq!(retained[0].size, Size::Large);
    // calibration Tests do not contribute to the study summary
    assert_eq!(report.summary["response_inhibition"], 0.0);
    assert!(report.tests[0].biomarkers.is_empty());
}

#[test]
fn test_study_without_calibration_warns_in_report() {
    let study = Study::new(Protocol::Antisaccadic, vec![antisaccadic_step_test()]).unwrap();
    assert_eq!(study.hor_calibration().gain, 1.0);
    assert_eq!(study.hor_calibration().drift, 0.0);

    let report = Analyzer::default().analyze(&study);
    assert_eq!(report.calibration.warnings.len(), 1);
    assert_eq!(report.calibration.warnings[0].channel, "horizontal");
    assert!((report.calibration.horizontal_drift_error - 100.0).abs() < 1e-12);
}

#[test]
fn test_target_angle_scaling_skips_flat_channels() {
    let len = 3000;
    let test = Test::new(
        TestKind::HorizontalSaccadic,
        20,
        flat(len),
        flat(len),
        flat(len),
        flat(len),
    )
    .unwrap();
    let study = study_with_gain(Protocol::Saccadic, vec![test], 0.01);
    let config = AnalysisConfig {
        scaling: eog_rs::ScalingMode::TargetAngle,
        ..AnalysisConfig::default()
    };

    let report = Analyzer::new(config).unwrap().analyze(&study);
    assert!(report.tests.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 0);
    assert!(report.summary["saccades_count"] == 0.0);
}

#[test]
fn test_saccadic_test_keeps_large_saccades() {
    // the eye follows the stimulus to the left
    let len = 4000;
    let stimulus: Vec<u16> = (0..len).map(|i| if i < 1500 { CENTER } else { CENTER + 20000 }).collect();
    let test = Test::new(
        TestKind::HorizontalSaccadic,
        10,
        stimulus,
        raw_step(len, 1600, 40, 30000, 1000),
        flat(len),
        flat(len),
    )
    .unwrap();
    let study = study_with_gain(Protocol::Saccadic, vec![test], 0.01);

    let report = Analyzer::default().analyze(&study);
    let annotations = &report.tests[0].annotations;
    assert_eq!(annotations.len(), 1);
    assert!(annotations[0].is_saccade());
    assert_eq!(annotations[0].direction, Direction::Left);
    assert_eq!(report.summary["saccades_count"], 1.0);
    assert!((report.summary["amplitude_mean"] - 10.0).abs() < 0.8);
}

#[test]
fn test_pursuit_study_tracks_delayed_eye() {
    let study = study_with_gain(Protocol::Pursuit, vec![pursuit_test(100)], 0.0005);

    let report = Analyzer::default().analyze(&study);
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);

    let summary = &report.summary;
    assert!(summary["waveform_mse"] < 0.5, "mse {}", summary["waveform_mse"]);
    assert_eq!(summary["corrective_saccades_count"], 0.0);
    let gain = summary["velocity_gain"];
    assert!((0.8..1.2).contains(&gain), "velocity gain {}", gain);
    let latency = summary["latency_mean"];
    assert!((0.05..0.2).contains(&latency), "latency {}", latency);
    let deficit = summary["spectral_coherence"];
    assert!((0.0..=1.0).contains(&deficit), "coherence deficit {}", deficit);
}

#[test]
fn test_annotate_study_attaches_annotations() {
    let mut study = study_with_gain(Protocol::Antisaccadic, vec![antisaccadic_step_test()], 0.01);
    Analyzer::default().annotate_study(&mut study).unwrap();
    assert_eq!(study.tests()[0].annotations().len(), 1);
}
