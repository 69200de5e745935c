mod common;

use std::io::Cursor;

use common::*;
use eog_rs::archive::{self, load_study, read_study, save_study, write_study};
use eog_rs::models::{Conditions, Protocol};
use eog_rs::{Analyzer, EogError};

#[test]
fn test_reloaded_study_annotates_identically() {
    let mut study = study_with_gain(
        Protocol::Antisaccadic,
        vec![antisaccadic_step_test(), antisaccadic_step_test().with_replica(true)],
        0.01,
    )
    .with_conditions(Some(Conditions {
        light_intensity: 80.0,
        errors: 3,
    }));
    let analyzer = Analyzer::default();
    analyzer.annotate_study(&mut study).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("study.oeog");
    save_study(&study, &path).unwrap();
    let reloaded = load_study(&path).unwrap();

    assert_eq!(reloaded.id, study.id);
    assert_eq!(reloaded.protocol, study.protocol);
    assert_eq!(reloaded.conditions, study.conditions);
    assert_eq!(reloaded.recorded_at.timestamp(), study.recorded_at.timestamp());
    assert_eq!(reloaded.hor_calibration(), study.hor_calibration());
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.tests()[1].replica());

    for (before, after) in study.tests().iter().zip(reloaded.tests()) {
        assert_eq!(before.kind(), after.kind());
        assert_eq!(before.angle(), after.angle());
        assert_eq!(before.hor_stimuli_raw(), after.hor_stimuli_raw());
        assert_eq!(before.hor_channel_raw(), after.hor_channel_raw());
        assert_eq!(before.ver_stimuli_raw(), after.ver_stimuli_raw());
        assert_eq!(before.ver_channel_raw(), after.ver_channel_raw());
        assert_eq!(
            analyzer.annotate(before).unwrap().annotations,
            analyzer.annotate(after).unwrap().annotations
        );
        assert_eq!(before.annotations(), after.annotations());
    }

    let manifest = archive::read_manifest(&path).unwrap();
    assert_eq!(manifest.version, "1.0");
    assert_eq!(manifest.tests.len(), 2);
    assert_eq!(manifest.tests[0].length, 4000);
}

#[test]
fn test_in_memory_round_trip() {
    let study = study_with_gain(Protocol::Pursuit, vec![pursuit_test(50)], 0.0005);
    let bytes = write_study(&study, Cursor::new(Vec::new())).unwrap().into_inner();
    let reloaded = read_study(Cursor::new(bytes)).unwrap();

    assert_eq!(reloaded.tests()[0].hor_channel_raw(), study.tests()[0].hor_channel_raw());
    assert_eq!(reloaded.tests()[0].hor_channel().unwrap(), study.tests()[0].hor_channel().unwrap());
}

#[test]
fn test_missing_bundle_is_an_archive_error() {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let study = study_with_gain(Protocol::Antisaccadic, vec![antisaccadic_step_test()], 0.01);
    let manifest = serde_json::to_vec(&archive::StudyManifest::from_study(&study)).unwrap();

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(archive::MANIFEST_NAME, SimpleFileOptions::default()).unwrap();
    zip.write_all(&manifest).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = read_study(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, EogError::Archive(ref message) if message.contains("test00.npz")), "{err}");
}

#[test]
fn test_not_a_zip_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.oeog");
    std::fs::write(&path, b"not an archive").unwrap();
    assert!(matches!(load_study(&path), Err(EogError::Zip(_))));
}
