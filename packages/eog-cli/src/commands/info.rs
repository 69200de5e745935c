use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use eog_rs::archive::{self, StudyManifest};
use eog_rs::models::{Conditions, Hardware, Protocol, TestKind};
use eog_rs::CalibrationEstimate;
use serde::Serialize;

#[derive(Serialize)]
struct CalibrationInfo {
    gain: f64,
    drift: f64,
    drift_error: f64,
}

impl From<CalibrationEstimate> for CalibrationInfo {
    fn from(estimate: CalibrationEstimate) -> Self {
        Self {
            gain: estimate.gain,
            drift: estimate.drift,
            drift_error: estimate.drift_error(),
        }
    }
}

#[derive(Serialize)]
struct TestInfo {
    index: usize,
    test_type: TestKind,
    angle: u32,
    replica: bool,
    length: usize,
    duration_secs: f64,
}

#[derive(Serialize)]
struct InfoOutput {
    file: String,
    version: String,
    id: String,
    recorded_at: String,
    protocol: Protocol,
    hor_calibration: CalibrationInfo,
    ver_calibration: CalibrationInfo,
    hardware: Option<Hardware>,
    conditions: Option<Conditions>,
    tests: Vec<TestInfo>,
}

impl InfoOutput {
    fn new(file: &str, manifest: StudyManifest) -> Self {
        let recorded_at = manifest
            .recorded_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|_| manifest.recorded_at.to_string());
        let tests = manifest
            .tests
            .iter()
            .enumerate()
            .map(|(index, t)| TestInfo {
                index,
                test_type: t.test_type,
                angle: t.angle,
                replica: t.replica,
                length: t.length,
                duration_secs: t.length as f64 / t.fs as f64,
            })
            .collect();

        Self {
            file: file.to_string(),
            version: manifest.version.clone(),
            id: manifest.id.to_string(),
            recorded_at,
            protocol: manifest.protocol,
            hor_calibration: manifest.hor_estimate().into(),
            ver_calibration: manifest.ver_estimate().into(),
            hardware: manifest.hardware,
            conditions: manifest.conditions,
            tests,
        }
    }
}

pub fn execute(args: InfoArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let manifest = match archive::read_manifest(&args.file) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", args.file, e);
            return exit_codes::INPUT_ERROR;
        }
    };
    let info = InfoOutput::new(&args.file, manifest);

    if args.json {
        if let Err(e) = output::emit_json(&info, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        return exit_codes::SUCCESS;
    }

    println!("Study {} (archive v{})", info.id, info.version);
    println!("Recorded: {}", info.recorded_at);
    println!("Protocol: {}", info.protocol);
    if let Some(ref hardware) = info.hardware {
        println!(
            "Hardware: {} at {} Hz, monitor {}",
            hardware.acquisition_device, hardware.acquisition_sampling_rate, hardware.stimuli_monitor
        );
    }
    println!(
        "Horizontal calibration: gain {:.6}, drift {:.3} ({:.1}% error)",
        info.hor_calibration.gain, info.hor_calibration.drift, info.hor_calibration.drift_error
    );
    println!(
        "Vertical calibration: gain {:.6}, drift {:.3} ({:.1}% error)",
        info.ver_calibration.gain, info.ver_calibration.drift, info.ver_calibration.drift_error
    );
    println!();
    println!("{:<4} {:<24} {:>6} {:>8} {:>10}", "#", "Test", "Angle", "Replica", "Seconds");
    for test in &info.tests {
        println!(
            "{:<4} {:<24} {:>6} {:>8} {:>10.1}",
            test.index,
            test.test_type.to_string(),
            test.angle,
            if test.replica { "yes" } else { "no" },
            test.duration_secs
        );
    }

    exit_codes::SUCCESS
}
