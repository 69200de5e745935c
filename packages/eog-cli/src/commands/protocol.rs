use crate::cli::ProtocolArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use eog_rs::models::{Protocol, TestKind, TestSpec};
use eog_rs::ProtocolTemplate;
use serde::Serialize;

#[derive(Serialize)]
struct SpecInfo {
    index: usize,
    test_type: TestKind,
    angle: u32,
    replica: bool,
    length: usize,
}

#[derive(Serialize)]
struct ProtocolOutput {
    name: String,
    protocol: Protocol,
    seed: u64,
    total_samples: usize,
    tests: Vec<SpecInfo>,
}

fn summarize(template: &ProtocolTemplate, seed: u64, specs: &[TestSpec]) -> ProtocolOutput {
    ProtocolOutput {
        name: template.name().to_string(),
        protocol: template.protocol(),
        seed,
        total_samples: specs.iter().map(|s| s.length).sum(),
        tests: specs
            .iter()
            .enumerate()
            .map(|(index, s)| SpecInfo {
                index,
                test_type: s.kind,
                angle: s.angle,
                replica: s.replica,
                length: s.length,
            })
            .collect(),
    }
}

pub fn execute(args: ProtocolArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.template) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let template = match ProtocolTemplate::open(&args.template) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    let specs = template.tests(args.seed);
    let summary = summarize(&template, args.seed, &specs);

    if args.json {
        if let Err(e) = output::emit_json(&summary, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
        return exit_codes::SUCCESS;
    }

    println!("{} ({} protocol, seed {})", summary.name, summary.protocol, summary.seed);
    println!();
    println!("{:<4} {:<24} {:>6} {:>8} {:>10}", "#", "Test", "Angle", "Replica", "Samples");
    for spec in &summary.tests {
        println!(
            "{:<4} {:<24} {:>6} {:>8} {:>10}",
            spec.index,
            spec.test_type.to_string(),
            spec.angle,
            if spec.replica { "yes" } else { "no" },
            spec.length
        );
    }
    println!();
    println!(
        "{} Tests, {:.1} s of recording",
        summary.tests.len(),
        summary.total_samples as f64 / eog_rs::SAMPLE_RATE
    );

    exit_codes::SUCCESS
}
