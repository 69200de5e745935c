use crate::cli::{StimulusArgs, StimulusKind};
use crate::exit_codes;
use crate::output;
use eog_rs::stimuli::{encode, pursuit_stimuli, saccadic_stimuli};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn generate(kind: &StimulusKind) -> Result<Vec<f64>, String> {
    match *kind {
        StimulusKind::Saccadic {
            length,
            saccades,
            variability,
            seed,
        } => {
            if !(0.0..=1.0).contains(&variability) {
                return Err(format!("--variability must lie in [0, 1], got {}", variability));
            }
            let mut rng = StdRng::seed_from_u64(seed);
            Ok(saccadic_stimuli(length, saccades, variability, &mut rng))
        }
        StimulusKind::Pursuit { length, speed, rate } => {
            if !(speed.is_finite() && speed > 0.0) || !(rate.is_finite() && rate > 0.0) {
                return Err("--speed and --rate must be positive".to_string());
            }
            Ok(pursuit_stimuli(length, speed, rate))
        }
    }
}

pub fn execute(args: StimulusArgs) -> i32 {
    let values = match generate(&args.kind) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let text = match (args.counts, args.json) {
        (true, true) => output::to_json(&encode(&values), true),
        (true, false) => Ok(output::to_lines(&encode(&values))),
        (false, true) => output::to_json(&values, true),
        (false, false) => Ok(output::to_lines(&values)),
    };

    match text.and_then(|t| output::write_output(&t, args.output.as_deref())) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXECUTION_ERROR
        }
    }
}
