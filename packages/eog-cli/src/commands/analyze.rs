use crate::cli::AnalyzeArgs;
use crate::exit_codes;
use crate::output;
use crate::params;

pub fn execute(args: AnalyzeArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let analyzer = match params::build_analyzer(args.config.as_deref(), args.scaling) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!("Analyzing {}...", args.file);
    }

    let report = match params::analyze_archive(&args.file, &analyzer) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "  {} Tests analyzed, {} skipped, {} calibration warning(s)",
            report.tests.len(),
            report.skipped.len(),
            report.calibration.warnings.len()
        );
    }

    if let Err(e) = output::emit_json(&report, args.compact, args.output.as_deref()) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }
    if !args.quiet {
        if let Some(ref path) = args.output {
            eprintln!("Report written to {}", path);
        }
    }

    exit_codes::SUCCESS
}
