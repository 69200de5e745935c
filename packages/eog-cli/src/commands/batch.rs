use crate::cli::BatchArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching archives found");
        return exit_codes::INPUT_ERROR;
    }

    if args.dry_run {
        for f in &files {
            println!("{}", f);
        }
        if !args.quiet {
            eprintln!("Found {} archive(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let analyzer = match params::build_analyzer(args.config.as_deref(), args.scaling) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: Failed to start worker threads: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let total = files.len();
    let start_time = Instant::now();
    if !args.quiet {
        eprintln!("Analyzing {} archive(s) on {} thread(s)...", total, pool.current_num_threads());
    }

    let results: Vec<_> = pool.install(|| {
        files
            .par_iter()
            .map(|file| params::analyze_archive(file, &analyzer))
            .collect()
    });

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    // outputs are written in input order
    for (i, (file_path, result)) in files.iter().zip(results).enumerate() {
        if !args.quiet {
            eprintln!("[{}/{}] {}", i + 1, total, file_path);
        }

        let written = result
            .map_err(|e| format!("{:#}", e))
            .and_then(|report| match args.output_dir {
                Some(ref dir) => {
                    let out_path = params::report_path(dir, file_path);
                    output::emit_json(&report, args.compact, out_path.to_str())
                }
                // JSONL to stdout
                None => output::emit_json(&report, true, None),
            });

        match written {
            Ok(()) => succeeded += 1,
            Err(msg) => {
                eprintln!("  Error: {}", msg);
                failed += 1;
                if !args.continue_on_error {
                    break;
                }
            }
        }
    }

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {:.1}s",
            succeeded,
            total,
            failed,
            total,
            start_time.elapsed().as_secs_f64()
        );
    }

    if failed == 0 {
        exit_codes::SUCCESS
    } else if succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

fn resolve_files(args: &BatchArgs) -> Result<Vec<String>, String> {
    if let Some(ref pattern) = args.pattern {
        if Path::new(pattern).is_dir() {
            let joined = Path::new(pattern).join(format!("*.{}", params::ARCHIVE_EXTENSION));
            resolve_glob(&joined.to_string_lossy())
        } else {
            resolve_glob(pattern)
        }
    } else if let Some(ref files) = args.files {
        Ok(files.clone())
    } else {
        Err("One of --pattern or --files must be specified".to_string())
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths = glob::glob(pattern)
        .map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    if let Some(s) = path.to_str() {
                        files.push(s.to_string());
                    }
                }
            }
            Err(e) => {
                log::warn!("glob error: {}", e);
            }
        }
    }
    files.sort();
    Ok(files)
}
