use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;
mod params;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let exit_code = match cli.command {
        cli::Command::Analyze(args) => commands::analyze::execute(args),
        cli::Command::Batch(args) => commands::batch::execute(args),
        cli::Command::Info(args) => commands::info::execute(args),
        cli::Command::Protocol(args) => commands::protocol::execute(args),
        cli::Command::Stimulus(args) => commands::stimulus::execute(args),
    };

    std::process::exit(exit_code);
}
