use clap::{Args, Parser, Subcommand};
use eog_rs::ScalingMode;

#[derive(Parser)]
#[command(
    name = "eog",
    version,
    about = "EOG biomarker extraction command-line tool",
    long_about = "Extract saccadic, antisaccadic and smooth-pursuit biomarkers from EOG study archives.\n\
                  Analysis parameters come from --config and $EOG_* environment variables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Analyze one study archive and write its biomarker report
    Analyze(AnalyzeArgs),
    /// Analyze many study archives in parallel
    Batch(BatchArgs),
    /// Show study archive metadata
    Info(InfoArgs),
    /// Validate a protocol template and list the Tests it expands to
    Protocol(ProtocolArgs),
    /// Generate a stimulus waveform
    Stimulus(StimulusArgs),
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Study archive (.oeog)
    #[arg(long)]
    pub file: String,

    /// JSON analysis configuration
    #[arg(long, env = "EOG_CONFIG")]
    pub config: Option<String>,

    /// Channel scaling: calibrated or target-angle
    #[arg(long)]
    pub scaling: Option<ScalingMode>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for archives (e.g., "data/*.oeog")
    #[arg(long, conflicts_with = "files")]
    pub pattern: Option<String>,

    /// Explicit list of archives
    #[arg(long, num_args = 1..)]
    pub files: Option<Vec<String>>,

    /// JSON analysis configuration
    #[arg(long, env = "EOG_CONFIG")]
    pub config: Option<String>,

    /// Channel scaling: calibrated or target-angle
    #[arg(long)]
    pub scaling: Option<ScalingMode>,

    /// Directory for <stem>_biomarkers.json files (default: JSONL on stdout)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Keep going after a failed archive
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List matching archives without analyzing them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Study archive (.oeog)
    #[arg(long)]
    pub file: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ProtocolArgs {
    /// Protocol template (JSON)
    #[arg(long)]
    pub template: String,

    /// Seed of the stimulus randomization
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct StimulusArgs {
    #[command(subcommand)]
    pub kind: StimulusKind,

    /// Emit DAC counts instead of normalized values
    #[arg(long, default_value_t = false, global = true)]
    pub counts: bool,

    /// Output as a JSON array
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    pub output: Option<String>,
}

#[derive(Subcommand)]
pub enum StimulusKind {
    /// Fixation steps alternating between the two targets
    Saccadic {
        /// Length in samples
        #[arg(long)]
        length: usize,

        /// Number of saccades
        #[arg(long, default_value_t = 10)]
        saccades: usize,

        /// Fixation variability, as a fraction of the mean fixation
        #[arg(long, default_value_t = 0.05)]
        variability: f64,

        /// Seed of the fixation randomization
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Constant-speed triangle wave
    Pursuit {
        /// Length in samples
        #[arg(long)]
        length: usize,

        /// Normalized units per second
        #[arg(long)]
        speed: f64,

        /// Sampling rate in Hz
        #[arg(long, default_value_t = eog_rs::SAMPLE_RATE)]
        rate: f64,
    },
}
