//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ROM Tracker - joint angles and range of motion from pose keypoints
#[derive(Parser, Debug)]
#[command(
    name = "rom-tracker",
    author,
    version,
    about = "Joint/segment angles and range-of-motion analysis from 2-D pose keypoints",
    long_about = "Computes joint and segment angles from pose detector output, follows \n\
                  every person across frames, and aggregates range-of-motion statistics.\n\n\
                  Sessions are fed from recorded detector output or a synthetic subject, \n\
                  and per-frame records are dispatched to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "ROM_TRACKER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose", env = "ROM_TRACKER_QUIET")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "ROM_TRACKER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level used when `RUST_LOG` is not set
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run sessions from recordings or mock subjects through the configured sinks
    Run(RunArgs),

    /// Compute ROM statistics from a saved angle file
    Analyze(AnalyzeArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// List supported angles and body models
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "rom.toml", env = "ROM_TRACKER_CONFIG")]
    pub config: PathBuf,

    /// Recorded detector output (JSON lines), one session per file
    #[arg(long, env = "ROM_TRACKER_REPLAY", value_delimiter = ',')]
    pub replay: Vec<PathBuf>,

    /// Replay speed multiplier (0 = as fast as possible)
    #[arg(long, default_value = "0", env = "ROM_TRACKER_REPLAY_SPEED")]
    pub replay_speed: f64,

    /// Number of synthetic subject sessions to run
    #[arg(long, default_value = "0", env = "ROM_TRACKER_MOCK")]
    pub mock: usize,

    /// Frame rate of synthetic sessions
    #[arg(long, default_value = "30", env = "ROM_TRACKER_MOCK_FPS")]
    pub mock_fps: f64,

    /// Duration of synthetic sessions in seconds
    #[arg(long, default_value = "10", env = "ROM_TRACKER_MOCK_DURATION")]
    pub mock_duration: f64,

    /// People visible in each synthetic session
    #[arg(long, default_value = "1", env = "ROM_TRACKER_MOCK_PEOPLE")]
    pub mock_people: usize,

    /// Emit synthetic frames at their frame rate instead of as fast as possible
    #[arg(long, env = "ROM_TRACKER_REALTIME")]
    pub realtime: bool,

    /// Output directory for angle files (overrides file sinks, adds one if absent)
    #[arg(short, long, env = "ROM_TRACKER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Maximum number of frames to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "ROM_TRACKER_MAX_FRAMES")]
    pub max_frames: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "ROM_TRACKER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size between sessions and the dispatcher
    #[arg(long, default_value = "100", env = "ROM_TRACKER_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "ROM_TRACKER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `analyze` command
#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Angle time-series file (.mot)
    #[arg(short, long, env = "ROM_TRACKER_INPUT")]
    pub input: PathBuf,

    /// Smoothing window for the running ROM, in seconds
    #[arg(long, default_value = "0.4", env = "ROM_TRACKER_WINDOW")]
    pub window: f64,

    /// Angle the running ROM follows
    #[arg(long, default_value = "trunk", env = "ROM_TRACKER_REFERENCE")]
    pub reference: String,

    /// Test name written into the report
    #[arg(long, default_value = "default", env = "ROM_TRACKER_TEST_NAME")]
    pub test_name: String,

    /// Include the per-row ROM report
    #[arg(long)]
    pub report: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "rom.toml", env = "ROM_TRACKER_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Show the angle definition table
    #[arg(long)]
    pub angles: bool,

    /// Show the supported body models
    #[arg(long)]
    pub models: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InfoArgs {
    /// Neither flag given means both sections
    pub fn show_angles(&self) -> bool {
        self.angles || !self.models
    }

    pub fn show_models(&self) -> bool {
        self.models || !self.angles
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "rom-tracker",
            "-v",
            "run",
            "--config",
            "session.toml",
            "--replay",
            "a.jsonl,b.jsonl",
            "--mock",
            "2",
            "--max-frames",
            "50",
        ])
        .unwrap();
        assert_eq!(cli.default_log_level(), "debug");
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.config, PathBuf::from("session.toml"));
        assert_eq!(args.replay.len(), 2);
        assert_eq!(args.mock, 2);
        assert_eq!(args.max_frames, 50);
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["rom-tracker", "-q", "-v", "info"]).is_err());
        let cli = Cli::try_parse_from(["rom-tracker", "-q", "info"]).unwrap();
        assert_eq!(cli.default_log_level(), "warn");
    }

    #[test]
    fn test_analyze_requires_input() {
        assert!(Cli::try_parse_from(["rom-tracker", "analyze"]).is_err());
        let cli =
            Cli::try_parse_from(["rom-tracker", "analyze", "-i", "a.mot", "--reference", "left knee"])
                .unwrap();
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.reference, "left knee");
        assert_eq!(args.window, 0.4);
    }

    #[test]
    fn test_info_defaults_to_both_sections() {
        let args = InfoArgs {
            angles: false,
            models: false,
            json: false,
        };
        assert!(args.show_angles() && args.show_models());
        let args = InfoArgs {
            angles: true,
            models: false,
            json: false,
        };
        assert!(args.show_angles() && !args.show_models());
    }
}
