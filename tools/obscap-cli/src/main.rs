//! obscap CLI: query the capture engine, list displays, and record.
//!
//! Usage:
//!   obscap version             Print the capture engine version
//!   obscap check               Check permission and system capabilities
//!   obscap displays            List capturable displays
//!   obscap record [OUTPUT]     Record until Ctrl+C or --duration elapses

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use obscap_capture_engine::EngineKind;
use obscap_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "obscap",
    about = "Screen recording through an external capture engine",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Capture engine backend (ffmpeg or stub)
    #[arg(long, global = true, default_value = "ffmpeg")]
    engine: EngineKind,

    /// Config file (defaults to $XDG_CONFIG_HOME/obscap/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the capture engine version
    Version,

    /// Check screen-recording permission and system capabilities
    Check {
        /// Prompt for screen-recording permission if not yet determined
        #[arg(long)]
        request: bool,
    },

    /// List capturable displays
    Displays {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record the screen
    Record {
        /// Output file (defaults to a timestamped file in the configured directory)
        output: Option<PathBuf>,

        /// Display id to capture (index or name)
        #[arg(short, long)]
        display: Option<String>,

        /// Output width
        #[arg(long)]
        width: Option<u32>,

        /// Output height
        #[arg(long)]
        height: Option<u32>,

        /// Target FPS
        #[arg(long)]
        fps: Option<u32>,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    obscap_common::logging::init_logging(&config.logging);
    tracing::debug!(?config, "Loaded configuration");

    let engine = cli.engine;

    match cli.command {
        Commands::Version => commands::version::run(engine, &config),
        Commands::Check { request } => commands::check::run(engine, &config, request),
        Commands::Displays { json } => commands::displays::run(engine, &config, json),
        Commands::Record {
            output,
            display,
            width,
            height,
            fps,
            duration,
        } => {
            let options = commands::record::RecordOptions {
                output,
                display,
                width,
                height,
                fps,
                duration_secs: duration,
            };
            commands::record::run(engine, &config, options).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_flag_selects_backend() {
        let cli = Cli::try_parse_from(["obscap", "--engine", "stub", "version"]).unwrap();
        assert_eq!(cli.engine, EngineKind::Stub);

        let cli = Cli::try_parse_from(["obscap", "displays", "--engine", "FFmpeg"]).unwrap();
        assert_eq!(cli.engine, EngineKind::Ffmpeg);

        assert!(Cli::try_parse_from(["obscap", "--engine", "obs", "version"]).is_err());
    }

    #[test]
    fn engine_defaults_to_ffmpeg() {
        let cli = Cli::try_parse_from(["obscap", "version"]).unwrap();
        assert_eq!(cli.engine, EngineKind::Ffmpeg);
    }
}
