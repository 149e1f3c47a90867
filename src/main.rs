// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use streamforge::VirtualCameraOutput;

mod cli;

#[derive(Parser)]
#[command(name = "streamforge")]
#[command(about = "Stream local media files into a virtual camera and microphone")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream files or directories until Ctrl+C or the queues run out
    Stream {
        /// Media files or directories to load
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Loop the video queue
        #[arg(long)]
        loop_video: bool,

        /// Loop the audio queue
        #[arg(long)]
        loop_audio: bool,

        /// Name of the virtual microphone node
        #[arg(short, long)]
        device: Option<String>,

        /// Virtual camera output (pipewire or v4l2)
        #[arg(short, long, value_parser = parse_output)]
        output: Option<VirtualCameraOutput>,
    },

    /// Check whether the virtual camera and microphone can be created
    Check,

    /// Show how paths would be queued, without streaming
    Scan {
        /// Media files or directories to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn parse_output(value: &str) -> Result<VirtualCameraOutput, String> {
    VirtualCameraOutput::from_arg(value)
        .ok_or_else(|| format!("unknown output '{}', expected pipewire or v4l2", value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=streamforge=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Stream {
            paths,
            loop_video,
            loop_audio,
            device,
            output,
        } => cli::stream(cli::StreamOptions {
            paths,
            loop_video,
            loop_audio,
            device,
            output,
        }),
        Commands::Check => cli::check(),
        Commands::Scan { paths } => cli::scan(&paths),
    };

    result?;
    Ok(())
}
