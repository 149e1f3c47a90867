// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for streaming operations
//!
//! This module provides command-line functionality for:
//! - Streaming files into the virtual devices
//! - Checking the virtual device integration
//! - Previewing how paths would be queued

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use streamforge::constants::app_info;
use streamforge::media::scan_paths;
use streamforge::{
    AppError, AppResult, BackendError, Config, MediaKind, StreamEngine, VirtualCameraOutput,
};
use tracing::warn;

/// How often the stream command polls the engine
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Options of the `stream` command
pub struct StreamOptions {
    pub paths: Vec<PathBuf>,
    pub loop_video: bool,
    pub loop_audio: bool,
    pub device: Option<String>,
    pub output: Option<VirtualCameraOutput>,
}

/// Load the user config, falling back to defaults on error
fn load_config() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Could not load config, using defaults");
            Config::default()
        }
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Stream the given paths until Ctrl+C or until both media go idle
pub fn stream(options: StreamOptions) -> AppResult<()> {
    let mut config = load_config();
    if let Some(device) = options.device {
        config.audio_device_name = device;
    }
    if let Some(output) = options.output {
        config.video_output = output;
    }
    config.loop_video |= options.loop_video;
    config.loop_audio |= options.loop_audio;

    let engine = StreamEngine::from_config(&config);

    engine.register_status_observer(Arc::new(|message: &str| {
        println!("[{}] {}", timestamp(), message);
    }));
    engine.register_error_observer(Arc::new(|message: &str| {
        eprintln!("[{}] ERROR {}", timestamp(), message);
    }));

    let report = engine.load(&options.paths);
    for entry in &report.loaded {
        println!("Loaded {}", entry);
    }
    for error in &report.errors {
        eprintln!("Skipped {}", error);
    }
    if report.loaded.is_empty() {
        return Err("No playable media found".into());
    }

    println!(
        "Virtual camera: {} | Virtual microphone: {}",
        config.video_output.display_name(),
        engine.settings().audio_device_name
    );
    println!("Streaming... (press Ctrl+C to stop)");
    engine.start_streaming();

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = stop_flag.clone();
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))?;

    loop {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping...");
            break;
        }
        if engine.status().is_idle() {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    engine.shutdown();

    let status = engine.status();
    for kind in MediaKind::ALL {
        let medium = status.get(kind);
        if medium.queue_len > 0 {
            println!("{}: {} item(s) left in queue", kind, medium.queue_len);
        }
    }

    Ok(())
}

/// Print virtual device diagnostics
pub fn check() -> AppResult<()> {
    let config = load_config();
    let engine = StreamEngine::from_config(&config);

    println!(
        "StreamForge {} ({})",
        app_info::version(),
        app_info::runtime_environment()
    );
    println!("Virtual camera output: {}", config.video_output.display_name());
    println!("Virtual microphone: {}", config.audio_device_name);
    println!();

    let problems = engine.check_devices();
    if problems.is_empty() {
        println!("All virtual devices available.");
        return Ok(());
    }

    println!("Problems found:");
    for problem in &problems {
        println!("  - {}", problem);
    }
    Err(AppError::Backend(BackendError::NotAvailable(format!(
        "{} problem(s) found",
        problems.len()
    ))))
}

/// Classify paths and print the resulting queues
pub fn scan(paths: &[PathBuf]) -> AppResult<()> {
    let result = scan_paths(paths);

    for kind in MediaKind::ALL {
        println!("{} ({}):", kind, result.count(kind));
        for item in result.items.iter().filter(|item| item.kind() == kind) {
            println!("  {}", item.path().display());
        }
    }

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &result.errors {
            println!("  {}", error);
        }
    }

    Ok(())
}
