//! Record the screen until Ctrl+C or a fixed duration.

use std::path::PathBuf;
use std::time::Duration;

use obscap_capture_engine::{EngineKind, RecordingRequest};
use obscap_common::config::AppConfig;
use obscap_platform_core::{DisplayId, PermissionStatus};

use super::open_session;

/// Options from the `record` subcommand.
pub struct RecordOptions {
    pub output: Option<PathBuf>,
    pub display: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub duration_secs: Option<f64>,
}

pub async fn run(engine: EngineKind, config: &AppConfig, options: RecordOptions) -> anyhow::Result<()> {
    let limit = recording_limit(options.duration_secs)?;

    let session = open_session(engine, config);
    println!("Engine version: {}", session.query_version());

    let mut permission = session.check_capture_permission();
    if permission == PermissionStatus::NotDetermined {
        permission = session.request_capture_permission();
    }
    println!("Screen recording permission: {permission}");

    let handle = session.initialize()?;
    println!("Engine initialized ({handle})");

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| config.recording.output_dir.join(default_file_name()));
    let request = build_request(output, &options);

    if let Err(e) = session.start_recording(request) {
        session.shutdown().ok();
        return Err(e.into());
    }
    if let Some(config) = session.active_config() {
        println!(
            "Recording display {} at {}x{} @ {} fps to {}",
            config.display.id,
            config.width,
            config.height,
            config.fps,
            config.output_path.display()
        );
    }

    wait_for_stop(limit).await?;

    println!();
    let stopped = session.stop_recording();
    session.shutdown()?;
    let summary = stopped?;

    println!(
        "Recording saved to: {} ({:.1}s)",
        summary.output_path.display(),
        summary.duration_secs
    );
    Ok(())
}

fn build_request(output: PathBuf, options: &RecordOptions) -> RecordingRequest {
    let mut request = RecordingRequest::new(output);
    request.display_id = options
        .display
        .as_deref()
        .and_then(|d| d.parse::<DisplayId>().ok());
    request.width = options.width;
    request.height = options.height;
    request.fps = options.fps;
    request
}

/// Validate `--duration` before anything is started.
fn recording_limit(duration_secs: Option<f64>) -> anyhow::Result<Option<Duration>> {
    match duration_secs {
        None => Ok(None),
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
        Some(secs) => anyhow::bail!("--duration must be a positive number of seconds, got {secs}"),
    }
}

async fn wait_for_stop(limit: Option<Duration>) -> anyhow::Result<()> {
    match limit {
        Some(limit) => {
            println!("Recording for {:.1}s (Ctrl+C stops early)...", limit.as_secs_f64());
            tokio::select! {
                _ = tokio::time::sleep(limit) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => {
            println!("Press Ctrl+C to stop recording...");
            tokio::signal::ctrl_c().await?;
        }
    }
    Ok(())
}

fn default_file_name() -> String {
    format!("obscap-{}.mp4", chrono::Local::now().format("%Y%m%d-%H%M%S"))
}
