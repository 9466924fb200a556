//! Engine backed by an external `ffmpeg` process.
//!
//! One ffmpeg child runs per recording. It is stopped by writing `q` to its
//! stdin, which makes ffmpeg flush and close the container before exiting.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use obscap_common::error::{EngineError, EngineResult};
use obscap_platform_core::{DisplayDescriptor, DisplayId, DisplayServer};
use parking_lot::Mutex;

use crate::backend::permission::{platform_permission_probe, ScreenRecordingPermission};
use crate::config::RecordingConfig;
use crate::engine::{CaptureEngine, EngineHandle, PermissionProbe};

/// How long a fresh capture process is watched for an immediate exit.
const STARTUP_GRACE: Duration = Duration::from_millis(300);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Fallback desktop size when gdigrab does not report one.
const DEFAULT_DESKTOP: (u32, u32) = (1920, 1080);

/// Input device family ffmpeg grabs the screen from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrabSource {
    /// `x11grab` on the given X display (e.g. `:0`).
    X11 { display: String },
    /// `avfoundation` on macOS.
    AvFoundation,
    /// `gdigrab` on Windows.
    GdiGrab,
}

impl GrabSource {
    /// The grab source for the running platform.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::AvFoundation
        } else if cfg!(target_os = "windows") {
            Self::GdiGrab
        } else {
            Self::X11 {
                display: obscap_platform_linux::x11_display_name(),
            }
        }
    }
}

struct CaptureProcess {
    child: Child,
    output_path: PathBuf,
    stderr_task: Option<JoinHandle<String>>,
}

/// [`CaptureEngine`] that drives the `ffmpeg` binary.
pub struct FfmpegEngine {
    binary: PathBuf,
    source: GrabSource,
    capture: Mutex<Option<CaptureProcess>>,
    permission: Option<ScreenRecordingPermission>,
}

impl FfmpegEngine {
    /// Use `ffmpeg` from `PATH` with the platform's grab source.
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            source: GrabSource::current(),
            capture: Mutex::new(None),
            permission: platform_permission_probe(),
        }
    }

    fn probe_version(&self) -> Result<String, String> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| format!("failed to run {}: {e}", self.binary.display()))?;
        if !output.status.success() {
            return Err(format!("{} -version exited with {}", self.binary.display(), output.status));
        }
        parse_version(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| "unrecognized ffmpeg -version output".to_string())
    }

    fn list_avfoundation_screens(&self) -> EngineResult<Vec<DisplayDescriptor>> {
        // ffmpeg exits non-zero after listing devices; only stderr matters.
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-f", "avfoundation", "-list_devices", "true", "-i", ""])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| EngineError::enumeration(format!("Failed to run ffmpeg: {e}")))?;

        let listing = String::from_utf8_lossy(&output.stderr);
        let screens = obscap_platform_macos::parse_avfoundation_screens(
            &listing,
            &obscap_platform_macos::active_display_bounds(),
        );
        if screens.is_empty() {
            return Err(EngineError::enumeration(
                "avfoundation reported no capturable screens",
            ));
        }
        Ok(screens)
    }

    fn gdigrab_desktop(&self) -> DisplayDescriptor {
        let mut desktop = DisplayDescriptor {
            id: DisplayId::Name("desktop".to_string()),
            label: "Desktop".to_string(),
            width: DEFAULT_DESKTOP.0,
            height: DEFAULT_DESKTOP.1,
            x: 0,
            y: 0,
            primary: true,
        };

        // gdigrab logs the desktop geometry when it opens; grab one frame.
        let probe = Command::new(&self.binary)
            .args(["-hide_banner", "-f", "gdigrab", "-i", "desktop", "-frames:v", "1", "-f", "null", "-"])
            .stdin(Stdio::null())
            .output();
        match probe.map(|o| parse_gdigrab_desktop(&String::from_utf8_lossy(&o.stderr))) {
            Ok(Some((width, height, x, y))) => {
                desktop.width = width;
                desktop.height = height;
                desktop.x = x;
                desktop.y = y;
            }
            Ok(None) => tracing::warn!("Could not read desktop size from gdigrab; assuming 1920x1080"),
            Err(e) => tracing::warn!(error = %e, "gdigrab desktop probe failed; assuming 1920x1080"),
        }
        desktop
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureEngine for FfmpegEngine {
    fn version(&self) -> String {
        self.probe_version().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "ffmpeg version probe failed");
            "unknown".to_string()
        })
    }

    fn permissions(&self) -> Option<&dyn PermissionProbe> {
        self.permission.as_ref().map(|p| p as &dyn PermissionProbe)
    }

    fn start(&self) -> EngineResult<EngineHandle> {
        let version = self.probe_version().map_err(EngineError::startup)?;

        if let GrabSource::X11 { display: x_display } = &self.source {
            let server = obscap_platform_linux::detect_display_server();
            if server == DisplayServer::Unknown {
                return Err(EngineError::startup(
                    "no X11 display available (DISPLAY is not set)",
                ));
            }
            if server == DisplayServer::Wayland {
                tracing::warn!(
                    x_display = %x_display,
                    "Wayland session detected; x11grab only sees XWayland clients"
                );
            }
        }

        tracing::info!(%version, source = ?self.source, "ffmpeg engine ready");
        Ok(EngineHandle::new(format!("ffmpeg {version}")))
    }

    fn enumerate_displays(&self, _handle: &EngineHandle) -> EngineResult<Vec<DisplayDescriptor>> {
        match &self.source {
            GrabSource::X11 { .. } => match obscap_platform_linux::detect_displays() {
                Ok(displays) => Ok(displays),
                Err(e) => {
                    tracing::warn!(error = %e, "Monitor detection failed; using default display");
                    Ok(vec![obscap_platform_linux::default_display()])
                }
            },
            GrabSource::AvFoundation => self.list_avfoundation_screens(),
            GrabSource::GdiGrab => Ok(vec![self.gdigrab_desktop()]),
        }
    }

    fn begin_capture(&self, _handle: &EngineHandle, config: &RecordingConfig) -> EngineResult<()> {
        let mut capture = self.capture.lock();
        if capture.is_some() {
            return Err(EngineError::capture("a capture process is already running"));
        }

        let args = capture_args(&self.source, config);
        tracing::debug!(?args, "Spawning ffmpeg capture");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::capture(format!("Failed to start ffmpeg: {e}")))?;

        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut output = String::new();
                if let Err(err) = stderr.read_to_string(&mut output) {
                    output.push_str(&format!("<failed to read ffmpeg stderr: {err}>"));
                }
                output
            })
        });

        // Input errors (bad display, missing device) make ffmpeg exit within
        // the grace period. Anything later surfaces at finalize.
        match wait_for_early_exit(&mut child, STARTUP_GRACE) {
            Ok(Some(status)) => {
                let stderr = join_stderr(stderr_task);
                return Err(EngineError::capture(format!(
                    "ffmpeg exited immediately ({status}): {}",
                    stderr.trim()
                )));
            }
            Ok(None) => {}
            Err(e) => {
                reap(&mut child);
                join_stderr(stderr_task);
                return Err(EngineError::capture(format!("Failed to poll ffmpeg: {e}")));
            }
        }

        tracing::info!(pid = child.id(), output = %config.output_path.display(), "ffmpeg capture started");
        *capture = Some(CaptureProcess {
            child,
            output_path: config.output_path.clone(),
            stderr_task,
        });
        Ok(())
    }

    fn end_capture(&self, _handle: &EngineHandle) -> EngineResult<()> {
        let Some(mut process) = self.capture.lock().take() else {
            return Err(EngineError::finalize("no capture process is running"));
        };

        if let Some(mut stdin) = process.child.stdin.take() {
            if let Err(e) = stdin.write_all(b"q") {
                tracing::warn!(error = %e, "Failed to send quit to ffmpeg");
            }
        }

        let status = match process.child.wait() {
            Ok(status) => status,
            Err(e) => {
                reap(&mut process.child);
                join_stderr(process.stderr_task.take());
                return Err(EngineError::finalize(format!("Failed to wait on ffmpeg: {e}")));
            }
        };
        let stderr = join_stderr(process.stderr_task.take());

        if !status.success() {
            return Err(EngineError::finalize(format!(
                "ffmpeg exited with {status}: {}",
                stderr.trim()
            )));
        }
        if !process.output_path.exists() {
            return Err(EngineError::finalize(format!(
                "ffmpeg produced no file at {}",
                process.output_path.display()
            )));
        }

        tracing::info!(output = %process.output_path.display(), "ffmpeg capture finalized");
        Ok(())
    }

    fn stop(&self, _handle: EngineHandle) -> EngineResult<()> {
        if let Some(mut process) = self.capture.lock().take() {
            tracing::warn!(pid = process.child.id(), "Killing orphaned ffmpeg capture");
            let killed = process.child.kill();
            if let Err(e) = process.child.wait() {
                tracing::warn!(error = %e, "Failed to reap ffmpeg");
            }
            join_stderr(process.stderr_task.take());
            killed.map_err(|e| EngineError::stop(format!("Failed to kill ffmpeg: {e}")))?;
        }
        Ok(())
    }
}

/// Poll `child` for up to `grace`, returning its status if it exited.
fn wait_for_early_exit(child: &mut Child, grace: Duration) -> std::io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
}

/// Kill and wait on a child whose state is unknown.
fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::debug!(error = %e, "ffmpeg already exited");
    }
    if let Err(e) = child.wait() {
        tracing::warn!(error = %e, "Failed to reap ffmpeg");
    }
}

/// Desktop size from gdigrab's `Capturing whole desktop as 2560x1440@(0,0)`
/// log line.
pub fn parse_gdigrab_desktop(log: &str) -> Option<(u32, u32, i32, i32)> {
    let rest = log
        .lines()
        .find_map(|line| line.split_once("Capturing whole desktop as "))?
        .1;
    let (size, origin) = rest.trim().split_once('@')?;
    let (width, height) = size.split_once('x')?;
    let (x, y) = origin
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split_once(',')?;
    Some((
        width.parse().ok()?,
        height.parse().ok()?,
        x.trim().parse().ok()?,
        y.trim().parse().ok()?,
    ))
}

fn join_stderr(task: Option<JoinHandle<String>>) -> String {
    task.map(|t| {
        t.join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
    })
    .unwrap_or_default()
}

/// Extract the version from the first line of `ffmpeg -version`
/// (`ffmpeg version 6.1.1-3ubuntu5 Copyright ...`).
pub fn parse_version(output: &str) -> Option<String> {
    let first = output.lines().next()?;
    let mut words = first.split_whitespace();
    if words.next()? != "ffmpeg" || words.next()? != "version" {
        return None;
    }
    words.next().map(str::to_string)
}

/// Build the ffmpeg argument list for a recording.
pub fn capture_args(source: &GrabSource, config: &RecordingConfig) -> Vec<String> {
    let display = &config.display;
    let fps = config.fps.to_string();

    let mut args: Vec<String> = ["-hide_banner", "-nostats", "-loglevel", "error", "-y"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    match source {
        GrabSource::X11 { display: x_display } => {
            args.extend([
                "-f".to_string(),
                "x11grab".to_string(),
                "-framerate".to_string(),
                fps,
                "-video_size".to_string(),
                display.bounds(),
                "-i".to_string(),
                format!("{x_display}+{},{}", display.x, display.y),
            ]);
        }
        GrabSource::AvFoundation => {
            args.extend([
                "-f".to_string(),
                "avfoundation".to_string(),
                "-framerate".to_string(),
                fps,
                "-capture_cursor".to_string(),
                "1".to_string(),
                "-i".to_string(),
                format!("{}:none", display.id),
            ]);
        }
        GrabSource::GdiGrab => {
            args.extend([
                "-f".to_string(),
                "gdigrab".to_string(),
                "-framerate".to_string(),
                fps,
                "-i".to_string(),
                display.id.to_string(),
            ]);
        }
    }

    // gdigrab's desktop size may be a guess, so pin the output size.
    if config.needs_scaling() || *source == GrabSource::GdiGrab {
        args.push("-vf".to_string());
        args.push(format!("scale={}:{}", config.width, config.height));
    }

    args.extend(
        ["-c:v", "libx264", "-preset", "veryfast", "-pix_fmt", "yuv420p"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(config.output_path.display().to_string());
    args
}
