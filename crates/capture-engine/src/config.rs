//! Recording requests and their validated, fully-resolved form.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use obscap_common::config::{DisplayPolicy, RecordingDefaults};
use obscap_common::error::ConfigError;
use obscap_platform_core::{DisplayDescriptor, DisplayId};
use serde::{Deserialize, Serialize};

/// Highest accepted frame rate.
pub const MAX_FPS: u32 = 240;

/// Highest accepted output width or height, in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

/// What the caller asks for. Absent fields are filled from
/// [`RecordingDefaults`] and the selected display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingRequest {
    /// File the engine writes to.
    pub output_path: PathBuf,

    /// Display to capture.
    pub display_id: Option<DisplayId>,

    /// Output width in pixels.
    pub width: Option<u32>,

    /// Output height in pixels.
    pub height: Option<u32>,

    /// Target frame rate.
    pub fps: Option<u32>,
}

impl RecordingRequest {
    /// A request with only an output path; everything else defaulted.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            display_id: None,
            width: None,
            height: None,
            fps: None,
        }
    }

    pub fn with_display(mut self, id: impl Into<DisplayId>) -> Self {
        self.display_id = Some(id.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Checks that need no engine: output path and explicit numbers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_output_writable(&self.output_path)?;
        if let Some(width) = self.width {
            check_dimension("width", width)?;
        }
        if let Some(height) = self.height {
            check_dimension("height", height)?;
        }
        if let Some(fps) = self.fps {
            check_fps(fps)?;
        }
        Ok(())
    }
}

/// A validated recording configuration handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub output_path: PathBuf,
    pub display: DisplayDescriptor,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl RecordingConfig {
    /// Combine a request, the configured defaults and the selected display.
    pub fn resolve(
        request: &RecordingRequest,
        defaults: &RecordingDefaults,
        display: DisplayDescriptor,
    ) -> Result<Self, ConfigError> {
        request.validate()?;

        let width = request
            .width
            .or(defaults.width)
            .unwrap_or(display.width);
        let height = request
            .height
            .or(defaults.height)
            .unwrap_or(display.height);
        let fps = request.fps.unwrap_or(defaults.fps);

        check_dimension("width", width)?;
        check_dimension("height", height)?;
        check_fps(fps)?;

        Ok(Self {
            output_path: request.output_path.clone(),
            display,
            width,
            height,
            fps,
        })
    }

    pub fn display_id(&self) -> &DisplayId {
        &self.display.id
    }

    /// Whether the output size differs from the captured display.
    pub fn needs_scaling(&self) -> bool {
        self.width != self.display.width || self.height != self.display.height
    }
}

/// Pick the display a request refers to from a fresh enumeration.
pub fn select_display(
    requested: Option<&DisplayId>,
    policy: DisplayPolicy,
    displays: &[DisplayDescriptor],
) -> Result<DisplayDescriptor, ConfigError> {
    match requested {
        Some(id) => displays.iter().find(|d| &d.id == id).cloned().ok_or_else(|| {
            ConfigError::invalid(
                "display_id",
                format!(
                    "display {id} not found (available: {})",
                    display_list_for_error(displays)
                ),
            )
        }),
        None => match policy {
            DisplayPolicy::FirstEnumerated => displays
                .first()
                .cloned()
                .ok_or_else(|| ConfigError::invalid("display_id", "no displays available")),
            DisplayPolicy::Require => Err(ConfigError::invalid(
                "display_id",
                "a display must be selected explicitly",
            )),
        },
    }
}

fn display_list_for_error(displays: &[DisplayDescriptor]) -> String {
    if displays.is_empty() {
        return "none".to_string();
    }
    displays
        .iter()
        .map(|d| format!("{} ({})", d.id, d.label))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_dimension(field: &str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "must be positive"));
    }
    if value > MAX_DIMENSION {
        return Err(ConfigError::invalid(
            field,
            format!("{value} exceeds maximum of {MAX_DIMENSION}"),
        ));
    }
    Ok(())
}

fn check_fps(fps: u32) -> Result<(), ConfigError> {
    if fps == 0 {
        return Err(ConfigError::invalid("fps", "must be positive"));
    }
    if fps > MAX_FPS {
        return Err(ConfigError::invalid(
            "fps",
            format!("{fps} exceeds maximum of {MAX_FPS}"),
        ));
    }
    Ok(())
}

/// The output file must be creatable by the current user. The path is
/// opened for writing; a file created only for the check is removed again
/// and an existing file is left untouched.
pub fn check_output_writable(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid("output_path", "path is empty"));
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    match std::fs::metadata(parent) {
        Ok(meta) if !meta.is_dir() => {
            return Err(ConfigError::invalid(
                "output_path",
                format!("{} is not a directory", parent.display()),
            ))
        }
        Ok(_) => {}
        Err(e) => {
            return Err(ConfigError::invalid(
                "output_path",
                format!("directory {} is not accessible: {e}", parent.display()),
            ))
        }
    }

    // symlink_metadata so a dangling link counts as existing and is never
    // replaced by a fresh file.
    let existed = std::fs::symlink_metadata(path).is_ok();
    if existed && path.is_dir() {
        return Err(ConfigError::invalid(
            "output_path",
            format!("{} is a directory", path.display()),
        ));
    }

    let opened = if existed {
        OpenOptions::new().write(true).open(path)
    } else {
        OpenOptions::new().write(true).create_new(true).open(path)
    };
    match opened {
        Ok(file) => {
            drop(file);
            if !existed {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove write check file");
                }
            }
            Ok(())
        }
        Err(e) => Err(ConfigError::invalid(
            "output_path",
            format!("{} is not writable: {e}", path.display()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(idx: u32, width: u32, height: u32) -> DisplayDescriptor {
        DisplayDescriptor {
            id: DisplayId::Index(idx),
            label: format!("Display {idx}"),
            width,
            height,
            x: 0,
            y: 0,
            primary: idx == 0,
        }
    }

    fn writable_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(name)
    }

    #[test]
    fn missing_fields_come_from_display_and_defaults() {
        let request = RecordingRequest::new(writable_path("obscap-defaults.mp4"));
        let config =
            RecordingConfig::resolve(&request, &RecordingDefaults::default(), display(0, 2560, 1440))
                .unwrap();

        assert_eq!((config.width, config.height), (2560, 1440));
        assert_eq!(config.fps, 30);
        assert_eq!(config.display_id(), &DisplayId::Index(0));
        assert!(!config.needs_scaling());
    }

    #[test]
    fn explicit_fields_win_over_defaults() {
        let defaults = RecordingDefaults {
            width: Some(1280),
            height: Some(720),
            fps: 60,
            ..RecordingDefaults::default()
        };
        let request = RecordingRequest::new(writable_path("obscap-explicit.mp4"))
            .with_size(640, 480)
            .with_fps(24);
        let config = RecordingConfig::resolve(&request, &defaults, display(0, 1920, 1080)).unwrap();

        assert_eq!((config.width, config.height, config.fps), (640, 480, 24));
        assert!(config.needs_scaling());
    }

    #[test]
    fn zero_values_are_rejected() {
        let base = RecordingRequest::new(writable_path("obscap-zero.mp4"));
        for (request, field) in [
            (base.clone().with_fps(0), "fps"),
            (base.clone().with_size(0, 480), "width"),
            (base.clone().with_size(640, 0), "height"),
        ] {
            let err = request.validate().unwrap_err();
            assert_eq!(err.field(), field);
        }
    }

    #[test]
    fn zero_default_fps_is_rejected_at_resolve() {
        let defaults = RecordingDefaults {
            fps: 0,
            ..RecordingDefaults::default()
        };
        let request = RecordingRequest::new(writable_path("obscap-zero-default.mp4"));
        let err = RecordingConfig::resolve(&request, &defaults, display(0, 1920, 1080)).unwrap_err();
        assert_eq!(err.field(), "fps");
    }

    #[test]
    fn limits_are_enforced() {
        let base = RecordingRequest::new(writable_path("obscap-limits.mp4"));
        assert!(base.clone().with_fps(MAX_FPS).validate().is_ok());
        assert!(base.clone().with_fps(MAX_FPS + 1).validate().is_err());
        assert!(base.with_size(MAX_DIMENSION + 1, 10).validate().is_err());
    }

    #[test]
    fn output_path_must_be_in_existing_directory() {
        let err = check_output_writable(Path::new("/obscap-no-such-dir/out/t.mp4")).unwrap_err();
        assert_eq!(err.field(), "output_path");

        let err = check_output_writable(Path::new("")).unwrap_err();
        assert_eq!(err.field(), "output_path");

        let err = check_output_writable(&std::env::temp_dir()).unwrap_err();
        assert_eq!(err.field(), "output_path");

        assert!(check_output_writable(&writable_path("obscap-ok.mp4")).is_ok());
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn write_check_leaves_no_trace() {
        let dir = scratch_dir("obscap-write-check");

        let fresh = dir.join("fresh.mp4");
        check_output_writable(&fresh).unwrap();
        assert!(!fresh.exists());

        let existing = dir.join("existing.mp4");
        std::fs::write(&existing, b"keep me").unwrap();
        check_output_writable(&existing).unwrap();
        assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn unopenable_path_in_writable_directory_is_rejected() {
        // The directory's mode bits allow writing, but the path cannot be
        // opened: it is a link into a directory that does not exist.
        let dir = scratch_dir("obscap-dangling");
        let link = dir.join("out.mp4");
        std::os::unix::fs::symlink("/obscap-no-such-dir/out.mp4", &link).unwrap();

        let err = check_output_writable(&link).unwrap_err();
        assert_eq!(err.field(), "output_path");
        assert!(std::fs::symlink_metadata(&link).is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn read_only_directory_is_rejected_unless_privileged() {
        use std::os::unix::fs::PermissionsExt;

        let dir = scratch_dir("obscap-ro-dir");
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Root bypasses mode bits, so only compare against what the OS allows.
        let target = dir.join("out.mp4");
        let os_allows = std::fs::File::create(&target).is_ok();
        let _ = std::fs::remove_file(&target);

        assert_eq!(check_output_writable(&target).is_ok(), os_allows);
        assert!(!target.exists());

        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn first_enumerated_policy_takes_first_display() {
        let displays = vec![display(3, 1920, 1080), display(4, 1280, 1024)];
        let picked = select_display(None, DisplayPolicy::FirstEnumerated, &displays).unwrap();
        assert_eq!(picked.id, DisplayId::Index(3));
    }

    #[test]
    fn require_policy_rejects_missing_display() {
        let displays = vec![display(0, 1920, 1080)];
        let err = select_display(None, DisplayPolicy::Require, &displays).unwrap_err();
        assert_eq!(err.field(), "display_id");
    }

    #[test]
    fn unknown_display_is_rejected() {
        let displays = vec![display(0, 1920, 1080)];
        let err = select_display(
            Some(&DisplayId::Name("HDMI-9".to_string())),
            DisplayPolicy::FirstEnumerated,
            &displays,
        )
        .unwrap_err();
        assert!(err.to_string().contains("HDMI-9"));
        assert!(err.to_string().contains("0 (Display 0)"));
    }

    #[test]
    fn empty_enumeration_is_rejected() {
        let err = select_display(None, DisplayPolicy::FirstEnumerated, &[]).unwrap_err();
        assert_eq!(err.field(), "display_id");
    }
}
