//! Screen-recording permission capability for real engines.

use obscap_platform_core::PermissionStatus;

use crate::engine::PermissionProbe;

/// macOS TCC screen-recording permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenRecordingPermission;

impl PermissionProbe for ScreenRecordingPermission {
    fn query(&self) -> PermissionStatus {
        obscap_platform_macos::screen_capture_permission()
    }

    fn request(&self) -> PermissionStatus {
        obscap_platform_macos::request_screen_capture_permission()
    }
}

/// The permission capability of the running platform, if it has one.
pub fn platform_permission_probe() -> Option<ScreenRecordingPermission> {
    if cfg!(target_os = "macos") {
        Some(ScreenRecordingPermission)
    } else {
        None
    }
}
