//! macOS platform integration.
//!
//! Screen recording on macOS is gated by the TCC "Screen Recording"
//! permission. CoreGraphics exposes a non-prompting preflight check and a
//! prompting request; both only report granted/not granted, so a negative
//! preflight is reported as [`PermissionStatus::NotDetermined`] until a
//! request has been answered.

use obscap_platform_core::{DisplayDescriptor, DisplayId, PermissionStatus};

/// Check the screen-recording permission without prompting.
pub fn screen_capture_permission() -> PermissionStatus {
    #[cfg(target_os = "macos")]
    {
        if coregraphics::has_permission() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::NotDetermined
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        PermissionStatus::NotApplicable
    }
}

/// Request the screen-recording permission.
///
/// The first call shows the system dialog; later calls return the recorded
/// answer without prompting.
pub fn request_screen_capture_permission() -> PermissionStatus {
    #[cfg(target_os = "macos")]
    {
        if coregraphics::request_permission() {
            PermissionStatus::Granted
        } else {
            tracing::warn!("Screen recording permission was not granted");
            PermissionStatus::Denied
        }
    }
    #[cfg(not(target_os = "macos"))]
    {
        PermissionStatus::NotApplicable
    }
}

/// Pixel bounds of the active displays, in CoreGraphics order.
pub fn active_display_bounds() -> Vec<(u32, u32)> {
    #[cfg(target_os = "macos")]
    {
        coregraphics::active_display_bounds()
    }
    #[cfg(not(target_os = "macos"))]
    {
        Vec::new()
    }
}

/// Parse the screen devices out of ffmpeg's avfoundation device listing
/// (`ffmpeg -f avfoundation -list_devices true -i ""`, printed on stderr).
///
/// ```text
/// [AVFoundation indev @ 0x7f] AVFoundation video devices:
/// [AVFoundation indev @ 0x7f] [0] FaceTime HD Camera
/// [AVFoundation indev @ 0x7f] [1] Capture screen 0
/// [AVFoundation indev @ 0x7f] AVFoundation audio devices:
/// ```
///
/// The display id is the avfoundation device index. `bounds` holds the
/// CoreGraphics sizes indexed by screen number; screens without a known
/// size fall back to 1920x1080. Screen 0 is the main display.
pub fn parse_avfoundation_screens(listing: &str, bounds: &[(u32, u32)]) -> Vec<DisplayDescriptor> {
    let mut in_video_section = false;
    let mut screens = Vec::new();

    for line in listing.lines() {
        if line.contains("AVFoundation video devices") {
            in_video_section = true;
            continue;
        }
        if line.contains("AVFoundation audio devices") {
            break;
        }
        if !in_video_section {
            continue;
        }

        let Some((index, name)) = parse_device_entry(line) else {
            continue;
        };
        let Some(screen_no) = name
            .strip_prefix("Capture screen ")
            .and_then(|n| n.trim().parse::<usize>().ok())
        else {
            continue;
        };

        let (width, height) = bounds.get(screen_no).copied().unwrap_or((1920, 1080));
        screens.push(DisplayDescriptor {
            id: DisplayId::Index(index),
            label: name.to_string(),
            width,
            height,
            x: 0,
            y: 0,
            primary: screen_no == 0,
        });
    }

    screens
}

/// Split `... [N] Device name` into `(N, "Device name")`.
fn parse_device_entry(line: &str) -> Option<(u32, &str)> {
    let after_prefix = line.split_once("] ")?.1;
    let rest = after_prefix.strip_prefix('[')?;
    let (index, name) = rest.split_once(']')?;
    Some((index.parse().ok()?, name.trim()))
}

#[cfg(target_os = "macos")]
mod coregraphics {
    pub fn has_permission() -> bool {
        unsafe { CGPreflightScreenCaptureAccess() }
    }

    pub fn request_permission() -> bool {
        unsafe { CGRequestScreenCaptureAccess() }
    }

    pub fn active_display_bounds() -> Vec<(u32, u32)> {
        const MAX_DISPLAYS: u32 = 16;
        let mut ids = [0u32; MAX_DISPLAYS as usize];
        let mut count = 0u32;

        let err = unsafe { CGGetActiveDisplayList(MAX_DISPLAYS, ids.as_mut_ptr(), &mut count) };
        if err != 0 {
            tracing::warn!(err, "CGGetActiveDisplayList failed");
            return Vec::new();
        }

        let main = unsafe { CGMainDisplayID() };
        let mut ordered: Vec<u32> = ids[..count as usize].to_vec();
        ordered.sort_by_key(|id| *id != main);

        ordered
            .into_iter()
            .map(|id| unsafe { (CGDisplayPixelsWide(id) as u32, CGDisplayPixelsHigh(id) as u32) })
            .collect()
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGRequestScreenCaptureAccess() -> bool;
        fn CGPreflightScreenCaptureAccess() -> bool;
        fn CGMainDisplayID() -> u32;
        fn CGGetActiveDisplayList(max: u32, displays: *mut u32, count: *mut u32) -> i32;
        fn CGDisplayPixelsWide(display: u32) -> usize;
        fn CGDisplayPixelsHigh(display: u32) -> usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
[AVFoundation indev @ 0x7fa] AVFoundation video devices:
[AVFoundation indev @ 0x7fa] [0] FaceTime HD Camera
[AVFoundation indev @ 0x7fa] [1] Capture screen 0
[AVFoundation indev @ 0x7fa] [2] Capture screen 1
[AVFoundation indev @ 0x7fa] AVFoundation audio devices:
[AVFoundation indev @ 0x7fa] [0] MacBook Pro Microphone
";

    #[test]
    fn screens_are_picked_from_video_section() {
        let screens = parse_avfoundation_screens(LISTING, &[(3024, 1964)]);
        assert_eq!(screens.len(), 2);

        assert_eq!(screens[0].id, DisplayId::Index(1));
        assert_eq!(screens[0].label, "Capture screen 0");
        assert_eq!((screens[0].width, screens[0].height), (3024, 1964));
        assert!(screens[0].primary);

        assert_eq!(screens[1].id, DisplayId::Index(2));
        assert_eq!((screens[1].width, screens[1].height), (1920, 1080));
        assert!(!screens[1].primary);
    }

    #[test]
    fn cameras_and_audio_devices_are_ignored() {
        let listing = "\
[AVFoundation indev @ 0x1] AVFoundation video devices:
[AVFoundation indev @ 0x1] [0] FaceTime HD Camera
[AVFoundation indev @ 0x1] AVFoundation audio devices:
[AVFoundation indev @ 0x1] [0] Capture screen 9
";
        assert!(parse_avfoundation_screens(listing, &[]).is_empty());
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn permission_is_not_applicable_off_macos() {
        assert_eq!(screen_capture_permission(), PermissionStatus::NotApplicable);
        assert_eq!(
            request_screen_capture_permission(),
            PermissionStatus::NotApplicable
        );
        assert!(active_display_bounds().is_empty());
    }

    #[cfg(target_os = "macos")]
    #[test]
    fn preflight_maps_to_granted_or_not_determined() {
        let expected = if coregraphics::has_permission() {
            PermissionStatus::Granted
        } else {
            PermissionStatus::NotDetermined
        };
        assert_eq!(screen_capture_permission(), expected);
    }
}
