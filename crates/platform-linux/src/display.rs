//! Display server detection and monitor enumeration.

use std::process::Command;

use obscap_common::error::{ObscapError, ObscapResult};
use obscap_platform_core::{DisplayDescriptor, DisplayId, DisplayServer};

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var("WAYLAND_DISPLAY").is_ok() {
        DisplayServer::Wayland
    } else if std::env::var("DISPLAY").is_ok() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

/// The X11 display name to capture from (`$DISPLAY`, default `:0`).
pub fn x11_display_name() -> String {
    std::env::var("DISPLAY").unwrap_or_else(|_| ":0".to_string())
}

/// Enumerate connected monitors via `xrandr --listmonitors`.
pub fn detect_displays() -> ObscapResult<Vec<DisplayDescriptor>> {
    tracing::debug!("Detecting monitors via xrandr");

    let output = Command::new("xrandr")
        .arg("--listmonitors")
        .output()
        .map_err(|e| ObscapError::platform(format!("Failed to run xrandr: {e}")))?;

    if !output.status.success() {
        return Err(ObscapError::platform(format!(
            "xrandr exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let displays = parse_xrandr_monitors(&String::from_utf8_lossy(&output.stdout));
    if displays.is_empty() {
        return Err(ObscapError::platform("xrandr reported no monitors"));
    }
    Ok(displays)
}

/// Fallback used when monitors cannot be enumerated.
pub fn default_display() -> DisplayDescriptor {
    DisplayDescriptor {
        id: DisplayId::Index(0),
        label: "default".to_string(),
        width: 1920,
        height: 1080,
        x: 0,
        y: 0,
        primary: true,
    }
}

/// Parse the output of `xrandr --listmonitors`.
///
/// ```text
/// Monitors: 2
///  0: +*DP-1 2560/597x1440/336+0+0  DP-1
///  1: +HDMI-1 1920/527x1080/296+2560+0  HDMI-1
/// ```
///
/// Lines that do not match are skipped.
pub fn parse_xrandr_monitors(output: &str) -> Vec<DisplayDescriptor> {
    output.lines().filter_map(parse_monitor_line).collect()
}

fn parse_monitor_line(line: &str) -> Option<DisplayDescriptor> {
    let (index, rest) = line.trim().split_once(':')?;
    let index: u32 = index.trim().parse().ok()?;

    let mut fields = rest.split_whitespace();
    let flagged_name = fields.next()?;
    let geometry = fields.next()?;

    let name = flagged_name.trim_start_matches(['+', '*']);
    let primary = flagged_name.contains('*');
    let (width, height, x, y) = parse_geometry(geometry)?;

    Some(DisplayDescriptor {
        id: DisplayId::Index(index),
        label: name.to_string(),
        width,
        height,
        x,
        y,
        primary,
    })
}

/// Parse `W/mmxH/mm+X+Y` into pixel size and offset.
fn parse_geometry(geometry: &str) -> Option<(u32, u32, i32, i32)> {
    let (w_part, rest) = geometry.split_once('x')?;
    let width = w_part.split('/').next()?.parse().ok()?;

    let offset_start = rest.find('+')?;
    let (h_part, offsets) = rest.split_at(offset_start);
    let height = h_part.split('/').next()?.parse().ok()?;

    let (x, y) = parse_offsets(offsets)?;
    Some((width, height, x, y))
}

/// Parse `+X+Y`; either coordinate may be negative (`+-1920+0`).
fn parse_offsets(offsets: &str) -> Option<(i32, i32)> {
    let rest = offsets.strip_prefix('+')?;
    let split = rest.get(1..)?.find('+')? + 1;
    let x = rest[..split].parse().ok()?;
    let y = rest[split + 1..].parse().ok()?;
    Some((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUAL_HEAD: &str = "Monitors: 2
 0: +*DP-1 2560/597x1440/336+0+0  DP-1
 1: +HDMI-1 1920/527x1080/296+2560+0  HDMI-1
";

    #[test]
    fn parses_dual_head_layout() {
        let displays = parse_xrandr_monitors(DUAL_HEAD);
        assert_eq!(displays.len(), 2);

        assert_eq!(displays[0].id, DisplayId::Index(0));
        assert_eq!(displays[0].label, "DP-1");
        assert_eq!((displays[0].width, displays[0].height), (2560, 1440));
        assert!(displays[0].primary);

        assert_eq!(displays[1].label, "HDMI-1");
        assert_eq!((displays[1].x, displays[1].y), (2560, 0));
        assert!(!displays[1].primary);
    }

    #[test]
    fn parses_negative_offsets() {
        let displays = parse_xrandr_monitors(" 0: +eDP-1 1920/344x1200/215+-1920+-120  eDP-1");
        assert_eq!(displays.len(), 1);
        assert_eq!((displays[0].x, displays[0].y), (-1920, -120));
        assert_eq!(displays[0].height, 1200);
    }

    #[test]
    fn skips_header_and_garbage() {
        let displays = parse_xrandr_monitors("Monitors: 0\nnot a monitor line\n 7: broken");
        assert!(displays.is_empty());
    }

    #[test]
    fn default_display_is_primary() {
        let display = default_display();
        assert!(display.primary);
        assert_eq!(display.bounds(), "1920x1080");
    }
}
