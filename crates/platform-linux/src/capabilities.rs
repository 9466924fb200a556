//! Capability detection and guidance for Linux.
//!
//! Linux has no screen-recording permission prompt; what capture needs
//! instead is an X11 session and the external tools the engine drives.

use std::process::{Command, Stdio};

use obscap_platform_core::DisplayServer;

use crate::display::detect_display_server;

/// A system capability that obscap may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_x11_session(),
        check_ffmpeg(),
        check_xrandr(),
    ]
}

/// Whether every required capability is available.
pub fn all_required_available(capabilities: &[Capability]) -> bool {
    capabilities
        .iter()
        .filter(|c| c.required)
        .all(|c| c.available)
}

/// Whether `program` can be spawned and exits successfully with `arg`.
pub fn command_succeeds(program: &str, arg: &str) -> bool {
    Command::new(program)
        .arg(arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Check for an X11 (or XWayland) display to grab from.
fn check_x11_session() -> Capability {
    let server = detect_display_server();
    let has_x_display = std::env::var("DISPLAY").is_ok();

    let fix_instructions = match (server, has_x_display) {
        (_, true) => None,
        (DisplayServer::Wayland, false) => {
            Some("Enable XWayland or log into an X11 session".to_string())
        }
        _ => Some(
            "Ensure you are running a graphical desktop session with DISPLAY set".to_string(),
        ),
    };

    Capability {
        name: "X11 Display".to_string(),
        description: "X11 display server for x11grab screen capture".to_string(),
        available: has_x_display,
        required: true,
        fix_instructions,
    }
}

/// Check the ffmpeg binary used as the capture engine.
fn check_ffmpeg() -> Capability {
    let available = command_succeeds("ffmpeg", "-version");

    Capability {
        name: "FFmpeg".to_string(),
        description: "FFmpeg binary that performs capture and encoding".to_string(),
        available,
        required: true,
        fix_instructions: if !available {
            Some("Install FFmpeg: sudo apt install ffmpeg".to_string())
        } else {
            None
        },
    }
}

/// Check xrandr for monitor enumeration.
fn check_xrandr() -> Capability {
    let available = command_succeeds("xrandr", "--version");

    Capability {
        name: "xrandr".to_string(),
        description: "Monitor enumeration (falls back to a single default display)".to_string(),
        available,
        required: false,
        fix_instructions: if !available {
            Some("Install xrandr: sudo apt install x11-xserver-utils".to_string())
        } else {
            None
        },
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("obscap System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
