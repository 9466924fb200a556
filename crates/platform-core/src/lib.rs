//! obscap platform core contracts.
//!
//! This crate contains cross-platform display and permission data structures
//! used by the capture engine and platform crates without coupling to a
//! concrete OS backend.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a capturable display.
///
/// Engines identify displays either by position (`0`, `1`, ...) or by an
/// output name (`"DP-1"`, `"Capture screen 0"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayId {
    Index(u32),
    Name(String),
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(idx) => write!(f, "{idx}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for DisplayId {
    type Err = Infallible;

    /// Numeric strings become [`DisplayId::Index`], anything else a name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.parse::<u32>() {
            Ok(idx) => Self::Index(idx),
            Err(_) => Self::Name(trimmed.to_string()),
        })
    }
}

impl From<u32> for DisplayId {
    fn from(idx: u32) -> Self {
        Self::Index(idx)
    }
}

impl From<&str> for DisplayId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Snapshot of one capturable display as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayDescriptor {
    /// Engine identifier.
    pub id: DisplayId,
    /// Human-readable name.
    pub label: String,
    /// Resolution in physical pixels.
    pub width: u32,
    pub height: u32,
    /// Position in the virtual desktop (pixels).
    pub x: i32,
    pub y: i32,
    /// Whether this display is primary.
    pub primary: bool,
}

impl DisplayDescriptor {
    /// Bounds formatted as `WIDTHxHEIGHT`.
    pub fn bounds(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Screen-recording permission as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    NotDetermined,
    /// The platform has no screen-recording permission model.
    NotApplicable,
}

impl PermissionStatus {
    /// Whether capture may proceed under this status.
    pub fn allows_capture(self) -> bool {
        matches!(self, Self::Granted | Self::NotApplicable)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::NotDetermined => "not determined",
            Self::NotApplicable => "not applicable",
        };
        f.write_str(label)
    }
}

/// Display server / platform family used for capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayServer {
    Wayland,
    X11,
    Windows,
    MacOS,
    #[default]
    Unknown,
}

/// Reorder displays so that primary displays come first.
///
/// The sort is stable: displays keep their engine-reported order otherwise.
pub fn order_primary_first(displays: &mut [DisplayDescriptor]) {
    displays.sort_by_key(|d| !d.primary);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(id: DisplayId, primary: bool) -> DisplayDescriptor {
        DisplayDescriptor {
            label: id.to_string(),
            id,
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
            primary,
        }
    }

    #[test]
    fn primary_display_moves_to_front_preserving_order() {
        let mut displays = vec![
            display(DisplayId::Index(0), false),
            display(DisplayId::Index(1), false),
            display(DisplayId::Index(2), true),
            display(DisplayId::Index(3), false),
        ];
        order_primary_first(&mut displays);

        let ids: Vec<_> = displays.iter().map(|d| d.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                DisplayId::Index(2),
                DisplayId::Index(0),
                DisplayId::Index(1),
                DisplayId::Index(3)
            ]
        );
    }

    #[test]
    fn display_id_parses_numbers_as_indices() {
        assert_eq!("0".parse::<DisplayId>(), Ok(DisplayId::Index(0)));
        assert_eq!(" 12 ".parse::<DisplayId>(), Ok(DisplayId::Index(12)));
        assert_eq!(
            "DP-1".parse::<DisplayId>(),
            Ok(DisplayId::Name("DP-1".to_string()))
        );
    }

    #[test]
    fn display_id_serializes_untagged() {
        let json = serde_json::to_string(&vec![DisplayId::Index(0), DisplayId::from("HDMI-1")])
            .unwrap();
        assert_eq!(json, r#"[0,"HDMI-1"]"#);
    }

    #[test]
    fn permission_gate() {
        assert!(PermissionStatus::Granted.allows_capture());
        assert!(PermissionStatus::NotApplicable.allows_capture());
        assert!(!PermissionStatus::Denied.allows_capture());
        assert!(!PermissionStatus::NotDetermined.allows_capture());
    }
}
