//! Platform abstraction layer
//!
//! Handles the responsive-viewport side of the engine:
//! - Device class from viewport width
//! - Mode from the page's UI flags
//! - Horizontal screen zones for placed items
//!
//! The `web` submodule carries the `wasm32` bindings.

#[cfg(target_arch = "wasm32")]
pub mod web;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::{MEDIUM_MAX_WIDTH, SMALL_MAX_WIDTH};

/// Responsive breakpoint bucket
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Small,
    Medium,
    #[default]
    Large,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 3] = [DeviceClass::Small, DeviceClass::Medium, DeviceClass::Large];

    /// Classify a viewport width (device-independent pixels)
    pub fn from_width(width: f64) -> Self {
        if width <= SMALL_MAX_WIDTH {
            DeviceClass::Small
        } else if width <= MEDIUM_MAX_WIDTH {
            DeviceClass::Medium
        } else {
            DeviceClass::Large
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Small => "small",
            DeviceClass::Medium => "medium",
            DeviceClass::Large => "large",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "small" | "mobile" => Some(DeviceClass::Small),
            "medium" | "tablet" => Some(DeviceClass::Medium),
            "large" | "desktop" => Some(DeviceClass::Large),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page mode: selects grid geometry, placement bands and quota curves
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Start,
    Questionnaire,
    Overlay,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Start, Mode::Questionnaire, Mode::Overlay];

    /// Overlay wins over an open questionnaire
    pub fn from_flags(flags: ModeFlags) -> Self {
        if flags.overlay {
            Mode::Overlay
        } else if flags.questionnaire_open {
            Mode::Questionnaire
        } else {
            Mode::Start
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Start => "start",
            Mode::Questionnaire => "questionnaire",
            Mode::Overlay => "overlay",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "start" => Some(Mode::Start),
            "questionnaire" | "survey" => Some(Mode::Questionnaire),
            "overlay" => Some(Mode::Overlay),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw UI flags as reported by the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeFlags {
    pub questionnaire_open: bool,
    pub overlay: bool,
}

/// Viewport size in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Zero-area, negative or non-finite viewports cannot host a grid
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }

    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::from_width(self.width)
    }
}

/// Horizontal screen zone of a placed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenZone {
    Left,
    Mid,
    Right,
}

/// Percentage thresholds splitting the viewport into left / mid / right
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneThresholds {
    /// x below this fraction of the width is `Left`
    pub left: f64,
    /// x above this fraction of the width is `Right`
    pub right: f64,
}

impl ZoneThresholds {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// Left is tested before right, so `left > right` leaves no room for `Mid`.
    pub fn mid_reachable(&self) -> bool {
        self.left <= self.right
    }

    pub fn classify(&self, x: f32, viewport_width: f64) -> ScreenZone {
        if viewport_width <= 0.0 {
            return ScreenZone::Mid;
        }
        let frac = x as f64 / viewport_width;
        if frac < self.left {
            ScreenZone::Left
        } else if frac > self.right {
            ScreenZone::Right
        } else {
            ScreenZone::Mid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_breakpoints() {
        assert_eq!(DeviceClass::from_width(320.0), DeviceClass::Small);
        assert_eq!(DeviceClass::from_width(767.0), DeviceClass::Small);
        assert_eq!(DeviceClass::from_width(767.5), DeviceClass::Medium);
        assert_eq!(DeviceClass::from_width(1024.0), DeviceClass::Medium);
        assert_eq!(DeviceClass::from_width(1025.0), DeviceClass::Large);
    }

    #[test]
    fn test_mode_from_flags() {
        let flags = |questionnaire_open, overlay| ModeFlags {
            questionnaire_open,
            overlay,
        };
        assert_eq!(Mode::from_flags(flags(false, false)), Mode::Start);
        assert_eq!(Mode::from_flags(flags(true, false)), Mode::Questionnaire);
        assert_eq!(Mode::from_flags(flags(false, true)), Mode::Overlay);
        assert_eq!(Mode::from_flags(flags(true, true)), Mode::Overlay);
    }

    #[test]
    fn test_degenerate_viewport() {
        assert!(Viewport::new(0.0, 600.0).is_degenerate());
        assert!(Viewport::new(800.0, -1.0).is_degenerate());
        assert!(Viewport::new(f64::NAN, 600.0).is_degenerate());
        assert!(!Viewport::new(800.0, 600.0).is_degenerate());
    }

    #[test]
    fn test_zone_classification() {
        let zones = ZoneThresholds::new(0.3, 0.7);
        assert!(zones.mid_reachable());
        assert_eq!(zones.classify(100.0, 1000.0), ScreenZone::Left);
        assert_eq!(zones.classify(500.0, 1000.0), ScreenZone::Mid);
        assert_eq!(zones.classify(900.0, 1000.0), ScreenZone::Right);
    }

    #[test]
    fn test_inverted_thresholds_never_yield_mid() {
        let zones = ZoneThresholds::new(0.6, 0.4);
        assert!(!zones.mid_reachable());
        for x in (0..=1000).step_by(25) {
            assert_ne!(zones.classify(x as f32, 1000.0), ScreenZone::Mid);
        }
    }

    #[test]
    fn test_enum_strings() {
        for device in DeviceClass::ALL {
            assert_eq!(DeviceClass::from_str(device.as_str()), Some(device));
        }
        for mode in Mode::ALL {
            assert_eq!(Mode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(Mode::from_str("Survey"), Some(Mode::Questionnaire));
        assert_eq!(DeviceClass::from_str("watch"), None);
    }
}
