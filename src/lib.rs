//! Scene Layout - deterministic procedural scene composition
//!
//! Core modules:
//! - `layout`: Deterministic composition (quotas, reallocation, placement)
//! - `engine`: Validated engine, geometry cache and per-target scenes
//! - `platform`: Viewport classification and browser bindings
//! - `tuning`: Data-driven layout tables
//! - `settings`: Scoring knobs and presets

pub mod engine;
pub mod error;
pub mod layout;
pub mod platform;
pub mod settings;
pub mod tuning;

pub use engine::{GeometryCache, MountedScene, SceneContext, SceneEngine};
pub use error::{LayoutError, Result};
pub use layout::{Category, ComposeRequest, Composition, PlacedItem, PoolItem, Variant};
pub use platform::{DeviceClass, Mode, ModeFlags, Viewport};
pub use settings::{EngineSettings, ScatterPreset};
pub use tuning::LayoutConfig;

/// Layout configuration constants
pub mod consts {
    /// Widest viewport (inclusive) classified as small
    pub const SMALL_MAX_WIDTH: f64 = 767.0;
    /// Widest viewport (inclusive) classified as medium
    pub const MEDIUM_MAX_WIDTH: f64 = 1024.0;

    /// At or below this signal the landmark must be placed
    pub const LANDMARK_SIGNAL_THRESHOLD: f64 = 0.02;
}

/// Clamp a control signal to [0, 1] (NaN counts as 0)
#[inline]
pub fn clamp_signal(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_signal() {
        assert_eq!(clamp_signal(0.25), 0.25);
        assert_eq!(clamp_signal(-1.0), 0.0);
        assert_eq!(clamp_signal(3.0), 1.0);
        assert_eq!(clamp_signal(f64::NAN), 0.0);
        assert_eq!(clamp_signal(f64::INFINITY), 1.0);
    }
}
