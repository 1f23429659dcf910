//! Engine settings
//!
//! Scoring knobs and per-mode curve selection. Serialized alongside the
//! tuning tables in a `LayoutConfig`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::consts::LANDMARK_SIGNAL_THRESHOLD;
use crate::error::{LayoutError, Result};
use crate::platform::Mode;

/// Named family of quota curves
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CurveSet {
    #[default]
    Standard,
    /// Sparser scene used behind overlays
    Muted,
}

impl CurveSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveSet::Standard => "standard",
            CurveSet::Muted => "muted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "default" => Some(CurveSet::Standard),
            "muted" => Some(CurveSet::Muted),
            _ => None,
        }
    }
}

/// Scoring presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScatterPreset {
    /// Strong pull to the centre, little jitter
    Tight,
    #[default]
    Balanced,
    /// Weak centre pull, more jitter
    Loose,
}

impl ScatterPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScatterPreset::Tight => "tight",
            ScatterPreset::Balanced => "balanced",
            ScatterPreset::Loose => "loose",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tight" => Some(ScatterPreset::Tight),
            "balanced" | "default" => Some(ScatterPreset::Balanced),
            "loose" => Some(ScatterPreset::Loose),
            _ => None,
        }
    }

    pub fn center_bias(&self) -> f64 {
        match self {
            ScatterPreset::Tight => 0.08,
            ScatterPreset::Balanced => 0.02,
            ScatterPreset::Loose => 0.005,
        }
    }

    pub fn jitter_amplitude(&self) -> f64 {
        match self {
            ScatterPreset::Tight => 0.1,
            ScatterPreset::Balanced => 0.35,
            ScatterPreset::Loose => 1.5,
        }
    }

    pub fn separation_weight(&self) -> f64 {
        match self {
            ScatterPreset::Tight => 1.0,
            ScatterPreset::Balanced => 4.0,
            ScatterPreset::Loose => 6.0,
        }
    }
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Preset the scoring knobs were last derived from
    pub preset: ScatterPreset,

    // === Scoring ===
    /// Weight of the squared distance to the grid centre (ignored in overlay)
    pub center_bias: f64,
    /// Weight of the quadratic same-group crowding penalty
    pub separation_weight: f64,
    /// Peak-to-peak size of the hash jitter
    pub jitter_amplitude: f64,

    // === Invariants ===
    /// At or below this signal a landmark must be on screen
    pub landmark_signal_threshold: f64,

    // === Curves ===
    /// Curve set per mode (missing modes use `Standard`)
    pub curve_sets: BTreeMap<Mode, CurveSet>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let preset = ScatterPreset::Balanced;
        Self {
            preset,
            center_bias: preset.center_bias(),
            separation_weight: preset.separation_weight(),
            jitter_amplitude: preset.jitter_amplitude(),
            landmark_signal_threshold: LANDMARK_SIGNAL_THRESHOLD,
            curve_sets: BTreeMap::from([
                (Mode::Start, CurveSet::Standard),
                (Mode::Questionnaire, CurveSet::Standard),
                (Mode::Overlay, CurveSet::Muted),
            ]),
        }
    }
}

impl EngineSettings {
    /// Create settings from a scoring preset
    pub fn from_preset(preset: ScatterPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Overwrite the scoring knobs with a preset's values
    pub fn apply_preset(&mut self, preset: ScatterPreset) {
        self.preset = preset;
        self.center_bias = preset.center_bias();
        self.jitter_amplitude = preset.jitter_amplitude();
        self.separation_weight = preset.separation_weight();
    }

    pub fn curve_set_for(&self, mode: Mode) -> CurveSet {
        self.curve_sets.get(&mode).copied().unwrap_or_default()
    }

    /// Centre bias actually applied (overlay spreads freely)
    pub fn effective_center_bias(&self, mode: Mode) -> f64 {
        if mode == Mode::Overlay {
            0.0
        } else {
            self.center_bias
        }
    }

    pub fn validate(&self) -> Result<()> {
        let knobs = [
            ("center_bias", self.center_bias),
            ("separation_weight", self.separation_weight),
            ("jitter_amplitude", self.jitter_amplitude),
        ];
        for (name, value) in knobs {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::Settings(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.landmark_signal_threshold) {
            return Err(LayoutError::Settings(format!(
                "landmark_signal_threshold must be within 0..=1, got {}",
                self.landmark_signal_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let settings = EngineSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.curve_set_for(Mode::Overlay), CurveSet::Muted);
        assert_eq!(settings.curve_set_for(Mode::Start), CurveSet::Standard);
    }

    #[test]
    fn test_overlay_disables_center_bias() {
        let settings = EngineSettings::default();
        assert_eq!(settings.effective_center_bias(Mode::Overlay), 0.0);
        assert!(settings.effective_center_bias(Mode::Start) > 0.0);
    }

    #[test]
    fn test_apply_preset() {
        let mut settings = EngineSettings::default();
        settings.apply_preset(ScatterPreset::Loose);
        assert_eq!(settings.preset, ScatterPreset::Loose);
        assert_eq!(settings.jitter_amplitude, ScatterPreset::Loose.jitter_amplitude());
        assert_eq!(EngineSettings::from_preset(ScatterPreset::Loose), settings);
    }

    #[test]
    fn test_missing_mode_uses_standard() {
        let mut settings = EngineSettings::default();
        settings.curve_sets.clear();
        assert_eq!(settings.curve_set_for(Mode::Overlay), CurveSet::Standard);
    }

    #[test]
    fn test_validate_rejects_bad_knobs() {
        let mut settings = EngineSettings::default();
        settings.jitter_amplitude = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = EngineSettings::default();
        settings.landmark_signal_threshold = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_preset_strings() {
        for preset in [ScatterPreset::Tight, ScatterPreset::Balanced, ScatterPreset::Loose] {
            assert_eq!(ScatterPreset::from_str(preset.as_str()), Some(preset));
        }
        assert_eq!(CurveSet::from_str("DEFAULT"), Some(CurveSet::Standard));
    }
}
