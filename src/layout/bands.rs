//! Placement bands
//!
//! Each variant may only be placed within a vertical slice of the usable
//! rows. Lookup order: mode override, then the per-device base table, then
//! a generic sky / ground default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::state::Variant;
use crate::platform::{DeviceClass, Mode};

/// Normalized `[top, bottom]` fractions of the usable rows
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub top: f64,
    pub bottom: f64,
}

impl Band {
    pub const fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.top) && (0.0..=1.0).contains(&self.bottom) && self.top <= self.bottom
    }
}

pub type BandTable = BTreeMap<Variant, Band>;

/// All band data for an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandTables {
    #[serde(default)]
    pub overrides: BTreeMap<Mode, BTreeMap<DeviceClass, BandTable>>,
    #[serde(default)]
    pub base: BTreeMap<DeviceClass, BandTable>,
    pub sky_default: Band,
    pub ground_default: Band,
}

impl BandTables {
    pub fn lookup(&self, variant: Variant, device: DeviceClass, mode: Mode) -> Band {
        self.overrides
            .get(&mode)
            .and_then(|by_device| by_device.get(&device))
            .and_then(|table| table.get(&variant))
            .or_else(|| self.base.get(&device).and_then(|table| table.get(&variant)))
            .copied()
            .unwrap_or(if variant.is_sky_like() {
                self.sky_default
            } else {
                self.ground_default
            })
    }

    /// Every band in the tables, for validation
    pub fn iter_bands(&self) -> impl Iterator<Item = (Variant, &Band)> {
        self.overrides
            .values()
            .flat_map(|by_device| by_device.values())
            .chain(self.base.values())
            .flat_map(|table| table.iter().map(|(v, b)| (*v, b)))
    }
}

/// Inclusive range of rows a footprint's top edge may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBand {
    pub top: u32,
    pub bottom: u32,
}

impl RowBand {
    pub fn contains(&self, row: u32) -> bool {
        row >= self.top && row <= self.bottom
    }
}

/// Absolute top-edge rows for a footprint `footprint_h` tall.
///
/// `None` when the footprint is taller than the usable rows.
pub fn resolve_band(
    tables: &BandTables,
    variant: Variant,
    device: DeviceClass,
    mode: Mode,
    footprint_h: u32,
    used_rows: u32,
) -> Option<RowBand> {
    if footprint_h == 0 || footprint_h > used_rows {
        return None;
    }
    let band = tables.lookup(variant, device, mode);
    let used = used_rows as f64;
    let top = (used * band.top.clamp(0.0, 1.0)).floor() as u32;
    let bottom = ((used * band.bottom.clamp(0.0, 1.0)).floor() as u32).min(used_rows - footprint_h);
    Some(RowBand {
        top: top.min(bottom),
        bottom,
    })
}
