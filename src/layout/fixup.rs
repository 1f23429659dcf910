//! Post-placement invariants
//!
//! At the low end of the signal the scene must still show the landmark.

use super::placer::PlacementContext;
use super::state::{CellRect, Footprint, PlacedItem, Variant};

/// Convert one placed 1x1 item into the landmark when none is on screen.
///
/// Runs only when `signal` is at or below the configured threshold.
/// Preference: non-filler in the landmark's band, any item in the band,
/// any non-filler, anything. Returns the converted id.
pub fn ensure_landmark(placed: &mut [PlacedItem], signal: f64, ctx: &PlacementContext) -> Option<u32> {
    if signal > ctx.config.settings.landmark_signal_threshold {
        return None;
    }
    if placed.iter().any(|p| p.variant.is_landmark()) {
        return None;
    }

    let band = ctx.band(Variant::LANDMARK, 1);
    let in_band = |p: &PlacedItem| band.is_some_and(|b| b.contains(p.rect.row0));
    let unit = |p: &PlacedItem| p.rect.footprint().is_unit();

    let tiers: [&dyn Fn(&PlacedItem) -> bool; 4] = [
        &|p: &PlacedItem| !p.category.is_filler() && in_band(p),
        &|p: &PlacedItem| in_band(p),
        &|p: &PlacedItem| !p.category.is_filler(),
        &|_: &PlacedItem| true,
    ];
    let idx = tiers
        .iter()
        .find_map(|tier| placed.iter().position(|p| unit(p) && tier(p)))?;

    let item = &mut placed[idx];
    log::debug!("Forcing item {} ({}) to landmark", item.id, item.variant);
    let rect = CellRect::new(item.rect.row0, item.rect.col0, Footprint::UNIT);
    *item = ctx.place_item(item.id, item.category, Variant::LANDMARK, rect);
    Some(item.id)
}
