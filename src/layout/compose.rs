//! One composition pass
//!
//! Signal, viewport and pool in; placements, updated pool and metadata
//! out. Pure: no clock, no shared RNG, no I/O.

use serde::{Deserialize, Serialize};

use super::fixup::ensure_landmark;
use super::grid::{GridGeometry, GridSpec};
use super::hash::derive_salt;
use super::placer::{PlacementContext, Placer};
use super::planner::plan_category;
use super::quota::category_targets;
use super::realloc::{reallocate, reassignment_count};
use super::state::{Category, Composition, LayoutMeta, PoolItem};
use crate::clamp_signal;
use crate::platform::{DeviceClass, Mode, ModeFlags, Viewport};
use crate::tuning::LayoutConfig;

/// Inputs of a pass besides the pool
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComposeRequest {
    /// Control signal, clamped to 0..=1
    pub signal: f64,
    pub viewport: Viewport,
    #[serde(default)]
    pub flags: ModeFlags,
    /// Derived from the grid shape when absent
    #[serde(default)]
    pub salt: Option<u32>,
}

impl ComposeRequest {
    pub fn new(signal: f64, viewport: Viewport, flags: ModeFlags) -> Self {
        Self {
            signal,
            viewport,
            flags,
            salt: None,
        }
    }

    pub fn with_salt(mut self, salt: u32) -> Self {
        self.salt = Some(salt);
        self
    }

    pub fn mode(&self) -> Mode {
        Mode::from_flags(self.flags)
    }

    pub fn device(&self) -> DeviceClass {
        self.viewport.device_class()
    }
}

/// Truncate or extend `pool` to `size` items.
///
/// New items get ids after the current maximum and start as filler; the
/// reallocator gives them a real category. Pass fields are cleared.
pub fn resize_pool(pool: &[PoolItem], size: usize) -> Vec<PoolItem> {
    let mut out: Vec<PoolItem> = pool.iter().take(size).cloned().collect();
    let mut next_id = pool.iter().map(|p| p.id).max().map_or(0, |m| m.wrapping_add(1));
    while out.len() < size {
        out.push(PoolItem::new(next_id, Category::Filler));
        next_id = next_id.wrapping_add(1);
    }
    for item in &mut out {
        item.clear_pass();
    }
    out
}

/// Run a full pass against `spec` and its precomputed `geometry`
pub fn compose(
    config: &LayoutConfig,
    spec: &GridSpec,
    geometry: GridGeometry,
    request: &ComposeRequest,
    pool: &[PoolItem],
) -> Composition {
    let signal = clamp_signal(request.signal);
    let mode = request.mode();
    let device = request.device();
    let curve_set = config.settings.curve_set_for(mode);

    // === Categories ===
    let size = config.pool_sizes.size(mode, device) as usize;
    let mut pool = resize_pool(pool, size);
    let before: Vec<Category> = pool.iter().map(|p| p.category).collect();
    let targets = category_targets(config.category_curve(curve_set), signal, size as u32);
    let after = reallocate(&before, &targets);
    let reassigned = reassignment_count(&before, &after);
    for (item, category) in pool.iter_mut().zip(after) {
        item.category = category;
    }

    let salt = request
        .salt
        .unwrap_or_else(|| derive_salt(geometry.rows, geometry.cols));
    let mut meta = LayoutMeta {
        device,
        mode,
        signal,
        salt,
        grid_spec: spec.clone(),
        geometry,
        reassigned,
        fallback_placed: 0,
        dropped: 0,
        landmark_forced: None,
    };

    if geometry.is_degenerate() {
        log::debug!(
            "Degenerate grid for {}x{} ({mode}/{device}), nothing placed",
            request.viewport.width,
            request.viewport.height
        );
        return Composition {
            placed: Vec::new(),
            pool,
            meta,
        };
    }

    // === Variants ===
    for category in Category::ALL {
        plan_category(
            &mut pool,
            category,
            config.variant_curve(curve_set, category),
            signal,
            salt,
            |variant| config.footprint(category, variant),
        );
    }

    // === Placement ===
    let ctx = PlacementContext {
        config,
        spec,
        geometry,
        device,
        mode,
        viewport_width: request.viewport.width,
        salt,
    };
    let mut placer = Placer::new(ctx);
    for item in &pool {
        placer.place(item);
    }
    let outcome = placer.finish();
    let mut placed = outcome.placed;
    meta.fallback_placed = outcome.fallback_placed;
    meta.dropped = outcome.dropped;
    meta.landmark_forced = ensure_landmark(&mut placed, signal, &ctx);

    for item in &mut pool {
        item.clear_pass();
    }

    log::debug!(
        "Composed {}/{} items at t={signal:.3} ({mode}/{device}, {}x{} grid): {} reassigned, {} fallback, {} dropped",
        placed.len(),
        pool.len(),
        geometry.rows,
        geometry.cols,
        meta.reassigned,
        meta.fallback_placed,
        meta.dropped
    );

    Composition { placed, pool, meta }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::state::Variant;

    fn run(signal: f64, w: f64, h: f64, flags: ModeFlags, pool: &[PoolItem]) -> Composition {
        let config = LayoutConfig::default();
        let request = ComposeRequest::new(signal, Viewport::new(w, h), flags);
        let specs = config.compile_grid_specs().unwrap();
        let spec = &specs[&(request.mode(), request.device())];
        compose(&config, spec, spec.geometry(w, h), &request, pool)
    }

    #[test]
    fn test_determinism() {
        // Same inputs must give byte-identical output
        let pool: Vec<PoolItem> = (0..20).map(|i| PoolItem::new(i, Category::ALL[i as usize % 4])).collect();
        let a = run(0.37, 1280.0, 800.0, ModeFlags::default(), &pool);
        let b = run(0.37, 1280.0, 800.0, ModeFlags::default(), &pool);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_pool_sized_by_policy() {
        let c = run(0.5, 1280.0, 800.0, ModeFlags::default(), &[]);
        assert_eq!(c.pool.len(), 26);
        let ids: Vec<u32> = c.pool.iter().map(|p| p.id).collect();
        assert_eq!(ids, (0..26).collect::<Vec<_>>());

        let overlay = ModeFlags {
            questionnaire_open: true,
            overlay: true,
        };
        let c2 = run(0.5, 375.0, 700.0, overlay, &c.pool);
        assert_eq!(c2.meta.mode, Mode::Overlay);
        assert_eq!(c2.meta.device, DeviceClass::Small);
        assert_eq!(c2.pool.len(), 8);
        // truncation keeps the leading ids
        assert_eq!(c2.pool[7].id, 7);
    }

    #[test]
    fn test_resize_pool_continues_ids() {
        let pool = vec![PoolItem::new(5, Category::Sky), PoolItem::new(9, Category::Flora)];
        let grown = resize_pool(&pool, 4);
        let ids: Vec<u32> = grown.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![5, 9, 10, 11]);
        assert_eq!(grown[2].category, Category::Filler);
        assert_eq!(resize_pool(&pool, 1).len(), 1);
    }

    #[test]
    fn test_categories_match_targets() {
        let config = LayoutConfig::default();
        let c = run(0.5, 1280.0, 800.0, ModeFlags::default(), &[]);
        let targets = category_targets(config.category_curve(crate::settings::CurveSet::Standard), 0.5, 26);
        assert_eq!(Category::tally(&c.categories()), targets);
    }

    #[test]
    fn test_pool_fields_cleared() {
        let c = run(0.8, 1280.0, 800.0, ModeFlags::default(), &[]);
        assert!(!c.placed.is_empty());
        for item in &c.pool {
            assert_eq!(*item, PoolItem::new(item.id, item.category));
        }
    }

    #[test]
    fn test_degenerate_viewport() {
        let c = run(0.5, 0.0, 800.0, ModeFlags::default(), &[]);
        assert!(c.placed.is_empty());
        assert!(c.meta.geometry.is_degenerate());
        assert_eq!(c.meta.dropped, 0);
        assert!(c.pool.iter().all(|p| p.variant.is_none()));
    }

    #[test]
    fn test_signal_clamped() {
        let low = run(-4.0, 1280.0, 800.0, ModeFlags::default(), &[]);
        assert_eq!(low.meta.signal, 0.0);
        let nan = run(f64::NAN, 1280.0, 800.0, ModeFlags::default(), &[]);
        assert_eq!(nan.meta.signal, 0.0);
        assert_eq!(low.placed, nan.placed);
    }

    #[test]
    fn test_low_signal_shows_landmark() {
        let c = run(0.0, 1280.0, 800.0, ModeFlags::default(), &[]);
        assert!(c.placed.iter().any(|p| p.variant == Variant::LANDMARK));
    }

    #[test]
    fn test_same_signal_is_sticky() {
        let first = run(0.3, 1280.0, 800.0, ModeFlags::default(), &[]);
        let second = run(0.3, 1280.0, 800.0, ModeFlags::default(), &first.pool);
        assert_eq!(second.meta.reassigned, 0);
        assert_eq!(first.placed, second.placed);
    }

    #[test]
    fn test_explicit_salt_is_used() {
        let config = LayoutConfig::default();
        let request = ComposeRequest::new(0.6, Viewport::new(1280.0, 800.0), ModeFlags::default()).with_salt(77);
        let specs = config.compile_grid_specs().unwrap();
        let spec = &specs[&(Mode::Start, DeviceClass::Large)];
        let c = compose(&config, spec, spec.geometry(1280.0, 800.0), &request, &[]);
        assert_eq!(c.meta.salt, 77);
    }
}
