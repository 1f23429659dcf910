//! Occupancy placer
//!
//! Places planned items one at a time in pool order:
//! 1. Score every in-band rectangle that avoids forbidden cells
//! 2. Claim the best-scoring free one, or drop the item if none is free
//! 3. With no candidates at all, scan the band's open cells from a rolling
//!    cursor, dropping the item if that finds nothing either

use glam::Vec2;

use super::bands::{RowBand, resolve_band};
use super::grid::{GridGeometry, GridSpec, OccupancyGrid};
use super::hash::{hash_cells, unit_jitter};
use super::state::{Category, CellRect, Footprint, PlacedItem, PoolItem, Variant};
use crate::platform::{DeviceClass, Mode};
use crate::tuning::LayoutConfig;

/// Everything fixed for the duration of one pass
#[derive(Debug, Clone, Copy)]
pub struct PlacementContext<'a> {
    pub config: &'a LayoutConfig,
    pub spec: &'a GridSpec,
    pub geometry: GridGeometry,
    pub device: DeviceClass,
    pub mode: Mode,
    pub viewport_width: f64,
    pub salt: u32,
}

impl PlacementContext<'_> {
    /// Top-edge rows available to `variant` at `footprint_h`
    pub fn band(&self, variant: Variant, footprint_h: u32) -> Option<RowBand> {
        resolve_band(
            &self.config.bands,
            variant,
            self.device,
            self.mode,
            footprint_h,
            self.geometry.used_rows,
        )
    }

    /// Build a placed item with its pixel anchor and screen zone
    pub fn place_item(&self, id: u32, category: Category, variant: Variant, rect: CellRect) -> PlacedItem {
        let pos = pixel_position(
            &rect,
            variant,
            self.geometry.cell,
            self.config.anchor_fraction(variant),
        );
        let zone = self
            .config
            .zone_thresholds(self.device)
            .classify(pos.x, self.viewport_width);
        PlacedItem {
            id,
            category,
            variant,
            rect,
            pos,
            zone,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rect: CellRect,
    score: f64,
}

/// Stateful placer for a single pass
pub struct Placer<'a> {
    ctx: PlacementContext<'a>,
    grid: OccupancyGrid,
    fallback_cells: Vec<(u32, u32)>,
    cursor: usize,
    placed: Vec<PlacedItem>,
    fallback_placed: usize,
    dropped: usize,
}

/// What a finished pass produced
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub placed: Vec<PlacedItem>,
    pub grid: OccupancyGrid,
    pub fallback_placed: usize,
    pub dropped: usize,
}

impl<'a> Placer<'a> {
    pub fn new(ctx: PlacementContext<'a>) -> Self {
        let grid = OccupancyGrid::new(&ctx.geometry, ctx.spec);
        let fallback_cells = grid.non_forbidden_cells(ctx.geometry.used_rows);
        Self {
            ctx,
            grid,
            fallback_cells,
            cursor: 0,
            placed: Vec::new(),
            fallback_placed: 0,
            dropped: 0,
        }
    }

    pub fn placed(&self) -> &[PlacedItem] {
        &self.placed
    }

    /// Place one item. Items without a planned variant are skipped.
    pub fn place(&mut self, item: &PoolItem) -> Option<&PlacedItem> {
        let variant = item.variant?;
        let footprint = item.footprint.unwrap_or_else(|| variant.default_footprint());

        let band = self.ctx.band(variant, footprint.h);
        let candidates = self.candidates(variant, footprint, band);
        let claimed = if candidates.is_empty() {
            let rect = self.fallback_claim(footprint, band);
            if rect.is_some() {
                self.fallback_placed += 1;
                log::debug!("Item {} ({variant}) placed by fallback scan", item.id);
            }
            rect
        } else {
            candidates
                .into_iter()
                .map(|c| c.rect)
                .find(|rect| self.grid.try_claim(rect))
        };
        let Some(rect) = claimed else {
            self.dropped += 1;
            log::debug!("Item {} ({variant}) dropped: no room", item.id);
            return None;
        };

        let placed = self.ctx.place_item(item.id, item.category, variant, rect);
        self.placed.push(placed);
        self.placed.last()
    }

    pub fn finish(self) -> PlacementOutcome {
        PlacementOutcome {
            placed: self.placed,
            grid: self.grid,
            fallback_placed: self.fallback_placed,
            dropped: self.dropped,
        }
    }

    /// In-band rectangles off forbidden cells, best first
    fn candidates(&self, variant: Variant, footprint: Footprint, band: Option<RowBand>) -> Vec<Candidate> {
        let cols = self.ctx.geometry.cols;
        let Some(band) = band else {
            return Vec::new();
        };
        if footprint.w == 0 || footprint.w > cols {
            return Vec::new();
        }

        let mut out = Vec::new();
        for r0 in band.top..=band.bottom {
            for c0 in 0..=cols - footprint.w {
                let rect = CellRect::new(r0, c0, footprint);
                if self.grid.fits(&rect) {
                    out.push(Candidate {
                        rect,
                        score: self.score(&rect, variant),
                    });
                }
            }
        }
        out.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.rect.row0.cmp(&b.rect.row0))
                .then(a.rect.col0.cmp(&b.rect.col0))
        });
        out
    }

    fn score(&self, rect: &CellRect, variant: Variant) -> f64 {
        let settings = &self.ctx.config.settings;
        let (row, col) = rect.center();

        let center_bias = settings.effective_center_bias(self.ctx.mode);
        let mid_row = self.ctx.geometry.used_rows as f64 / 2.0;
        let mid_col = self.ctx.geometry.cols as f64 / 2.0;
        let center = -center_bias * ((row - mid_row).powi(2) + (col - mid_col).powi(2));

        let min_sep = self.ctx.config.separation(variant);
        let group = variant.visual_group();
        let nearest = self
            .placed
            .iter()
            .filter(|p| p.variant.visual_group() == group)
            .map(|p| {
                let (r, c) = p.rect.center();
                ((r - row).powi(2) + (c - col).powi(2)).sqrt()
            })
            .min_by(f64::total_cmp);
        let separation = match nearest {
            Some(d) if d < min_sep => -settings.separation_weight * (min_sep - d).powi(2),
            _ => 0.0,
        };

        let hash = hash_cells(rect.row0, rect.col0, rect.w, rect.h, self.ctx.salt);
        let jitter = settings.jitter_amplitude * unit_jitter(hash);

        center + separation + jitter
    }

    /// Rolling scan over open cells whose rows lie in `band`.
    ///
    /// The cursor moves on after every cell it checks and is never reset, so
    /// successive fallbacks spread across the grid.
    fn fallback_claim(&mut self, footprint: Footprint, band: Option<RowBand>) -> Option<CellRect> {
        let band = band?;
        let len = self.fallback_cells.len();
        let used_rows = self.ctx.geometry.used_rows;
        let cols = self.ctx.geometry.cols;
        for _ in 0..len {
            let idx = self.cursor % len;
            self.cursor = (idx + 1) % len;
            let (r, c) = self.fallback_cells[idx];
            let rect = CellRect::new(r, c, footprint);
            if !band.contains(r) || rect.row_end() > used_rows || rect.col_end() > cols {
                continue;
            }
            if self.grid.is_open(r, c) && self.grid.try_claim(&rect) {
                return Some(rect);
            }
        }
        None
    }
}

/// Pixel anchor of a placed rectangle.
///
/// Cell centre, except the landmark which sits at origin plus its
/// whole-cell half extent. A configured anchor fraction is averaged with the
/// centre.
pub fn pixel_position(rect: &CellRect, variant: Variant, cell: f64, anchor: Option<Vec2>) -> Vec2 {
    let cell = cell as f32;
    let origin = Vec2::new(rect.col0 as f32, rect.row0 as f32) * cell;
    let extent = Vec2::new(rect.w as f32, rect.h as f32) * cell;

    if variant.is_landmark() {
        let half = Vec2::new((rect.w / 2) as f32, (rect.h / 2) as f32) * cell;
        return origin + half;
    }

    let center = origin + extent * 0.5;
    match anchor {
        Some(frac) => (center + origin + frac * extent) * 0.5,
        None => center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::bands::Band;
    use crate::layout::grid::build_geometry;
    use crate::layout::rules::RowRule;
    use crate::platform::ScreenZone;

    fn planned(id: u32, variant: Variant, footprint: Footprint) -> PoolItem {
        let mut item = PoolItem::new(id, variant.category());
        item.variant = Some(variant);
        item.footprint = Some(footprint);
        item
    }

    fn ctx<'a>(config: &'a LayoutConfig, spec: &'a GridSpec, w: f64, h: f64) -> PlacementContext<'a> {
        PlacementContext {
            config,
            spec,
            geometry: build_geometry(w, h, spec.rows, spec.usable_height_ratio),
            device: DeviceClass::from_width(w),
            mode: Mode::Start,
            viewport_width: w,
            salt: 42,
        }
    }

    #[test]
    fn test_items_do_not_overlap() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(12, 0.8);
        let mut placer = Placer::new(ctx(&config, &spec, 1280.0, 800.0));
        let mut id = 0;
        for variant in Variant::ALL {
            for _ in 0..3 {
                placer.place(&planned(id, variant, variant.default_footprint()));
                id += 1;
            }
        }
        let outcome = placer.finish();
        for (i, a) in outcome.placed.iter().enumerate() {
            for b in &outcome.placed[i + 1..] {
                assert!(!a.rect.intersects(&b.rect), "{a:?} overlaps {b:?}");
            }
        }
        let cells: u32 = outcome.placed.iter().map(|p| p.rect.w * p.rect.h).sum();
        assert_eq!(cells as usize, outcome.grid.used_count());
    }

    #[test]
    fn test_respects_band() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(12, 0.8);
        let context = ctx(&config, &spec, 1280.0, 800.0);
        let mut placer = Placer::new(context);
        let item = planned(1, Variant::Rock, Footprint::UNIT);
        let placed = placer.place(&item).cloned().unwrap();
        let band = context.band(Variant::Rock, 1).unwrap();
        assert!(band.contains(placed.rect.row0));
    }

    #[test]
    fn test_unplanned_items_are_skipped() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(12, 0.8);
        let mut placer = Placer::new(ctx(&config, &spec, 800.0, 600.0));
        assert!(placer.place(&PoolItem::new(1, Category::Sky)).is_none());
        let outcome = placer.finish();
        assert_eq!(outcome.dropped, 0);
        assert!(outcome.placed.is_empty());
    }

    #[test]
    fn test_forbidden_band_drops_instead_of_leaving_band() {
        let mut config = LayoutConfig::default();
        // houses may only sit in the bottom rows, which are all forbidden
        for table in config.bands.base.values_mut() {
            table.insert(Variant::House, Band::new(0.8, 1.0));
        }
        let spec = GridSpec::new(10, 1.0).with_rules(vec![RowRule::parse("6-: left 100%").unwrap()]);
        let mut placer = Placer::new(ctx(&config, &spec, 1280.0, 500.0));

        let cloud = placer.place(&planned(1, Variant::Cloud, Footprint::new(2, 1)));
        assert!(cloud.is_some());
        assert!(placer.place(&planned(2, Variant::House, Footprint::new(2, 2))).is_none());
        let outcome = placer.finish();
        assert_eq!(outcome.placed.len(), 1);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.fallback_placed, 0);
    }

    #[test]
    fn test_full_band_drops_overflow() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(10, 1.0);
        let context = ctx(&config, &spec, 1280.0, 500.0);
        let band = context.band(Variant::Rock, 1).unwrap();
        let capacity = (band.bottom - band.top + 1) * context.geometry.cols;

        let mut placer = Placer::new(context);
        for id in 0..capacity + 40 {
            placer.place(&planned(id, Variant::Rock, Footprint::UNIT));
        }
        let outcome = placer.finish();
        assert_eq!(outcome.placed.len(), capacity as usize);
        assert_eq!(outcome.dropped, 40);
        assert_eq!(outcome.fallback_placed, 0);
        assert!(outcome.placed.iter().all(|p| band.contains(p.rect.row0)));
    }

    #[test]
    fn test_fallback_cursor_spreads_items() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(10, 1.0);
        let mut placer = Placer::new(ctx(&config, &spec, 1280.0, 500.0));
        let band = RowBand { top: 2, bottom: 3 };
        let a = placer.fallback_claim(Footprint::UNIT, Some(band)).unwrap();
        let b = placer.fallback_claim(Footprint::UNIT, Some(band)).unwrap();
        assert_eq!((a.row0, a.col0), (2, 0));
        assert_eq!((b.row0, b.col0), (2, 1));
        // the cursor keeps its position, so a wider band continues from there
        let c = placer
            .fallback_claim(Footprint::UNIT, Some(RowBand { top: 0, bottom: 9 }))
            .unwrap();
        assert_eq!((c.row0, c.col0), (2, 2));
        assert!(placer.fallback_claim(Footprint::UNIT, None).is_none());
    }

    #[test]
    fn test_center_bias_targets_usable_rows() {
        let mut config = LayoutConfig::default();
        config.settings.jitter_amplitude = 0.0;
        config.bands.overrides.clear();
        for table in config.bands.base.values_mut() {
            table.insert(Variant::Rock, Band::new(0.0, 1.0));
        }
        // 10 rows, 6 usable, 20 columns
        let spec = GridSpec::new(10, 0.6);
        let context = ctx(&config, &spec, 1200.0, 1000.0);
        assert_eq!((context.geometry.used_rows, context.geometry.cols), (6, 20));

        let mut placer = Placer::new(context);
        let rock = placer.place(&planned(1, Variant::Rock, Footprint::UNIT)).cloned().unwrap();
        // ties on distance go to the lower row and column
        assert_eq!((rock.rect.row0, rock.rect.col0), (2, 9));
    }

    #[test]
    fn test_full_grid_drops() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(2, 1.0);
        // 2x2 grid
        let mut placer = Placer::new(ctx(&config, &spec, 100.0, 100.0));
        assert!(placer.place(&planned(1, Variant::House, Footprint::new(2, 2))).is_some());
        assert!(placer.place(&planned(2, Variant::Rock, Footprint::UNIT)).is_none());
        let outcome = placer.finish();
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.placed.len(), 1);
    }

    #[test]
    fn test_pixel_position_centre_and_landmark() {
        let rect = CellRect::new(2, 3, Footprint::new(2, 2));
        assert_eq!(pixel_position(&rect, Variant::House, 10.0, None), Vec2::new(40.0, 30.0));
        // landmark: origin + whole-cell half extent
        let unit = CellRect::new(2, 3, Footprint::UNIT);
        assert_eq!(pixel_position(&unit, Variant::Sprout, 10.0, None), Vec2::new(30.0, 20.0));
        assert_eq!(pixel_position(&unit, Variant::Rock, 10.0, None), Vec2::new(35.0, 25.0));
    }

    #[test]
    fn test_anchor_fraction_is_averaged() {
        let rect = CellRect::new(0, 0, Footprint::new(1, 2));
        // centre (5, 10), anchor point (5, 20) -> (5, 15)
        let pos = pixel_position(&rect, Variant::Tree, 10.0, Some(Vec2::new(0.5, 1.0)));
        assert_eq!(pos, Vec2::new(5.0, 15.0));
    }

    #[test]
    fn test_zone_assigned() {
        let config = LayoutConfig::default();
        let spec = GridSpec::new(12, 0.8);
        let context = ctx(&config, &spec, 600.0, 800.0);
        let left = context.place_item(
            1,
            Category::Filler,
            Variant::Rock,
            CellRect::new(0, 0, Footprint::UNIT),
        );
        assert_eq!(left.zone, ScreenZone::Left);
    }
}
