//! Deterministic layout module
//!
//! All composition logic lives here. This module must be pure and deterministic:
//! - No clock, no shared RNG (jitter comes from hashing explicit inputs)
//! - Stable iteration order (pool order, then id)
//! - No rendering or platform dependencies beyond the viewport types
//!
//! A pass runs: pool sizing, category quotas, sticky reallocation, variant
//! planning, grid geometry, band resolution, placement, landmark fix-up.

pub mod bands;
pub mod compose;
pub mod fixup;
pub mod grid;
pub mod hash;
pub mod placer;
pub mod planner;
pub mod quota;
pub mod realloc;
pub mod rules;
pub mod state;

pub use bands::{Band, BandTables, RowBand, resolve_band};
pub use compose::{ComposeRequest, compose, resize_pool};
pub use fixup::ensure_landmark;
pub use grid::{GridGeometry, GridSpec, OccupancyGrid, build_geometry};
pub use hash::{derive_salt, hash_cells, mix32, unit_jitter};
pub use placer::{PlacementContext, PlacementOutcome, Placer, pixel_position};
pub use planner::{Assignment, plan_category};
pub use quota::{
    CategoryAnchor, QuotaLimit, VariantAnchor, VariantQuota, category_targets,
    interpolate_variant_quota, interpolate_weights, scale_to_count,
};
pub use realloc::{reallocate, reassignment_count};
pub use rules::{Margin, RowRule, RowSpan, ZoneCols};
pub use state::{
    Category, CategoryCounts, CellRect, Composition, Footprint, LayoutMeta, PlacedItem, PoolItem,
    Variant, VisualGroup,
};
