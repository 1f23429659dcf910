//! Layout state and core data types
//!
//! Pool items persist across passes (id + category); everything a pass
//! derives (variant, footprint, placement, pixel position) is cleared
//! before the pool is handed back to the caller.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::grid::{GridGeometry, GridSpec};
use crate::platform::{DeviceClass, Mode, ScreenZone};

/// Coarse item grouping whose proportions follow the control signal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Sky,
    Flora,
    Structure,
    #[default]
    Filler,
}

/// Per-category integer counts, indexed by `Category::index`
pub type CategoryCounts = [u32; Category::COUNT];

impl Category {
    pub const COUNT: usize = 4;
    pub const ALL: [Category; Category::COUNT] = [
        Category::Sky,
        Category::Flora,
        Category::Structure,
        Category::Filler,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn is_filler(self) -> bool {
        self == Category::Filler
    }

    /// Variants in declaration order; the first one is the planner's last resort
    pub fn variants(self) -> &'static [Variant] {
        match self {
            Category::Sky => &[Variant::Cloud, Variant::Bird, Variant::Balloon],
            Category::Flora => &[Variant::Tree, Variant::Bush, Variant::Flower, Variant::Sprout],
            Category::Structure => &[Variant::House, Variant::Windmill, Variant::Well],
            Category::Filler => &[Variant::Rock, Variant::Grass],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sky => "sky",
            Category::Flora => "flora",
            Category::Structure => "structure",
            Category::Filler => "filler",
        }
    }

    /// Count occurrences of each category
    pub fn tally<'a>(categories: impl IntoIterator<Item = &'a Category>) -> CategoryCounts {
        let mut counts = [0u32; Category::COUNT];
        for c in categories {
            counts[c.index()] += 1;
        }
        counts
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visual grouping used by the separation penalty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualGroup {
    Sky,
    Vegetation,
    Building,
    Ground,
}

/// Concrete decorative element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Cloud,
    Bird,
    Balloon,
    Tree,
    Bush,
    Flower,
    Sprout,
    House,
    Windmill,
    Well,
    Rock,
    Grass,
}

impl Variant {
    /// The variant guaranteed to exist at the low end of the signal
    pub const LANDMARK: Variant = Variant::Sprout;

    pub const ALL: [Variant; 12] = [
        Variant::Cloud,
        Variant::Bird,
        Variant::Balloon,
        Variant::Tree,
        Variant::Bush,
        Variant::Flower,
        Variant::Sprout,
        Variant::House,
        Variant::Windmill,
        Variant::Well,
        Variant::Rock,
        Variant::Grass,
    ];

    /// Category that declares this variant
    pub fn category(self) -> Category {
        match self {
            Variant::Cloud | Variant::Bird | Variant::Balloon => Category::Sky,
            Variant::Tree | Variant::Bush | Variant::Flower | Variant::Sprout => Category::Flora,
            Variant::House | Variant::Windmill | Variant::Well => Category::Structure,
            Variant::Rock | Variant::Grass => Category::Filler,
        }
    }

    pub fn is_sky_like(self) -> bool {
        self.category() == Category::Sky
    }

    pub fn is_landmark(self) -> bool {
        self == Self::LANDMARK
    }

    pub fn visual_group(self) -> VisualGroup {
        match self {
            Variant::Cloud | Variant::Bird | Variant::Balloon => VisualGroup::Sky,
            Variant::Tree | Variant::Bush | Variant::Flower | Variant::Sprout => {
                VisualGroup::Vegetation
            }
            Variant::House | Variant::Windmill | Variant::Well => VisualGroup::Building,
            Variant::Rock | Variant::Grass => VisualGroup::Ground,
        }
    }

    /// Global fallback footprint when a table entry is missing
    pub fn default_footprint(self) -> Footprint {
        match self {
            Variant::Cloud => Footprint::new(2, 1),
            Variant::Balloon | Variant::Tree | Variant::Windmill => Footprint::new(1, 2),
            Variant::House => Footprint::new(2, 2),
            _ => Footprint::UNIT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Cloud => "cloud",
            Variant::Bird => "bird",
            Variant::Balloon => "balloon",
            Variant::Tree => "tree",
            Variant::Bush => "bush",
            Variant::Flower => "flower",
            Variant::Sprout => "sprout",
            Variant::House => "house",
            Variant::Windmill => "windmill",
            Variant::Well => "well",
            Variant::Rock => "rock",
            Variant::Grass => "grass",
        }
    }

    /// Single-character glyph for text dumps
    pub fn glyph(&self) -> char {
        match self {
            Variant::Cloud => 'c',
            Variant::Bird => 'v',
            Variant::Balloon => 'o',
            Variant::Tree => 'T',
            Variant::Bush => 'b',
            Variant::Flower => '*',
            Variant::Sprout => '!',
            Variant::House => 'H',
            Variant::Windmill => 'W',
            Variant::Well => 'U',
            Variant::Rock => '.',
            Variant::Grass => ',',
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extent in grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub w: u32,
    pub h: u32,
}

impl Footprint {
    pub const UNIT: Footprint = Footprint { w: 1, h: 1 };

    pub const fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    pub fn is_unit(&self) -> bool {
        *self == Self::UNIT
    }
}

/// Claimed cell rectangle (top-left + extent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    pub row0: u32,
    pub col0: u32,
    pub w: u32,
    pub h: u32,
}

impl CellRect {
    pub fn new(row0: u32, col0: u32, footprint: Footprint) -> Self {
        Self {
            row0,
            col0,
            w: footprint.w,
            h: footprint.h,
        }
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.w, self.h)
    }

    /// One past the last row
    #[inline]
    pub fn row_end(&self) -> u32 {
        self.row0 + self.h
    }

    /// One past the last column
    #[inline]
    pub fn col_end(&self) -> u32 {
        self.col0 + self.w
    }

    pub fn intersects(&self, other: &CellRect) -> bool {
        self.row0 < other.row_end()
            && other.row0 < self.row_end()
            && self.col0 < other.col_end()
            && other.col0 < self.col_end()
    }

    /// Geometric centre in cell units as (row, col)
    pub fn center(&self) -> (f64, f64) {
        (
            self.row0 as f64 + self.h as f64 / 2.0,
            self.col0 as f64 + self.w as f64 / 2.0,
        )
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.row0..self.row_end()).flat_map(move |r| (self.col0..self.col_end()).map(move |c| (r, c)))
    }
}

/// A pool slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolItem {
    /// Stable identity across passes
    pub id: u32,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Footprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<CellRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Vec2>,
}

impl PoolItem {
    pub fn new(id: u32, category: Category) -> Self {
        Self {
            id,
            category,
            variant: None,
            footprint: None,
            placement: None,
            pos: None,
        }
    }

    /// Drop everything derived by a composition pass
    pub fn clear_pass(&mut self) {
        self.variant = None;
        self.footprint = None;
        self.placement = None;
        self.pos = None;
    }
}

/// An item that made it onto the grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedItem {
    pub id: u32,
    pub category: Category,
    pub variant: Variant,
    pub rect: CellRect,
    /// Pixel anchor (cell centre except for the landmark)
    pub pos: Vec2,
    pub zone: ScreenZone,
}

/// Everything a caller needs to know about how a pass was resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutMeta {
    pub device: DeviceClass,
    pub mode: Mode,
    /// Clamped control signal actually used
    pub signal: f64,
    pub salt: u32,
    pub grid_spec: GridSpec,
    pub geometry: GridGeometry,
    /// Category relabels made by the reallocator
    pub reassigned: usize,
    /// Items placed through the fallback scan
    pub fallback_placed: usize,
    /// Items with a variant that could not be placed
    pub dropped: usize,
    /// Item converted to the landmark variant, if any
    pub landmark_forced: Option<u32>,
}

/// Result of one composition pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub placed: Vec<PlacedItem>,
    /// Same ids as the input (resized to policy), pass fields cleared
    pub pool: Vec<PoolItem>,
    pub meta: LayoutMeta,
}

impl Composition {
    pub fn categories(&self) -> Vec<Category> {
        self.pool.iter().map(|p| p.category).collect()
    }

    pub fn placed_by_id(&self, id: u32) -> Option<&PlacedItem> {
        self.placed.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variants_belong_to_declaring_category() {
        for category in Category::ALL {
            for variant in category.variants() {
                assert_eq!(variant.category(), category);
            }
        }
        let declared: usize = Category::ALL.iter().map(|c| c.variants().len()).sum();
        assert_eq!(declared, Variant::ALL.len());
    }

    #[test]
    fn test_rect_intersection() {
        let a = CellRect::new(0, 0, Footprint::new(2, 2));
        let b = CellRect::new(1, 1, Footprint::UNIT);
        let c = CellRect::new(0, 2, Footprint::new(2, 2));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c)); // edge-adjacent
        assert_eq!(a.cells().count(), 4);
        assert_eq!(a.center(), (1.0, 1.0));
    }

    #[test]
    fn test_clear_pass_keeps_identity() {
        let mut item = PoolItem::new(7, Category::Flora);
        item.variant = Some(Variant::Tree);
        item.footprint = Some(Footprint::new(1, 2));
        item.placement = Some(CellRect::new(3, 4, Footprint::new(1, 2)));
        item.pos = Some(Vec2::new(10.0, 20.0));
        item.clear_pass();
        assert_eq!(item, PoolItem::new(7, Category::Flora));
    }

    #[test]
    fn test_tally() {
        let cats = [Category::Sky, Category::Sky, Category::Filler];
        assert_eq!(Category::tally(&cats), [2, 0, 0, 1]);
    }
}
