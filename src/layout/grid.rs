//! Grid geometry and occupancy
//!
//! Cells are always square: their side is driven by the usable height, and
//! the column count follows from the viewport width.

use serde::{Deserialize, Serialize};

use super::rules::{RowRule, ZoneCols};
use super::state::CellRect;

/// Grid layout selected for a (device class, mode) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub usable_height_ratio: f64,
    pub rules: Vec<RowRule>,
}

impl GridSpec {
    pub fn new(rows: u32, usable_height_ratio: f64) -> Self {
        Self {
            rows,
            usable_height_ratio,
            rules: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: Vec<RowRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Merged forbidden columns for `row`
    pub fn zone_cols(&self, row: u32, cols: u32) -> ZoneCols {
        self.rules
            .iter()
            .filter(|r| r.rows.contains(row))
            .fold(ZoneCols::default(), |acc, r| acc.merge(r.zone_cols(cols)))
    }

    pub fn is_forbidden(&self, row: u32, col: u32, cols: u32) -> bool {
        self.zone_cols(row, cols).forbids(col, cols)
    }

    /// Geometry of this spec on a `width` x `height` viewport
    pub fn geometry(&self, width: f64, height: f64) -> GridGeometry {
        build_geometry(width, height, self.rows, self.usable_height_ratio)
    }
}

/// Resolved pixel geometry of a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    pub rows: u32,
    pub cols: u32,
    /// Side of a square cell in pixels
    pub cell: f64,
    pub usable_height: f64,
    /// Rows eligible for placement (from the top)
    pub used_rows: u32,
}

impl GridGeometry {
    pub const EMPTY: GridGeometry = GridGeometry {
        rows: 0,
        cols: 0,
        cell: 0.0,
        usable_height: 0.0,
        used_rows: 0,
    };

    /// Nothing can be placed on this grid
    pub fn is_degenerate(&self) -> bool {
        self.rows == 0 || self.cols == 0 || self.used_rows == 0 || !(self.cell > 0.0)
    }
}

/// Compute square-cell geometry for a viewport.
///
/// Zero-area viewports and zero rows produce a degenerate geometry rather
/// than an error.
pub fn build_geometry(width: f64, height: f64, rows: u32, usable_height_ratio: f64) -> GridGeometry {
    let ratio = if usable_height_ratio.is_finite() {
        usable_height_ratio.clamp(0.01, 1.0)
    } else {
        1.0
    };
    if rows == 0 || !(width > 0.0) || !(height > 0.0) || !width.is_finite() || !height.is_finite() {
        return GridGeometry {
            rows,
            ..GridGeometry::EMPTY
        };
    }

    let usable_height = (height * ratio).round();
    let cell = usable_height / rows as f64;
    if !(cell > 0.0) {
        return GridGeometry {
            rows,
            usable_height,
            ..GridGeometry::EMPTY
        };
    }
    let cols = (width / cell).ceil() as u32;
    let used_rows = ((rows as f64 * ratio).round() as u32).max(1);

    GridGeometry {
        rows,
        cols,
        cell,
        usable_height,
        used_rows,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellState {
    Open,
    Forbidden,
    Used,
}

/// Per-cell open / forbidden / used bitmap
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    rows: u32,
    cols: u32,
    cells: Vec<CellState>,
}

impl OccupancyGrid {
    /// Empty grid with every rule-forbidden cell marked
    pub fn new(geometry: &GridGeometry, spec: &GridSpec) -> Self {
        let (rows, cols) = (geometry.rows, geometry.cols);
        let mut cells = Vec::with_capacity((rows * cols) as usize);
        for r in 0..rows {
            let zone = spec.zone_cols(r, cols);
            for c in 0..cols {
                cells.push(if zone.forbids(c, cols) {
                    CellState::Forbidden
                } else {
                    CellState::Open
                });
            }
        }
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    #[inline]
    fn state(&self, row: u32, col: u32) -> Option<CellState> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get((row * self.cols + col) as usize).copied()
    }

    pub fn is_open(&self, row: u32, col: u32) -> bool {
        self.state(row, col) == Some(CellState::Open)
    }

    pub fn is_forbidden(&self, row: u32, col: u32) -> bool {
        self.state(row, col) == Some(CellState::Forbidden)
    }

    pub fn is_used(&self, row: u32, col: u32) -> bool {
        self.state(row, col) == Some(CellState::Used)
    }

    /// Rect lies inside the grid and off forbidden cells (ignores use)
    pub fn fits(&self, rect: &CellRect) -> bool {
        rect.row_end() <= self.rows
            && rect.col_end() <= self.cols
            && rect.cells().all(|(r, c)| !self.is_forbidden(r, c))
    }

    /// Claim every cell of `rect` if all are open; otherwise change nothing
    pub fn try_claim(&mut self, rect: &CellRect) -> bool {
        if rect.w == 0 || rect.h == 0 {
            return false;
        }
        if rect.row_end() > self.rows || rect.col_end() > self.cols {
            return false;
        }
        if !rect.cells().all(|(r, c)| self.is_open(r, c)) {
            return false;
        }
        for (r, c) in rect.cells() {
            let idx = (r * self.cols + c) as usize;
            self.cells[idx] = CellState::Used;
        }
        true
    }

    /// Non-forbidden cells in rows `[0, row_limit)`, row-major
    pub fn non_forbidden_cells(&self, row_limit: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        for r in 0..row_limit.min(self.rows) {
            for c in 0..self.cols {
                if !self.is_forbidden(r, c) {
                    out.push((r, c));
                }
            }
        }
        out
    }

    pub fn used_count(&self) -> usize {
        self.cells.iter().filter(|&&s| s == CellState::Used).count()
    }
}
