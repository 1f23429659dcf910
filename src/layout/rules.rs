//! Forbidden-zone row rules
//!
//! A tiny rule language marks columns a row must keep free:
//!
//! ```text
//! rule    := rows ':' clause (',' clause)*
//! rows    := '*' | N | N '-' M | N '-'
//! clause  := ('left' | 'right' | 'center') amount
//! amount  := N '%' | N
//! ```
//!
//! e.g. `"0-2: left 10%, right 10%"` or `"*: center 6"`. Rules are parsed
//! once when an engine is built; at placement time they resolve to a
//! [`ZoneCols`] per row.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LayoutError, Result};

/// Rows a rule applies to (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSpan {
    All,
    Range { first: u32, last: Option<u32> },
}

impl RowSpan {
    pub fn contains(&self, row: u32) -> bool {
        match *self {
            RowSpan::All => true,
            RowSpan::Range { first, last } => row >= first && last.is_none_or(|l| row <= l),
        }
    }
}

/// A margin, either in columns or as a share of the grid width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Margin {
    Cols(u32),
    Percent(f64),
}

impl Margin {
    pub const NONE: Margin = Margin::Cols(0);

    /// Columns covered on a grid `cols` wide
    pub fn resolve(&self, cols: u32) -> u32 {
        let raw = match *self {
            Margin::Cols(n) => n,
            Margin::Percent(p) => (cols as f64 * p / 100.0).round().max(0.0) as u32,
        };
        raw.min(cols)
    }
}

/// One parsed rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRule {
    pub rows: RowSpan,
    pub left: Margin,
    pub right: Margin,
    pub center: Margin,
}

impl RowRule {
    pub fn parse(source: &str) -> Result<Self> {
        let (rows_part, clauses_part) = source
            .split_once(':')
            .ok_or_else(|| LayoutError::row_rule(source, "missing ':' after row selector"))?;

        let rows = parse_rows(source, rows_part.trim())?;
        let mut rule = RowRule {
            rows,
            left: Margin::NONE,
            right: Margin::NONE,
            center: Margin::NONE,
        };

        let mut seen_clause = false;
        for clause in clauses_part.split(',') {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            let mut words = clause.split_whitespace();
            let side = words.next().unwrap_or_default();
            let amount = words
                .next()
                .ok_or_else(|| LayoutError::row_rule(source, format!("`{side}` needs an amount")))?;
            if words.next().is_some() {
                return Err(LayoutError::row_rule(
                    source,
                    format!("unexpected text in clause `{clause}`"),
                ));
            }
            let margin = parse_amount(source, amount)?;
            match side.to_ascii_lowercase().as_str() {
                "left" => rule.left = margin,
                "right" => rule.right = margin,
                "center" | "centre" => rule.center = margin,
                other => {
                    return Err(LayoutError::row_rule(
                        source,
                        format!("unknown side `{other}`"),
                    ));
                }
            }
            seen_clause = true;
        }

        if !seen_clause {
            return Err(LayoutError::row_rule(source, "no clauses"));
        }
        Ok(rule)
    }

    /// Resolved columns for a grid `cols` wide
    pub fn zone_cols(&self, cols: u32) -> ZoneCols {
        ZoneCols {
            left_cols: self.left.resolve(cols),
            right_cols: self.right.resolve(cols),
            center_cols: self.center.resolve(cols),
        }
    }
}

impl FromStr for RowRule {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self> {
        RowRule::parse(s)
    }
}

impl fmt::Display for RowRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rows {
            RowSpan::All => write!(f, "*")?,
            RowSpan::Range { first, last: None } => write!(f, "{first}-")?,
            RowSpan::Range {
                first,
                last: Some(last),
            } if first == last => write!(f, "{first}")?,
            RowSpan::Range {
                first,
                last: Some(last),
            } => write!(f, "{first}-{last}")?,
        }
        write!(f, ":")?;
        let mut sep = " ";
        for (name, margin) in [("left", self.left), ("right", self.right), ("center", self.center)]
        {
            if margin == Margin::NONE {
                continue;
            }
            match margin {
                Margin::Cols(n) => write!(f, "{sep}{name} {n}")?,
                Margin::Percent(p) => write!(f, "{sep}{name} {p}%")?,
            }
            sep = ", ";
        }
        Ok(())
    }
}

/// Normalized forbidden columns for one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneCols {
    pub left_cols: u32,
    pub right_cols: u32,
    pub center_cols: u32,
}

impl ZoneCols {
    /// Union with another rule's columns
    pub fn merge(self, other: ZoneCols) -> ZoneCols {
        ZoneCols {
            left_cols: self.left_cols.max(other.left_cols),
            right_cols: self.right_cols.max(other.right_cols),
            center_cols: self.center_cols.max(other.center_cols),
        }
    }

    pub fn forbids(&self, col: u32, cols: u32) -> bool {
        if col < self.left_cols || col >= cols.saturating_sub(self.right_cols) {
            return true;
        }
        if self.center_cols > 0 {
            let start = (cols - self.center_cols.min(cols)) / 2;
            return col >= start && col < start + self.center_cols;
        }
        false
    }
}

fn parse_rows(source: &str, rows: &str) -> Result<RowSpan> {
    if rows == "*" {
        return Ok(RowSpan::All);
    }
    let number = |s: &str| {
        s.trim()
            .parse::<u32>()
            .map_err(|_| LayoutError::row_rule(source, format!("bad row number `{}`", s.trim())))
    };
    match rows.split_once('-') {
        None => {
            let row = number(rows)?;
            Ok(RowSpan::Range {
                first: row,
                last: Some(row),
            })
        }
        Some((first, last)) if last.trim().is_empty() => Ok(RowSpan::Range {
            first: number(first)?,
            last: None,
        }),
        Some((first, last)) => {
            let (first, last) = (number(first)?, number(last)?);
            if last < first {
                return Err(LayoutError::row_rule(
                    source,
                    format!("row range {first}-{last} is reversed"),
                ));
            }
            Ok(RowSpan::Range {
                first,
                last: Some(last),
            })
        }
    }
}

fn parse_amount(source: &str, amount: &str) -> Result<Margin> {
    if let Some(pct) = amount.strip_suffix('%') {
        let p: f64 = pct
            .parse()
            .map_err(|_| LayoutError::row_rule(source, format!("bad percentage `{amount}`")))?;
        if !(0.0..=100.0).contains(&p) {
            return Err(LayoutError::row_rule(
                source,
                format!("percentage `{amount}` outside 0-100"),
            ));
        }
        Ok(Margin::Percent(p))
    } else {
        amount
            .parse::<u32>()
            .map(Margin::Cols)
            .map_err(|_| LayoutError::row_rule(source, format!("bad column count `{amount}`")))
    }
}
