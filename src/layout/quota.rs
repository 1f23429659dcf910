//! Quota curves
//!
//! Maps the control signal to integer targets: anchors are bracketed and
//! blended linearly, then the blend is apportioned with largest-remainder
//! rounding so counts always sum exactly to the requested total.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::state::{Category, CategoryCounts, Variant};

/// Category proportions at one point of the signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAnchor {
    pub t: f64,
    pub weights: [f64; Category::COUNT],
}

impl CategoryAnchor {
    pub fn new(t: f64, weights: [f64; Category::COUNT]) -> Self {
        Self { t, weights }
    }
}

/// Per-variant limit at an anchor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaLimit {
    /// Finite cap (blended, then rounded)
    Cap(f64),
    /// Absorbs every item the finite caps cannot take
    Unbounded,
}

/// Per-variant limits at one point of the signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAnchor {
    pub t: f64,
    pub limits: BTreeMap<Variant, QuotaLimit>,
}

impl VariantAnchor {
    pub fn new(t: f64, limits: impl IntoIterator<Item = (Variant, QuotaLimit)>) -> Self {
        Self {
            t,
            limits: limits.into_iter().collect(),
        }
    }
}

/// Anything positioned on the signal axis
pub trait Anchored {
    fn t(&self) -> f64;
}

impl Anchored for CategoryAnchor {
    fn t(&self) -> f64 {
        self.t
    }
}

impl Anchored for VariantAnchor {
    fn t(&self) -> f64 {
        self.t
    }
}

/// Find the anchors around `t` and the blend factor toward the upper one.
///
/// Anchors must be sorted by `t`. Outside the anchor range the nearest end
/// anchor is returned on both sides with factor 0.
pub fn bracket<A: Anchored>(anchors: &[A], t: f64) -> Option<(&A, &A, f64)> {
    let first = anchors.first()?;
    let last = anchors.last()?;
    if t <= first.t() {
        return Some((first, first, 0.0));
    }
    if t >= last.t() {
        return Some((last, last, 0.0));
    }
    let upper = anchors.iter().position(|a| a.t() >= t)?;
    let (a, b) = (&anchors[upper - 1], &anchors[upper]);
    if a.t() == b.t() {
        return Some((a, a, 0.0));
    }
    Some((a, b, (t - a.t()) / (b.t() - a.t())))
}

/// Blend category proportions at `t`
pub fn interpolate_weights(anchors: &[CategoryAnchor], t: f64) -> [f64; Category::COUNT] {
    let Some((a, b, k)) = bracket(anchors, t) else {
        return [0.0; Category::COUNT];
    };
    let mut out = [0.0; Category::COUNT];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = a.weights[i] + (b.weights[i] - a.weights[i]) * k;
    }
    out
}

/// Largest-remainder apportionment of `total` units over `weights`.
///
/// Non-finite and negative weights count as zero; if nothing positive is
/// left the units are spread as if all weights were equal. Remainder ties go
/// to the lower index. The result always sums to `total`.
pub fn scale_to_count(weights: &[f64], total: u32) -> Vec<u32> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }

    let mut clean: Vec<f64> = weights
        .iter()
        .map(|&w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
        .collect();
    let mut sum: f64 = clean.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        clean = vec![1.0; n];
        sum = n as f64;
    }
    let scale = total as f64 / sum;

    let mut counts = Vec::with_capacity(n);
    let mut remainders = Vec::with_capacity(n);
    for (i, &w) in clean.iter().enumerate() {
        let exact = w * scale;
        let floor = exact.floor();
        counts.push(floor as u32);
        remainders.push((i, exact - floor));
    }
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let assigned: u64 = counts.iter().map(|&c| c as u64).sum();
    let target = total as u64;
    if assigned < target {
        let mut left = target - assigned;
        for &(i, _) in remainders.iter().cycle() {
            if left == 0 {
                break;
            }
            counts[i] += 1;
            left -= 1;
        }
    } else if assigned > target {
        // Float overshoot: take back from the smallest remainders first
        let mut excess = assigned - target;
        while excess > 0 {
            let mut progressed = false;
            for &(i, _) in remainders.iter().rev() {
                if excess == 0 {
                    break;
                }
                if counts[i] > 0 {
                    counts[i] -= 1;
                    excess -= 1;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }
    counts
}

/// Integer category targets at `t` summing exactly to `total`
pub fn category_targets(anchors: &[CategoryAnchor], t: f64, total: u32) -> CategoryCounts {
    let weights = interpolate_weights(anchors, t);
    let counts = scale_to_count(&weights, total);
    let mut out = [0u32; Category::COUNT];
    out.copy_from_slice(&counts);
    out
}

/// Resolved per-variant quota for one category
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantQuota {
    /// Finite caps in declaration order (missing entries are cap 0)
    pub caps: Vec<(Variant, u32)>,
    /// Unbounded variants in declaration order
    pub sinks: Vec<Variant>,
}

impl VariantQuota {
    /// The variant that absorbs overflow
    pub fn sink(&self) -> Option<Variant> {
        self.sinks.first().copied()
    }

    pub fn cap(&self, variant: Variant) -> u32 {
        self.caps
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn finite_total(&self) -> u32 {
        self.caps.iter().map(|(_, c)| c).sum()
    }
}

/// Blend per-variant limits for `category` at `t`.
///
/// A variant is a sink when a contributing anchor marks it unbounded.
/// Finite caps are blended and then rounded with the largest-remainder
/// method against their rounded total.
pub fn interpolate_variant_quota(
    anchors: &[VariantAnchor],
    category: Category,
    t: f64,
) -> VariantQuota {
    let Some((a, b, k)) = bracket(anchors, t) else {
        return VariantQuota {
            caps: category.variants().iter().map(|&v| (v, 0)).collect(),
            sinks: Vec::new(),
        };
    };

    let mut finite = Vec::new();
    let mut sinks = Vec::new();
    for &variant in category.variants() {
        let la = a.limits.get(&variant).copied();
        let lb = b.limits.get(&variant).copied();
        let unbounded = (k < 1.0 && la == Some(QuotaLimit::Unbounded))
            || (k > 0.0 && lb == Some(QuotaLimit::Unbounded));
        if unbounded {
            sinks.push(variant);
            continue;
        }
        let cap_of = |limit: Option<QuotaLimit>| match limit {
            Some(QuotaLimit::Cap(c)) if c.is_finite() => c.max(0.0),
            _ => 0.0,
        };
        finite.push((variant, cap_of(la) + (cap_of(lb) - cap_of(la)) * k));
    }

    let weights: Vec<f64> = finite.iter().map(|(_, w)| *w).collect();
    let total = weights.iter().sum::<f64>().round().max(0.0) as u32;
    let rounded = if total == 0 {
        vec![0; weights.len()]
    } else {
        scale_to_count(&weights, total)
    };

    VariantQuota {
        caps: finite
            .iter()
            .zip(rounded)
            .map(|((v, _), c)| (*v, c))
            .collect(),
        sinks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_curve(weights: [f64; 4]) -> Vec<CategoryAnchor> {
        vec![CategoryAnchor::new(0.0, weights), CategoryAnchor::new(1.0, weights)]
    }

    #[test]
    fn test_exact_proportions_are_kept() {
        let anchors = flat_curve([5.0, 7.0, 7.0, 5.0]);
        assert_eq!(category_targets(&anchors, 0.5, 24), [5, 7, 7, 5]);
    }

    #[test]
    fn test_one_unit_short_loses_smallest_remainder() {
        let anchors = flat_curve([5.0, 7.0, 7.0, 5.0]);
        // 5 -> 4.79, 7 -> 6.71: the two 7s tie and the lower index keeps its unit
        assert_eq!(category_targets(&anchors, 0.5, 23), [5, 7, 6, 5]);
        // repeatable
        assert_eq!(category_targets(&anchors, 0.5, 23), [5, 7, 6, 5]);
    }

    #[test]
    fn test_zero_total() {
        assert_eq!(scale_to_count(&[1.0, 2.0, 3.0], 0), vec![0, 0, 0]);
        assert!(scale_to_count(&[], 5).is_empty());
    }

    #[test]
    fn test_degenerate_weights_spread_evenly() {
        assert_eq!(scale_to_count(&[0.0, 0.0, 0.0], 4), vec![2, 1, 1]);
        assert_eq!(scale_to_count(&[-1.0, f64::NAN, 0.0], 3), vec![1, 1, 1]);
        assert_eq!(scale_to_count(&[-1.0, 2.0], 3), vec![0, 3]);
    }

    #[test]
    fn test_sums_match_for_awkward_weights() {
        let weights = [0.1, 0.2, 0.3, 1.0 / 3.0, 2.0 / 7.0];
        for total in 0..200 {
            let counts = scale_to_count(&weights, total);
            assert_eq!(counts.iter().sum::<u32>(), total);
        }
    }

    #[test]
    fn test_interpolation_between_anchors() {
        let anchors = vec![
            CategoryAnchor::new(0.0, [0.0, 10.0, 0.0, 10.0]),
            CategoryAnchor::new(1.0, [10.0, 0.0, 10.0, 0.0]),
        ];
        assert_eq!(interpolate_weights(&anchors, 0.25), [2.5, 7.5, 2.5, 7.5]);
        // clamped outside the anchor range
        assert_eq!(interpolate_weights(&anchors, -3.0), [0.0, 10.0, 0.0, 10.0]);
        assert_eq!(interpolate_weights(&anchors, 7.0), [10.0, 0.0, 10.0, 0.0]);
    }

    #[test]
    fn test_coincident_anchors_use_lower() {
        let anchors = vec![
            CategoryAnchor::new(0.0, [1.0, 0.0, 0.0, 0.0]),
            CategoryAnchor::new(0.5, [0.0, 1.0, 0.0, 0.0]),
            CategoryAnchor::new(0.5, [0.0, 0.0, 1.0, 0.0]),
            CategoryAnchor::new(1.0, [0.0, 0.0, 0.0, 1.0]),
        ];
        assert_eq!(interpolate_weights(&anchors, 0.5), [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_variant_is_cap_zero_not_sink() {
        let anchors = vec![VariantAnchor::new(
            0.0,
            [(Variant::Tree, QuotaLimit::Cap(3.0))],
        )];
        let quota = interpolate_variant_quota(&anchors, Category::Flora, 0.4);
        assert_eq!(quota.cap(Variant::Tree), 3);
        assert_eq!(quota.cap(Variant::Bush), 0);
        assert_eq!(quota.sink(), None);
    }

    #[test]
    fn test_variant_caps_blend_and_sink() {
        let anchors = vec![
            VariantAnchor::new(
                0.0,
                [
                    (Variant::Tree, QuotaLimit::Cap(0.0)),
                    (Variant::Flower, QuotaLimit::Cap(2.0)),
                    (Variant::Bush, QuotaLimit::Unbounded),
                ],
            ),
            VariantAnchor::new(
                1.0,
                [
                    (Variant::Tree, QuotaLimit::Cap(4.0)),
                    (Variant::Flower, QuotaLimit::Cap(4.0)),
                    (Variant::Bush, QuotaLimit::Unbounded),
                ],
            ),
        ];
        let quota = interpolate_variant_quota(&anchors, Category::Flora, 0.5);
        assert_eq!(quota.cap(Variant::Tree), 2);
        assert_eq!(quota.cap(Variant::Flower), 3);
        assert_eq!(quota.sink(), Some(Variant::Bush));
        assert_eq!(quota.finite_total(), 5);
    }

    #[test]
    fn test_unbounded_only_counts_when_anchor_contributes() {
        let anchors = vec![
            VariantAnchor::new(0.0, [(Variant::Rock, QuotaLimit::Unbounded)]),
            VariantAnchor::new(
                1.0,
                [
                    (Variant::Rock, QuotaLimit::Cap(2.0)),
                    (Variant::Grass, QuotaLimit::Unbounded),
                ],
            ),
        ];
        let low = interpolate_variant_quota(&anchors, Category::Filler, 0.0);
        assert_eq!(low.sinks, vec![Variant::Rock]);
        let high = interpolate_variant_quota(&anchors, Category::Filler, 1.0);
        assert_eq!(high.sinks, vec![Variant::Grass]);
        assert_eq!(high.cap(Variant::Rock), 2);
        let mid = interpolate_variant_quota(&anchors, Category::Filler, 0.5);
        assert_eq!(mid.sinks, vec![Variant::Rock, Variant::Grass]);
        assert_eq!(mid.sink(), Some(Variant::Rock));
    }
}
