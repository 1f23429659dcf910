//! Variant planner
//!
//! Turns a category's items into concrete variants under the per-variant
//! quota at the current signal.

use super::quota::{VariantAnchor, VariantQuota, interpolate_variant_quota};
use super::state::{Category, Footprint, PoolItem, Variant};

/// One planned item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub id: u32,
    pub variant: Variant,
    pub footprint: Footprint,
}

/// Assign a variant and footprint to every pool item of `category`.
///
/// Items are visited by `(id, id ^ salt)` so the plan does not depend on
/// pool order. Each takes the first finite variant with room left, then the
/// sink, then the category's first declared variant. Results are written
/// back into `pool` and also returned in visit order.
pub fn plan_category(
    pool: &mut [PoolItem],
    category: Category,
    anchors: &[VariantAnchor],
    signal: f64,
    salt: u32,
    footprint_of: impl Fn(Variant) -> Footprint,
) -> Vec<Assignment> {
    let quota = interpolate_variant_quota(anchors, category, signal);

    let mut order: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, item)| item.category == category)
        .map(|(i, _)| i)
        .collect();
    order.sort_by_key(|&i| (pool[i].id, pool[i].id ^ salt));

    let mut remaining = quota.caps.clone();
    let mut plan = Vec::with_capacity(order.len());
    for idx in order {
        let variant = pick_variant(&mut remaining, &quota, category);
        let footprint = footprint_of(variant);
        let item = &mut pool[idx];
        item.variant = Some(variant);
        item.footprint = Some(footprint);
        plan.push(Assignment {
            id: item.id,
            variant,
            footprint,
        });
    }
    plan
}

fn pick_variant(remaining: &mut [(Variant, u32)], quota: &VariantQuota, category: Category) -> Variant {
    if let Some((variant, left)) = remaining.iter_mut().find(|(_, left)| *left > 0) {
        *left -= 1;
        return *variant;
    }
    quota
        .sink()
        .unwrap_or_else(|| category.variants()[0])
}
