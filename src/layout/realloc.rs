//! Sticky category reallocation
//!
//! Moves pool items between categories toward new targets while touching
//! as few items as possible, so successive passes keep most of the scene.

use super::quota::scale_to_count;
use super::state::{Category, CategoryCounts};

/// Relabel `current` toward `target` counts with the fewest changes.
///
/// When `target` does not sum to `current.len()` it is re-apportioned to
/// that length first. Each needy category (in declaration order) takes
/// items one at a time from whichever category currently has the largest
/// surplus; ties go to the earlier category and the donor gives up its
/// last member in pool order.
pub fn reallocate(current: &[Category], target: &CategoryCounts) -> Vec<Category> {
    let n = current.len();
    let target = normalize_target(target, n);

    let mut members: [Vec<usize>; Category::COUNT] = Default::default();
    for (i, c) in current.iter().enumerate() {
        members[c.index()].push(i);
    }

    let mut need = [0i64; Category::COUNT];
    let mut surplus = [0i64; Category::COUNT];
    for c in Category::ALL {
        let have = members[c.index()].len() as i64;
        let want = target[c.index()] as i64;
        need[c.index()] = want - have;
        surplus[c.index()] = have - want;
    }

    let mut out = current.to_vec();
    for receiver in Category::ALL {
        while need[receiver.index()] > 0 {
            let Some(donor) = largest_surplus(&surplus) else {
                break;
            };
            let Some(idx) = members[donor].pop() else {
                break;
            };
            out[idx] = receiver;
            surplus[donor] -= 1;
            need[donor] += 1;
            need[receiver.index()] -= 1;
            surplus[receiver.index()] += 1;
        }
    }
    out
}

/// Number of positions whose category differs
pub fn reassignment_count(before: &[Category], after: &[Category]) -> usize {
    before.iter().zip(after).filter(|(a, b)| a != b).count()
}

fn normalize_target(target: &CategoryCounts, n: usize) -> CategoryCounts {
    let sum: u64 = target.iter().map(|&t| t as u64).sum();
    if sum == n as u64 {
        return *target;
    }
    let weights: Vec<f64> = target.iter().map(|&t| t as f64).collect();
    let scaled = scale_to_count(&weights, n as u32);
    let mut out = [0u32; Category::COUNT];
    out.copy_from_slice(&scaled);
    out
}

fn largest_surplus(surplus: &[i64; Category::COUNT]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &s) in surplus.iter().enumerate() {
        if s > 0 && best.is_none_or(|b| s > surplus[b]) {
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use Category::*;

    #[test]
    fn test_matching_target_is_noop() {
        let current = vec![Sky, Filler, Flora, Flora, Structure, Filler];
        let target = Category::tally(&current);
        assert_eq!(reallocate(&current, &target), current);
    }

    #[test]
    fn test_two_donors_two_receivers() {
        let current = vec![Sky, Sky, Flora, Flora];
        let out = reallocate(&current, &[1, 1, 1, 1]);
        assert_eq!(reassignment_count(&current, &out), 2);
        assert_eq!(Category::tally(&out), [1, 1, 1, 1]);
        // one of each original kind survives untouched
        assert_eq!(out[0], Sky);
        assert_eq!(out[2], Flora);
        let mut moved = vec![out[1], out[3]];
        moved.sort();
        assert_eq!(moved, vec![Structure, Filler]);
    }

    #[test]
    fn test_changes_bounded_by_positive_need() {
        let current = vec![Filler; 10];
        let target = [3, 3, 2, 2];
        let out = reallocate(&current, &target);
        assert_eq!(Category::tally(&out), target);
        assert_eq!(reassignment_count(&current, &out), 8);
    }

    #[test]
    fn test_donor_gives_up_last_member() {
        let current = vec![Sky, Sky, Sky];
        let out = reallocate(&current, &[2, 1, 0, 0]);
        assert_eq!(out, vec![Sky, Sky, Flora]);
    }

    #[test]
    fn test_mismatched_target_is_reapportioned() {
        let current = vec![Filler; 6];
        // sums to 12, gets halved to 6
        let out = reallocate(&current, &[4, 4, 2, 2]);
        assert_eq!(Category::tally(&out), [2, 2, 1, 1]);
    }

    #[test]
    fn test_empty_pool() {
        assert!(reallocate(&[], &[1, 2, 3, 4]).is_empty());
    }
}
