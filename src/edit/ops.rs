//! Discrete edit operations.
//!
//! Every operation is pure: it takes a curve and a selection and returns a new
//! curve. Diffing and history recording are the caller's job. Selection
//! indices that fall outside the curve are ignored.

use crate::domain::{KnotSet, MonotoneDirection};

/// Valid, de-duplicated selection ordered by x (index breaks ties).
fn ordered_selection(curve: &KnotSet, selection: &[usize]) -> Vec<usize> {
    let mut idx: Vec<usize> = selection.iter().copied().filter(|&i| i < curve.len()).collect();
    idx.sort_unstable();
    idx.dedup();
    idx.sort_by(|&a, &b| curve.x[a].total_cmp(&curve.x[b]).then(a.cmp(&b)));
    idx
}

/// Replace each selected y with the mean of the selected (finite) y values.
pub fn align(curve: &KnotSet, selection: &[usize]) -> KnotSet {
    let idx = ordered_selection(curve, selection);
    let values: Vec<f64> = idx.iter().map(|&i| curve.y[i]).collect();
    let Some(mean) = crate::math::finite_mean(&values) else {
        return curve.clone();
    };

    let mut out = curve.clone();
    for &i in &idx {
        out.y[i] = mean;
    }
    out
}

/// Draw a chord between the first and last selected knots (by x) and move the
/// interior selected knots onto it. Endpoints keep their values.
pub fn interpolate(curve: &KnotSet, selection: &[usize]) -> KnotSet {
    let idx = ordered_selection(curve, selection);
    if idx.len() < 3 {
        return curve.clone();
    }
    let first = idx[0];
    let last = idx[idx.len() - 1];
    let (x0, y0) = (curve.x[first], curve.y[first]);
    let (x1, y1) = (curve.x[last], curve.y[last]);
    let span = x1 - x0;
    if !(span > 0.0) {
        return curve.clone();
    }

    let mut out = curve.clone();
    for &i in &idx[1..idx.len() - 1] {
        let t = (curve.x[i] - x0) / span;
        out.y[i] = y0 + (y1 - y0) * t;
    }
    out
}

/// Set the selected values to 0.
pub fn zero(curve: &KnotSet, selection: &[usize]) -> KnotSet {
    let mut out = curve.clone();
    for i in ordered_selection(curve, selection) {
        out.y[i] = 0.0;
    }
    out
}

/// One-pass monotonic clamp over the selected knots, ordered by x.
///
/// Increasing tracks a running maximum and raises every value below it;
/// decreasing mirrors this with a running minimum. Values are only ever
/// raised (or lowered), never averaged, so this is not a least-squares
/// isotonic fit. Non-finite values are skipped.
pub fn enforce_monotonic(curve: &KnotSet, selection: &[usize], direction: MonotoneDirection) -> KnotSet {
    let mut out = curve.clone();
    let mut running: Option<f64> = None;

    for i in ordered_selection(curve, selection) {
        let y = out.y[i];
        if !y.is_finite() {
            continue;
        }
        let bound = match (running, direction) {
            (None, _) => y,
            (Some(r), MonotoneDirection::Increasing) => r.max(y),
            (Some(r), MonotoneDirection::Decreasing) => r.min(y),
        };
        out.y[i] = bound;
        running = Some(bound);
    }
    out
}

/// Insert one knot at the midpoint of every adjacent pair of selected knots.
///
/// Needs at least two selected knots; existing knots are never modified. The
/// result is re-sorted by x.
pub fn insert_midpoints(curve: &KnotSet, selection: &[usize]) -> KnotSet {
    let idx = ordered_selection(curve, selection);
    if idx.len() < 2 {
        return curve.clone();
    }

    let mut out = curve.clone();
    for pair in idx.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let (xa, xb) = (curve.x[a], curve.x[b]);
        if !(xb > xa) {
            continue;
        }
        out.x.push((xa + xb) / 2.0);
        out.y.push((curve.y[a] + curve.y[b]) / 2.0);
    }
    out.sort_by_x();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample() -> KnotSet {
        KnotSet::new(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 5.0, 2.0, 8.0]).unwrap()
    }

    #[test]
    fn align_writes_the_mean() {
        let out = align(&sample(), &[1, 2]);
        assert_eq!(out.y, vec![0.0, 3.5, 3.5, 8.0]);
    }

    #[test]
    fn align_ignores_out_of_range_indices() {
        let out = align(&sample(), &[1, 2, 99]);
        assert_eq!(out.y, vec![0.0, 3.5, 3.5, 8.0]);
    }

    #[test]
    fn interpolate_pins_endpoints() {
        let out = interpolate(&sample(), &[0, 1, 2, 3]);
        assert_eq!(out.y[0], 0.0);
        assert_eq!(out.y[3], 8.0);
        assert!((out.y[1] - 8.0 / 3.0).abs() < 1e-12);
        assert!((out.y[2] - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn interpolate_leaves_unselected_interior_alone() {
        let out = interpolate(&sample(), &[0, 2, 3]);
        assert_eq!(out.y[1], 5.0);
        assert!((out.y[2] - 16.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn zero_clears_selected() {
        assert_eq!(zero(&sample(), &[3]).y, vec![0.0, 5.0, 2.0, 0.0]);
    }

    #[test]
    fn monotonic_increasing_example() {
        let out = enforce_monotonic(&sample(), &[0, 1, 2, 3], MonotoneDirection::Increasing);
        assert_eq!(out.y, vec![0.0, 5.0, 5.0, 8.0]);
    }

    #[test]
    fn monotonic_decreasing_example() {
        let out = enforce_monotonic(&sample(), &[0, 1, 2, 3], MonotoneDirection::Decreasing);
        assert_eq!(out.y, vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn insert_midpoints_adds_between_pairs() {
        let out = insert_midpoints(&sample(), &[1, 2, 3]);
        assert_eq!(out.x, vec![0.0, 1.0, 1.5, 2.0, 2.5, 3.0]);
        assert_eq!(out.y, vec![0.0, 5.0, 3.5, 2.0, 5.0, 8.0]);
    }

    #[test]
    fn insert_midpoints_needs_two_points() {
        assert_eq!(insert_midpoints(&sample(), &[2]), sample());
    }

    proptest! {
        #[test]
        fn prop_monotonic_increasing_is_running_max(
            ys in prop::collection::vec(-50.0f64..50.0, 1..25),
            picks in prop::collection::vec(any::<bool>(), 25),
        ) {
            let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
            let curve = KnotSet::new(xs, ys.clone()).unwrap();
            let selection: Vec<usize> = (0..ys.len()).filter(|&i| picks[i]).collect();
            let out = enforce_monotonic(&curve, &selection, MonotoneDirection::Increasing);

            let mut running = f64::NEG_INFINITY;
            for &i in &selection {
                running = running.max(ys[i]);
                prop_assert_eq!(out.y[i], running);
            }
            for w in selection.windows(2) {
                prop_assert!(out.y[w[0]] <= out.y[w[1]]);
            }
            for i in (0..ys.len()).filter(|i| !selection.contains(i)) {
                prop_assert_eq!(out.y[i], ys[i]);
            }
        }
    }
}
