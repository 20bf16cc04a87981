//! Piecewise-linear evaluation of shape functions.
//!
//! Continuous features are evaluated by linear interpolation between the
//! bracketing knots with flat extrapolation past either end. Categorical
//! features skip interpolation entirely: the sample's category ordinal indexes
//! straight into `y`.

use std::borrow::Cow;

use crate::domain::{FeatureDescriptor, KnotSet};
use crate::error::AppError;

/// Evaluate `knots` at every target.
///
/// Fails on an empty knot set; callers are expected to guard (a feature
/// without knots contributes nothing rather than being evaluated).
pub fn evaluate(knots: &KnotSet, targets: &[f64]) -> Result<Vec<f64>, AppError> {
    if knots.is_empty() {
        return Err(AppError::new(3, "Cannot evaluate an empty knot set."));
    }
    if knots.x.len() != knots.y.len() {
        return Err(AppError::new(2, "Knot length mismatch during evaluation."));
    }
    let knots: Cow<'_, KnotSet> = if knots.is_sorted() {
        Cow::Borrowed(knots)
    } else {
        Cow::Owned(knots.clone().sorted())
    };
    Ok(targets
        .iter()
        .map(|&t| evaluate_sorted(&knots.x, &knots.y, t))
        .collect())
}

/// Evaluate a non-empty, x-sorted curve at one point.
fn evaluate_sorted(x: &[f64], y: &[f64], t: f64) -> f64 {
    let n = x.len();
    if t.is_nan() {
        return f64::NAN;
    }
    if n == 1 || t <= x[0] {
        return y[0];
    }
    if t >= x[n - 1] {
        return y[n - 1];
    }

    // x[0] < t < x[n-1], so `hi` lands in 1..n.
    let hi = x.partition_point(|&xi| xi <= t);
    let lo = hi - 1;
    let (x0, x1) = (x[lo], x[hi]);
    let (y0, y1) = (y[lo], y[hi]);
    if t == x0 {
        return y0;
    }

    let width = x1 - x0;
    if !(width > 0.0) {
        // Zero-width bracket: step function favoring the right knot.
        return y1;
    }
    y0 + (y1 - y0) * (t - x0) / width
}

/// Direct lookup of a categorical contribution; unknown categories give 0.
pub fn lookup_category(y: &[f64], ordinal: Option<usize>) -> f64 {
    ordinal.and_then(|i| y.get(i).copied()).unwrap_or(0.0)
}

/// Per-sample contribution of one feature under `knots`.
///
/// A feature with no knots contributes 0 to every sample.
pub fn contributions(feature: &FeatureDescriptor, knots: &KnotSet) -> Vec<f64> {
    if knots.is_empty() {
        return vec![0.0; feature.scatter_x.len()];
    }

    if let Some(categories) = &feature.categories {
        return feature
            .scatter_x
            .iter()
            .map(|v| lookup_category(&knots.y, v.category_ordinal(categories)))
            .collect();
    }

    let targets: Vec<f64> = feature.scatter_x.iter().map(|v| v.as_number()).collect();
    // Non-empty and length-checked by construction; fall back to zeros otherwise.
    evaluate(knots, &targets).unwrap_or_else(|_| vec![0.0; targets.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScatterValue;
    use proptest::prelude::*;

    fn knots(x: &[f64], y: &[f64]) -> KnotSet {
        KnotSet::new(x.to_vec(), y.to_vec()).unwrap()
    }

    #[test]
    fn interpolates_between_two_knots() {
        let k = knots(&[0.0, 10.0], &[0.0, 100.0]);
        assert_eq!(evaluate(&k, &[5.0]).unwrap(), vec![50.0]);
    }

    #[test]
    fn extrapolates_flat_at_both_ends() {
        let k = knots(&[1.0, 2.0], &[3.0, 7.0]);
        assert_eq!(evaluate(&k, &[-5.0, 1.0, 2.0, 9.0]).unwrap(), vec![3.0, 3.0, 7.0, 7.0]);
    }

    #[test]
    fn single_knot_is_constant() {
        let k = knots(&[4.0], &[2.5]);
        assert_eq!(evaluate(&k, &[-1.0, 4.0, 100.0]).unwrap(), vec![2.5, 2.5, 2.5]);
    }

    #[test]
    fn empty_knots_are_a_caller_error() {
        assert_eq!(evaluate(&KnotSet::empty(), &[1.0]).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn duplicate_x_steps_to_the_right_knot() {
        let k = knots(&[0.0, 1.0, 1.0, 2.0], &[0.0, 10.0, 20.0, 20.0]);
        let v = evaluate(&k, &[1.0, 0.5]).unwrap();
        assert_eq!(v[0], 20.0);
        assert_eq!(v[1], 5.0);
    }

    #[test]
    fn nan_targets_propagate() {
        let k = knots(&[0.0, 1.0], &[0.0, 1.0]);
        assert!(evaluate(&k, &[f64::NAN]).unwrap()[0].is_nan());
    }

    #[test]
    fn unsorted_knots_are_sorted_before_use() {
        let k = knots(&[10.0, 0.0], &[100.0, 0.0]);
        assert_eq!(evaluate(&k, &[5.0]).unwrap(), vec![50.0]);
    }

    #[test]
    fn categorical_contributions_use_direct_lookup() {
        let feature = FeatureDescriptor {
            key: "season".into(),
            label: "Season".into(),
            scatter_x: vec![
                ScatterValue::Label("summer".into()),
                ScatterValue::Label("winter".into()),
                ScatterValue::Label("monsoon".into()),
            ],
            categories: Some(vec!["winter".into(), "summer".into()]),
        };
        let k = KnotSet::new(vec![0.0, 1.0], vec![-1.0, 2.0]).unwrap();
        assert_eq!(contributions(&feature, &k), vec![2.0, -1.0, 0.0]);
    }

    #[test]
    fn empty_knots_contribute_zero() {
        let feature = FeatureDescriptor {
            key: "t".into(),
            label: String::new(),
            scatter_x: vec![ScatterValue::Number(1.0), ScatterValue::Number(2.0)],
            categories: None,
        };
        assert_eq!(contributions(&feature, &KnotSet::empty()), vec![0.0, 0.0]);
    }

    fn sorted_knots() -> impl Strategy<Value = KnotSet> {
        prop::collection::btree_set(-1000i32..1000, 1..20).prop_flat_map(|xs| {
            let xs: Vec<f64> = xs.into_iter().map(f64::from).collect();
            let n = xs.len();
            prop::collection::vec(-100.0f64..100.0, n)
                .prop_map(move |ys| KnotSet::new(xs.clone(), ys).unwrap())
        })
    }

    proptest! {
        #[test]
        fn prop_knots_evaluate_to_their_own_y(k in sorted_knots()) {
            let v = evaluate(&k, &k.x).unwrap();
            prop_assert_eq!(v, k.y.clone());
        }

        #[test]
        fn prop_target_order_does_not_matter(
            k in sorted_knots(),
            targets in prop::collection::vec(-1500.0f64..1500.0, 0..30),
        ) {
            let forward = evaluate(&k, &targets).unwrap();
            let reversed_targets: Vec<f64> = targets.iter().rev().copied().collect();
            let mut backward = evaluate(&k, &reversed_targets).unwrap();
            backward.reverse();
            prop_assert_eq!(&forward, &backward);
            prop_assert_eq!(forward, evaluate(&k, &targets).unwrap());
        }
    }
}
