//! Recompute baseline and edited predictions from knot sets.
//!
//! For both curve sets:
//! - every feature's contribution is evaluated at every sample
//! - contributions are summed into `totals`
//! - `preds = link(totals + intercept)`
//!
//! The intercept is derived once from the baseline pass (unless the model
//! supplies one) and reused for the edited pass, so edits move shape but never
//! the global offset.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureDescriptor, KnotSet, ModelResult, ModelSnapshot, PredictionReport, Task};
use crate::math::contributions;

/// Bracket searched for a classification intercept (logit units).
const INTERCEPT_BRACKET: (f64, f64) = (-12.0, 12.0);
const INTERCEPT_ITERS: usize = 40;
const TARGET_RATE_CLAMP: f64 = 1e-4;

/// Model facts the engine needs; everything else in a model result is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInputs {
    pub partials: Vec<FeatureDescriptor>,
    pub y: Vec<f64>,
    pub task: Task,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,
}

impl From<&ModelResult> for ModelInputs {
    fn from(model: &ModelResult) -> Self {
        Self {
            partials: model.descriptors(),
            y: model.y.clone(),
            task: model.task,
            intercept: model.intercept,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub result: ModelInputs,
    pub baseline_knots: BTreeMap<String, KnotSet>,
    /// Edited curves; features absent here use their baseline.
    pub knot_edits: BTreeMap<String, KnotSet>,
}

impl PredictionRequest {
    /// Number of samples: the target length, or the longest scatter array
    /// when no targets are known.
    pub fn sample_count(&self) -> usize {
        if !self.result.y.is_empty() {
            return self.result.y.len();
        }
        self.result
            .partials
            .iter()
            .map(|p| p.scatter_x.len())
            .max()
            .unwrap_or(0)
    }
}

/// Run both passes and compute residuals against the observed targets.
pub fn compute(request: &PredictionRequest) -> PredictionReport {
    let inputs = &request.result;
    let n = request.sample_count();

    let base_contribs = feature_contributions(&inputs.partials, &request.baseline_knots, n);
    let base_totals = sum_columns(&base_contribs, n);
    let intercept = inputs
        .intercept
        .unwrap_or_else(|| derive_intercept(inputs.task, &inputs.y, &base_totals));
    let base_model = snapshot(base_contribs, base_totals, intercept, inputs.task);

    let mut merged = request.baseline_knots.clone();
    for (key, knots) in &request.knot_edits {
        merged.insert(key.clone(), knots.clone());
    }
    let edited_contribs = feature_contributions(&inputs.partials, &merged, n);
    let edited_totals = sum_columns(&edited_contribs, n);
    let edited_model = snapshot(edited_contribs, edited_totals, intercept, inputs.task);

    let residuals = (0..n)
        .map(|i| inputs.y.get(i).copied().unwrap_or(f64::NAN) - edited_model.preds[i])
        .collect();

    PredictionReport {
        base_model,
        edited_model,
        residuals,
    }
}

/// One contribution array per feature (descriptor order), each of length `n`.
///
/// Features without knots contribute 0; short scatter arrays are padded with 0.
fn feature_contributions(
    features: &[FeatureDescriptor],
    knots: &BTreeMap<String, KnotSet>,
    n: usize,
) -> Vec<Vec<f64>> {
    features
        .par_iter()
        .map(|feature| {
            let mut column = match knots.get(&feature.key) {
                Some(k) => contributions(feature, k),
                None => Vec::new(),
            };
            column.resize(n, 0.0);
            column
        })
        .collect()
}

fn sum_columns(columns: &[Vec<f64>], n: usize) -> Vec<f64> {
    (0..n).map(|i| columns.iter().map(|c| c[i]).sum()).collect()
}

fn snapshot(contribs: Vec<Vec<f64>>, totals: Vec<f64>, intercept: f64, task: Task) -> ModelSnapshot {
    let preds = totals.iter().map(|&t| task.link(t + intercept)).collect();
    ModelSnapshot {
        contribs,
        totals,
        intercept,
        preds,
    }
}

/// Intercept implied by the baseline totals.
///
/// - regression: `mean(y - total)` over finite pairs
/// - classification: the offset whose mean predicted probability matches the
///   (clamped) observed positive rate, found by bisection
pub fn derive_intercept(task: Task, y: &[f64], totals: &[f64]) -> f64 {
    match task {
        Task::Regression => {
            let (sum, count) = y
                .iter()
                .zip(totals)
                .map(|(&yi, &ti)| yi - ti)
                .filter(|r| r.is_finite())
                .fold((0.0, 0usize), |(s, c), r| (s + r, c + 1));
            if count == 0 { 0.0 } else { sum / count as f64 }
        }
        Task::Classification => {
            let finite_totals: Vec<f64> = totals.iter().copied().filter(|t| t.is_finite()).collect();
            if finite_totals.is_empty() {
                return 0.0;
            }
            let observed: Vec<f64> = y.iter().copied().filter(|v| v.is_finite()).collect();
            let rate = if observed.is_empty() {
                0.5
            } else {
                observed.iter().sum::<f64>() / observed.len() as f64
            };
            let target = rate.clamp(TARGET_RATE_CLAMP, 1.0 - TARGET_RATE_CLAMP);

            let mean_prob = |b: f64| {
                finite_totals.iter().map(|&t| Task::Classification.link(t + b)).sum::<f64>()
                    / finite_totals.len() as f64
            };
            let (mut lo, mut hi) = INTERCEPT_BRACKET;
            for _ in 0..INTERCEPT_ITERS {
                let mid = 0.5 * (lo + hi);
                if mean_prob(mid) < target {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            0.5 * (lo + hi)
        }
    }
}
