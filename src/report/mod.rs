//! Reporting utilities: fit metrics and residual rankings.

pub mod format;

use serde::{Deserialize, Serialize};

use crate::domain::Task;

/// Fit quality of one set of predictions.
///
/// Regression fills `rmse`/`r2`, classification fills `acc`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acc: Option<f64>,
    pub count: usize,
}

/// Metrics over the samples where both target and prediction are finite.
pub fn compute_metrics(task: Task, y: &[f64], preds: &[f64]) -> Metrics {
    let pairs: Vec<(f64, f64)> = y
        .iter()
        .zip(preds)
        .map(|(&a, &b)| (a, b))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    let count = pairs.len();
    if count == 0 {
        return Metrics::default();
    }
    let n = count as f64;

    match task {
        Task::Classification => {
            let hits = pairs.iter().filter(|(a, b)| (*a >= 0.5) == (*b >= 0.5)).count();
            Metrics {
                acc: Some(hits as f64 / n),
                count,
                ..Metrics::default()
            }
        }
        Task::Regression => {
            let sse: f64 = pairs.iter().map(|(a, b)| (a - b).powi(2)).sum();
            let mean = pairs.iter().map(|(a, _)| a).sum::<f64>() / n;
            let sst: f64 = pairs.iter().map(|(a, _)| (a - mean).powi(2)).sum();
            let r2 = if sst != 0.0 { 1.0 - sse / sst } else { 0.0 };
            Metrics {
                rmse: Some((sse / n).sqrt()),
                r2: Some(r2),
                count,
                ..Metrics::default()
            }
        }
    }
}

/// One sample's residual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualRow {
    pub index: usize,
    pub observed: f64,
    pub predicted: f64,
    pub residual: f64,
}

/// Largest residuals on each side (top-N each).
#[derive(Debug, Clone, Default)]
pub struct Rankings {
    /// Positive residuals: observed above prediction.
    pub under: Vec<ResidualRow>,
    /// Negative residuals: observed below prediction.
    pub over: Vec<ResidualRow>,
}

pub fn residual_rows(y: &[f64], preds: &[f64]) -> Vec<ResidualRow> {
    y.iter()
        .zip(preds)
        .enumerate()
        .map(|(index, (&observed, &predicted))| ResidualRow {
            index,
            observed,
            predicted,
            residual: observed - predicted,
        })
        .collect()
}

/// Rank samples by residual; non-finite residuals are left out.
pub fn rank_residuals(rows: &[ResidualRow], top_n: usize) -> Rankings {
    let mut sorted: Vec<ResidualRow> = rows.iter().copied().filter(|r| r.residual.is_finite()).collect();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));

    let under = sorted.iter().filter(|r| r.residual > 0.0).take(top_n).copied().collect();
    let over = sorted.iter().rev().filter(|r| r.residual < 0.0).take(top_n).copied().collect();

    Rankings { under, over }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn regression_metrics() {
        let m = compute_metrics(Task::Regression, &[1.0, 2.0, 3.0, f64::NAN], &[1.0, 2.0, 5.0, 1.0]);
        assert_eq!(m.count, 3);
        assert_abs_diff_eq!(m.rmse.unwrap(), (4.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.r2.unwrap(), 1.0 - 4.0 / 2.0, epsilon = 1e-12);
        assert!(m.acc.is_none());
    }

    #[test]
    fn constant_target_has_zero_r2() {
        let m = compute_metrics(Task::Regression, &[2.0, 2.0], &[1.0, 3.0]);
        assert_eq!(m.r2, Some(0.0));
    }

    #[test]
    fn classification_accuracy_thresholds_both_sides() {
        let m = compute_metrics(Task::Classification, &[1.0, 0.0, 1.0, 0.0], &[0.9, 0.2, 0.4, 0.5]);
        assert_eq!(m.acc, Some(0.5));
        assert_eq!(m.count, 4);
        assert!(m.rmse.is_none());
    }

    #[test]
    fn empty_input_gives_empty_metrics() {
        assert_eq!(compute_metrics(Task::Regression, &[], &[]), Metrics::default());
    }

    #[test]
    fn rankings_split_by_sign() {
        let rows = residual_rows(&[10.0, 0.0, 5.0, 1.0], &[5.0, 5.0, 5.0, f64::NAN]);
        let rankings = rank_residuals(&rows, 3);
        assert_eq!(rankings.under.len(), 1);
        assert_eq!(rankings.under[0].index, 0);
        assert_eq!(rankings.over.len(), 1);
        assert_eq!(rankings.over[0].index, 1);
    }
}
