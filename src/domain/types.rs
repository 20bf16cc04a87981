//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during editing and recomputation
//! - written back to model JSON files
//! - shipped to the prediction worker as plain values

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Learning task of the additive model.
///
/// The task decides the link function applied to `totals + intercept`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    #[default]
    Regression,
    Classification,
}

impl Task {
    /// Identity for regression, logistic sigmoid for classification.
    ///
    /// NaN propagates through both links.
    pub fn link(self, eta: f64) -> f64 {
        match self {
            Task::Regression => eta,
            Task::Classification => 1.0 / (1.0 + (-eta).exp()),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Task::Regression => "regression",
            Task::Classification => "classification",
        }
    }
}

/// Direction for monotonic enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MonotoneDirection {
    Increasing,
    Decreasing,
}

/// What produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Align,
    Interpolate,
    Zero,
    MonotonicIncreasing,
    MonotonicDecreasing,
    InsertMidpoints,
    Drag,
    Smooth,
}

impl EditAction {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            EditAction::Align => "align",
            EditAction::Interpolate => "interpolate",
            EditAction::Zero => "zero",
            EditAction::MonotonicIncreasing => "monotonic (increasing)",
            EditAction::MonotonicDecreasing => "monotonic (decreasing)",
            EditAction::InsertMidpoints => "insert midpoints",
            EditAction::Drag => "drag",
            EditAction::Smooth => "smooth",
        }
    }
}

impl From<MonotoneDirection> for EditAction {
    fn from(value: MonotoneDirection) -> Self {
        match value {
            MonotoneDirection::Increasing => EditAction::MonotonicIncreasing,
            MonotoneDirection::Decreasing => EditAction::MonotonicDecreasing,
        }
    }
}

/// A piecewise-linear curve: parallel x and y sequences.
///
/// For categorical features `x` is the fixed ordinal sequence `0..N-1`.
/// Everything that consumes a knot set (interpolation, diffing, rendering)
/// expects it sorted by x; use [`KnotSet::sort_by_x`] after edits that may
/// reorder points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnotSet {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl KnotSet {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, AppError> {
        if x.len() != y.len() {
            return Err(AppError::new(
                2,
                format!("Knot length mismatch: {} x values vs {} y values.", x.len(), y.len()),
            ));
        }
        Ok(Self { x, y })
    }

    /// An explicitly empty knot set (feature without usable curve data).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flat categorical curve: `x = 0..n`, `y = 0`.
    pub fn categorical(n: usize) -> Self {
        Self {
            x: (0..n).map(|i| i as f64).collect(),
            y: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    /// Stable sort of the points by x (NaN x values sort last).
    pub fn sort_by_x(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut pairs: Vec<(f64, f64)> = self.points().collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (x, y) = pairs.into_iter().unzip();
        self.x = x;
        self.y = y;
    }

    pub fn sorted(mut self) -> Self {
        self.sort_by_x();
        self
    }

    pub fn is_sorted(&self) -> bool {
        self.x.windows(2).all(|w| w[0].total_cmp(&w[1]).is_le())
    }

    /// Index of the first knot whose x equals `x` exactly.
    pub fn position_of(&self, x: f64) -> Option<usize> {
        self.x.iter().position(|&xi| xi == x)
    }

    /// Finite min/max of the x coordinates.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        crate::math::finite_min_max(&self.x)
    }

    /// Finite min/max of the y values.
    pub fn y_range(&self) -> Option<(f64, f64)> {
        crate::math::finite_min_max(&self.y)
    }
}

/// A raw observed input value for one training sample.
///
/// Continuous features carry numbers; categorical features carry category
/// labels. `null` in JSON is kept as `Missing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScatterValue {
    Number(f64),
    Label(String),
    Missing,
}

impl ScatterValue {
    /// Numeric reading of the sample; labels are parsed, anything else is NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            ScatterValue::Number(v) => *v,
            ScatterValue::Label(s) => s.trim().parse().unwrap_or(f64::NAN),
            ScatterValue::Missing => f64::NAN,
        }
    }

    /// Category ordinal of the sample, if it names a known category.
    ///
    /// Labels are matched by name; numbers are rounded to an ordinal.
    pub fn category_ordinal(&self, categories: &[String]) -> Option<usize> {
        match self {
            ScatterValue::Label(s) => categories.iter().position(|c| c == s),
            ScatterValue::Number(v) => {
                let idx = v.round();
                if idx.is_finite() && idx >= 0.0 && (idx as usize) < categories.len() {
                    Some(idx as usize)
                } else {
                    None
                }
            }
            ScatterValue::Missing => None,
        }
    }
}

/// Immutable per-model metadata for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDescriptor {
    pub key: String,
    pub label: String,
    pub scatter_x: Vec<ScatterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl FeatureDescriptor {
    pub fn is_categorical(&self) -> bool {
        self.categories.is_some()
    }

    /// Display label, falling back to the key.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// One feature entry of a model result file.
///
/// Fields this crate does not interpret are preserved in `extra` so a
/// load/save round trip does not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partial {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub scatter_x: Vec<ScatterValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_x: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_y: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_x: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Vec<f64>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Partial {
    pub fn descriptor(&self) -> FeatureDescriptor {
        FeatureDescriptor {
            key: self.key.clone(),
            label: self.label.clone(),
            scatter_x: self.scatter_x.clone(),
            categories: self.categories.clone(),
        }
    }
}

/// A trained (or loaded) additive model result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f64>,
    pub partials: Vec<Partial>,
    /// Observed targets, one per training sample.
    #[serde(default)]
    pub y: Vec<f64>,
    #[serde(default)]
    pub task: Task,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelResult {
    pub fn descriptors(&self) -> Vec<FeatureDescriptor> {
        self.partials.iter().map(Partial::descriptor).collect()
    }

    pub fn partial(&self, key: &str) -> Option<&Partial> {
        self.partials.iter().find(|p| p.key == key)
    }
}

/// Per-sample model output for one set of curves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSnapshot {
    /// One array per feature (descriptor order), one value per sample.
    pub contribs: Vec<Vec<f64>>,
    pub totals: Vec<f64>,
    pub intercept: f64,
    pub preds: Vec<f64>,
}

/// Baseline vs edited predictions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionReport {
    pub base_model: ModelSnapshot,
    pub edited_model: ModelSnapshot,
    /// `observedY - editedPreds`.
    pub residuals: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knot_set_rejects_length_mismatch() {
        let err = KnotSet::new(vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn sort_by_x_keeps_pairs_together() {
        let mut knots = KnotSet::new(vec![2.0, 0.0, 1.0], vec![20.0, 0.0, 10.0]).unwrap();
        knots.sort_by_x();
        assert_eq!(knots.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(knots.y, vec![0.0, 10.0, 20.0]);
    }

    #[test]
    fn scatter_values_parse_from_mixed_json() {
        let values: Vec<ScatterValue> = serde_json::from_str(r#"[1.5, "red", null]"#).unwrap();
        assert_eq!(values[0], ScatterValue::Number(1.5));
        assert_eq!(values[1], ScatterValue::Label("red".to_string()));
        assert_eq!(values[2], ScatterValue::Missing);
        assert!(values[2].as_number().is_nan());
    }

    #[test]
    fn category_ordinal_by_label_and_number() {
        let cats = vec!["a".to_string(), "b".to_string()];
        assert_eq!(ScatterValue::Label("b".into()).category_ordinal(&cats), Some(1));
        assert_eq!(ScatterValue::Label("zzz".into()).category_ordinal(&cats), None);
        assert_eq!(ScatterValue::Number(0.9).category_ordinal(&cats), Some(1));
        assert_eq!(ScatterValue::Number(7.0).category_ordinal(&cats), None);
    }

    #[test]
    fn logistic_link_is_bounded() {
        assert_eq!(Task::Classification.link(0.0), 0.5);
        assert!(Task::Classification.link(1000.0) <= 1.0);
        assert!(Task::Classification.link(-1000.0) >= 0.0);
        assert!(Task::Classification.link(f64::NAN).is_nan());
    }

    #[test]
    fn model_result_preserves_unknown_fields() {
        let json = r#"{
            "dataset": "bike",
            "partials": [{"key": "hr", "label": "Hour", "scatterX": [1, 2], "trueSignal": null}],
            "y": [1.0, 2.0],
            "task": "regression"
        }"#;
        let model: ModelResult = serde_json::from_str(json).unwrap();
        assert_eq!(model.extra.get("dataset").and_then(|v| v.as_str()), Some("bike"));
        assert!(model.partials[0].extra.contains_key("trueSignal"));
        let back = serde_json::to_value(&model).unwrap();
        assert_eq!(back["dataset"], "bike");
    }
}
