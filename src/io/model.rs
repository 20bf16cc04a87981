//! Read/write model result JSON files.
//!
//! A model file carries, per feature, the observed samples (`scatterX`) and the
//! editable curve (`editableX`/`editableY`). Older or partially populated files
//! may only have a dense grid (`gridX`/`curve`) or nothing at all; the baseline
//! reconstruction below handles all three. Fields this crate does not use are
//! round-tripped unchanged.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde_json::Value;

use crate::domain::{KnotSet, ModelResult, Partial};
use crate::error::AppError;
use crate::math::discretize;

pub fn read_model_json(path: &Path) -> Result<ModelResult, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open model JSON '{}': {e}", path.display())))?;
    let model: ModelResult =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid model JSON: {e}")))?;
    validate_model(&model)?;
    Ok(model)
}

pub fn write_model_json(path: &Path, model: &ModelResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create model JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, model).map_err(|e| AppError::new(2, format!("Failed to write model JSON: {e}")))?;
    Ok(())
}

/// Parse a model from an already decoded JSON value (artifact payloads).
pub fn model_from_value(value: Value) -> Result<ModelResult, AppError> {
    let model: ModelResult =
        serde_json::from_value(value).map_err(|e| AppError::new(2, format!("Invalid model payload: {e}")))?;
    validate_model(&model)?;
    Ok(model)
}

pub fn model_to_value(model: &ModelResult) -> Result<Value, AppError> {
    serde_json::to_value(model).map_err(|e| AppError::new(4, format!("Failed to encode model: {e}")))
}

fn validate_model(model: &ModelResult) -> Result<(), AppError> {
    let mut seen = std::collections::BTreeSet::new();
    for partial in &model.partials {
        if partial.key.is_empty() {
            return Err(AppError::new(2, "Model contains a feature with an empty key."));
        }
        if !seen.insert(partial.key.as_str()) {
            return Err(AppError::new(2, format!("Duplicate feature key '{}'.", partial.key)));
        }
    }
    Ok(())
}

/// Reconstruct the baseline curve of one feature.
///
/// Order of preference:
/// 1. `editableX`/`editableY` (both present, same length, non-empty)
/// 2. categorical features: `x = 0..N-1`, `y = 0`
/// 3. `gridX` with `curve` (zeros when `curve` is missing or mismatched),
///    resampled to `max_knots` evenly spaced points when denser than that
/// 4. an explicitly empty knot set
pub fn baseline_knots(partial: &Partial, max_knots: usize) -> KnotSet {
    if let (Some(x), Some(y)) = (&partial.editable_x, &partial.editable_y) {
        if !x.is_empty() && x.len() == y.len() {
            return KnotSet {
                x: x.clone(),
                y: y.clone(),
            }
            .sorted();
        }
    }

    if let Some(categories) = &partial.categories {
        return KnotSet::categorical(categories.len());
    }

    if let Some(grid) = partial.grid_x.as_ref().filter(|g| !g.is_empty()) {
        let curve = match &partial.curve {
            Some(c) if c.len() == grid.len() => c.clone(),
            _ => vec![0.0; grid.len()],
        };
        let dense = KnotSet {
            x: grid.clone(),
            y: curve,
        }
        .sorted();
        if max_knots >= 2 && dense.len() > max_knots {
            let (x, y) = discretize(&dense.x, &dense.y, max_knots);
            return KnotSet { x, y };
        }
        return dense;
    }

    KnotSet::empty()
}

/// Baseline curves of every feature, keyed by feature key.
pub fn baseline_curves(model: &ModelResult, max_knots: usize) -> BTreeMap<String, KnotSet> {
    model
        .partials
        .iter()
        .map(|p| (p.key.clone(), baseline_knots(p, max_knots)))
        .collect()
}

/// Copy of `model` with `editableX`/`editableY` overwritten from `curves`.
///
/// Features without an entry in `curves` are left as they were.
pub fn with_edits(model: &ModelResult, curves: &BTreeMap<String, KnotSet>) -> ModelResult {
    let mut out = model.clone();
    for partial in &mut out.partials {
        if let Some(curve) = curves.get(&partial.key) {
            partial.editable_x = Some(curve.x.clone());
            partial.editable_y = Some(curve.y.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn partial(value: Value) -> Partial {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn editable_points_win_and_are_sorted() {
        let p = partial(json!({
            "key": "age", "scatterX": [1, 2],
            "editableX": [2.0, 0.0], "editableY": [5.0, 1.0],
            "gridX": [0.0, 1.0], "curve": [9.0, 9.0]
        }));
        let k = baseline_knots(&p, 120);
        assert_eq!(k.x, vec![0.0, 2.0]);
        assert_eq!(k.y, vec![1.0, 5.0]);
    }

    #[test]
    fn grid_fallback_uses_zeros_for_mismatched_curve() {
        let p = partial(json!({
            "key": "age", "editableX": [], "editableY": [],
            "gridX": [0.0, 1.0, 2.0], "curve": [1.0]
        }));
        assert_eq!(baseline_knots(&p, 120), KnotSet::new(vec![0.0, 1.0, 2.0], vec![0.0; 3]).unwrap());
    }

    #[test]
    fn dense_grid_is_resampled() {
        let grid: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let curve: Vec<f64> = grid.iter().map(|x| 2.0 * x).collect();
        let p = partial(json!({ "key": "age", "gridX": grid, "curve": curve }));
        let k = baseline_knots(&p, 11);
        assert_eq!(k.len(), 11);
        assert_eq!(k.x[1], 10.0);
        assert_eq!(k.y[1], 20.0);
    }

    #[test]
    fn categorical_without_curve_is_flat() {
        let p = partial(json!({ "key": "colour", "categories": ["r", "g", "b"] }));
        assert_eq!(baseline_knots(&p, 120), KnotSet::categorical(3));
    }

    #[test]
    fn nothing_usable_gives_empty_knots() {
        let p = partial(json!({ "key": "age", "gridX": [], "curve": [] }));
        assert!(baseline_knots(&p, 120).is_empty());
    }

    #[test]
    fn save_overwrites_editable_points_and_keeps_unknown_fields() {
        let model = model_from_value(json!({
            "dataset": "bike",
            "partials": [{ "key": "age", "trueSignal": null, "editableX": [0.0], "editableY": [0.0] }],
            "y": [1.0],
            "task": "regression"
        }))
        .unwrap();
        let mut curves = BTreeMap::new();
        curves.insert("age".to_string(), KnotSet::new(vec![0.0, 1.0], vec![3.0, 4.0]).unwrap());
        let saved = model_to_value(&with_edits(&model, &curves)).unwrap();
        assert_eq!(saved["dataset"], "bike");
        assert_eq!(saved["partials"][0]["editableY"], json!([3.0, 4.0]));
        assert!(saved["partials"][0].get("trueSignal").is_some());
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = model_from_value(json!({ "partials": [{ "key": "a" }, { "key": "a" }] })).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = model_from_value(json!({ "partials": [{ "key": "a", "editableX": [0.0], "editableY": [1.5] }] })).unwrap();
        write_model_json(&path, &model).unwrap();
        assert_eq!(read_model_json(&path).unwrap(), model);
    }
}
