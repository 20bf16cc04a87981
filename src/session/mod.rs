//! Interactive editing session.
//!
//! An `EditSession` owns everything one open model needs:
//! - per-feature curve states and selections
//! - the history ledger
//! - the in-progress gesture (at most one)
//! - the prediction worker handle and the latest report it produced
//!
//! Every edit applies synchronously. Committed changes are pushed to the
//! worker, which debounces them; `poll_prediction` picks up the newest result.

pub mod state;

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, info, warn};

use crate::domain::{
    EditAction, EditorConfig, FeatureDescriptor, KnotSet, ModelResult, MonotoneDirection, PredictionReport,
};
use crate::edit::{
    DragGesture, SelectionModel, SelectionPolicy, SmoothingBrush, align, enforce_monotonic, insert_midpoints,
    interpolate, zero,
};
use crate::error::AppError;
use crate::history::{CurveStore, HistoryCache, HistoryLedger, KnotLayout, RecordOutcome};
use crate::io::model::{baseline_knots, with_edits};
use crate::predict::{ModelInputs, PredictionRequest, PredictionWorker, compute};

pub use state::FeatureEditState;

/// Discrete edit applied to the active feature's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    Align,
    Interpolate,
    /// Categorical features only.
    Zero,
    Monotonic(MonotoneDirection),
    /// Continuous features only.
    InsertMidpoints,
}

impl EditOp {
    pub fn action(self) -> EditAction {
        match self {
            EditOp::Align => EditAction::Align,
            EditOp::Interpolate => EditAction::Interpolate,
            EditOp::Zero => EditAction::Zero,
            EditOp::Monotonic(direction) => direction.into(),
            EditOp::InsertMidpoints => EditAction::InsertMidpoints,
        }
    }
}

#[derive(Debug, Clone)]
enum Gesture {
    Drag { key: String, drag: DragGesture },
    Smooth { key: String, brush: SmoothingBrush },
}

impl Gesture {
    fn key(&self) -> &str {
        match self {
            Gesture::Drag { key, .. } | Gesture::Smooth { key, .. } => key,
        }
    }

    fn action(&self) -> EditAction {
        match self {
            Gesture::Drag { .. } => EditAction::Drag,
            Gesture::Smooth { .. } => EditAction::Smooth,
        }
    }
}

/// Curve states keyed by feature; the ledger reads and writes through this.
#[derive(Debug, Clone, Default)]
struct FeatureStates(BTreeMap<String, FeatureEditState>);

impl FeatureStates {
    fn get(&self, key: &str) -> Option<&FeatureEditState> {
        self.0.get(key)
    }

    fn update(&mut self, key: &str, f: impl FnOnce(FeatureEditState) -> FeatureEditState) {
        if let Some(state) = self.0.remove(key) {
            self.0.insert(key.to_string(), f(state));
        }
    }
}

impl CurveStore for FeatureStates {
    fn replay_origin(&self, key: &str) -> Option<KnotSet> {
        self.0.get(key).map(|s| s.replay_origin().clone())
    }

    fn edited(&self, key: &str) -> Option<&KnotSet> {
        self.0.get(key).map(FeatureEditState::committed)
    }

    fn set_edited(&mut self, key: &str, curve: KnotSet) {
        self.update(key, |s| s.with_curve(curve));
    }

    fn feature_keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    fn layout(&self, key: &str) -> KnotLayout {
        self.0.get(key).map_or(KnotLayout::Resizable, FeatureEditState::layout)
    }
}

#[derive(Debug)]
pub struct EditSession {
    model: ModelResult,
    config: EditorConfig,
    features: Vec<FeatureDescriptor>,
    states: FeatureStates,
    selections: BTreeMap<String, SelectionModel>,
    active: usize,
    ledger: HistoryLedger,
    gesture: Option<Gesture>,
    worker: Option<PredictionWorker>,
    latest: Option<PredictionReport>,
}

impl EditSession {
    /// Open a session with a background prediction worker.
    pub fn open(model: ModelResult, config: EditorConfig) -> Result<Self, AppError> {
        config.validate()?;
        let worker = PredictionWorker::spawn(config.debounce())?;
        let session = Self::build(model, config, Some(worker));
        session.request_prediction();
        Ok(session)
    }

    /// Open a session without a worker; use [`EditSession::recompute_now`].
    pub fn open_detached(model: ModelResult, config: EditorConfig) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self::build(model, config, None))
    }

    fn build(model: ModelResult, config: EditorConfig, worker: Option<PredictionWorker>) -> Self {
        let features = model.descriptors();
        let mut states = BTreeMap::new();
        let mut selections = BTreeMap::new();
        for partial in &model.partials {
            let baseline = baseline_knots(partial, config.grid_points);
            if baseline.is_empty() {
                warn!("feature '{}' has no curve data; it contributes nothing", partial.key);
            }
            let (policy, layout) = if partial.categories.is_some() {
                (SelectionPolicy::Free, KnotLayout::Fixed)
            } else {
                (SelectionPolicy::Contiguous, KnotLayout::Resizable)
            };
            states.insert(partial.key.clone(), FeatureEditState::new(baseline).with_layout(layout));
            selections.insert(partial.key.clone(), SelectionModel::new(policy));
        }
        info!(
            "session opened: {} features, {} samples, task {}",
            features.len(),
            model.y.len(),
            model.task.display_name()
        );
        Self {
            ledger: HistoryLedger::with_limit(config.history_limit),
            model,
            config,
            features,
            states: FeatureStates(states),
            selections,
            active: 0,
            gesture: None,
            worker,
            latest: None,
        }
    }

    /// Finalize any gesture, stop the worker and return the edited model.
    pub fn close(mut self) -> ModelResult {
        self.interrupt_gesture();
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        info!("session closed after {} history entries", self.ledger.len());
        self.edited_model()
    }

    pub fn model(&self) -> &ModelResult {
        &self.model
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn features(&self) -> &[FeatureDescriptor] {
        &self.features
    }

    pub fn feature(&self, key: &str) -> Option<&FeatureDescriptor> {
        self.features.iter().find(|f| f.key == key)
    }

    pub fn state(&self, key: &str) -> Option<&FeatureEditState> {
        self.states.get(key)
    }

    pub fn selection(&self, key: &str) -> Option<&SelectionModel> {
        self.selections.get(key)
    }

    pub fn history(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_feature(&self) -> Option<&FeatureDescriptor> {
        self.features.get(self.active)
    }

    /// Switch the active feature. A gesture in progress is committed first.
    pub fn set_active(&mut self, index: usize) -> Result<(), AppError> {
        if index >= self.features.len() {
            return Err(AppError::new(
                3,
                format!("Feature index {index} out of range ({} features).", self.features.len()),
            ));
        }
        if index != self.active {
            self.interrupt_gesture();
            self.active = index;
        }
        Ok(())
    }

    pub fn select_feature(&mut self, key: &str) -> Result<(), AppError> {
        let index = self
            .features
            .iter()
            .position(|f| f.key == key)
            .ok_or_else(|| AppError::new(3, format!("Unknown feature '{key}'.")))?;
        self.set_active(index)
    }

    /// Cycle to the next feature.
    pub fn next_feature(&mut self) -> Result<(), AppError> {
        if self.features.is_empty() {
            return Err(AppError::new(3, "Model has no features."));
        }
        self.set_active((self.active + 1) % self.features.len())
    }

    // --- selection ---

    pub fn click(&mut self, idx: usize, multi: bool) -> Result<(), AppError> {
        let key = self.active_key()?;
        self.check_index(&key, idx)?;
        if let Some(selection) = self.selections.get_mut(&key) {
            selection.click(idx, multi);
        }
        Ok(())
    }

    /// Brush selection; indices past the end of the curve are ignored.
    pub fn brush(&mut self, indices: &[usize], multi: bool) -> Result<(), AppError> {
        let key = self.active_key()?;
        let len = self.curve_len(&key);
        let valid: Vec<usize> = indices.iter().copied().filter(|&i| i < len).collect();
        if let Some(selection) = self.selections.get_mut(&key) {
            selection.brush(&valid, multi);
        }
        Ok(())
    }

    /// Replace the selection.
    pub fn select(&mut self, indices: &[usize]) -> Result<(), AppError> {
        let key = self.active_key()?;
        for &idx in indices {
            self.check_index(&key, idx)?;
        }
        if let Some(selection) = self.selections.get_mut(&key) {
            selection.set(indices.iter().copied());
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) -> Result<(), AppError> {
        let key = self.active_key()?;
        if let Some(selection) = self.selections.get_mut(&key) {
            selection.clear();
        }
        Ok(())
    }

    // --- discrete edits ---

    /// Apply `op` to the active feature's selection.
    ///
    /// Returns whether the curve changed (and a history entry was recorded).
    pub fn apply(&mut self, op: EditOp) -> Result<bool, AppError> {
        let key = self.active_key()?;
        self.ensure_idle(&key)?;
        let categorical = self.feature(&key).is_some_and(FeatureDescriptor::is_categorical);
        match (op, categorical) {
            (EditOp::Zero, false) => return Err(self.reject("Zero applies to categorical features only.")),
            (EditOp::InsertMidpoints, true) => {
                return Err(self.reject("Cannot insert points into a categorical feature."));
            }
            _ => {}
        }

        let selection = self.selections.get(&key).map(SelectionModel::indices).unwrap_or_default();
        if selection.is_empty() {
            debug!("{} on '{key}': empty selection", op.action().display_name());
            return Ok(false);
        }
        let Some(before) = self.states.get(&key).map(|s| s.committed().clone()) else {
            return Err(AppError::new(3, format!("Unknown feature '{key}'.")));
        };

        let after = match op {
            EditOp::Align => align(&before, &selection),
            EditOp::Interpolate => interpolate(&before, &selection),
            EditOp::Zero => zero(&before, &selection),
            EditOp::Monotonic(direction) => enforce_monotonic(&before, &selection, direction),
            EditOp::InsertMidpoints => insert_midpoints(&before, &selection),
        };

        if op == EditOp::InsertMidpoints {
            let selected_x: Vec<f64> = selection.iter().map(|&i| before.x[i]).collect();
            let remapped: Vec<usize> = selected_x.iter().filter_map(|&x| after.position_of(x)).collect();
            if let Some(sel) = self.selections.get_mut(&key) {
                sel.set(remapped);
            }
        }
        Ok(self.commit_edit(&key, &before, after, op.action()))
    }

    // --- drag gesture ---

    /// Start a drag at knot `idx`; `pointer` is the pointer position in knot
    /// index units and `radius` the raw falloff radius.
    pub fn begin_drag(&mut self, idx: usize, multi: bool, radius: f64, pointer: f64) -> Result<(), AppError> {
        let key = self.active_key()?;
        self.ensure_no_gesture()?;
        self.check_index(&key, idx)?;
        let Some(selection) = self.selections.get_mut(&key) else {
            return Err(AppError::new(3, format!("Unknown feature '{key}'.")));
        };
        let resolved = selection.resolve_drag(idx, multi);
        let Some(state) = self.states.get(&key) else {
            return Err(AppError::new(3, format!("Unknown feature '{key}'.")));
        };
        let drag = DragGesture::begin(state.working(), &resolved.targets, pointer, radius);
        debug!("drag on '{key}': targets {:?}", drag.targets());
        self.gesture = Some(Gesture::Drag { key, drag });
        Ok(())
    }

    /// Move the drag: targets end up `delta` away from where they started.
    pub fn update_drag(&mut self, delta: f64, pointer: f64) -> Result<(), AppError> {
        let Some(Gesture::Drag { key, drag }) = &self.gesture else {
            return Err(AppError::rejected("No drag in progress."));
        };
        let next = drag.apply(delta, pointer, &self.config);
        let key = key.clone();
        self.states.update(&key, |s| s.with_working(next));
        Ok(())
    }

    pub fn end_drag(&mut self) -> Result<bool, AppError> {
        if !matches!(self.gesture, Some(Gesture::Drag { .. })) {
            return Err(AppError::rejected("No drag in progress."));
        }
        Ok(self.finish_gesture())
    }

    // --- smoothing gesture ---

    pub fn begin_smooth(&mut self, center: f64, amount: f64, neighbors: f64) -> Result<(), AppError> {
        let key = self.active_key()?;
        self.ensure_no_gesture()?;
        let brush = SmoothingBrush::new(center, amount, neighbors);
        debug!("smooth on '{key}': center {center}, amount {}", brush.amount);
        self.gesture = Some(Gesture::Smooth { key, brush });
        Ok(())
    }

    pub fn move_smooth(&mut self, center: f64) -> Result<(), AppError> {
        match &mut self.gesture {
            Some(Gesture::Smooth { brush, .. }) => {
                brush.center = center;
                Ok(())
            }
            _ => Err(AppError::rejected("No smoothing in progress.")),
        }
    }

    /// Advance smoothing by `dt` seconds, compounding on the live curve.
    pub fn step_smooth(&mut self, dt: f64) -> Result<(), AppError> {
        let Some(Gesture::Smooth { key, brush }) = &self.gesture else {
            return Err(AppError::rejected("No smoothing in progress."));
        };
        let Some(state) = self.states.get(key) else {
            return Err(AppError::new(3, format!("Unknown feature '{key}'.")));
        };
        let next = brush.step(state.working(), dt, &self.config);
        let key = key.clone();
        self.states.update(&key, |s| s.with_working(next));
        Ok(())
    }

    pub fn end_smooth(&mut self) -> Result<bool, AppError> {
        if !matches!(self.gesture, Some(Gesture::Smooth { .. })) {
            return Err(AppError::rejected("No smoothing in progress."));
        }
        Ok(self.finish_gesture())
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Commit whatever the interrupted gesture last produced.
    pub fn interrupt_gesture(&mut self) -> bool {
        if self.gesture.is_none() {
            return false;
        }
        debug!("gesture interrupted; committing last state");
        self.finish_gesture()
    }

    fn finish_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        let key = gesture.key().to_string();
        let Some(state) = self.states.get(&key) else {
            return false;
        };
        let before = state.committed().clone();
        let after = state.working().clone().sorted();
        self.commit_edit(&key, &before, after, gesture.action())
    }

    // --- history ---

    pub fn undo(&mut self) -> Result<Option<String>, AppError> {
        self.ensure_no_gesture()?;
        let key = self.ledger.undo(&mut self.states);
        if let Some(key) = &key {
            self.after_history_change(std::slice::from_ref(key));
        }
        Ok(key)
    }

    pub fn redo(&mut self) -> Result<Option<String>, AppError> {
        self.ensure_no_gesture()?;
        let key = self.ledger.redo(&mut self.states);
        if let Some(key) = &key {
            self.after_history_change(std::slice::from_ref(key));
        }
        Ok(key)
    }

    /// Remove history entry `index` and rebuild every curve by replay.
    pub fn delete_entry(&mut self, index: usize) -> Result<(), AppError> {
        self.ensure_no_gesture()?;
        self.ledger.delete_entry(index, &mut self.states)?;
        let keys = self.states.feature_keys();
        self.after_history_change(&keys);
        Ok(())
    }

    /// Snapshot of the history for the history cache.
    pub fn history_cache(&self) -> HistoryCache {
        HistoryCache {
            history: self.ledger.entries().to_vec(),
            history_cursor: self.ledger.cursor(),
            active_partial_idx: self.active,
            replay_origins: self
                .states
                .0
                .iter()
                .filter(|(_, s)| s.replay_origin() != s.baseline())
                .map(|(key, s)| (key.clone(), s.replay_origin().clone()))
                .collect(),
        }
    }

    /// Replace the history with a cached one and replay it from baseline.
    pub fn restore_history(&mut self, cache: HistoryCache) -> Result<(), AppError> {
        self.ensure_no_gesture()?;
        let mut origins = cache.replay_origins;
        for key in self.states.feature_keys() {
            let origin = origins.remove(&key);
            self.states.update(&key, |s| {
                let fresh = FeatureEditState::new(s.baseline().clone()).with_layout(s.layout());
                match origin {
                    Some(origin) => fresh.rebased(origin),
                    None => fresh,
                }
            });
        }
        for key in origins.keys() {
            warn!("cached replay origin for unknown feature '{key}' ignored");
        }
        let (ledger, evicted) = HistoryLedger::restore(cache.history, cache.history_cursor, self.config.history_limit);
        for entry in &evicted {
            self.states.update(&entry.feature_key, |s| s.fold_into_origin(entry));
        }
        self.ledger = ledger;
        self.ledger.replay(&mut self.states);
        if !self.features.is_empty() {
            self.active = cache.active_partial_idx.min(self.features.len() - 1);
        }
        info!(
            "restored {} history entries (cursor {})",
            self.ledger.len(),
            self.ledger.cursor()
        );
        let keys = self.states.feature_keys();
        self.after_history_change(&keys);
        Ok(())
    }

    // --- predictions ---

    /// Committed curves of every feature.
    pub fn edited_curves(&self) -> BTreeMap<String, KnotSet> {
        self.states
            .0
            .iter()
            .map(|(k, s)| (k.clone(), s.committed().clone()))
            .collect()
    }

    /// The model with `editableX`/`editableY` taken from the committed curves.
    pub fn edited_model(&self) -> ModelResult {
        with_edits(&self.model, &self.edited_curves())
    }

    pub fn prediction_request(&self) -> PredictionRequest {
        let mut inputs = ModelInputs::from(&self.model);
        inputs.partials = self.features.clone();
        let mut baseline_knots = BTreeMap::new();
        let mut knot_edits = BTreeMap::new();
        for (key, state) in &self.states.0 {
            baseline_knots.insert(key.clone(), state.baseline().clone());
            if state.is_edited() {
                knot_edits.insert(key.clone(), state.committed().clone());
            }
        }
        PredictionRequest {
            result: inputs,
            baseline_knots,
            knot_edits,
        }
    }

    /// Push the committed curves to the worker (no-op without one).
    pub fn request_prediction(&self) {
        if let Some(worker) = &self.worker {
            if let Err(e) = worker.submit(self.prediction_request()) {
                warn!("prediction request dropped: {e}");
            }
        }
    }

    /// Recompute synchronously on the calling thread.
    pub fn recompute_now(&mut self) -> &PredictionReport {
        self.latest.insert(compute(&self.prediction_request()))
    }

    /// Pick up the newest worker result, if any. Returns whether it changed.
    pub fn poll_prediction(&mut self) -> bool {
        match self.worker.as_ref().and_then(PredictionWorker::try_latest) {
            Some(report) => {
                self.latest = Some(report);
                true
            }
            None => false,
        }
    }

    /// Block up to `timeout` for the worker's next result.
    pub fn wait_prediction(&mut self, timeout: Duration) -> Option<&PredictionReport> {
        let report = self.worker.as_ref()?.wait_latest(timeout)?;
        Some(self.latest.insert(report))
    }

    pub fn latest_prediction(&self) -> Option<&PredictionReport> {
        self.latest.as_ref()
    }

    // --- internals ---

    fn active_key(&self) -> Result<String, AppError> {
        self.features
            .get(self.active)
            .map(|f| f.key.clone())
            .ok_or_else(|| AppError::new(3, "Model has no features."))
    }

    fn curve_len(&self, key: &str) -> usize {
        self.states.get(key).map_or(0, |s| s.working().len())
    }

    fn check_index(&self, key: &str, idx: usize) -> Result<(), AppError> {
        let len = self.curve_len(key);
        if idx >= len {
            return Err(AppError::new(
                2,
                format!("Knot index {idx} out of range for '{key}' ({len} knots)."),
            ));
        }
        Ok(())
    }

    fn reject(&self, message: &str) -> AppError {
        warn!("edit rejected: {message}");
        AppError::rejected(message)
    }

    fn ensure_no_gesture(&self) -> Result<(), AppError> {
        match &self.gesture {
            Some(g) => Err(self.reject(&format!("A gesture on '{}' has not been finalized.", g.key()))),
            None => Ok(()),
        }
    }

    fn ensure_idle(&self, key: &str) -> Result<(), AppError> {
        match &self.gesture {
            Some(g) if g.key() == key => Err(self.reject(&format!("A gesture on '{key}' has not been finalized."))),
            _ => Ok(()),
        }
    }

    /// Record `before -> after`, install `after` and notify the worker.
    fn commit_edit(&mut self, key: &str, before: &KnotSet, after: KnotSet, action: EditAction) -> bool {
        let outcome = self.ledger.record(key, before, &after, action);
        self.states.update(key, |s| s.with_curve(after));
        match outcome {
            RecordOutcome::Unchanged => false,
            RecordOutcome::Recorded { evicted } => {
                for entry in &evicted {
                    self.states.update(&entry.feature_key, |s| s.fold_into_origin(entry));
                }
                self.request_prediction();
                true
            }
        }
    }

    fn after_history_change(&mut self, keys: &[String]) {
        for key in keys {
            let len = self.curve_len(key);
            if let Some(selection) = self.selections.get_mut(key) {
                selection.retain_below(len);
            }
        }
        self.request_prediction();
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::model::model_from_value;
    use serde_json::json;

    fn model() -> ModelResult {
        model_from_value(json!({
            "partials": [
                {
                    "key": "age", "label": "Age",
                    "scatterX": [0.0, 1.0, 2.0, 3.0, 4.0],
                    "editableX": [0.0, 1.0, 2.0, 3.0, 4.0],
                    "editableY": [0.0, 5.0, 2.0, 8.0, 1.0]
                },
                {
                    "key": "colour", "label": "Colour",
                    "categories": ["red", "blue", "green"],
                    "scatterX": ["red", "blue", "green", "red", "teal"],
                    "editableX": [0, 1, 2],
                    "editableY": [1.0, -1.0, 0.5]
                }
            ],
            "y": [1.0, 4.0, 3.0, 9.0, 1.0],
            "task": "regression"
        }))
        .unwrap()
    }

    fn session() -> EditSession {
        EditSession::open_detached(model(), EditorConfig::default()).unwrap()
    }

    fn committed(s: &EditSession, key: &str) -> Vec<f64> {
        s.state(key).unwrap().committed().y.clone()
    }

    #[test]
    fn categorical_features_use_free_selection() {
        let s = session();
        assert_eq!(s.selection("age").unwrap().policy(), SelectionPolicy::Contiguous);
        assert_eq!(s.selection("colour").unwrap().policy(), SelectionPolicy::Free);
    }

    #[test]
    fn zero_is_rejected_on_continuous_features() {
        let mut s = session();
        s.select(&[1]).unwrap();
        assert_eq!(s.apply(EditOp::Zero).unwrap_err().exit_code(), 5);
        assert!(s.history().is_empty());
    }

    #[test]
    fn align_records_one_entry() {
        let mut s = session();
        s.select(&[1, 2]).unwrap();
        assert!(s.apply(EditOp::Align).unwrap());
        assert_eq!(committed(&s, "age"), vec![0.0, 3.5, 3.5, 8.0, 1.0]);
        assert_eq!(s.history().len(), 1);

        // Nothing left to align.
        assert!(!s.apply(EditOp::Align).unwrap());
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn insert_midpoints_keeps_the_run_selected() {
        let mut s = session();
        s.select(&[1, 2]).unwrap();
        assert!(s.apply(EditOp::InsertMidpoints).unwrap());
        assert_eq!(s.state("age").unwrap().committed().len(), 6);
        assert_eq!(s.selection("age").unwrap().indices(), vec![1, 2, 3]);
    }

    #[test]
    fn drag_commits_once_and_undoes() {
        let mut s = session();
        s.begin_drag(1, false, 0.0, 1.0).unwrap();
        s.update_drag(1.0, 1.0).unwrap();
        s.update_drag(2.0, 1.0).unwrap();
        assert_eq!(s.state("age").unwrap().working().y[1], 7.0);
        assert_eq!(committed(&s, "age")[1], 5.0);

        assert!(s.end_drag().unwrap());
        assert_eq!(committed(&s, "age"), vec![0.0, 7.0, 2.0, 8.0, 1.0]);
        assert_eq!(s.history().len(), 1);

        s.undo().unwrap();
        assert_eq!(committed(&s, "age"), vec![0.0, 5.0, 2.0, 8.0, 1.0]);
    }

    #[test]
    fn edits_during_a_gesture_are_rejected() {
        let mut s = session();
        s.select(&[1, 2]).unwrap();
        s.begin_drag(1, false, 0.0, 1.0).unwrap();
        assert_eq!(s.apply(EditOp::Align).unwrap_err().exit_code(), 5);
        assert_eq!(s.undo().unwrap_err().exit_code(), 5);
        assert_eq!(s.begin_smooth(2.0, 0.5, 2.0).unwrap_err().exit_code(), 5);
    }

    #[test]
    fn interrupted_gesture_commits_last_state() {
        let mut s = session();
        s.begin_drag(3, false, 0.0, 3.0).unwrap();
        s.update_drag(-1.0, 3.0).unwrap();
        assert!(s.interrupt_gesture());
        assert!(!s.gesture_active());
        assert_eq!(committed(&s, "age")[3], 7.0);
        assert!(!s.state("age").unwrap().is_dirty());
    }

    #[test]
    fn switching_features_finalizes_the_gesture() {
        let mut s = session();
        s.begin_drag(0, false, 0.0, 0.0).unwrap();
        s.update_drag(1.0, 0.0).unwrap();
        s.select_feature("colour").unwrap();
        assert!(!s.gesture_active());
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn smoothing_ticks_compound() {
        let mut s = session();
        s.begin_smooth(2.0, 1.0, 2.0).unwrap();
        s.step_smooth(0.05).unwrap();
        let once = s.state("age").unwrap().working().y.clone();
        s.step_smooth(0.05).unwrap();
        let twice = s.state("age").unwrap().working().y.clone();
        assert_ne!(once, twice);
        assert!(s.end_smooth().unwrap());
        assert_eq!(s.history().entries()[0].action, EditAction::Smooth);
    }

    #[test]
    fn zero_on_categorical_feature() {
        let mut s = session();
        s.select_feature("colour").unwrap();
        s.click(0, false).unwrap();
        s.click(2, true).unwrap();
        assert!(s.apply(EditOp::Zero).unwrap());
        assert_eq!(committed(&s, "colour"), vec![0.0, -1.0, 0.0]);
        assert_eq!(s.apply(EditOp::InsertMidpoints).unwrap_err().exit_code(), 5);
    }

    #[test]
    fn unedited_session_predicts_baseline() {
        let mut s = session();
        let report = s.recompute_now();
        assert_eq!(report.base_model.preds, report.edited_model.preds);
    }

    #[test]
    fn history_cache_restores_curves() {
        let mut s = session();
        s.select(&[0, 3]).unwrap();
        s.apply(EditOp::Monotonic(MonotoneDirection::Increasing)).unwrap();
        s.select_feature("colour").unwrap();
        s.click(1, false).unwrap();
        s.apply(EditOp::Zero).unwrap();
        s.undo().unwrap();
        let cache = s.history_cache();
        let curves = s.edited_curves();

        let mut restored = session();
        restored.restore_history(cache).unwrap();
        assert_eq!(restored.edited_curves(), curves);
        assert_eq!(restored.history().cursor(), 1);
        assert_eq!(restored.active_index(), 1);
        assert_eq!(restored.redo().unwrap().as_deref(), Some("colour"));
    }
}
