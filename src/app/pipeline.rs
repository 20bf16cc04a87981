//! Shared "load, edit, predict" logic used by both the CLI and the TUI.
//!
//! Workflow:
//! model file (or synthetic sample) -> session -> optional history cache ->
//! edit script -> prediction report -> residual rankings
//!
//! The front-ends only deal with presentation.

use std::path::Path;

use log::{info, warn};
use serde_json::{Map, Value};

use crate::data::{SampleSpec, generate_model};
use crate::domain::{EditorConfig, ModelResult, PredictionReport};
use crate::error::AppError;
use crate::history::{HistoryCacheStore, cache_key};
use crate::io::{EditCommand, ScriptOutcome, read_model_json, run_script};
use crate::report::{Rankings, rank_residuals, residual_rows};
use crate::session::EditSession;

/// A model plus a label naming where it came from.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub model: ModelResult,
    pub source: String,
}

/// Everything `shapes predict` prints.
#[derive(Debug, Clone)]
pub struct PredictOutput {
    pub report: PredictionReport,
    pub rankings: Rankings,
}

/// Everything `shapes edit` prints or writes.
#[derive(Debug)]
pub struct EditOutput {
    pub session: EditSession,
    pub outcome: ScriptOutcome,
    pub predict: PredictOutput,
}

/// Read a model file, or generate the synthetic model when no path is given.
pub fn load_model(path: Option<&Path>, seed: u64) -> Result<LoadedModel, AppError> {
    match path {
        Some(path) => Ok(LoadedModel {
            model: read_model_json(path)?,
            source: path.display().to_string(),
        }),
        None => {
            let spec = SampleSpec {
                seed,
                ..SampleSpec::default()
            };
            Ok(LoadedModel {
                model: generate_model(&spec)?,
                source: format!("synthetic (seed {seed})"),
            })
        }
    }
}

/// History cache key for a model: its `source` tag (or the load label) plus
/// the scalar entries of the model's extra fields.
pub fn history_key(loaded: &LoadedModel) -> String {
    let source = loaded
        .model
        .extra
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or(&loaded.source);
    let params: Map<String, Value> = loaded
        .model
        .extra
        .iter()
        .filter(|(k, v)| k.as_str() != "source" && !v.is_array() && !v.is_object())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    cache_key(source, &params)
}

/// Open a session, resuming cached history when a cache directory is given.
///
/// `background` selects a worker-backed session; otherwise predictions are
/// computed on demand.
pub fn open_session(
    loaded: &LoadedModel,
    config: &EditorConfig,
    history_dir: Option<&Path>,
    background: bool,
) -> Result<EditSession, AppError> {
    let mut session = if background {
        EditSession::open(loaded.model.clone(), config.clone())?
    } else {
        EditSession::open_detached(loaded.model.clone(), config.clone())?
    };

    if let Some(dir) = history_dir {
        let store = HistoryCacheStore::new(dir);
        let key = history_key(loaded);
        if let Some(cache) = store.load(&key) {
            session.restore_history(cache)?;
        } else {
            info!("no cached history under key {key}");
        }
    }
    Ok(session)
}

/// Persist the session's history next to the other cached runs.
pub fn save_history(session: &EditSession, loaded: &LoadedModel, dir: &Path) -> Result<(), AppError> {
    let store = HistoryCacheStore::new(dir);
    let path = store.save(&history_key(loaded), &session.history_cache())?;
    info!("history saved to {}", path.display());
    Ok(())
}

/// Baseline vs edited predictions and the largest residuals.
pub fn run_predict(session: &mut EditSession, top_n: usize) -> PredictOutput {
    let y = session.model().y.clone();
    let report = session.recompute_now().clone();
    let rows = residual_rows(&y, &report.edited_model.preds);
    let rankings = rank_residuals(&rows, top_n);
    PredictOutput { report, rankings }
}

/// Run an edit script against a freshly opened session.
pub fn run_edit(
    loaded: &LoadedModel,
    config: &EditorConfig,
    commands: &[EditCommand],
    history_dir: Option<&Path>,
    top_n: usize,
) -> Result<EditOutput, AppError> {
    let mut session = open_session(loaded, config, history_dir, false)?;
    let outcome = run_script(&mut session, commands)?;
    if session.interrupt_gesture() {
        warn!("edit script left a gesture open; it was committed");
    }
    info!(
        "script ran {} commands, {} changed a curve",
        outcome.commands, outcome.changed
    );

    if let Some(dir) = history_dir {
        save_history(&session, loaded, dir)?;
    }

    let predict = run_predict(&mut session, top_n);
    Ok(EditOutput {
        session,
        outcome,
        predict,
    })
}
