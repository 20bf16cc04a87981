//! JSON edit scripts.
//!
//! A script is a JSON array of commands tagged by `op`, e.g.
//!
//! ```json
//! [
//!   {"op": "feature", "key": "age"},
//!   {"op": "brush", "indices": [3, 4, 5]},
//!   {"op": "monotonic", "direction": "increasing"},
//!   {"op": "drag", "index": 4, "delta": 0.5, "radius": 2},
//!   {"op": "undo"}
//! ]
//! ```
//!
//! Commands drive an `EditSession` exactly like the interactive editor does;
//! gestures (`drag`, `smooth`) run start to finish within one command.

use std::fs::File;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::MonotoneDirection;
use crate::error::AppError;
use crate::session::{EditOp, EditSession};

fn default_amount() -> f64 {
    0.5
}

fn default_neighbors() -> f64 {
    2.0
}

fn default_ticks() -> usize {
    30
}

fn default_dt() -> f64 {
    1.0 / 60.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    /// Make `key` the active feature.
    Feature { key: String },
    Click {
        index: usize,
        #[serde(default)]
        multi: bool,
    },
    Brush {
        indices: Vec<usize>,
        #[serde(default)]
        multi: bool,
    },
    Select { indices: Vec<usize> },
    Align,
    Interpolate,
    Zero,
    Monotonic { direction: MonotoneDirection },
    InsertMidpoints,
    /// One complete drag: grab `index`, move the pointer `travel` knots
    /// sideways and the targets by `delta`.
    Drag {
        index: usize,
        #[serde(default)]
        multi: bool,
        #[serde(default)]
        radius: f64,
        #[serde(default)]
        travel: f64,
        delta: f64,
    },
    /// One complete smoothing gesture of `ticks` steps of `dt` seconds.
    Smooth {
        center: f64,
        #[serde(default = "default_amount")]
        amount: f64,
        #[serde(default = "default_neighbors")]
        neighbors: f64,
        #[serde(default = "default_ticks")]
        ticks: usize,
        #[serde(default = "default_dt")]
        dt: f64,
    },
    Undo,
    Redo,
    DeleteEntry { index: usize },
}

/// What a script run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub commands: usize,
    /// Commands that changed a curve (edits, undo/redo, deletions).
    pub changed: usize,
}

pub fn read_script(path: &Path) -> Result<Vec<EditCommand>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open edit script '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid edit script: {e}")))
}

pub fn parse_script(text: &str) -> Result<Vec<EditCommand>, AppError> {
    serde_json::from_str(text).map_err(|e| AppError::new(2, format!("Invalid edit script: {e}")))
}

/// Run every command in order, stopping at the first failure.
///
/// The error keeps the failing command's exit code and names its position.
pub fn run_script(session: &mut EditSession, commands: &[EditCommand]) -> Result<ScriptOutcome, AppError> {
    let mut outcome = ScriptOutcome::default();
    for (i, command) in commands.iter().enumerate() {
        let changed = run_command(session, command)
            .map_err(|e| AppError::new(e.exit_code(), format!("Script command {}: {}", i + 1, e.message())))?;
        debug!("script command {}: {command:?} (changed: {changed})", i + 1);
        outcome.commands += 1;
        if changed {
            outcome.changed += 1;
        }
    }
    Ok(outcome)
}

fn run_command(session: &mut EditSession, command: &EditCommand) -> Result<bool, AppError> {
    match command {
        EditCommand::Feature { key } => session.select_feature(key).map(|_| false),
        EditCommand::Click { index, multi } => session.click(*index, *multi).map(|_| false),
        EditCommand::Brush { indices, multi } => session.brush(indices, *multi).map(|_| false),
        EditCommand::Select { indices } => session.select(indices).map(|_| false),
        EditCommand::Align => session.apply(EditOp::Align),
        EditCommand::Interpolate => session.apply(EditOp::Interpolate),
        EditCommand::Zero => session.apply(EditOp::Zero),
        EditCommand::Monotonic { direction } => session.apply(EditOp::Monotonic(*direction)),
        EditCommand::InsertMidpoints => session.apply(EditOp::InsertMidpoints),
        EditCommand::Drag {
            index,
            multi,
            radius,
            travel,
            delta,
        } => {
            let origin = *index as f64;
            session.begin_drag(*index, *multi, *radius, origin)?;
            session.update_drag(*delta, origin + travel)?;
            session.end_drag()
        }
        EditCommand::Smooth {
            center,
            amount,
            neighbors,
            ticks,
            dt,
        } => {
            session.begin_smooth(*center, *amount, *neighbors)?;
            for _ in 0..*ticks {
                session.step_smooth(*dt)?;
            }
            session.end_smooth()
        }
        EditCommand::Undo => session.undo().map(|key| key.is_some()),
        EditCommand::Redo => session.redo().map(|key| key.is_some()),
        EditCommand::DeleteEntry { index } => session.delete_entry(*index).map(|_| true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EditorConfig;
    use crate::io::model::model_from_value;
    use serde_json::json;

    fn session() -> EditSession {
        let model = model_from_value(json!({
            "partials": [{
                "key": "age",
                "scatterX": [0.0, 1.0, 2.0, 3.0],
                "editableX": [0.0, 1.0, 2.0, 3.0],
                "editableY": [0.0, 5.0, 2.0, 8.0]
            }],
            "y": [0.0, 5.0, 2.0, 8.0]
        }))
        .unwrap();
        EditSession::open_detached(model, EditorConfig::default()).unwrap()
    }

    #[test]
    fn parses_tagged_commands_with_defaults() {
        let commands = parse_script(
            r#"[{"op": "insert_midpoints"}, {"op": "smooth", "center": 1.5}, {"op": "delete_entry", "index": 0}]"#,
        )
        .unwrap();
        assert_eq!(commands[0], EditCommand::InsertMidpoints);
        match &commands[1] {
            EditCommand::Smooth { amount, ticks, .. } => {
                assert_eq!(*amount, 0.5);
                assert_eq!(*ticks, 30);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(commands[2], EditCommand::DeleteEntry { index: 0 });
    }

    #[test]
    fn runs_edits_and_history_commands() {
        let mut s = session();
        let commands = parse_script(
            r#"[
                {"op": "brush", "indices": [0, 3]},
                {"op": "monotonic", "direction": "increasing"},
                {"op": "select", "indices": [2]},
                {"op": "drag", "index": 2, "delta": 1.0},
                {"op": "undo"},
                {"op": "redo"}
            ]"#,
        )
        .unwrap();
        let outcome = run_script(&mut s, &commands).unwrap();
        assert_eq!(outcome.commands, 6);
        assert_eq!(outcome.changed, 4);
        assert_eq!(s.state("age").unwrap().committed().y, vec![0.0, 5.0, 6.0, 8.0]);
    }

    #[test]
    fn failure_names_the_command_and_keeps_the_code() {
        let mut s = session();
        let commands = parse_script(r#"[{"op": "align"}, {"op": "zero"}]"#).unwrap();
        let err = run_script(&mut s, &commands).unwrap_err();
        assert_eq!(err.exit_code(), 5);
        assert!(err.message().starts_with("Script command 2"));
    }
}
