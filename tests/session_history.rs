use std::time::{Duration, Instant};

use serde_json::json;

use shape_editor::domain::{EditorConfig, ModelResult};
use shape_editor::history::{decode, encode};
use shape_editor::io::model_from_value;
use shape_editor::session::{EditOp, EditSession};

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

fn detached() -> EditSession {
    EditSession::open_detached(model(), EditorConfig::default()).unwrap()
}

fn curve(s: &EditSession, key: &str) -> Vec<f64> {
    s.state(key).unwrap().committed().y.clone()
}

fn drag(s: &mut EditSession, idx: usize, delta: f64) {
    s.begin_drag(idx, false, 0.0, idx as f64).unwrap();
    s.update_drag(delta, idx as f64).unwrap();
    assert!(s.end_drag().unwrap());
}

#[test]
fn deleting_an_entry_replays_the_rest_from_baseline() {
    let mut s = detached();
    s.select(&[1, 2]).unwrap();
    s.apply(EditOp::Align).unwrap();
    drag(&mut s, 3, -2.0);
    s.select_feature("colour").unwrap();
    s.select(&[1]).unwrap();
    s.apply(EditOp::Zero).unwrap();
    assert_eq!(curve(&s, "age"), vec![0.0, 3.5, 3.5, 6.0, 1.0]);

    s.delete_entry(0).unwrap();
    assert_eq!(s.history().len(), 2);
    assert_eq!(s.history().cursor(), 2);
    assert_eq!(curve(&s, "age"), vec![0.0, 5.0, 2.0, 6.0, 1.0]);
    assert_eq!(curve(&s, "colour"), vec![1.0, 0.0, 0.5]);
}

#[test]
fn replay_keeps_relative_moves_on_changed_knots() {
    let mut s = detached();
    s.select(&[1, 2]).unwrap();
    s.apply(EditOp::Align).unwrap();
    s.clear_selection().unwrap();
    drag(&mut s, 1, 1.0);
    assert_eq!(curve(&s, "age"), vec![0.0, 4.5, 3.5, 8.0, 1.0]);

    // Without the align, the drag's +1 lands on the original 5.
    s.delete_entry(0).unwrap();
    assert_eq!(curve(&s, "age"), vec![0.0, 6.0, 2.0, 8.0, 1.0]);
}

#[test]
fn deleting_an_undone_entry_keeps_the_cursor() {
    let mut s = detached();
    drag(&mut s, 0, 1.0);
    drag(&mut s, 4, 1.0);
    s.undo().unwrap();
    assert_eq!(s.history().cursor(), 1);

    s.delete_entry(1).unwrap();
    assert_eq!(s.history().len(), 1);
    assert_eq!(s.history().cursor(), 1);
    assert!(!s.history().can_redo());
    assert_eq!(curve(&s, "age"), vec![1.0, 5.0, 2.0, 8.0, 1.0]);

    assert_eq!(s.delete_entry(5).unwrap_err().exit_code(), 2);
}

#[test]
fn inserted_midpoints_undo_and_redo() {
    let mut s = detached();
    s.select(&[1, 2]).unwrap();
    assert!(s.apply(EditOp::InsertMidpoints).unwrap());
    let inserted = s.state("age").unwrap().committed().clone();
    assert_eq!(inserted.x, vec![0.0, 1.0, 1.5, 2.0, 3.0, 4.0]);
    assert_eq!(inserted.y[2], 3.5);

    assert_eq!(s.undo().unwrap().as_deref(), Some("age"));
    assert_eq!(s.state("age").unwrap().committed().x, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert_eq!(curve(&s, "age"), vec![0.0, 5.0, 2.0, 8.0, 1.0]);

    s.redo().unwrap();
    assert_eq!(s.state("age").unwrap().committed(), &inserted);
}

#[test]
fn history_limit_evicts_oldest_without_losing_curves() {
    let config = EditorConfig {
        history_limit: 2,
        ..EditorConfig::default()
    };
    let mut s = EditSession::open_detached(model(), config).unwrap();
    drag(&mut s, 0, 1.0);
    drag(&mut s, 1, 1.0);
    drag(&mut s, 2, 1.0);
    assert_eq!(s.history().len(), 2);
    assert_eq!(curve(&s, "age"), vec![1.0, 6.0, 3.0, 8.0, 1.0]);

    // Replaying after a deletion starts from the evicted edits, not baseline.
    s.delete_entry(1).unwrap();
    assert_eq!(curve(&s, "age"), vec![1.0, 6.0, 2.0, 8.0, 1.0]);
}

#[test]
fn restored_history_keeps_edits_folded_by_the_limit() {
    let config = EditorConfig {
        history_limit: 2,
        ..EditorConfig::default()
    };
    let mut s = EditSession::open_detached(model(), config.clone()).unwrap();
    for pair in [[0, 1], [1, 2], [2, 3]] {
        s.select(&pair).unwrap();
        s.apply(EditOp::Align).unwrap();
    }
    let saved = vec![2.5, 2.25, 5.125, 5.125, 1.0];
    assert_eq!(curve(&s, "age"), saved);
    assert_eq!(s.history().len(), 2);

    let cache = decode(&encode(&s.history_cache()).unwrap()).unwrap();
    assert_eq!(cache.replay_origins["age"].y, vec![2.5, 2.5, 2.0, 8.0, 1.0]);
    assert!(!cache.replay_origins.contains_key("colour"));

    let mut same = EditSession::open_detached(model(), config).unwrap();
    same.restore_history(cache.clone()).unwrap();
    assert_eq!(curve(&same, "age"), saved);
    assert_eq!(same.history().len(), 2);

    // A tighter limit folds the overflow on restore.
    let tighter = EditorConfig {
        history_limit: 1,
        ..EditorConfig::default()
    };
    let mut narrow = EditSession::open_detached(model(), tighter).unwrap();
    narrow.restore_history(cache).unwrap();
    assert_eq!(curve(&narrow, "age"), saved);
    assert_eq!(narrow.history().len(), 1);
    narrow.undo().unwrap();
    assert_eq!(curve(&narrow, "age"), vec![2.5, 2.25, 2.25, 8.0, 1.0]);
    assert!(!narrow.history().can_undo());
}

#[test]
fn edited_model_carries_committed_knots() {
    let mut s = detached();
    s.select_feature("colour").unwrap();
    s.select(&[0, 2]).unwrap();
    s.apply(EditOp::Zero).unwrap();

    let edited = s.close();
    let colour = edited.partial("colour").unwrap();
    assert_eq!(colour.editable_y.as_deref(), Some(&[0.0, -1.0, 0.0][..]));
    let age = edited.partial("age").unwrap();
    assert_eq!(age.editable_y.as_deref(), Some(&[0.0, 5.0, 2.0, 8.0, 1.0][..]));
}

#[test]
fn background_worker_reports_edits() {
    let mut s = EditSession::open(model(), EditorConfig::default()).unwrap();
    let first = s.wait_prediction(Duration::from_secs(5)).cloned().unwrap();
    assert_eq!(first.base_model.preds, first.edited_model.preds);
    assert_eq!(first.residuals.len(), 5);

    s.select(&[1, 2]).unwrap();
    s.apply(EditOp::Align).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut updated = None;
    while Instant::now() < deadline {
        if let Some(report) = s.wait_prediction(Duration::from_millis(200)) {
            if report.edited_model.preds != report.base_model.preds {
                updated = Some(report.clone());
                break;
            }
        }
    }
    let report = updated.expect("worker never reported the edit");
    // Sample 1 sits on the aligned knot: 5 -> 3.5.
    let diff = report.base_model.preds[1] - report.edited_model.preds[1];
    assert!((diff - 1.5).abs() < 1e-9);
    assert_eq!(report.edited_model.intercept, report.base_model.intercept);
}
