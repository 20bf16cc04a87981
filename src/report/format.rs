//! Formatted terminal output.
//!
//! Formatting lives in one place so the editing and prediction code stays
//! free of presentation concerns.

use crate::domain::{ModelResult, PredictionReport, Task};
use crate::history::HistoryLedger;
use crate::report::{Metrics, Rankings, ResidualRow, compute_metrics};
use crate::session::EditSession;

/// Header: source, task, sample count and one line per feature.
pub fn format_model_summary(model: &ModelResult, source: &str) -> String {
    let mut out = String::new();

    out.push_str("=== shapes - additive model shape editor ===\n");
    out.push_str(&format!("Model: {source}\n"));
    out.push_str(&format!(
        "Task: {} | samples={} | features={}\n",
        model.task.display_name(),
        model.y.len(),
        model.partials.len()
    ));
    if let Some(b) = model.intercept {
        out.push_str(&format!("Intercept: {b:.6}\n"));
    }
    out.push('\n');

    out
}

/// Per-feature knot counts and edit status.
pub fn format_features(session: &EditSession) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<24} {:<12} {:>6} {:>8}", "feature", "kind", "knots", "edited"));
    out.push('\n');
    out.push_str(&format!("{:-<24} {:-<12} {:->6} {:->8}", "", "", "", ""));
    out.push('\n');

    for feature in session.features() {
        let Some(state) = session.state(&feature.key) else {
            continue;
        };
        let kind = if feature.is_categorical() { "categorical" } else { "continuous" };
        let edited = if state.is_edited() { "yes" } else { "" };
        out.push_str(
            format!(
                "{:<24} {:<12} {:>6} {:>8}",
                truncate(feature.display_label(), 24),
                kind,
                state.committed().len(),
                edited
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Baseline vs edited metrics.
pub fn format_metrics(task: Task, y: &[f64], report: &PredictionReport) -> String {
    let base = compute_metrics(task, y, &report.base_model.preds);
    let edited = compute_metrics(task, y, &report.edited_model.preds);

    let mut out = String::new();
    out.push_str(&format!("Intercept (held fixed): {:.6}\n", report.edited_model.intercept));
    out.push_str(&format!("{:<10} {}\n", "baseline", fmt_metrics(&base)));
    out.push_str(&format!("{:<10} {}\n", "edited", fmt_metrics(&edited)));
    out
}

/// One-line metrics, as shown in the editor footer too.
pub fn fmt_metrics(m: &Metrics) -> String {
    let mut parts = Vec::new();
    if let Some(rmse) = m.rmse {
        parts.push(format!("RMSE={rmse:.4}"));
    }
    if let Some(r2) = m.r2 {
        parts.push(format!("R2={r2:.4}"));
    }
    if let Some(acc) = m.acc {
        parts.push(format!("ACC={:.2}%", acc * 100.0));
    }
    parts.push(format!("n={}", m.count));
    parts.join(" ")
}

/// Largest residual tables.
pub fn format_rankings(rankings: &Rankings) -> String {
    let mut out = String::new();

    out.push_str("Largest under-predictions (positive residual):\n");
    out.push_str(&format_table(&rankings.under));
    out.push('\n');

    out.push_str("Largest over-predictions (negative residual):\n");
    out.push_str(&format_table(&rankings.over));

    out
}

fn format_table(rows: &[ResidualRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:>8} {:>12} {:>12} {:>12}", "sample", "observed", "predicted", "residual").trim_end());
    out.push('\n');
    out.push_str(format!("{:->8} {:->12} {:->12} {:->12}", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:>8} {:>12.4} {:>12.4} {:>12.4}",
                r.index, r.observed, r.predicted, r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }
    if rows.is_empty() {
        out.push_str("(none)\n");
    }

    out
}

/// History listing; `>` marks the entry the cursor sits after.
pub fn format_history(ledger: &HistoryLedger) -> String {
    let mut out = String::new();
    out.push_str(&format!("History: {} entries, cursor {}\n", ledger.len(), ledger.cursor()));

    for (i, entry) in ledger.entries().iter().enumerate() {
        let marker = if i + 1 == ledger.cursor() { ">" } else { " " };
        let state = if i < ledger.cursor() { "" } else { " (undone)" };
        out.push_str(&format!(
            "{marker} {i:>3} {} {:<22} {:<18} {} changes{state}\n",
            entry.timestamp.format("%H:%M:%S"),
            truncate(&entry.feature_key, 22),
            entry.action.display_name(),
            entry.changes.len()
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
