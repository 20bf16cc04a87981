//! Diff-based undo/redo ledger.
//!
//! Each entry stores, per touched knot, the value before and after the edit
//! (keyed by x) plus the delta between them. Undo and redo re-apply those
//! changes to the feature's current curve; deleting an arbitrary entry rebuilds
//! every curve from its replay origin.
//!
//! Replay precedence: when the knot still holds the source value the target is
//! written directly; when the knot has since moved, the stored delta is applied
//! relative to its current value. Both produce the same number when the knot
//! has not moved, the direct write just avoids rounding drift.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::domain::{DEFAULT_HISTORY_LIMIT, EditAction, KnotSet};
use crate::error::AppError;

/// One knot-level change.
///
/// - `before` and `after`: value edit
/// - only `after`: insertion
/// - only `before`: deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub x: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
}

impl Change {
    pub fn edit(x: f64, before: f64, after: f64) -> Self {
        Self {
            x,
            before: Some(before),
            after: Some(after),
            delta: Some(after - before),
        }
    }

    pub fn insertion(x: f64, after: f64) -> Self {
        Self {
            x,
            before: None,
            after: Some(after),
            delta: None,
        }
    }

    pub fn deletion(x: f64, before: f64) -> Self {
        Self {
            x,
            before: Some(before),
            after: None,
            delta: None,
        }
    }

    /// Fill in a missing delta from `before`/`after` (older cached histories).
    pub fn backfill_delta(&mut self) {
        if self.delta.is_none() {
            if let (Some(b), Some(a)) = (self.before, self.after) {
                self.delta = Some(a - b);
            }
        }
    }
}

/// Which side of a change to move toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Undo: restore `before`.
    Before,
    /// Redo / replay: restore `after`.
    After,
}

/// Whether applying changes may add or remove knots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KnotLayout {
    #[default]
    Resizable,
    /// Categorical curves keep `x = 0..N`: value changes only.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub feature_key: String,
    pub action: EditAction,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<Change>,
}

impl HistoryEntry {
    pub fn apply(&self, curve: &KnotSet, direction: Direction, layout: KnotLayout) -> KnotSet {
        apply_changes(curve, &self.changes, direction, layout)
    }
}

/// Where undo/redo/replay read and write curves.
pub trait CurveStore {
    /// Curve every replay starts from (normally the baseline).
    fn replay_origin(&self, key: &str) -> Option<KnotSet>;
    /// Current edited curve.
    fn edited(&self, key: &str) -> Option<&KnotSet>;
    fn set_edited(&mut self, key: &str, curve: KnotSet);
    fn feature_keys(&self) -> Vec<String>;
    fn layout(&self, _key: &str) -> KnotLayout {
        KnotLayout::Resizable
    }
}

/// Outcome of [`HistoryLedger::record`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// No net difference; nothing was appended.
    Unchanged,
    /// Appended. `evicted` holds entries dropped off the front by the limit.
    Recorded { evicted: Vec<HistoryEntry> },
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryLedger {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    limit: usize,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLedger {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Rebuild a ledger from stored entries; the cursor is clamped.
    ///
    /// Entries beyond `limit` are dropped from the front. The dropped entries
    /// that were applied are returned, oldest first, so the caller can fold
    /// them into its replay origins; dropped undone entries are discarded.
    pub fn restore(entries: Vec<HistoryEntry>, cursor: usize, limit: usize) -> (Self, Vec<HistoryEntry>) {
        let limit = limit.max(1);
        let mut entries = entries;
        let mut cursor = cursor.min(entries.len());
        let mut evicted = Vec::new();
        if entries.len() > limit {
            let excess = entries.len() - limit;
            evicted = entries.drain(..excess).take(cursor).collect();
            cursor = cursor.saturating_sub(excess);
        }
        let ledger = Self {
            entries,
            cursor,
            limit,
        };
        (ledger, evicted)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of applied entries; `entries[..cursor]` are live.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Diff `before` against `after` and append the result.
    ///
    /// Entries past the cursor (undone edits) are discarded first.
    pub fn record(&mut self, feature_key: &str, before: &KnotSet, after: &KnotSet, action: EditAction) -> RecordOutcome {
        let changes = diff(before, after);
        if changes.is_empty() {
            return RecordOutcome::Unchanged;
        }

        self.entries.truncate(self.cursor);
        debug!(
            "history: record {} on '{feature_key}' ({} changes)",
            action.display_name(),
            changes.len()
        );
        self.entries.push(HistoryEntry {
            feature_key: feature_key.to_string(),
            action,
            timestamp: Utc::now(),
            changes,
        });

        let evicted = if self.entries.len() > self.limit {
            let excess = self.entries.len() - self.limit;
            self.entries.drain(..excess).collect()
        } else {
            Vec::new()
        };
        self.cursor = self.entries.len();
        RecordOutcome::Recorded { evicted }
    }

    /// Step back one entry. Returns the feature key that changed.
    pub fn undo(&mut self, store: &mut impl CurveStore) -> Option<String> {
        if self.cursor == 0 {
            return None;
        }
        let entry = &self.entries[self.cursor - 1];
        let key = entry.feature_key.clone();
        let layout = store.layout(&key);
        let next = store.edited(&key).map(|curve| entry.apply(curve, Direction::Before, layout));
        if let Some(next) = next {
            store.set_edited(&key, next);
        }
        self.cursor -= 1;
        debug!("history: undo -> cursor {}", self.cursor);
        Some(key)
    }

    /// Step forward one entry. Returns the feature key that changed.
    pub fn redo(&mut self, store: &mut impl CurveStore) -> Option<String> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        let entry = &self.entries[self.cursor];
        let key = entry.feature_key.clone();
        let layout = store.layout(&key);
        let next = store.edited(&key).map(|curve| entry.apply(curve, Direction::After, layout));
        if let Some(next) = next {
            store.set_edited(&key, next);
        }
        self.cursor += 1;
        debug!("history: redo -> cursor {}", self.cursor);
        Some(key)
    }

    /// Remove entry `index` and rebuild every curve by replay.
    ///
    /// The cursor keeps pointing at the same logical position: deleting an
    /// applied entry moves it back by one, deleting an undone entry leaves it.
    pub fn delete_entry(&mut self, index: usize, store: &mut impl CurveStore) -> Result<HistoryEntry, AppError> {
        if index >= self.entries.len() {
            return Err(AppError::new(
                2,
                format!("History entry {index} does not exist ({} entries).", self.entries.len()),
            ));
        }
        let removed = self.entries.remove(index);
        if index < self.cursor {
            self.cursor -= 1;
        }
        self.replay(store);
        debug!("history: deleted entry {index}, cursor {}", self.cursor);
        Ok(removed)
    }

    /// Reset every curve to its replay origin and re-apply the live entries in order.
    pub fn replay(&self, store: &mut impl CurveStore) {
        for key in store.feature_keys() {
            if let Some(origin) = store.replay_origin(&key) {
                store.set_edited(&key, origin);
            }
        }
        for entry in &self.entries[..self.cursor] {
            let layout = store.layout(&entry.feature_key);
            let next = store
                .edited(&entry.feature_key)
                .map(|curve| entry.apply(curve, Direction::After, layout));
            if let Some(next) = next {
                store.set_edited(&entry.feature_key, next);
            }
        }
    }
}

fn same_value(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

/// Hash key for exact x matching (`-0.0` and `0.0` match).
fn x_key(x: f64) -> u64 {
    if x == 0.0 { 0f64.to_bits() } else { x.to_bits() }
}

/// Knot-by-knot diff matched by exact x.
pub fn diff(before: &KnotSet, after: &KnotSet) -> Vec<Change> {
    let mut pending: HashMap<u64, VecDeque<usize>> = HashMap::new();
    for (j, &x) in after.x.iter().enumerate() {
        pending.entry(x_key(x)).or_default().push_back(j);
    }

    let mut matched = vec![false; after.len()];
    let mut changes = Vec::new();
    for (x, yb) in before.points() {
        match pending.get_mut(&x_key(x)).and_then(|q| q.pop_front()) {
            Some(j) => {
                matched[j] = true;
                let ya = after.y[j];
                if !same_value(yb, ya) {
                    changes.push(Change::edit(x, yb, ya));
                }
            }
            None => changes.push(Change::deletion(x, yb)),
        }
    }
    for (j, was_matched) in matched.into_iter().enumerate() {
        if !was_matched {
            changes.push(Change::insertion(after.x[j], after.y[j]));
        }
    }
    changes
}

/// Apply `changes` toward one side and re-sort by x.
///
/// - target side absent: the knot at `x` is removed (no-op if it is gone)
/// - knot missing: it is inserted at the target value
/// - knot moved since recording and a delta exists: delta applied relative
/// - otherwise: the target value is written
pub fn apply_changes(curve: &KnotSet, changes: &[Change], direction: Direction, layout: KnotLayout) -> KnotSet {
    let mut out = curve.clone();
    for change in changes {
        let (source, target) = match direction {
            Direction::Before => (change.after, change.before),
            Direction::After => (change.before, change.after),
        };
        let pos = out.position_of(change.x);
        let resizable = layout == KnotLayout::Resizable;
        match (target, pos) {
            (None, Some(i)) if resizable => {
                out.x.remove(i);
                out.y.remove(i);
            }
            (Some(value), None) if resizable => {
                out.x.push(change.x);
                out.y.push(value);
            }
            (None, _) | (Some(_), None) => {}
            (Some(value), Some(i)) => {
                let current = out.y[i];
                out.y[i] = match (change.delta, source) {
                    (Some(delta), Some(source)) if !same_value(current, source) && current.is_finite() => {
                        match direction {
                            Direction::Before => current - delta,
                            Direction::After => current + delta,
                        }
                    }
                    _ => value,
                };
            }
        }
    }
    out.sort_by_x();
    out
}
