//! Per-feature curve states.
//!
//! - `baseline`: the loaded curve, written once per model load
//! - `committed`: the curve predictions are computed from
//! - `working`: the curve on screen, possibly mid-gesture
//!
//! Transitions consume the state and return the next one, so there is no
//! partially updated state to observe.

use crate::domain::KnotSet;
use crate::history::{Direction, HistoryEntry, KnotLayout};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEditState {
    baseline: KnotSet,
    committed: KnotSet,
    working: KnotSet,
    /// Baseline plus any history entries evicted by the ledger limit.
    replay_origin: KnotSet,
    layout: KnotLayout,
}

impl FeatureEditState {
    pub fn new(baseline: KnotSet) -> Self {
        let baseline = baseline.sorted();
        Self {
            committed: baseline.clone(),
            working: baseline.clone(),
            replay_origin: baseline.clone(),
            baseline,
            layout: KnotLayout::Resizable,
        }
    }

    /// Categorical features use [`KnotLayout::Fixed`].
    pub fn with_layout(self, layout: KnotLayout) -> Self {
        Self { layout, ..self }
    }

    pub fn layout(&self) -> KnotLayout {
        self.layout
    }

    pub fn baseline(&self) -> &KnotSet {
        &self.baseline
    }

    pub fn committed(&self) -> &KnotSet {
        &self.committed
    }

    pub fn working(&self) -> &KnotSet {
        &self.working
    }

    pub fn replay_origin(&self) -> &KnotSet {
        &self.replay_origin
    }

    /// True while `working` holds changes that have not been committed.
    pub fn is_dirty(&self) -> bool {
        self.working != self.committed
    }

    /// True once the committed curve differs from the baseline.
    pub fn is_edited(&self) -> bool {
        self.committed != self.baseline
    }

    /// Show an uncommitted curve.
    pub fn with_working(self, working: KnotSet) -> Self {
        Self { working, ..self }
    }

    /// Set both `working` and `committed` (discrete edits and history replay).
    pub fn with_curve(self, curve: KnotSet) -> Self {
        let curve = curve.sorted();
        Self {
            committed: curve.clone(),
            working: curve,
            ..self
        }
    }

    /// Promote `working` to `committed` (re-sorted).
    pub fn commit(self) -> Self {
        let working = self.working.sorted();
        Self {
            committed: working.clone(),
            working,
            ..self
        }
    }

    /// Throw away uncommitted changes.
    pub fn rollback(self) -> Self {
        Self {
            working: self.committed.clone(),
            ..self
        }
    }

    /// Reset both curves to the replay origin.
    pub fn replay_from_baseline(self) -> Self {
        let origin = self.replay_origin.clone();
        self.with_curve(origin)
    }

    /// Absorb an entry dropped off the front of the history.
    pub fn fold_into_origin(self, entry: &HistoryEntry) -> Self {
        let replay_origin = entry.apply(&self.replay_origin, Direction::After, self.layout);
        Self { replay_origin, ..self }
    }

    /// Start over from a stored replay origin; `baseline` is kept.
    pub fn rebased(self, origin: KnotSet) -> Self {
        let origin = origin.sorted();
        Self {
            committed: origin.clone(),
            working: origin.clone(),
            replay_origin: origin,
            ..self
        }
    }
}
