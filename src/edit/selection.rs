//! Knot selection under contiguous and free policies.
//!
//! Every gesture (click, brush, drag) funnels through the same normalization
//! step, so a contiguous selection can never end up as disconnected islands.

use std::collections::BTreeSet;

/// How a selection reacts to additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Any selection is widened to the full range `[min, max]`.
    Contiguous,
    /// No normalization (categorical bars).
    Free,
}

/// Result of resolving a drag start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragResolution {
    /// Selection after the gesture.
    pub selection: Vec<usize>,
    /// Knots the drag moves at full weight.
    pub targets: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionModel {
    policy: SelectionPolicy,
    selected: BTreeSet<usize>,
}

impl SelectionModel {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            policy,
            selected: BTreeSet::new(),
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.selected.contains(&idx)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the selection outright (still normalized).
    pub fn set(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.selected = self.normalize(indices.into_iter().collect());
    }

    /// Point click.
    ///
    /// Without `multi`, an already selected knot keeps the current selection
    /// (so the whole selection can be dragged); otherwise the selection becomes
    /// `{idx}`. With `multi`, membership of `idx` is toggled.
    pub fn click(&mut self, idx: usize, multi: bool) {
        let next = self.next_after_click(idx, multi);
        self.selected = self.normalize(next);
    }

    /// Range brush: union with the selection when `multi`, replace otherwise.
    pub fn brush(&mut self, indices: &[usize], multi: bool) {
        let mut next = if multi { self.selected.clone() } else { BTreeSet::new() };
        next.extend(indices.iter().copied());
        self.selected = self.normalize(next);
    }

    /// Resolve the selection and drag targets for a drag starting at `idx`.
    ///
    /// A multi drag adds the grabbed knot instead of toggling it off.
    pub fn resolve_drag(&mut self, idx: usize, multi: bool) -> DragResolution {
        let next = if multi {
            let mut next = self.selected.clone();
            next.insert(idx);
            next
        } else {
            self.next_after_click(idx, false)
        };
        self.selected = self.normalize(next);

        let selection = self.indices();
        let targets = if selection.is_empty() { vec![idx] } else { selection.clone() };
        DragResolution { selection, targets }
    }

    /// Drop indices that no longer exist after the curve shrank.
    pub fn retain_below(&mut self, len: usize) {
        self.selected.retain(|&i| i < len);
        let next = std::mem::take(&mut self.selected);
        self.selected = self.normalize(next);
    }

    fn next_after_click(&self, idx: usize, multi: bool) -> BTreeSet<usize> {
        let mut next = self.selected.clone();
        if multi {
            if !next.remove(&idx) {
                next.insert(idx);
            }
        } else if !next.contains(&idx) {
            next.clear();
            next.insert(idx);
        }
        next
    }

    fn normalize(&self, set: BTreeSet<usize>) -> BTreeSet<usize> {
        match self.policy {
            SelectionPolicy::Free => set,
            SelectionPolicy::Contiguous => match (set.first(), set.last()) {
                (Some(&lo), Some(&hi)) => (lo..=hi).collect(),
                _ => set,
            },
        }
    }
}
