// ABOUTME: Per-target release history: release id to lifecycle state.
// ABOUTME: Serialized as a JSON object ordered by release id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::ReleaseId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    /// Being built, not linked yet.
    Pending,
    /// Target of the `current` symlink.
    Current,
    /// Previously current, kept for rollback.
    Old,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseState::Pending => write!(f, "pending"),
            ReleaseState::Current => write!(f, "current"),
            ReleaseState::Old => write!(f, "old"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseHistory(BTreeMap<ReleaseId, ReleaseState>);

impl ReleaseHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn state(&self, release: &ReleaseId) -> Option<ReleaseState> {
        self.0.get(release).copied()
    }

    /// Releases oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&ReleaseId, ReleaseState)> {
        self.0.iter().map(|(id, state)| (id, *state))
    }

    pub fn insert_pending(&mut self, release: ReleaseId) {
        self.0.insert(release, ReleaseState::Pending);
    }

    pub fn remove(&mut self, release: &ReleaseId) -> Option<ReleaseState> {
        self.0.remove(release)
    }

    pub fn latest(&self) -> Option<&ReleaseId> {
        self.0.keys().next_back()
    }

    pub fn current(&self) -> Option<&ReleaseId> {
        self.0
            .iter()
            .find(|(_, state)| **state == ReleaseState::Current)
            .map(|(id, _)| id)
    }

    /// Most recent old release older than `current`.
    pub fn previous(&self) -> Option<&ReleaseId> {
        let current = self.current();
        self.0
            .iter()
            .rev()
            .filter(|(id, _)| current.is_none_or(|current| *id < current))
            .find(|(_, state)| **state == ReleaseState::Old)
            .map(|(id, _)| id)
    }

    /// Mark `release` current; the previous current becomes old.
    pub fn promote(&mut self, release: &ReleaseId) {
        for state in self.0.values_mut() {
            if *state == ReleaseState::Current {
                *state = ReleaseState::Old;
            }
        }
        self.0.insert(release.clone(), ReleaseState::Current);
    }

    /// Releases to delete so that at most `keep` releases older than
    /// `current` remain, oldest first.
    ///
    /// `extra` lists releases found on disk; unknown ones count as old.
    /// Pending releases newer than `current` are never evicted.
    pub fn evictable(&self, keep: usize, extra: &[ReleaseId]) -> Vec<ReleaseId> {
        let current = self.current();
        let mut candidates: Vec<ReleaseId> = self
            .0
            .iter()
            .filter(|(_, state)| **state != ReleaseState::Current)
            .map(|(id, _)| id.clone())
            .chain(extra.iter().filter(|id| !self.0.contains_key(*id)).cloned())
            .filter(|id| current.is_none_or(|current| id < current))
            .collect();
        candidates.sort();
        candidates.dedup();

        let excess = candidates.len().saturating_sub(keep);
        candidates.truncate(excess);
        candidates
    }
}
