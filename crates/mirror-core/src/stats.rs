//! Counters for accepted, skipped and failed events

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::event::{Operation, SkipReason};

/// Live counters shared by the dispatcher and its tasks
#[derive(Debug, Default)]
pub struct EventStats {
    created: AtomicU64,
    modified: AtomicU64,
    removed: AtomicU64,
    renamed_away: AtomicU64,
    duplicate_create: AtomicU64,
    stale_remove: AtomicU64,
    outside_root: AtomicU64,
    attribute_only: AtomicU64,
    sync_failed: AtomicU64,
    hook_failed: AtomicU64,
}

/// Point-in-time copy of [`EventStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub created: u64,
    pub modified: u64,
    pub removed: u64,
    pub renamed_away: u64,
    pub duplicate_create: u64,
    pub stale_remove: u64,
    pub outside_root: u64,
    pub attribute_only: u64,
    pub sync_failed: u64,
    pub hook_failed: u64,
}

impl StatsSnapshot {
    pub fn accepted(&self) -> u64 {
        self.created + self.modified + self.removed + self.renamed_away
    }

    pub fn skipped(&self) -> u64 {
        self.duplicate_create + self.stale_remove + self.outside_root + self.attribute_only
    }
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self, op: Operation) {
        let counter = match op {
            Operation::Create => &self.created,
            Operation::Modify => &self.modified,
            Operation::Remove => &self.removed,
            Operation::RenameAway => &self.renamed_away,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, reason: SkipReason) {
        let counter = match reason {
            SkipReason::DuplicateCreate => &self.duplicate_create,
            SkipReason::StaleRemove => &self.stale_remove,
            SkipReason::OutsideRoot => &self.outside_root,
            SkipReason::AttributeOnly => &self.attribute_only,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_failure(&self) {
        self.sync_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hook_failure(&self) {
        self.hook_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            created: load(&self.created),
            modified: load(&self.modified),
            removed: load(&self.removed),
            renamed_away: load(&self.renamed_away),
            duplicate_create: load(&self.duplicate_create),
            stale_remove: load(&self.stale_remove),
            outside_root: load(&self.outside_root),
            attribute_only: load(&self.attribute_only),
            sync_failed: load(&self.sync_failed),
            hook_failed: load(&self.hook_failed),
        }
    }
}
