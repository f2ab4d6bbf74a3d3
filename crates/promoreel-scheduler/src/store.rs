//! In-memory job record store.
//!
//! Each record sits behind its own lock so that one job's status updates never
//! wait on another's. The index lock is only held to insert or look up slots.
//! Records live for the lifetime of the process and are never removed.

use promoreel_core::{JobId, JobRecord, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Slot = Arc<RwLock<JobRecord>>;

#[derive(Default)]
struct Index {
    slots: HashMap<JobId, Slot>,
    /// Ids in insertion order.
    order: Vec<JobId>,
}

/// Shared store of every job submitted to this process.
#[derive(Default)]
pub struct JobStore {
    index: RwLock<Index>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new record for insertion. The returned writer is the only
    /// handle through which the record can be mutated.
    pub(crate) fn prepare(record: JobRecord) -> (PendingSlot, JobWriter) {
        let job_id = record.job_id();
        let slot = Arc::new(RwLock::new(record));
        (
            PendingSlot {
                job_id,
                slot: Arc::clone(&slot),
            },
            JobWriter { job_id, slot },
        )
    }

    /// Make a prepared record visible to readers.
    pub(crate) fn insert(&self, pending: PendingSlot) {
        let mut index = write(&self.index);
        if index.slots.insert(pending.job_id, pending.slot).is_none() {
            index.order.push(pending.job_id);
        }
    }

    /// Snapshot of one record.
    pub fn get(&self, job_id: &JobId) -> Option<JobRecord> {
        let slot = read(&self.index).slots.get(job_id).cloned()?;
        let record = read(&slot).clone();
        Some(record)
    }

    /// Snapshots of every record, oldest submission first.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let slots: Vec<Slot> = {
            let index = read(&self.index);
            index
                .order
                .iter()
                .filter_map(|id| index.slots.get(id).cloned())
                .collect()
        };
        slots.iter().map(|slot| read(slot).clone()).collect()
    }

    pub fn len(&self) -> usize {
        read(&self.index).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A record that has been created but not yet published to readers.
pub(crate) struct PendingSlot {
    job_id: JobId,
    slot: Slot,
}

impl PendingSlot {
    /// Block writers to the record while the guard is alive.
    pub(crate) fn hold(&self) -> RwLockReadGuard<'_, JobRecord> {
        read(&self.slot)
    }
}

/// Exclusive mutation handle for one job record, owned by the worker
/// running that job.
pub struct JobWriter {
    job_id: JobId,
    slot: Slot,
}

impl JobWriter {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// Apply a lifecycle transition and return the updated record.
    ///
    /// The record is left untouched if `f` fails.
    pub fn apply<F>(&mut self, f: F) -> Result<JobRecord>
    where
        F: FnOnce(&mut JobRecord) -> Result<()>,
    {
        let mut record = write(&self.slot);
        f(&mut *record)?;
        Ok(record.clone())
    }

    pub fn snapshot(&self) -> JobRecord {
        read(&self.slot).clone()
    }
}

// A poisoned lock only means a panic happened while it was held. Every
// transition validates before writing, so the record is still consistent.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
