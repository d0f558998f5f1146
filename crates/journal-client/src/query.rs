//! Query and mutation bookkeeping for the Entry Synchronizer.
//!
//! Slot<T>: one cached query result with a generation counter. Invalidation bumps the
//! generation; a fetch only lands if the generation it started under is still current.
//! MutationTracker: per-key pending/success/error status, and the in-flight gate.

use std::{collections::HashMap, fmt, sync::Mutex};

use anchor_lang::prelude::Pubkey;

use crate::{
    error::{JournalError, Result},
    program::TxSignature,
};

/// Cached state of one read query, as a UI would render it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum QueryState<T> {
    /// Never fetched, or invalidated since the last fetch.
    #[default]
    Idle,
    Ready(T),
    Failed(String),
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Idle)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Slot<T> {
    state     : QueryState<T>,
    generation: u64,
}

impl<T: Clone> Slot<T> {
    pub(crate) fn state(&self) -> QueryState<T> {
        self.state.clone()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn invalidate(&mut self) {
        self.generation += 1;
        self.state = QueryState::Idle;
    }

    /// Stores a fetch outcome started at `generation`; returns false if it was superseded.
    pub(crate) fn store(&mut self, generation: u64, outcome: &Result<T>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state = match outcome {
            Ok(data) => QueryState::Ready(data.clone()),
            Err(e)   => QueryState::Failed(e.to_string()),
        };
        true
    }
}

/// Identifies one mutation control: at most one call per key may be in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKey {
    Create,
    Update(Pubkey),
    Delete(Pubkey),
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKey::Create            => f.write_str("create"),
            MutationKey::Update(address)   => write!(f, "update of {address}"),
            MutationKey::Delete(address)   => write!(f, "delete of {address}"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success(TxSignature),
    Error(String),
}

#[derive(Debug, Default)]
pub(crate) struct MutationTracker {
    statuses: Mutex<HashMap<MutationKey, MutationStatus>>,
}

impl MutationTracker {
    /// Marks `key` pending, or refuses if a call for it is already in flight.
    pub(crate) fn begin(&self, key: MutationKey) -> Result<InFlight<'_>> {
        let mut statuses = lock(&self.statuses);
        let status = statuses.entry(key).or_default();
        if *status == MutationStatus::Pending {
            return Err(JournalError::MutationInFlight(key));
        }
        *status = MutationStatus::Pending;
        Ok(InFlight { tracker: self, key, finished: false })
    }

    pub(crate) fn status(&self, key: &MutationKey) -> MutationStatus {
        lock(&self.statuses).get(key).cloned().unwrap_or_default()
    }

    fn set(&self, key: MutationKey, status: MutationStatus) {
        lock(&self.statuses).insert(key, status);
    }
}

/// Pending marker for one mutation. Dropping it unfinished (a cancelled future) resets the key.
pub(crate) struct InFlight<'a> {
    tracker : &'a MutationTracker,
    key     : MutationKey,
    finished: bool,
}

impl InFlight<'_> {
    pub(crate) fn finish(mut self, outcome: &Result<TxSignature>) {
        let status = match outcome {
            Ok(sig) => MutationStatus::Success(sig.clone()),
            Err(e)  => MutationStatus::Error(e.to_string()),
        };
        self.tracker.set(self.key, status);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.tracker.set(self.key, MutationStatus::Idle);
        }
    }
}

/// Locks a cache mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
