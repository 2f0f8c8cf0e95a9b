//! Offline draft queue.
//!
//! Items captured while offline (or before their first successful upload)
//! live here as [`Draft`]s until the backend confirms a commit. The queue is
//! the only state that must survive a restart, so it is written through to a
//! [`KeyValueStore`] on every mutation and reloaded by [`DraftStore::open`].
//!
//! # Lifecycle
//!
//! ```text
//!   add_draft ──► pending ──submit fails──► error (retry_count + 1)
//!                    ▲                        │
//!                    └──────── retry ─────────┘
//!                    │
//!              submit succeeds
//!                    ▼
//!              remove_draft (committed item now owns the data)
//! ```
//!
//! # Storage format
//!
//! The whole queue is one JSON document under a single key:
//!
//! ```json
//! {"state": {"drafts": [ ... ]}, "version": 0}
//! ```
//!
//! Unlike a rebuildable cache, an unreadable queue is an error rather than an
//! empty start: silently dropping drafts would lose user captures.
//!
//! # Failure semantics
//!
//! A mutation first builds the new queue, writes it, and only then swaps it
//! in. If the write fails the in-memory queue is unchanged and the error is
//! returned to the caller.

use crate::storage::{KeyValueStore, StorageError};
use crate::types::{Draft, DraftItem, DraftStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Version of the persisted envelope. Bump when the draft layout changes
/// incompatibly.
const STORE_VERSION: u32 = 0;

#[derive(Error, Debug)]
pub enum DraftStoreError {
    #[error("Draft storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Stored draft queue under '{key}' is unreadable: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize draft queue: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Stored draft queue has unsupported version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    drafts: Vec<Draft>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: PersistedState,
    version: u32,
}

/// Durable queue of drafts awaiting commit.
///
/// One owner at a time: callers serialize mutations for a given draft.
#[derive(Debug)]
pub struct DraftStore<S: KeyValueStore> {
    storage: S,
    key: String,
    drafts: Vec<Draft>,
}

impl<S: KeyValueStore> DraftStore<S> {
    /// Load the queue stored under `key`. A missing key yields an empty queue.
    pub fn open(storage: S, key: impl Into<String>) -> Result<Self, DraftStoreError> {
        let key = key.into();
        let drafts = match storage.get(&key)? {
            None => Vec::new(),
            Some(raw) => decode(&key, &raw)?,
        };
        debug!(key = %key, count = drafts.len(), "draft queue loaded");
        Ok(Self {
            storage,
            key,
            drafts,
        })
    }

    /// Drafts in insertion order.
    pub fn drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn get(&self, local_id: &str) -> Option<&Draft> {
        self.drafts.iter().find(|d| d.local_id == local_id)
    }

    pub fn contains(&self, local_id: &str) -> bool {
        self.get(local_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Give the storage back, e.g. to reopen the queue from it.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Append a draft unless one with the same `local_id` is already queued.
    ///
    /// Returns `true` when the draft was added. Re-adding an existing id
    /// leaves the queued draft untouched and writes nothing.
    pub fn add_draft(&mut self, draft: Draft) -> Result<bool, DraftStoreError> {
        if self.contains(&draft.local_id) {
            debug!(local_id = %draft.local_id, "draft already queued");
            return Ok(false);
        }

        let local_id = draft.local_id.clone();
        let mut next = self.drafts.clone();
        next.push(draft);
        self.commit(next)?;
        debug!(local_id = %local_id, "draft added");
        Ok(true)
    }

    /// Remove a draft after its commit is confirmed.
    ///
    /// Returns `true` when a draft was removed; an unknown id is a no-op.
    pub fn remove_draft(&mut self, local_id: &str) -> Result<bool, DraftStoreError> {
        if !self.contains(local_id) {
            return Ok(false);
        }

        let next: Vec<Draft> = self
            .drafts
            .iter()
            .filter(|d| d.local_id != local_id)
            .cloned()
            .collect();
        self.commit(next)?;
        debug!(local_id = %local_id, "draft removed");
        Ok(true)
    }

    /// Set a draft's status, and its retry count when one is given.
    ///
    /// Without `retry_count` the stored count is kept. Returns `true` when
    /// the draft exists.
    pub fn update_draft_status(
        &mut self,
        local_id: &str,
        status: DraftStatus,
        retry_count: Option<u32>,
    ) -> Result<bool, DraftStoreError> {
        if !self.contains(local_id) {
            return Ok(false);
        }

        let next: Vec<Draft> = self
            .drafts
            .iter()
            .map(|d| {
                if d.local_id != local_id {
                    return d.clone();
                }
                Draft {
                    sync_status: status,
                    retry_count: retry_count.unwrap_or(d.retry_count),
                    ..d.clone()
                }
            })
            .collect();
        self.commit(next)?;
        debug!(local_id = %local_id, %status, ?retry_count, "draft status updated");
        Ok(true)
    }

    /// Change a queued draft's item fields in place.
    ///
    /// Status and retry count are left alone, so a draft the backend
    /// rejected can be fixed and then retried. Returns `true` when the draft
    /// exists; an unknown id writes nothing.
    pub fn edit_draft(
        &mut self,
        local_id: &str,
        edit: impl FnOnce(&mut DraftItem),
    ) -> Result<bool, DraftStoreError> {
        let Some(index) = self.drafts.iter().position(|d| d.local_id == local_id) else {
            return Ok(false);
        };

        let mut next = self.drafts.clone();
        edit(&mut next[index].item);
        self.commit(next)?;
        debug!(local_id = %local_id, "draft edited");
        Ok(true)
    }

    /// Drop every draft and delete the stored queue.
    pub fn clear(&mut self) -> Result<(), DraftStoreError> {
        self.storage.remove(&self.key)?;
        self.drafts.clear();
        debug!(key = %self.key, "draft queue cleared");
        Ok(())
    }

    /// Write `next` through to storage, then make it current.
    fn commit(&mut self, next: Vec<Draft>) -> Result<(), DraftStoreError> {
        let raw = encode(&next)?;
        self.storage.set(&self.key, &raw)?;
        self.drafts = next;
        Ok(())
    }
}

fn decode(key: &str, raw: &str) -> Result<Vec<Draft>, DraftStoreError> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|source| DraftStoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
    if envelope.version != STORE_VERSION {
        return Err(DraftStoreError::UnsupportedVersion {
            found: envelope.version,
            expected: STORE_VERSION,
        });
    }
    Ok(envelope.state.drafts)
}

fn encode(drafts: &[Draft]) -> Result<String, DraftStoreError> {
    let envelope = Envelope {
        state: PersistedState {
            drafts: drafts.to_vec(),
        },
        version: STORE_VERSION,
    };
    serde_json::to_string(&envelope).map_err(DraftStoreError::Serialize)
}
