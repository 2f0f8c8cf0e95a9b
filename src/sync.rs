//! Draft sync driver.
//!
//! Pushes queued drafts to the backend of record and records the outcome in
//! the [`DraftStore`]. The driver owns no timers: whoever embeds it decides
//! when to call [`SyncDriver::sync_pending`] (app start, connectivity
//! regained, a periodic tick) or delivers the explicit foreground event via
//! [`SyncDriver::on_foreground`].
//!
//! ## Outcomes per draft
//!
//! | Backend says | Store transition |
//! |---|---|
//! | committed | draft removed, its local capture deleted, [`Item`] reported |
//! | failed | status `error`, `retry_count + 1` |
//!
//! Submission failures are expected and recoverable, so they are recorded
//! in the store and in the [`SyncReport`] instead of being returned as
//! errors. Storage failures are different: they abort the run.

use crate::config::SyncConfig;
use crate::drafts::{DraftStore, DraftStoreError};
use crate::storage::KeyValueStore;
use crate::types::{Draft, DraftItem, DraftStatus, Item};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why the backend did not accept a draft.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
    #[error("Backend rejected draft: {0}")]
    Rejected(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Somewhere drafts can be committed.
pub trait CommitBackend {
    /// Commit the item with its local image and return the stored record.
    fn submit(&self, item: &DraftItem, local_image: &Path) -> Result<Item, SubmitError>;
}

/// Online/offline flag fed by whatever watches connectivity.
#[derive(Debug)]
pub struct NetworkStatus {
    online: AtomicBool,
}

impl NetworkStatus {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Limits on automatic retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which automatic sync skips a draft.
    pub max_retries: Option<u32>,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_retries: config.max_retries,
        }
    }

    pub fn unbounded() -> Self {
        Self { max_retries: None }
    }

    pub fn exhausted(&self, draft: &Draft) -> bool {
        self.max_retries
            .is_some_and(|limit| draft.retry_count >= limit)
    }
}

/// A draft the backend refused this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDraft {
    pub local_id: String,
    pub retry_count: u32,
    pub reason: String,
}

/// What a sync run did.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Nothing was attempted because the device is offline.
    pub offline: bool,
    pub committed: Vec<Item>,
    pub failed: Vec<FailedDraft>,
    /// Drafts skipped because they hit the retry ceiling.
    pub exhausted: Vec<String>,
}

impl SyncReport {
    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offline {
            return write!(f, "offline, nothing sent");
        }
        write!(
            f,
            "{} committed, {} failed",
            self.committed.len(),
            self.failed.len()
        )?;
        if !self.exhausted.is_empty() {
            write!(f, ", {} over retry limit", self.exhausted.len())?;
        }
        Ok(())
    }
}

/// Drives drafts from the local queue to a [`CommitBackend`].
pub struct SyncDriver<'a, B: CommitBackend> {
    backend: &'a B,
    network: &'a NetworkStatus,
    policy: RetryPolicy,
}

impl<'a, B: CommitBackend> SyncDriver<'a, B> {
    pub fn new(backend: &'a B, network: &'a NetworkStatus, policy: RetryPolicy) -> Self {
        Self {
            backend,
            network,
            policy,
        }
    }

    /// Attempt every queued draft once, in queue order.
    pub fn sync_pending<S: KeyValueStore>(
        &self,
        store: &mut DraftStore<S>,
    ) -> Result<SyncReport, DraftStoreError> {
        if !self.network.is_online() {
            debug!(queued = store.len(), "offline, skipping sync");
            return Ok(SyncReport::offline());
        }

        let mut report = SyncReport::default();
        let queued: Vec<Draft> = store.drafts().to_vec();

        for draft in queued {
            if self.policy.exhausted(&draft) {
                debug!(local_id = %draft.local_id, retry_count = draft.retry_count, "retry limit reached");
                report.exhausted.push(draft.local_id);
                continue;
            }
            self.attempt(store, draft, &mut report)?;
        }

        info!(%report, "sync finished");
        Ok(report)
    }

    /// The app came back to the foreground: sync if the network allows.
    pub fn on_foreground<S: KeyValueStore>(
        &self,
        store: &mut DraftStore<S>,
    ) -> Result<SyncReport, DraftStoreError> {
        if !self.network.is_online() {
            return Ok(SyncReport::offline());
        }
        self.sync_pending(store)
    }

    /// User-requested retry of one draft. Ignores the retry ceiling.
    ///
    /// Returns `Ok(None)` when no draft has this id.
    pub fn retry<S: KeyValueStore>(
        &self,
        store: &mut DraftStore<S>,
        local_id: &str,
    ) -> Result<Option<SyncReport>, DraftStoreError> {
        let Some(draft) = store.get(local_id).cloned() else {
            return Ok(None);
        };

        if !self.network.is_online() {
            // Still mark it for the next automatic run
            store.update_draft_status(local_id, DraftStatus::Pending, None)?;
            return Ok(Some(SyncReport::offline()));
        }

        let mut report = SyncReport::default();
        self.attempt(store, draft, &mut report)?;
        Ok(Some(report))
    }

    fn attempt<S: KeyValueStore>(
        &self,
        store: &mut DraftStore<S>,
        draft: Draft,
        report: &mut SyncReport,
    ) -> Result<(), DraftStoreError> {
        if draft.sync_status == DraftStatus::Error {
            store.update_draft_status(&draft.local_id, DraftStatus::Pending, None)?;
        }

        match self
            .backend
            .submit(&draft.item, Path::new(&draft.local_image_uri))
        {
            Ok(item) => {
                store.remove_draft(&draft.local_id)?;
                // The backend holds its own copy now
                draft.discard_local_image();
                info!(local_id = %draft.local_id, id = %item.id, "draft committed");
                report.committed.push(item);
            }
            Err(e) => {
                let retry_count = draft.retry_count.saturating_add(1);
                store.update_draft_status(
                    &draft.local_id,
                    DraftStatus::Error,
                    Some(retry_count),
                )?;
                warn!(local_id = %draft.local_id, retry_count, error = %e, "draft sync failed");
                report.failed.push(FailedDraft {
                    local_id: draft.local_id,
                    retry_count,
                    reason: e.to_string(),
                });
            }
        }
        Ok(())
    }
}
