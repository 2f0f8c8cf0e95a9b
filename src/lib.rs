//! # SnapLog
//!
//! Core of a photo-first cataloguing app: turn a camera capture into a small
//! JPEG, and keep the item it describes safe on the device until the backend
//! of record has it.
//!
//! # Architecture: Two Independent Engines
//!
//! ```text
//! capture ──► imaging::compress ──► compressed JPEG
//!                                        │
//!                       drafts::DraftStore (write-through, survives restart)
//!                                        │
//!                       sync::SyncDriver ──► CommitBackend ──► Item
//! ```
//!
//! The compression engine knows nothing about drafts, and the draft store
//! knows nothing about images beyond the path it was handed. Either can be
//! embedded on its own.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Budgeted JPEG compression: resize plan, quality ladder, `image`-crate backend |
//! | [`drafts`] | Offline draft queue persisted through a [`storage::KeyValueStore`] |
//! | [`storage`] | Key-value persistence: atomic file store and in-memory store |
//! | [`sync`] | Sync driver: connectivity flag, retry policy, per-draft outcomes |
//! | [`commit`] | Filesystem backend of record used by the CLI |
//! | [`config`] | `snaplog.toml` loading, merging over stock defaults, validation |
//! | [`types`] | Records shared across modules (`Draft`, `DraftItem`, `Item`) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Quality Ladder Over Binary Search
//!
//! Compression tries a short, fixed list of qualities from best to worst and
//! keeps the first file under budget. Four encodes at most, predictable
//! output names, and the result is always one of a handful of known
//! qualities. When nothing fits, the lowest rung is kept rather than failing:
//! a slightly large photo is better than no photo.
//!
//! ## Blocking APIs, Parallelism at the Edges
//!
//! Compression is CPU-bound and synchronous. Callers that must stay
//! responsive run it on a worker thread; batches go through
//! [`imaging::compress_all`], which fans out over rayon.
//!
//! ## Write-Through Draft Queue
//!
//! Every queue mutation is persisted before it becomes visible, so the
//! in-memory queue never runs ahead of what a restart would reload. A failed
//! write leaves both unchanged and surfaces as an error.

pub mod commit;
pub mod config;
pub mod drafts;
pub mod imaging;
pub mod output;
pub mod storage;
pub mod sync;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
