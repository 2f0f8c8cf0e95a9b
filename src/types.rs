//! Shared record types.
//!
//! These types are serialized to JSON: drafts into the persisted queue,
//! committed items into the backend of record. Field names are camelCase on
//! the wire so the stored documents stay readable by other clients of the
//! same catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Physical condition of a catalogued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Condition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Condition::Excellent => "Excellent",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        };
        f.write_str(name)
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "excellent" => Ok(Condition::Excellent),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "poor" => Ok(Condition::Poor),
            _ => Err(format!(
                "unknown condition '{s}' (expected Excellent, Good, Fair, or Poor)"
            )),
        }
    }
}

/// Partially filled item fields, editable until the draft is committed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// Sync state of a draft still held locally.
///
/// There is no "synced" draft: a draft that commits is removed from the
/// queue and lives on as an [`Item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    Error,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftStatus::Pending => f.write_str("pending"),
            DraftStatus::Error => f.write_str("error"),
        }
    }
}

/// A locally captured item waiting to be committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub local_id: String,
    pub item: DraftItem,
    pub local_image_uri: String,
    pub sync_status: DraftStatus,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    /// New pending draft with a fresh id and no failed attempts.
    pub fn new(item: DraftItem, local_image_uri: impl Into<String>) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4().to_string(),
            item,
            local_image_uri: local_image_uri.into(),
            sync_status: DraftStatus::Pending,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Delete the captured image this draft points at.
    ///
    /// Called once the draft leaves the queue. A file that is already gone
    /// is fine; any other failure is logged and otherwise ignored, since the
    /// draft itself is already settled.
    pub fn discard_local_image(&self) {
        match std::fs::remove_file(&self.local_image_uri) {
            Ok(()) => debug!(path = %self.local_image_uri, "capture deleted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.local_image_uri, error = %e, "failed to delete capture"),
        }
    }
}

/// Sync state as recorded on a committed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSyncStatus {
    Synced,
    Pending,
    Error,
}

/// An item in the backend of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    pub category: String,
    pub color: String,
    pub condition: Condition,
    pub tags: Vec<String>,
    pub notes: String,
    pub image_url: String,
    pub image_path: String,
    pub ai_generated: bool,
    pub sync_status: ItemSyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
