//! Filesystem backend of record.
//!
//! Commits drafts into a plain directory so the CLI can run the full
//! capture → draft → sync flow without a server:
//!
//! ```text
//! committed/
//! ├── images/<id>.jpg    # copy of the draft's compressed capture
//! └── items/<id>.json    # the committed Item
//! ```

use crate::storage::write_atomic;
use crate::sync::{CommitBackend, SubmitError};
use crate::types::{DraftItem, Item, ItemSyncStatus};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Narrows a listing of committed items.
///
/// Both criteria are case-insensitive and both must hold. `category` must
/// equal the item's category; `search` must occur in its title, notes,
/// color, or one of its tags. A blank criterion matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        let category_ok = match non_blank(&self.category) {
            Some(category) => item.category.trim().eq_ignore_ascii_case(category),
            None => true,
        };
        let search_ok = match non_blank(&self.search) {
            Some(query) => {
                let query = query.to_lowercase();
                let hit = |text: &str| text.to_lowercase().contains(&query);
                hit(&item.title)
                    || hit(&item.notes)
                    || hit(&item.color)
                    || item.tags.iter().any(|tag| hit(tag))
            }
            None => true,
        };
        category_ok && search_ok
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub struct LocalCommitBackend {
    root: PathBuf,
}

impl LocalCommitBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    pub fn items_dir(&self) -> PathBuf {
        self.root.join("items")
    }

    /// Every committed item, ordered by creation time.
    pub fn list_items(&self) -> Result<Vec<Item>, SubmitError> {
        let dir = self.items_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut items = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                let content = fs::read_to_string(&path)?;
                items.push(serde_json::from_str::<Item>(&content)?);
            }
        }
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    /// Committed items passing `filter`, ordered by creation time.
    pub fn find_items(&self, filter: &ItemFilter) -> Result<Vec<Item>, SubmitError> {
        let mut items = self.list_items()?;
        items.retain(|item| filter.matches(item));
        Ok(items)
    }
}

impl CommitBackend for LocalCommitBackend {
    fn submit(&self, draft: &DraftItem, local_image: &Path) -> Result<Item, SubmitError> {
        let title = draft.title.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return Err(SubmitError::Rejected("title is required".into()));
        }
        if !local_image.is_file() {
            return Err(SubmitError::Rejected(format!(
                "image not found: {}",
                local_image.display()
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let images = self.images_dir();
        let items = self.items_dir();
        fs::create_dir_all(&images)?;
        fs::create_dir_all(&items)?;

        let image_path = images.join(format!("{id}.jpg"));
        fs::copy(local_image, &image_path)?;

        let now = Utc::now();
        let item = Item {
            id: id.clone(),
            title: title.to_string(),
            category: draft.category.clone().unwrap_or_default(),
            color: draft.color.clone().unwrap_or_default(),
            condition: draft.condition.unwrap_or_default(),
            tags: draft.tags.clone(),
            notes: draft.notes.clone().unwrap_or_default(),
            image_url: draft
                .image_url
                .clone()
                .unwrap_or_else(|| image_path.display().to_string()),
            image_path: format!("images/{id}.jpg"),
            ai_generated: false,
            sync_status: ItemSyncStatus::Synced,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string_pretty(&item)?;
        let item_path = items.join(format!("{id}.json"));
        write_atomic(&item_path, json.as_bytes())?;

        debug!(id = %id, path = %item_path.display(), "item committed");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{create_test_jpeg, files_in};
    use crate::types::Condition;
    use tempfile::TempDir;

    fn titled(title: &str) -> DraftItem {
        DraftItem {
            title: Some(title.into()),
            ..DraftItem::default()
        }
    }

    #[test]
    fn commits_image_and_item() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("capture.jpg");
        create_test_jpeg(&image, 40, 30);
        let backend = LocalCommitBackend::new(tmp.path().join("committed"));

        let draft = DraftItem {
            category: Some("Lighting".into()),
            condition: Some(Condition::Excellent),
            tags: vec!["brass".into()],
            ..titled("Desk lamp")
        };
        let item = backend.submit(&draft, &image).unwrap();

        assert_eq!(item.title, "Desk lamp");
        assert_eq!(item.category, "Lighting");
        assert_eq!(item.condition, Condition::Excellent);
        assert_eq!(item.tags, vec!["brass"]);
        assert_eq!(item.sync_status, ItemSyncStatus::Synced);
        assert!(!item.ai_generated);
        assert_eq!(item.created_at, item.updated_at);

        let copied = backend.images_dir().join(format!("{}.jpg", item.id));
        assert_eq!(fs::read(&copied).unwrap(), fs::read(&image).unwrap());
        assert_eq!(files_in(&backend.items_dir()).len(), 1);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("capture.jpg");
        create_test_jpeg(&image, 10, 10);
        let backend = LocalCommitBackend::new(tmp.path());

        let item = backend.submit(&titled("  Mug "), &image).unwrap();
        assert_eq!(item.title, "Mug");
        assert_eq!(item.condition, Condition::Good);
        assert_eq!(item.category, "");
        assert!(item.tags.is_empty());
    }

    #[test]
    fn rejects_untitled_draft() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("capture.jpg");
        create_test_jpeg(&image, 10, 10);
        let backend = LocalCommitBackend::new(tmp.path().join("committed"));

        for draft in [DraftItem::default(), titled("   ")] {
            assert!(matches!(
                backend.submit(&draft, &image),
                Err(SubmitError::Rejected(_))
            ));
        }
        assert!(!tmp.path().join("committed").exists());
    }

    #[test]
    fn rejects_missing_image() {
        let tmp = TempDir::new().unwrap();
        let backend = LocalCommitBackend::new(tmp.path().join("committed"));

        let result = backend.submit(&titled("Chair"), &tmp.path().join("gone.jpg"));
        assert!(matches!(result, Err(SubmitError::Rejected(_))));
    }

    #[test]
    fn list_items_reads_back_commits() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("capture.jpg");
        create_test_jpeg(&image, 10, 10);
        let backend = LocalCommitBackend::new(tmp.path().join("committed"));
        assert!(backend.list_items().unwrap().is_empty());

        let first = backend.submit(&titled("One"), &image).unwrap();
        let second = backend.submit(&titled("Two"), &image).unwrap();

        let listed = backend.list_items().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&first));
        assert!(listed.contains(&second));
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    fn item(title: &str, category: &str, tags: &[&str], notes: &str) -> Item {
        let now = Utc::now();
        Item {
            id: title.to_lowercase(),
            title: title.into(),
            category: category.into(),
            color: "Brass".into(),
            condition: Condition::Good,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            notes: notes.into(),
            image_url: String::new(),
            image_path: String::new(),
            ai_generated: false,
            sync_status: ItemSyncStatus::Synced,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let lamp = item("Desk lamp", "Lighting", &[], "");
        assert!(ItemFilter::default().matches(&lamp));
        let blank = ItemFilter {
            category: Some("  ".into()),
            search: Some(String::new()),
        };
        assert!(blank.matches(&lamp));
    }

    #[test]
    fn category_filter_is_exact_but_case_insensitive() {
        let lamp = item("Desk lamp", "Lighting", &[], "");
        let filter = |c: &str| ItemFilter {
            category: Some(c.into()),
            ..ItemFilter::default()
        };
        assert!(filter("lighting").matches(&lamp));
        assert!(!filter("Light").matches(&lamp));
        assert!(!filter("Tools").matches(&lamp));
    }

    #[test]
    fn search_looks_at_title_notes_color_and_tags() {
        let lamp = item("Desk lamp", "Lighting", &["vintage"], "from the attic");
        let search = |q: &str| ItemFilter {
            search: Some(q.into()),
            ..ItemFilter::default()
        };
        assert!(search("LAMP").matches(&lamp));
        assert!(search("attic").matches(&lamp));
        assert!(search("brass").matches(&lamp));
        assert!(search("vint").matches(&lamp));
        assert!(!search("lighting").matches(&lamp));
        assert!(!search("chair").matches(&lamp));
    }

    #[test]
    fn both_criteria_must_hold() {
        let lamp = item("Desk lamp", "Lighting", &[], "");
        let filter = ItemFilter {
            category: Some("Tools".into()),
            search: Some("lamp".into()),
        };
        assert!(!filter.matches(&lamp));
    }

    #[test]
    fn find_items_filters_committed_items() {
        let tmp = TempDir::new().unwrap();
        let image = tmp.path().join("capture.jpg");
        create_test_jpeg(&image, 10, 10);
        let backend = LocalCommitBackend::new(tmp.path().join("committed"));
        backend
            .submit(
                &DraftItem {
                    category: Some("Lighting".into()),
                    ..titled("Desk lamp")
                },
                &image,
            )
            .unwrap();
        backend
            .submit(
                &DraftItem {
                    category: Some("Tools".into()),
                    ..titled("Hammer")
                },
                &image,
            )
            .unwrap();

        let found = backend
            .find_items(&ItemFilter {
                category: Some("tools".into()),
                ..ItemFilter::default()
            })
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Hammer");
        assert_eq!(backend.find_items(&ItemFilter::default()).unwrap().len(), 2);
    }
}
