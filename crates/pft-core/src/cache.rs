//! Sync cache: a side table of what was last synchronized.
//!
//! Stored as `.pft-cache.json` in the project directory. The cache is never
//! a source of truth; deleting it only forces a full re-comparison.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CACHE_FILE_NAME;
use crate::error::Result;
use crate::models::FeedbackItem;

const CACHE_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub title: String,
    pub hash: String,
    pub synced_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl CacheEntry {
    fn is_synced(&self) -> bool {
        self.external_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

/// Counts reported by [`SyncCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub synced: usize,
    pub unsynced: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncCache {
    version: String,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
    #[serde(skip)]
    path: PathBuf,
}

/// Content hash over title, description and status.
///
/// 32-bit polynomial rolling hash (base 31) over the characters of
/// `title|description|status`, as eight hex digits.
pub fn content_hash(item: &FeedbackItem) -> String {
    let content = format!("{}|{}|{}", item.title, item.description, item.status);
    let hash = content
        .chars()
        .fold(0u32, |hash, ch| hash.wrapping_mul(31).wrapping_add(u32::from(ch)));
    format!("{hash:08x}")
}

impl SyncCache {
    /// Empty cache that will be stored in `project_dir`.
    pub fn new(project_dir: &Path) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            updated_at: None,
            entries: BTreeMap::new(),
            path: project_dir.join(CACHE_FILE_NAME),
        }
    }

    /// Load the cache of a project.
    ///
    /// A missing file gives an empty cache. A malformed file is logged and
    /// replaced by an empty cache on the next save.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CACHE_FILE_NAME);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::new(project_dir)),
            Err(error) => return Err(error.into()),
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(mut cache) => {
                cache.path = path;
                Ok(cache)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "Ignoring malformed sync cache");
                Ok(Self::new(project_dir))
            }
        }
    }

    pub fn save(&mut self) -> Result<()> {
        self.updated_at = Some(Utc::now());
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn get(&self, id: &str) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    pub fn set(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub fn delete(&mut self, id: &str) -> Option<CacheEntry> {
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries ordered by item id.
    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// True unless the item was recorded with identical hashed content.
    pub fn has_changed(&self, item: &FeedbackItem) -> bool {
        self.entries
            .get(&item.id)
            .is_none_or(|entry| entry.hash != content_hash(item))
    }

    /// Remember the item's current content as synchronized.
    pub fn record_sync(&mut self, item: &FeedbackItem) {
        self.set(CacheEntry {
            id: item.id.clone(),
            external_id: item.external_id().map(ToString::to_string),
            title: item.title.clone(),
            hash: content_hash(item),
            synced_at: Utc::now(),
            file_path: item.file_path.clone(),
        });
    }

    pub fn stats(&self) -> CacheStats {
        let total = self.entries.len();
        let synced = self.entries.values().filter(|entry| entry.is_synced()).count();
        CacheStats {
            total,
            synced,
            unsynced: total - synced,
        }
    }

    /// Drop entries whose file is gone. Entries without a file are kept.
    pub fn cleanup_orphans(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry
                .file_path
                .as_deref()
                .is_none_or(|path| path.exists())
        });
        before - self.entries.len()
    }

    /// Items with no entry or an entry without an external id.
    pub fn find_unsynced_items<'a>(&self, items: &'a [FeedbackItem]) -> Vec<&'a FeedbackItem> {
        items
            .iter()
            .filter(|item| self.entries.get(&item.id).is_none_or(|entry| !entry.is_synced()))
            .collect()
    }

    /// Items whose content differs from the recorded hash.
    pub fn find_modified_items<'a>(&self, items: &'a [FeedbackItem]) -> Vec<&'a FeedbackItem> {
        items.iter().filter(|item| self.has_changed(item)).collect()
    }
}
