//! Local item store: markdown records in an area directory.

mod parser;
mod slug;
mod writer;

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::{resolve_area_dir, Area};
use crate::error::{Error, Result};
use crate::models::FeedbackItem;
use crate::util::today;

pub use parser::{is_external_id_key, parse_item, parse_metadata_line};
pub use slug::{slug_from_file_stem, slug_from_title, slugs_overlap};
pub use writer::{
    apply_remote_fields, priority_from_votes, render_new_item, set_categories, set_section,
    set_title, stamp_external_id, summary_from_description,
};

const RECORD_EXTENSION: &str = "md";
const FALLBACK_SLUG: &str = "untitled";

/// Outcome of scanning an area directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub items: Vec<FeedbackItem>,
    /// Records that could not be read or parsed
    pub failures: Vec<PathBuf>,
}

/// Markdown records of one area below a root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
    area: Area,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>, area: Area) -> Self {
        Self {
            root: root.into(),
            area,
        }
    }

    /// Store for an area inside a project, using whichever directory layout exists.
    pub fn for_project(project_dir: &Path, area: Area) -> Self {
        Self::new(resolve_area_dir(project_dir, area), area)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn area(&self) -> Area {
        self.area
    }

    /// Recursively read every record below the root.
    ///
    /// A missing root yields no items. Unreadable records are logged and
    /// listed in [`ScanResult::failures`].
    pub fn scan(&self) -> Result<ScanResult> {
        let mut result = ScanResult::default();
        for path in self.record_paths()? {
            match self.read_item(&path) {
                Ok(item) => result.items.push(item),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "Skipping unreadable record");
                    result.failures.push(path);
                }
            }
        }
        Ok(result)
    }

    /// Read and parse one record.
    ///
    /// `updated_at` falls back to the file's modification time.
    pub fn read_item(&self, path: &Path) -> Result<FeedbackItem> {
        let content = fs::read_to_string(path)
            .map_err(|error| Error::parse(path, error.to_string()))?;
        let mut item = parse_item(&content, path)?;
        item.item_type = self.area.as_str().to_string();
        if item.updated_at.is_empty() {
            if let Ok(modified) = fs::metadata(path).and_then(|meta| meta.modified()) {
                let modified: chrono::DateTime<chrono::Utc> = modified.into();
                item.updated_at =
                    modified.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
            }
        }
        Ok(item)
    }

    /// Next unused sequence number for the area prefix (1 when none exist).
    pub fn next_sequence(&self) -> Result<u32> {
        let pattern = Regex::new(&format!(r"^{}(\d+)-", regex::escape(self.area.prefix())))
            .map_err(|error| Error::InvalidInput(error.to_string()))?;
        let highest = self
            .record_paths()?
            .iter()
            .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
            .filter_map(|name| pattern.captures(name))
            .filter_map(|captures| captures[1].parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        highest.checked_add(1).ok_or_else(|| {
            Error::InvalidInput(format!(
                "no sequence numbers left after {}{highest}",
                self.area.prefix()
            ))
        })
    }

    /// Local id for a sequence number, e.g. `UC007`.
    pub fn local_id(&self, sequence: u32) -> String {
        format!("{}{sequence:03}", self.area.prefix())
    }

    /// File name for a new record: `<prefix><sequence>-<slug>.md`.
    pub fn file_name(&self, sequence: u32, title: &str) -> String {
        let slug = slug_from_title(title);
        let slug = if slug.is_empty() {
            FALLBACK_SLUG
        } else {
            slug.as_str()
        };
        format!("{}-{slug}.{RECORD_EXTENSION}", self.local_id(sequence))
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Write a new record for a remote item. Never overwrites an existing file.
    pub fn create_item(
        &self,
        item: &FeedbackItem,
        sequence: u32,
        provider: &str,
    ) -> Result<PathBuf> {
        let path = self.path_for(&self.file_name(sequence, &item.title));
        let content = render_new_item(item, &self.local_id(sequence), provider);

        fs::create_dir_all(&self.root)?;
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        std::io::Write::write_all(&mut file, content.as_bytes())?;
        Ok(path)
    }

    /// Record a remote identifier in the item's file.
    ///
    /// Returns `false` when the file already carried that identifier.
    pub fn stamp_external_id(
        &self,
        item: &FeedbackItem,
        external_id: &str,
        provider: &str,
        author: Option<&str>,
    ) -> Result<bool> {
        let path = owned_path(item)?;
        let content = fs::read_to_string(path)?;
        match stamp_external_id(&content, external_id, provider, author, &today()) {
            Some(updated) => {
                fs::write(path, updated)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Overwrite the local record with the remote version of its fields.
    pub fn apply_remote(&self, local: &FeedbackItem, remote: &FeedbackItem) -> Result<()> {
        let path = owned_path(local)?;
        let content = fs::read_to_string(path)?;
        fs::write(path, apply_remote_fields(&content, &local.title, remote))?;
        Ok(())
    }

    fn record_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        collect_record_paths(&self.root, &mut paths)?;
        paths.sort();
        Ok(paths)
    }
}

fn collect_record_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error.into()),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if let Err(error) = collect_record_paths(&path, paths) {
                tracing::warn!(dir = %path.display(), %error, "Skipping unreadable directory");
            }
        } else if path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION) {
            paths.push(path);
        }
    }
    Ok(())
}

fn owned_path(item: &FeedbackItem) -> Result<&Path> {
    item.file_path
        .as_deref()
        .ok_or_else(|| Error::InvalidInput(format!("item {} has no local file", item.id)))
}

/// Replace the categories of a record file.
pub fn update_file_categories(path: &Path, categories: &[String]) -> Result<()> {
    let content = fs::read_to_string(path)?;
    fs::write(path, set_categories(&content, categories))?;
    Ok(())
}

/// Add one category. Returns `false` when it was already present.
pub fn add_category(path: &Path, category: &str) -> Result<bool> {
    let category = category.trim();
    if category.is_empty() {
        return Err(Error::InvalidInput("category must not be empty".to_string()));
    }
    let content = fs::read_to_string(path)?;
    let mut categories = parse_item(&content, path)?.categories;
    if categories.iter().any(|existing| existing == category) {
        return Ok(false);
    }
    categories.push(category.to_string());
    fs::write(path, set_categories(&content, &categories))?;
    Ok(true)
}

/// Remove one category. Returns `false` when it was not present.
pub fn remove_category(path: &Path, category: &str) -> Result<bool> {
    let content = fs::read_to_string(path)?;
    let categories = parse_item(&content, path)?.categories;
    let remaining: Vec<String> = categories
        .iter()
        .filter(|existing| existing.as_str() != category.trim())
        .cloned()
        .collect();
    if remaining.len() == categories.len() {
        return Ok(false);
    }
    fs::write(path, set_categories(&content, &remaining))?;
    Ok(true)
}

/// Drop the categories section.
pub fn clear_categories(path: &Path) -> Result<()> {
    update_file_categories(path, &[])
}
