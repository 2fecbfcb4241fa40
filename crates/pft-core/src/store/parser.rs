//! Section-oriented parser for local feedback records.
//!
//! ```text
//! ---                      optional key: value block
//! # UC001: Title
//! ## Summary | Status | Priority | Categories | Tags | Description | Metadata
//! ```
//!
//! Unknown sections are ignored.

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::FeedbackItem;
use crate::provider::status::normalize_status;

/// Metadata keys that carry the remote identifier.
const EXTERNAL_ID_KEYS: [&str; 4] = ["external_id", "fider_id", "clearflask_id", "eververse_id"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Status,
    Priority,
    Categories,
    Tags,
    Description,
    Metadata,
    Unknown,
}

impl Section {
    fn from_heading(heading: &str) -> Self {
        match heading.trim().to_lowercase().as_str() {
            "summary" => Self::Summary,
            "status" => Self::Status,
            "priority" => Self::Priority,
            "categories" | "category" => Self::Categories,
            "tags" => Self::Tags,
            "description" => Self::Description,
            "metadata" => Self::Metadata,
            _ => Self::Unknown,
        }
    }
}

/// Parse record text. `path` supplies the id (file stem) and back-reference.
pub fn parse_item(content: &str, path: &Path) -> Result<FeedbackItem> {
    let id = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| Error::parse(path, "file name has no usable stem"))?;

    let mut item = FeedbackItem {
        id: id.to_string(),
        file_path: Some(path.to_path_buf()),
        ..FeedbackItem::default()
    };

    let body = split_front_matter(content, path, &mut item)?;

    let mut section: Option<Section> = None;
    let mut description_lines: Vec<&str> = Vec::new();

    for line in body.lines() {
        if item.title.is_empty() && section.is_none() {
            if let Some(title) = line.strip_prefix("# ") {
                item.title = title.trim().to_string();
                continue;
            }
        }

        if let Some(heading) = line.strip_prefix("## ") {
            section = Some(Section::from_heading(heading));
            continue;
        }

        let Some(current) = section else {
            continue;
        };
        let trimmed = line.trim();

        match current {
            Section::Description => description_lines.push(line),
            _ if trimmed.is_empty() => {}
            Section::Summary if item.summary.is_empty() => item.summary = trimmed.to_string(),
            Section::Status if item.status.is_empty() => item.status = normalize_status(trimmed),
            Section::Priority if item.priority.is_empty() => {
                item.priority = trimmed.to_string();
            }
            Section::Categories if item.categories.is_empty() => {
                item.categories = split_list(trimmed);
            }
            Section::Tags if item.tags.is_empty() => item.tags = split_list(trimmed),
            Section::Metadata => {
                if let Some((key, value)) = parse_metadata_line(trimmed) {
                    apply_metadata(&mut item, key, value);
                }
            }
            _ => {}
        }
    }

    item.description = description_lines.join("\n").trim().to_string();
    Ok(item)
}

/// Parse a `- Key: Value` bullet into a snake_case key and trimmed value.
pub fn parse_metadata_line(line: &str) -> Option<(String, &str)> {
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))?;
    let (key, value) = line.split_once(':')?;
    let key = metadata_key(key);
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// True when a metadata key names the remote identifier.
pub fn is_external_id_key(key: &str) -> bool {
    EXTERNAL_ID_KEYS.contains(&key)
}

fn metadata_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|ch: char| ch.is_whitespace() || ch == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn apply_metadata(item: &mut FeedbackItem, key: String, value: &str) {
    if value.is_empty() {
        return;
    }
    if is_external_id_key(&key) && item.external_id.is_none() {
        item.external_id = Some(value.to_string());
    }
    match key.as_str() {
        "created" | "created_at" if item.created_at.is_empty() => {
            item.created_at = value.to_string();
        }
        "updated" | "updated_at" if item.updated_at.is_empty() => {
            item.updated_at = value.to_string();
        }
        "votes" => {
            if let Ok(votes) = value.parse() {
                item.votes = votes;
            }
        }
        _ => {}
    }
    item.metadata.insert(key, value.to_string());
}

fn split_front_matter<'a>(content: &'a str, path: &Path, item: &mut FeedbackItem) -> Result<&'a str> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim();
        if trimmed == "---" {
            return Ok(&rest[offset..]);
        }
        if let Some((key, value)) = trimmed.split_once(':') {
            apply_metadata(item, metadata_key(key), value.trim());
        }
    }

    Err(Error::parse(path, "unterminated metadata block"))
}

fn split_list(line: &str) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}
