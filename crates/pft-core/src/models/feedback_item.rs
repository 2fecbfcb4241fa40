//! Feedback item model

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

static LOCAL_ID_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+\d+:\s*").expect("Invalid regex"));

/// Internal status vocabulary shared by every provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Open,
    Planned,
    Started,
    Completed,
    Declined,
}

impl Status {
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::Planned,
        Self::Started,
        Self::Completed,
        Self::Declined,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Planned => "planned",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Declined => "declined",
        }
    }

    /// Heading-style label written into local files.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Planned => "Planned",
            Self::Started => "Started",
            Self::Completed => "Completed",
            Self::Declined => "Declined",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| Error::InvalidInput(format!("unknown status: {s}")))
    }
}

/// Canonical unit of synchronization, local or remote.
///
/// Local items are identified by their file stem (`UC001-login`); remote
/// items carry the provider's identifier in both `id` and `external_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// Local identifier (file stem) or the remote identifier for remote items
    pub id: String,
    /// Identifier assigned by the provider; `None` until pushed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    /// Canonical status name when known, otherwise the text as written
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    /// Area classification (`voc`, `vos`, ...)
    #[serde(default, rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub votes: u32,
    /// Owning local file; `None` for items that only exist remotely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    /// ISO-8601 creation time (may be date-only)
    #[serde(default)]
    pub created_at: String,
    /// ISO-8601 last update time (may be date-only)
    #[serde(default)]
    pub updated_at: String,
    /// Provider-specific fields without a first-class column
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl FeedbackItem {
    /// Create a local item backed by a file.
    pub fn local(id: impl Into<String>, title: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: Status::Open.as_str().to_string(),
            file_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Create an item that only exists on the provider side.
    pub fn remote(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        let external_id = external_id.into();
        Self {
            id: external_id.clone(),
            external_id: Some(external_id),
            title: title.into(),
            status: Status::Open.as_str().to_string(),
            ..Self::default()
        }
    }

    /// True once the item has been linked to a remote record.
    pub fn is_synced(&self) -> bool {
        self.external_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Non-empty external id, if any.
    pub fn external_id(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// An item nobody can see (no remote id, no file) is invalid.
    pub fn is_observable(&self) -> bool {
        self.is_synced() || self.file_path.is_some()
    }

    /// Title without the local id prefix (`"UC001: Login"` -> `"Login"`).
    pub fn clean_title(&self) -> String {
        clean_title(&self.title)
    }

    /// Known canonical status, if the status text is one.
    pub fn canonical_status(&self) -> Option<Status> {
        self.status.parse().ok()
    }

    /// Body sent to a provider: summary followed by the description.
    ///
    /// The summary is omitted when the description already starts with it.
    pub fn remote_body(&self) -> String {
        let summary = self.summary.trim();
        let description = self.description.trim();
        if summary.is_empty() || description.starts_with(summary.trim_end_matches("...")) {
            return description.to_string();
        }
        if description.is_empty() {
            return summary.to_string();
        }
        format!("{summary}\n\n{description}")
    }

    /// Remote-facing projection of a local item used for comparisons.
    ///
    /// A missing status reads as open.
    #[must_use]
    pub fn remote_view(&self) -> Self {
        let status = if self.status.trim().is_empty() {
            Status::Open.as_str().to_string()
        } else {
            self.status.clone()
        };
        Self {
            title: self.clean_title(),
            description: self.remote_body(),
            status,
            ..self.clone()
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Strip a local id prefix such as `UC001: ` from a title.
///
/// Returns the original title when stripping would leave nothing.
pub fn clean_title(title: &str) -> String {
    let cleaned = LOCAL_ID_PREFIX.replace(title.trim(), "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        title.trim().to_string()
    } else {
        cleaned.to_string()
    }
}
