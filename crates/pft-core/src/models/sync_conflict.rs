//! Sync conflict model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FeedbackItem;
use crate::error::Error;

/// Field compared during conflict detection, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictField {
    Title,
    Description,
    Status,
}

impl ConflictField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for ConflictField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Divergence between a local item and its matched remote item.
///
/// Created during a sync pass and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    pub item_id: String,
    pub local_item: FeedbackItem,
    pub remote_item: FeedbackItem,
    /// Diverging fields, always ordered title, description, status
    pub fields: Vec<ConflictField>,
    /// Set once a policy has been applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl SyncConflict {
    /// Human readable reason, e.g. `modified fields: title, status`.
    pub fn reason(&self) -> String {
        let fields = self
            .fields
            .iter()
            .map(|field| field.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("modified fields: {fields}")
    }
}

/// How a conflict is settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    #[serde(rename = "local", alias = "local-wins")]
    LocalWins,
    #[serde(rename = "remote", alias = "remote-wins")]
    RemoteWins,
    #[default]
    #[serde(alias = "timestamp-wins")]
    Timestamp,
    Manual,
}

impl ConflictPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalWins => "local",
            Self::RemoteWins => "remote",
            Self::Timestamp => "timestamp",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "local-wins" | "local_wins" => Ok(Self::LocalWins),
            "remote" | "remote-wins" | "remote_wins" => Ok(Self::RemoteWins),
            "timestamp" | "timestamp-wins" | "timestamp_wins" | "newest" => Ok(Self::Timestamp),
            "manual" => Ok(Self::Manual),
            other => Err(Error::InvalidInput(format!(
                "unknown conflict policy `{other}` (expected local, remote, timestamp or manual)"
            ))),
        }
    }
}
