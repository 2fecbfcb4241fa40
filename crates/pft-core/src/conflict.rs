//! Conflict detection and resolution between a local item and its remote twin.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{ConflictField, ConflictPolicy, FeedbackItem, SyncConflict};

/// Which side a resolution kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Side,
    pub item: FeedbackItem,
    pub label: &'static str,
}

/// Compare title, description and status. `None` when all three match.
///
/// Line endings and surrounding whitespace are ignored; status names
/// compare case-insensitively.
pub fn detect_conflict(local: &FeedbackItem, remote: &FeedbackItem) -> Option<SyncConflict> {
    let mut fields = Vec::new();
    if !same_text(&local.title, &remote.title) {
        fields.push(ConflictField::Title);
    }
    if !same_text(&local.description, &remote.description) {
        fields.push(ConflictField::Description);
    }
    if !local.status.trim().eq_ignore_ascii_case(remote.status.trim()) {
        fields.push(ConflictField::Status);
    }

    if fields.is_empty() {
        return None;
    }

    Some(SyncConflict {
        item_id: local.id.clone(),
        local_item: local.clone(),
        remote_item: remote.clone(),
        fields,
        resolution: None,
    })
}

fn same_text(left: &str, right: &str) -> bool {
    left.trim().lines().map(str::trim_end).eq(right.trim().lines().map(str::trim_end))
}

/// Settle a conflict and record the outcome on it.
///
/// The manual policy never picks a side and returns
/// [`Error::ManualResolutionRequired`].
pub fn resolve_conflict(conflict: &mut SyncConflict, policy: ConflictPolicy) -> Result<Resolution> {
    let (winner, label) = match policy {
        ConflictPolicy::LocalWins => (Side::Local, "kept local version"),
        ConflictPolicy::RemoteWins => (Side::Remote, "accepted remote version"),
        ConflictPolicy::Timestamp => {
            let local = parse_timestamp(&conflict.local_item.updated_at);
            let remote = parse_timestamp(&conflict.remote_item.updated_at);
            match local.cmp(&remote) {
                std::cmp::Ordering::Greater => (Side::Local, "kept local (newer)"),
                std::cmp::Ordering::Less => (Side::Remote, "accepted remote (newer)"),
                std::cmp::Ordering::Equal => (Side::Local, "kept local (same timestamp)"),
            }
        }
        ConflictPolicy::Manual => {
            return Err(Error::ManualResolutionRequired(conflict.item_id.clone()));
        }
    };

    conflict.resolution = Some(label.to_string());
    let item = match winner {
        Side::Local => conflict.local_item.clone(),
        Side::Remote => conflict.remote_item.clone(),
    };
    Ok(Resolution {
        winner,
        item,
        label,
    })
}

/// Match every local item against the remote list and collect conflicts.
///
/// Remote items are looked up by external id first, then by raw id.
pub fn detect_all_conflicts(
    locals: &[FeedbackItem],
    remotes: &[FeedbackItem],
) -> Vec<SyncConflict> {
    let mut by_key: HashMap<&str, &FeedbackItem> = HashMap::new();
    for remote in remotes {
        if let Some(external_id) = remote.external_id() {
            by_key.entry(external_id).or_insert(remote);
        }
        if !remote.id.is_empty() {
            by_key.entry(remote.id.as_str()).or_insert(remote);
        }
    }

    locals
        .iter()
        .filter_map(|local| {
            let remote = local
                .external_id()
                .and_then(|id| by_key.get(id))
                .or_else(|| by_key.get(local.id.as_str()))?;
            detect_conflict(local, remote)
        })
        .collect()
}

/// Parse an ISO-8601 timestamp or date.
///
/// Unparsable or empty input yields the zero time so it always loses a
/// timestamp comparison.
pub fn parse_timestamp(value: &str) -> DateTime<Utc> {
    let value = value.trim();
    if value.is_empty() {
        return DateTime::<Utc>::MIN_UTC;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.and_utc();
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |parsed| parsed.and_utc())
}
