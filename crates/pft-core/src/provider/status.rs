//! Status vocabulary translation.
//!
//! Each service names its workflow states differently; these tables map them
//! onto the internal set (open, planned, started, completed, declined).
//! Unknown names are kept as written; an empty name means open.

use crate::models::Status;

type Table = &'static [(&'static str, Status)];

const FIDER: Table = &[
    ("open", Status::Open),
    ("planned", Status::Planned),
    ("started", Status::Started),
    ("completed", Status::Completed),
    ("declined", Status::Declined),
    ("duplicate", Status::Declined),
];

const CLEARFLASK: Table = &[
    ("under review", Status::Open),
    ("new", Status::Open),
    ("open", Status::Open),
    ("pending", Status::Open),
    ("planned", Status::Planned),
    ("accepted", Status::Planned),
    ("in progress", Status::Started),
    ("started", Status::Started),
    ("working", Status::Started),
    ("completed", Status::Completed),
    ("done", Status::Completed),
    ("implemented", Status::Completed),
    ("released", Status::Completed),
    ("closed", Status::Declined),
    ("declined", Status::Declined),
    ("rejected", Status::Declined),
    ("wont do", Status::Declined),
    ("duplicate", Status::Declined),
];

const EVERVERSE: Table = &[
    ("idea", Status::Open),
    ("draft", Status::Open),
    ("new", Status::Open),
    ("pending", Status::Open),
    ("under review", Status::Open),
    ("exploring", Status::Open),
    ("researching", Status::Open),
    ("planned", Status::Planned),
    ("accepted", Status::Planned),
    ("prioritized", Status::Planned),
    ("in progress", Status::Started),
    ("building", Status::Started),
    ("developing", Status::Started),
    ("completed", Status::Completed),
    ("done", Status::Completed),
    ("shipped", Status::Completed),
    ("released", Status::Completed),
    ("live", Status::Completed),
    ("declined", Status::Declined),
    ("rejected", Status::Declined),
    ("wont do", Status::Declined),
    ("archived", Status::Declined),
    ("cancelled", Status::Declined),
];

/// Lowercase, treat `_`/`-` as spaces, drop apostrophes, collapse whitespace.
fn vocabulary_key(name: &str) -> String {
    name.to_lowercase()
        .replace(['_', '-'], " ")
        .replace(['\'', '\u{2019}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn lookup(tables: &[Table], name: &str) -> Option<Status> {
    let key = vocabulary_key(name);
    if let Ok(status) = key.parse::<Status>() {
        return Some(status);
    }
    tables
        .iter()
        .flat_map(|table| table.iter())
        .find(|(remote, _)| *remote == key)
        .map(|(_, status)| *status)
}

fn translate(tables: &[Table], name: &str) -> String {
    if name.trim().is_empty() {
        return Status::Open.as_str().to_string();
    }
    lookup(tables, name).map_or_else(|| name.trim().to_string(), |status| status.as_str().to_string())
}

/// Status text from a local file, matched against every known vocabulary.
pub fn normalize_status(name: &str) -> String {
    translate(&[FIDER, CLEARFLASK, EVERVERSE], name)
}

pub fn from_fider(name: &str) -> String {
    translate(&[FIDER], name)
}

pub fn from_clearflask(name: &str) -> String {
    translate(&[CLEARFLASK], name)
}

/// Canonical status of a ClearFlask status name, if it has one.
pub fn clearflask_canonical(name: &str) -> Option<Status> {
    lookup(&[CLEARFLASK], name)
}

pub fn from_eververse(name: &str) -> String {
    translate(&[EVERVERSE], name)
}

/// Internal status to the Eververse vocabulary.
pub fn to_eververse(status: &str) -> String {
    match status.parse::<Status>() {
        Ok(Status::Open) => "idea".to_string(),
        Ok(Status::Started) => "in_progress".to_string(),
        Ok(status) => status.as_str().to_string(),
        Err(_) => status.trim().to_string(),
    }
}
