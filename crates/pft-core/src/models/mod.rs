//! Data models for pft

mod feedback_item;
mod sync_conflict;

pub use feedback_item::{clean_title, FeedbackItem, Status};
pub use sync_conflict::{ConflictField, ConflictPolicy, SyncConflict};
