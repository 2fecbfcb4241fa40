//! pft-core - Core library for pft
//!
//! This crate contains the feedback model, the provider abstraction and its
//! implementations, the markdown item store, the sync cache, conflict handling
//! and the pull/push orchestration used by the `pft` command-line tool.

pub mod cache;
pub mod config;
pub mod conflict;
pub mod error;
pub mod models;
pub mod provider;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{ConflictField, ConflictPolicy, FeedbackItem, Status, SyncConflict};
