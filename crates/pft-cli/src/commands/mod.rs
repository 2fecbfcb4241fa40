pub mod cache;
pub mod category;
pub mod common;
pub mod completions;
pub mod conflicts;
pub mod providers;
pub mod sync;
