use std::path::Path;

use pft_core::cache::{CacheStats, SyncCache};
use pft_core::config::Area;
use pft_core::store::LocalStore;
use serde::Serialize;

use crate::commands::common::{load_project, Project};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct CacheStatus {
    path: String,
    version: String,
    updated_at: Option<String>,
    #[serde(flatten)]
    stats: CacheStats,
    areas: Vec<AreaPending>,
}

/// Local records the cache does not consider in sync.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct AreaPending {
    pub area: Area,
    pub records: usize,
    /// Records never pushed or linked
    pub unsynced: usize,
    /// Records edited since their last recorded sync
    pub modified: usize,
}

fn open_cache(project_dir: Option<&Path>) -> Result<(Project, SyncCache), CliError> {
    let project = load_project(project_dir)?;
    let cache = SyncCache::load(&project.dir)?;
    Ok((project, cache))
}

/// Scope of the next push and reconcile per configured area.
pub fn pending_work(project: &Project, cache: &SyncCache) -> Result<Vec<AreaPending>, CliError> {
    let mut pending = Vec::new();
    for area in project.config.configured_areas() {
        let scan = LocalStore::for_project(&project.dir, area).scan()?;
        pending.push(AreaPending {
            area,
            records: scan.items.len(),
            unsynced: cache.find_unsynced_items(&scan.items).len(),
            modified: cache.find_modified_items(&scan.items).len(),
        });
    }
    Ok(pending)
}

pub fn run_cache_status(project_dir: Option<&Path>, as_json: bool) -> Result<(), CliError> {
    let (project, cache) = open_cache(project_dir)?;
    let status = CacheStatus {
        path: cache.path().display().to_string(),
        version: cache.version().to_string(),
        updated_at: cache.updated_at().map(|at| at.to_rfc3339()),
        stats: cache.stats(),
        areas: pending_work(&project, &cache)?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("Cache: {}", status.path);
    println!(
        "Updated: {}",
        status.updated_at.as_deref().unwrap_or("never")
    );
    println!(
        "Entries: {} ({} synced, {} unsynced)",
        status.stats.total, status.stats.synced, status.stats.unsynced
    );
    for area in &status.areas {
        println!(
            "{}: {} records, {} unsynced, {} modified",
            area.area, area.records, area.unsynced, area.modified
        );
    }
    Ok(())
}

pub fn run_cache_cleanup(project_dir: Option<&Path>) -> Result<(), CliError> {
    let (_, mut cache) = open_cache(project_dir)?;
    let removed = cache.cleanup_orphans();
    cache.save()?;
    println!("Removed {removed} orphaned entr{}", if removed == 1 { "y" } else { "ies" });
    Ok(())
}

pub fn run_cache_clear(project_dir: Option<&Path>) -> Result<(), CliError> {
    let (_, mut cache) = open_cache(project_dir)?;
    cache.clear();
    cache.save()?;
    println!("Cache cleared");
    Ok(())
}
