use std::path::Path;

use pft_core::config::Area;
use pft_core::conflict::resolve_conflict;
use pft_core::provider::{FeedbackProvider, ProviderRegistry};
use pft_core::store::LocalStore;
use pft_core::sync::{SyncOptions, SyncSession};
use pft_core::{ConflictPolicy, SyncConflict};
use serde::Serialize;

use crate::commands::common::{connect_area, load_project, select_areas};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ConflictItem {
    pub area: Area,
    pub item_id: String,
    pub external_id: Option<String>,
    pub file: Option<String>,
    pub fields: Vec<String>,
    pub reason: String,
    pub resolution: Option<String>,
}

pub async fn run_conflicts(
    project_dir: Option<&Path>,
    areas: &[Area],
    policy: Option<ConflictPolicy>,
    as_json: bool,
) -> Result<(), CliError> {
    let project = load_project(project_dir)?;
    let registry = ProviderRegistry::builtin();

    let mut items = Vec::new();
    for area in select_areas(&project.config, areas)? {
        let mut provider = connect_area(&project.config, area, &registry).await?;
        let store = LocalStore::for_project(&project.dir, area);
        let conflicts = SyncSession::new(&provider, &store, SyncOptions::default())
            .conflicts()
            .await?;
        provider.close();
        items.extend(
            conflicts
                .into_iter()
                .map(|conflict| conflict_to_item(area, conflict, policy)),
        );
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No conflicts.");
        return Ok(());
    }
    for line in format_conflict_lines(&items) {
        println!("{line}");
    }
    Ok(())
}

/// Preview the policy outcome without applying it.
pub fn conflict_to_item(
    area: Area,
    mut conflict: SyncConflict,
    policy: Option<ConflictPolicy>,
) -> ConflictItem {
    let resolution = policy.map(|policy| match resolve_conflict(&mut conflict, policy) {
        Ok(resolution) => resolution.label.to_string(),
        Err(_) => "manual resolution required".to_string(),
    });

    ConflictItem {
        area,
        item_id: conflict.item_id.clone(),
        external_id: conflict.local_item.external_id().map(ToString::to_string),
        file: conflict
            .local_item
            .file_path
            .as_ref()
            .map(|path| path.display().to_string()),
        fields: conflict
            .fields
            .iter()
            .map(|field| field.as_str().to_string())
            .collect(),
        reason: conflict.reason(),
        resolution,
    }
}

pub fn format_conflict_lines(items: &[ConflictItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let external = item.external_id.as_deref().unwrap_or("-");
            let mut line = format!("{} {} [{external}]: {}", item.area, item.item_id, item.reason);
            if let Some(resolution) = &item.resolution {
                line.push_str(" -> ");
                line.push_str(resolution);
            }
            line
        })
        .collect()
}
