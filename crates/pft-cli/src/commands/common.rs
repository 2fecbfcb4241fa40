use std::env;
use std::path::{Path, PathBuf};

use pft_core::config::{Area, ProjectConfig};
use pft_core::provider::{FeedbackProvider, Provider, ProviderRegistry};
use pft_core::sync::SyncReport;

use crate::error::CliError;

/// A discovered and validated project configuration.
#[derive(Debug)]
pub struct Project {
    pub config: ProjectConfig,
    pub config_path: PathBuf,
    /// Directory holding the area directories and the sync cache
    pub dir: PathBuf,
}

pub fn load_project(start: Option<&Path>) -> Result<Project, CliError> {
    let start = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };
    let config_path =
        ProjectConfig::discover(&start).ok_or_else(|| CliError::ConfigNotFound(start.clone()))?;
    let config = ProjectConfig::load_from_path(&config_path)?;
    config.validate()?;
    let dir = config.project_dir(&config_path);
    tracing::debug!(config = %config_path.display(), dir = %dir.display(), "Loaded project");

    Ok(Project {
        config,
        config_path,
        dir,
    })
}

/// Requested areas, or every configured area when none were requested.
pub fn select_areas(config: &ProjectConfig, requested: &[Area]) -> Result<Vec<Area>, CliError> {
    if requested.is_empty() {
        return Ok(config.configured_areas());
    }

    let mut areas = Vec::new();
    for area in requested {
        if config.area(*area).is_none() {
            return Err(CliError::AreaNotConfigured(*area));
        }
        if !areas.contains(area) {
            areas.push(*area);
        }
    }
    Ok(areas)
}

/// Build and connect the provider configured for an area.
pub async fn connect_area(
    config: &ProjectConfig,
    area: Area,
    registry: &ProviderRegistry,
) -> Result<Provider, CliError> {
    let name = config.area_provider(area).to_string();
    let mut provider = registry
        .create(&name)
        .ok_or_else(|| CliError::UnknownProvider(name.clone()))?;
    let provider_config = config.area_provider_config(area, |key| env::var(key).ok());
    provider
        .connect(&provider_config)
        .await
        .map_err(|source| CliError::Connect {
            area,
            provider: name,
            source,
        })?;
    Ok(provider)
}

pub fn format_report_line(area: Area, provider: &str, report: &SyncReport) -> String {
    let mut line = format!(
        "{area} ({provider}): created {}, linked {}, skipped {}, failed {}",
        report.created, report.linked, report.skipped, report.failed
    );
    if report.updated > 0 || report.manual > 0 {
        line.push_str(&format!(
            ", updated {}, needs input {}",
            report.updated, report.manual
        ));
    }
    if report.unstamped > 0 {
        line.push_str(&format!(" ({} created remotely but not stamped)", report.unstamped));
    }
    line
}
