use std::path::Path;

use pft_core::cache::SyncCache;
use pft_core::config::Area;
use pft_core::provider::{FeedbackProvider, ProviderRegistry};
use pft_core::store::LocalStore;
use pft_core::sync::{SyncOptions, SyncReport, SyncSession};
use serde::Serialize;

use crate::cli::SyncArgs;
use crate::commands::common::{connect_area, format_report_line, load_project, select_areas, Project};
use crate::error::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Pull,
    Push,
    Reconcile,
}

#[derive(Debug, Serialize)]
pub struct AreaReport {
    pub area: Area,
    pub provider: String,
    pub pass: Pass,
    #[serde(flatten)]
    pub report: SyncReport,
}

pub async fn run_pull(project_dir: Option<&Path>, args: &SyncArgs) -> Result<(), CliError> {
    run_batch(project_dir, args, &[Pass::Pull]).await
}

pub async fn run_push(project_dir: Option<&Path>, args: &SyncArgs) -> Result<(), CliError> {
    run_batch(project_dir, args, &[Pass::Push]).await
}

pub async fn run_sync(project_dir: Option<&Path>, args: &SyncArgs) -> Result<(), CliError> {
    run_batch(project_dir, args, &[Pass::Push, Pass::Pull, Pass::Reconcile]).await
}

async fn run_batch(project_dir: Option<&Path>, args: &SyncArgs, passes: &[Pass]) -> Result<(), CliError> {
    let project = load_project(project_dir)?;
    let areas = select_areas(&project.config, &args.areas)?;
    if areas.is_empty() {
        println!("No areas configured in {}", project.config_path.display());
        return Ok(());
    }

    let registry = ProviderRegistry::builtin();
    let mut cache = SyncCache::load(&project.dir)?;
    let options = SyncOptions {
        dry_run: args.dry_run,
        author: args.author.clone(),
        policy: args.policy.unwrap_or(project.config.sync.conflict_resolution),
    };

    let mut reports = Vec::new();
    let mut failed_areas = 0;
    for area in areas {
        match run_area(&project, area, &registry, &mut cache, &options, passes).await {
            Ok(area_reports) => {
                if !args.json {
                    for report in &area_reports {
                        println!("{}", format_area_report(report, passes.len() > 1));
                    }
                }
                reports.extend(area_reports);
            }
            Err(error) => {
                tracing::error!(%area, %error, "Area sync failed");
                failed_areas += 1;
            }
        }
    }

    if !args.dry_run {
        cache.save()?;
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    if failed_areas > 0 {
        return Err(CliError::AreasFailed(failed_areas));
    }
    Ok(())
}

async fn run_area(
    project: &Project,
    area: Area,
    registry: &ProviderRegistry,
    cache: &mut SyncCache,
    options: &SyncOptions,
    passes: &[Pass],
) -> Result<Vec<AreaReport>, CliError> {
    let mut provider = connect_area(&project.config, area, registry).await?;
    let store = LocalStore::for_project(&project.dir, area);
    let provider_name = provider.name().to_string();

    let mut reports = Vec::with_capacity(passes.len());
    {
        let mut session = SyncSession::new(&provider, &store, options.clone()).with_cache(cache);
        for pass in passes {
            let report = match pass {
                Pass::Pull => session.pull().await?,
                Pass::Push => session.push().await?,
                Pass::Reconcile => session.reconcile().await?,
            };
            reports.push(AreaReport {
                area,
                provider: provider_name.clone(),
                pass: *pass,
                report,
            });
        }
    }
    provider.close();
    Ok(reports)
}

pub fn format_area_report(report: &AreaReport, with_pass: bool) -> String {
    let line = format_report_line(report.area, &report.provider, &report.report);
    if with_pass {
        let pass = match report.pass {
            Pass::Pull => "pull",
            Pass::Push => "push",
            Pass::Reconcile => "reconcile",
        };
        format!("[{pass}] {line}")
    } else {
        line
    }
}
