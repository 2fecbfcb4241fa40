//! pft - reconcile markdown feedback records with hosted voting boards

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::cli::{CacheCommands, CategoryCommands, Cli, Commands};
use crate::commands::cache::{run_cache_cleanup, run_cache_clear, run_cache_status};
use crate::commands::category::{run_category_add, run_category_clear, run_category_remove};
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::providers::run_providers;
use crate::commands::sync::{run_pull, run_push, run_sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let default_directive = "pft=info"
        .parse::<Directive>()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(default_directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_dir = cli.project_dir.as_deref();

    match cli.command {
        Commands::Pull(args) => run_pull(project_dir, &args).await?,
        Commands::Push(args) => run_push(project_dir, &args).await?,
        Commands::Sync(args) => run_sync(project_dir, &args).await?,
        Commands::Conflicts {
            areas,
            policy,
            json,
        } => run_conflicts(project_dir, &areas, policy, json).await?,
        Commands::Cache { command } => match command {
            CacheCommands::Status { json } => run_cache_status(project_dir, json)?,
            CacheCommands::Cleanup => run_cache_cleanup(project_dir)?,
            CacheCommands::Clear => run_cache_clear(project_dir)?,
        },
        Commands::Category { command } => match command {
            CategoryCommands::Add { file, category } => run_category_add(&file, &category)?,
            CategoryCommands::Remove { file, category } => {
                run_category_remove(&file, &category)?;
            }
            CategoryCommands::Clear { file } => run_category_clear(&file)?,
        },
        Commands::Providers => run_providers(project_dir)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
