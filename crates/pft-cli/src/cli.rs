use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pft_core::config::Area;
use pft_core::ConflictPolicy;

#[derive(Parser)]
#[command(name = "pft")]
#[command(about = "Reconcile markdown feedback records with hosted voting boards")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory to search for .pft-config.json (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub project_dir: Option<PathBuf>,
}

/// Options shared by the batch commands.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Limit to these areas (voc, vos, vob, voe); defaults to every configured area
    #[arg(long = "area", value_name = "AREA")]
    pub areas: Vec<Area>,
    /// Show what would happen without writing files or creating remote items
    #[arg(long)]
    pub dry_run: bool,
    /// Author recorded when stamping external ids
    #[arg(long, value_name = "NAME")]
    pub author: Option<String>,
    /// Conflict policy, overriding the project config (local, remote, timestamp, manual)
    #[arg(long, value_name = "POLICY")]
    pub policy: Option<ConflictPolicy>,
    /// Print reports as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create local records for remote items
    Pull(SyncArgs),
    /// Create remote items for unsynced local records
    Push(SyncArgs),
    /// Push, pull, then reconcile linked records
    Sync(SyncArgs),
    /// Report linked records that diverge from their remote item
    Conflicts {
        #[arg(long = "area", value_name = "AREA")]
        areas: Vec<Area>,
        /// Preview how this policy would resolve each conflict
        #[arg(long, value_name = "POLICY")]
        policy: Option<ConflictPolicy>,
        #[arg(long)]
        json: bool,
    },
    /// Inspect or maintain the sync cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Edit the categories of a record file
    Category {
        #[command(subcommand)]
        command: CategoryCommands,
    },
    /// List available providers and the provider of each configured area
    Providers,
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output file path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show cache location and entry counts
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Drop entries whose record file no longer exists
    Cleanup,
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// Add a category
    Add { file: PathBuf, category: String },
    /// Remove a category
    Remove { file: PathBuf, category: String },
    /// Remove the Categories section
    Clear { file: PathBuf },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
