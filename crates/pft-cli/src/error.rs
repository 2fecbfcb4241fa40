use std::io;
use std::path::PathBuf;

use pft_core::config::Area;
use pft_core::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] pft_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No .pft-config.json found in {} or any parent directory", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Area {0} is not configured in .pft-config.json")]
    AreaNotConfigured(Area),
    #[error("Unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("Could not connect to {provider} for area {area}: {source}")]
    Connect {
        area: Area,
        provider: String,
        #[source]
        source: ProviderError,
    },
    #[error("{0} area(s) failed")]
    AreasFailed(usize),
}
