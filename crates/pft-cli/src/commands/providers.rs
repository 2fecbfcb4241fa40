use std::path::Path;

use pft_core::provider::ProviderRegistry;

use crate::commands::common::load_project;
use crate::error::CliError;

pub fn run_providers(project_dir: Option<&Path>) -> Result<(), CliError> {
    let registry = ProviderRegistry::builtin();
    println!("Available providers:");
    for name in registry.names() {
        println!("  {name}");
    }

    match load_project(project_dir) {
        Ok(project) => {
            println!();
            println!("Configured areas ({}):", project.config_path.display());
            for area in project.config.configured_areas() {
                println!("  {area}: {}", project.config.area_provider(area));
            }
        }
        Err(CliError::ConfigNotFound(_)) => {}
        Err(error) => return Err(error),
    }
    Ok(())
}
