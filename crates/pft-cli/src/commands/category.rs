use std::path::Path;

use pft_core::store::{add_category, clear_categories, remove_category};

use crate::error::CliError;

pub fn run_category_add(file: &Path, category: &str) -> Result<(), CliError> {
    if add_category(file, category)? {
        println!("Added {category} to {}", file.display());
    } else {
        println!("{} already has {category}", file.display());
    }
    Ok(())
}

pub fn run_category_remove(file: &Path, category: &str) -> Result<(), CliError> {
    if remove_category(file, category)? {
        println!("Removed {category} from {}", file.display());
    } else {
        println!("{} does not have {category}", file.display());
    }
    Ok(())
}

pub fn run_category_clear(file: &Path) -> Result<(), CliError> {
    clear_categories(file)?;
    println!("Cleared categories of {}", file.display());
    Ok(())
}
