//! Init command implementation

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;
use xmlsitemap_core::Config;

/// Write the default configuration to `path` or the platform location.
pub fn execute(path: Option<&Path>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_path()?,
    };
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to(&path)?;
    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}
