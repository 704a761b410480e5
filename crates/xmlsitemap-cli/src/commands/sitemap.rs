//! Sitemap management commands

use anyhow::{bail, Result};
use colored::Colorize;
use xmlsitemap_core::{Sitemap, SitemapLayout, StateStore};

use crate::output::{format_timestamp, print_json, OutputFormat};
use crate::utils::workspace::Workspace;

/// Register a sitemap for `language`, or one covering every link.
pub fn add(workspace: &Workspace, language: Option<&str>) -> Result<()> {
    let sitemap = language.map_or_else(Sitemap::default, Sitemap::for_language);
    if workspace.sitemaps.load(&sitemap.smid)?.is_some() {
        println!("Sitemap {} already registered", sitemap.smid.bold());
        return Ok(());
    }

    workspace.sitemaps.save(&sitemap)?;
    // The new sitemap has no files yet
    workspace.state.set_regenerate_needed(true)?;
    println!("{} sitemap {}", "Added".green(), sitemap.smid.bold());
    Ok(())
}

/// List registered sitemaps.
pub fn list(workspace: &Workspace, format: OutputFormat) -> Result<()> {
    let sitemaps = workspace.sitemaps.all()?;
    match format {
        OutputFormat::Json => print_json(&sitemaps)?,
        OutputFormat::Text if sitemaps.is_empty() => println!("No sitemaps registered."),
        OutputFormat::Text => {
            for sitemap in &sitemaps {
                let context = sitemap
                    .context
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "{} [{}] {} chunk(s), updated {}",
                    sitemap.smid.bold(),
                    context,
                    sitemap.chunks,
                    format_timestamp(sitemap.updated)
                );
            }
        },
    }
    Ok(())
}

/// Remove a sitemap and its generated files.
pub fn remove(workspace: &Workspace, smid: &str) -> Result<()> {
    let layout = SitemapLayout::new(workspace.config.paths.files_dir());
    if !workspace.sitemaps.delete(smid, &layout)? {
        bail!("Sitemap '{smid}' not found");
    }
    println!("{} sitemap {}", "Removed".green(), smid.bold());
    Ok(())
}
