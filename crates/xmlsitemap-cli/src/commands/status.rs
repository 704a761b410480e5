//! Status command implementation

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use xmlsitemap_core::{LinkConditions, LinkSelection, Sitemap, StateStore};

use crate::output::{format_timestamp, print_json, OutputFormat};
use crate::utils::workspace::Workspace;

#[derive(Debug, Serialize)]
struct StatusReport {
    regenerate_needed: bool,
    rebuild_needed: bool,
    generated_last: i64,
    links: usize,
    visible_links: usize,
    sitemaps: Vec<Sitemap>,
}

/// Print the regeneration flags and the registered sitemaps.
pub fn execute(workspace: &Workspace, format: OutputFormat) -> Result<()> {
    let state = workspace.state.snapshot()?;
    let report = StatusReport {
        regenerate_needed: state.regenerate_needed,
        rebuild_needed: state.rebuild_needed,
        generated_last: state.generated_last,
        links: workspace.store.count(&LinkConditions::new())?,
        visible_links: workspace.store.visible_count(&LinkSelection::all())?,
        sitemaps: workspace.sitemaps.all()?,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn flag(value: bool) -> colored::ColoredString {
    if value { "yes".yellow() } else { "no".green() }
}

fn print_text(report: &StatusReport) {
    println!("Regeneration needed: {}", flag(report.regenerate_needed));
    println!("Rebuild needed:      {}", flag(report.rebuild_needed));
    println!("Last generated:      {}", format_timestamp(report.generated_last));
    println!(
        "Links:               {} ({} visible)",
        report.links, report.visible_links
    );

    if report.sitemaps.is_empty() {
        println!("No sitemaps registered. Run 'xmlsitemap generate' to create one.");
        return;
    }
    println!();
    for sitemap in &report.sitemaps {
        let language = sitemap.language().unwrap_or("all languages");
        println!("{} ({})", sitemap.smid.bold(), language.bright_black());
        println!(
            "  {} link(s), {} chunk(s), updated {}",
            sitemap.links,
            sitemap.chunks,
            format_timestamp(sitemap.updated)
        );
    }
}
