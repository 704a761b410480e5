//! Link management commands

use anyhow::{bail, Result};
use colored::Colorize;
use xmlsitemap_core::{ChangeFrequency, LinkConditions, LinkRecord, effective_changefreq};

use crate::cli::LinkArgs;
use crate::output::{format_timestamp, print_json, OutputFormat};
use crate::utils::workspace::Workspace;

/// Add or replace a link.
pub fn add(workspace: &Workspace, args: &LinkArgs) -> Result<()> {
    let mut link = LinkRecord::new(&args.kind, &args.id, &args.loc);
    if let Some(language) = &args.language {
        link = link.with_language(language);
    }
    if let Some(priority) = args.priority {
        link = link.with_priority(priority);
        link.priority_override = true;
    }
    if args.hidden {
        link.status = false;
        link.status_override = true;
    }
    if let Some(lastmod) = args.lastmod {
        link.lastmod = lastmod;
    }

    let saved = workspace.store.save(link)?;
    println!(
        "{} {}/{} at {}",
        "Saved".green(),
        saved.kind,
        saved.id,
        saved.loc
    );
    Ok(())
}

/// Remove a link or all of its language variants.
pub fn remove(workspace: &Workspace, kind: &str, id: &str, language: Option<&str>) -> Result<()> {
    let removed = workspace.store.delete(kind, id, language)?;
    if removed == 0 {
        bail!("Link {kind}/{id} not found");
    }
    println!("{} {removed} link(s)", "Removed".green());
    Ok(())
}

/// List stored links.
pub fn list(workspace: &Workspace, kind: Option<&str>, format: OutputFormat) -> Result<()> {
    let mut conditions = LinkConditions::new();
    if let Some(kind) = kind {
        conditions = conditions.kind(kind);
    }
    let links = workspace.store.load_multiple(&conditions)?;

    match format {
        OutputFormat::Json => print_json(&links)?,
        OutputFormat::Text if links.is_empty() => println!("No links stored."),
        OutputFormat::Text => {
            let now = chrono::Utc::now().timestamp();
            for link in &links {
                let marker = if link.is_visible() { "+".green() } else { "-".red() };
                let changefreq = ChangeFrequency::from_interval(effective_changefreq(link, now));
                println!(
                    "{marker} {}/{} [{}] {} priority {:.1}, {}, lastmod {}",
                    link.kind,
                    link.id,
                    link.language,
                    link.loc,
                    link.priority,
                    changefreq.map_or("unknown", ChangeFrequency::as_str),
                    format_timestamp(link.lastmod)
                );
            }
        },
    }
    Ok(())
}

/// Store the front page link.
pub fn frontpage(workspace: &Workspace) -> Result<()> {
    let link = workspace.store.save_frontpage(&workspace.config.frontpage)?;
    println!(
        "{} front page link with priority {:.1}",
        "Saved".green(),
        link.priority
    );
    Ok(())
}
