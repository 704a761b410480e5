//! Generate command implementation

use anyhow::{bail, Result};
use colored::Colorize;

use crate::utils::workspace::Workspace;

/// Regenerate the given sitemaps, or all of them when `smids` is empty.
pub fn execute(workspace: &Workspace, smids: &[String]) -> Result<()> {
    workspace.ensure_sitemaps()?;
    let orchestrator = workspace.orchestrator(None)?;

    let targets = (!smids.is_empty()).then_some(smids);
    let outcome = orchestrator.regenerate(targets);
    if !outcome.success {
        bail!(outcome.message);
    }

    println!("{}", outcome.message.green());
    for sitemap in orchestrator.sitemaps().load_multiple(targets)? {
        let directory = orchestrator.layout().directory(&sitemap.smid);
        println!(
            "  {} {} link(s) in {} chunk(s) at {}",
            sitemap.smid.bold(),
            sitemap.links,
            sitemap.chunks,
            directory.display()
        );
    }
    Ok(())
}
