//! Rebuild command implementation

use anyhow::{bail, Result};
use colored::Colorize;
use std::path::Path;
use tracing::warn;

use crate::utils::workspace::Workspace;

/// Rebuild the links of `types` from the content export, then regenerate.
pub fn execute(
    workspace: &Workspace,
    types: &[String],
    save_custom: bool,
    content: Option<&Path>,
) -> Result<()> {
    if content.is_none() && !workspace.content_file().exists() {
        warn!(
            path = %workspace.content_file().display(),
            "no content export found, links of the rebuilt types will be removed"
        );
    }

    let orchestrator = workspace.orchestrator(content)?;
    workspace.ensure_sitemaps()?;

    let outcome = orchestrator.rebuild(types, save_custom);
    if !outcome.success {
        bail!(outcome.message);
    }
    println!("{}", outcome.message.green());
    Ok(())
}
