//! Cron command implementation

use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use xmlsitemap_core::{CronOutcome, SkipReason};

use crate::utils::workspace::Workspace;

/// Run the periodic trigger once.
pub fn execute(workspace: &Workspace, now: Option<i64>) -> Result<()> {
    workspace.ensure_sitemaps()?;
    let orchestrator = workspace.orchestrator(None)?;
    let now = now.unwrap_or_else(|| Utc::now().timestamp());

    match orchestrator.cron(now)? {
        CronOutcome::Skipped(reason) => println!("{}", describe_skip(reason).bright_black()),
        CronOutcome::Regenerated(outcome) if outcome.success => {
            println!("{}", outcome.message.green());
        },
        CronOutcome::Regenerated(outcome) => bail!(outcome.message),
    }
    Ok(())
}

fn describe_skip(reason: SkipReason) -> String {
    match reason {
        SkipReason::NotNeeded => "Sitemap is up to date, nothing to do".to_string(),
        SkipReason::Disabled => "Cron regeneration is disabled".to_string(),
        SkipReason::TooSoon { remaining } => {
            format!("Sitemap is stale but will not be regenerated for another {remaining}s")
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_skip() {
        assert!(describe_skip(SkipReason::NotNeeded).contains("up to date"));
        assert!(describe_skip(SkipReason::TooSoon { remaining: 42 }).contains("42s"));
    }
}
