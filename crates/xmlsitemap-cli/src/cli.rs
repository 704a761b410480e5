//! # CLI Structure and Argument Parsing
//!
//! The CLI follows a command-subcommand pattern built with `clap` derive
//! macros:
//!
//! - **Global options**: `--config`, `--verbose`, `--quiet`, `--no-color`
//! - **Batch commands**: `generate`, `rebuild`, `cron`
//! - **Management**: `sitemap`, `link`, `status`, `init`
//!
//! ## Usage Patterns
//!
//! ```bash
//! # Regenerate every sitemap
//! xmlsitemap generate
//!
//! # Rebuild node links from a content export, keeping custom settings
//! xmlsitemap rebuild node --save-custom --content export.json
//!
//! # Scheduler entry point
//! xmlsitemap cron
//!
//! # Inspect flags and generated sitemaps as JSON
//! xmlsitemap status --format json
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Main CLI structure for the `xmlsitemap` command
#[derive(Parser, Clone, Debug)]
#[command(name = "xmlsitemap")]
#[command(version)]
#[command(about = "xmlsitemap - Link registry and chunked XML sitemap generation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "XMLSITEMAP_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Regenerate sitemap files now
    Generate {
        /// Sitemaps to regenerate (all when omitted)
        #[arg(value_name = "SMID")]
        smids: Vec<String>,
    },

    /// Rebuild links of entity types from a content export, then regenerate
    Rebuild {
        /// Entity types to rebuild
        #[arg(required = true, value_name = "TYPE")]
        types: Vec<String>,

        /// Keep links with a custom status or priority
        #[arg(long)]
        save_custom: bool,

        /// Content export (defaults to `content.json` under the root)
        #[arg(long, value_name = "FILE")]
        content: Option<PathBuf>,
    },

    /// Regenerate when links changed and the minimum lifetime has passed
    Cron {
        /// Unix time to treat as "now"
        #[arg(long)]
        now: Option<i64>,
    },

    /// Show regeneration flags and sitemap summaries
    Status {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Manage sitemaps
    #[command(subcommand)]
    Sitemap(SitemapCommand),

    /// Manage individual links
    #[command(subcommand)]
    Link(LinkCommand),
}

#[derive(Subcommand, Clone, Debug)]
pub enum SitemapCommand {
    /// Register a sitemap, optionally restricted to one language
    Add {
        /// Language code
        #[arg(long)]
        language: Option<String>,
    },

    /// List registered sitemaps
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Remove a sitemap and its generated files
    Remove {
        /// Sitemap identifier
        smid: String,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum LinkCommand {
    /// Add or replace a link
    Add(LinkArgs),

    /// Remove a link (every language variant unless `--language` is given)
    Remove {
        /// Entity type
        kind: String,
        /// Entity id
        id: String,
        /// Only remove this language variant
        #[arg(long)]
        language: Option<String>,
    },

    /// List stored links
    List {
        /// Only links of this entity type
        #[arg(long = "type")]
        kind: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Store the front page link using the configured settings
    Frontpage,
}

/// Arguments of `link add`
#[derive(Args, Clone, Debug)]
pub struct LinkArgs {
    /// Entity type
    pub kind: String,

    /// Entity id
    pub id: String,

    /// Internal path starting with `/`
    pub loc: String,

    /// Language code
    #[arg(long)]
    pub language: Option<String>,

    /// Custom priority between 0.0 and 1.0
    #[arg(long)]
    pub priority: Option<f32>,

    /// Exclude the link from generated sitemaps
    #[arg(long)]
    pub hidden: bool,

    /// Unix time of the last modification
    #[arg(long)]
    pub lastmod: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_rebuild_requires_types() {
        assert!(Cli::try_parse_from(["xmlsitemap", "rebuild"]).is_err());
        assert!(Cli::try_parse_from(["xmlsitemap", "rebuild", "node", "--save-custom"]).is_ok());
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["xmlsitemap", "-v", "-q", "status"]).is_err());
    }
}
