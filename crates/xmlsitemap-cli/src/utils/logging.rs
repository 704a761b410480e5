//! Logging initialization and configuration.
//!
//! This module handles setting up the tracing subscriber and color control
//! based on CLI flags and environment variables.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Cli, Commands, LinkCommand, SitemapCommand};
use crate::output::OutputFormat;

/// Initialize the logging subsystem based on CLI flags.
///
/// Machine-readable output suppresses informational logs unless `--verbose`
/// was given explicitly.
///
/// # Errors
///
/// Returns an error if the global tracing subscriber cannot be set.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let machine_output = command_format(&cli.command).is_some_and(OutputFormat::is_machine_readable);

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet || machine_output {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let env_no_color = std::env::var_os("NO_COLOR").is_some();
    if cli.no_color || env_no_color || machine_output {
        color_control::set_override(false);
    }
    Ok(())
}

fn command_format(command: &Commands) -> Option<OutputFormat> {
    match command {
        Commands::Status { format }
        | Commands::Sitemap(SitemapCommand::List { format })
        | Commands::Link(LinkCommand::List { format, .. }) => Some(*format),
        _ => None,
    }
}
