//! xmlsitemap CLI - link registry and chunked XML sitemap generation
//!
//! This is the main entry point for the xmlsitemap command-line interface.
//! Command implementations live in [`commands`]; the shared stores are opened
//! through [`utils::workspace`].

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod output;
mod utils;

use cli::{Cli, Commands, LinkCommand, SitemapCommand};
use utils::workspace::Workspace;

fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logging::initialize_logging(&cli)?;

    execute_command(&cli)
}

fn execute_command(cli: &Cli) -> Result<()> {
    if let Commands::Init { force } = &cli.command {
        return commands::init_config(cli.config.as_deref(), *force);
    }

    let workspace = Workspace::open(cli.config.as_deref())?;

    match &cli.command {
        Commands::Init { .. } => {},

        Commands::Generate { smids } => {
            commands::generate(&workspace, smids)?;
        },

        Commands::Rebuild {
            types,
            save_custom,
            content,
        } => {
            commands::rebuild(&workspace, types, *save_custom, content.as_deref())?;
        },

        Commands::Cron { now } => {
            commands::cron(&workspace, *now)?;
        },

        Commands::Status { format } => {
            commands::show_status(&workspace, *format)?;
        },

        Commands::Sitemap(command) => match command {
            SitemapCommand::Add { language } => {
                commands::add_sitemap(&workspace, language.as_deref())?;
            },
            SitemapCommand::List { format } => {
                commands::list_sitemaps(&workspace, *format)?;
            },
            SitemapCommand::Remove { smid } => {
                commands::remove_sitemap(&workspace, smid)?;
            },
        },

        Commands::Link(command) => match command {
            LinkCommand::Add(args) => commands::add_link(&workspace, args)?,
            LinkCommand::Remove { kind, id, language } => {
                commands::remove_link(&workspace, kind, id, language.as_deref())?;
            },
            LinkCommand::List { kind, format } => {
                commands::list_links(&workspace, kind.as_deref(), *format)?;
            },
            LinkCommand::Frontpage => commands::save_frontpage(&workspace)?,
        },
    }

    Ok(())
}
