//! Command implementations for the xmlsitemap CLI
//!
//! Each command lives in its own submodule.

mod cron;
mod generate;
mod init;
mod link;
mod rebuild;
mod sitemap;
mod status;

pub use cron::execute as cron;
pub use generate::execute as generate;
pub use init::execute as init_config;
pub use link::{add as add_link, frontpage as save_frontpage, list as list_links, remove as remove_link};
pub use rebuild::execute as rebuild;
pub use sitemap::{add as add_sitemap, list as list_sitemaps, remove as remove_sitemap};
pub use status::execute as show_status;
