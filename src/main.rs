//! mdxr - MDX static site renderer with component hydration and incremental
//! rebuilds.

mod cli;
mod config;
mod core;
mod deps;
mod hydrate;
mod logger;
mod plugin;
mod rebuild;
mod render;
mod site;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }

    let config = SiteConfig::load(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build_site(&config).map(|_| ()),
        Commands::Serve { .. } => cli::serve::serve_site(&config),
        Commands::Clean => cli::clean::clean_site(&config),
    }
}
