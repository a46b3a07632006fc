//! plist-sync CLI
//!
//! Converges property-list keys to desired values through PlistBuddy.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing if verbose
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Apply {
            manifest,
            entry,
            dry_run,
        }) => commands::run_apply(
            manifest.as_deref(),
            &entry,
            &cli.tool,
            cli.no_reload,
            dry_run,
        ),
        Some(Commands::Check { manifest, entry }) => {
            commands::run_check(manifest.as_deref(), &entry, &cli.tool)
        }
        Some(Commands::Remove { target }) => {
            commands::run_remove(&target, &cli.tool, cli.no_reload)
        }
        Some(Commands::Print { target }) => commands::run_print(&target, &cli.tool),
        None => {
            // No command provided - show help hint
            println!("{} property-list reconciler", "plist-sync".green().bold());
            println!();
            println!("Run {} for available commands.", "plist-sync --help".cyan());
            Ok(())
        }
    }
}
