//! Onepage CLI - operator tools for the checkout.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! onepage-cli migrate sessions
//!
//! # Validate a country/region reference file
//! onepage-cli directory check crates/checkout/data/directory.json
//! ```
//!
//! # Commands
//!
//! - `migrate sessions` - Create the tower-sessions table
//! - `directory check` - Load and validate reference data

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "onepage-cli")]
#[command(author, version, about = "Onepage Checkout operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Work with country/region reference data
    Directory {
        #[command(subcommand)]
        action: DirectoryAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Create the session store table
    Sessions,
}

#[derive(Subcommand)]
enum DirectoryAction {
    /// Load a reference data file and report what it contains
    Check {
        /// Path to the JSON file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Sessions => commands::migrate::sessions().await?,
        },
        Commands::Directory { action } => match action {
            DirectoryAction::Check { path } => {
                let summary = commands::directory::check(&path)?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{summary}");
                }
            }
        },
    }
    Ok(())
}
