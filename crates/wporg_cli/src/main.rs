//! wporg CLI
//!
//! Extracts data from the WordPress.org public API as Singer-style JSON
//! lines.
//!
//! # Commands
//!
//! - `sync` - Extract records from the selected endpoints
//! - `discover` - Print the catalog of every endpoint
//! - `endpoints` - List the known endpoints

mod client;
mod commands;
mod error;
mod output;
mod settings;
mod state_file;

use clap::{Parser, Subcommand};
use settings::Settings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// WordPress.org API extractor.
#[derive(Parser)]
#[command(name = "wporg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON settings file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records to stdout
    Sync {
        /// JSON state file holding bookmarks; updated in place
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Endpoint to sync (repeatable); overrides stream_selection
        #[arg(short, long = "endpoint")]
        endpoints: Vec<String>,
    },

    /// Print the endpoint catalog as JSON
    Discover,

    /// List known endpoints
    Endpoints,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the record stream.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Sync { state, endpoints } => {
            commands::sync::run(&settings, state.as_deref(), &endpoints)?;
        }
        Commands::Discover => commands::discover::run()?,
        Commands::Endpoints => commands::endpoints::run()?,
    }

    Ok(())
}
