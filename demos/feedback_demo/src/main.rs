//! Horizon feedback demo
//!
//! Runs the feedback and media collections over the in-memory store and
//! logs every change notification.
//!
//! # Commands
//!
//! - `submit` - Validate a JSON feedback body, store it and print the response
//! - `scenario` - Create, list, patch and delete a batch of feedback

mod commands;

use clap::{Parser, Subcommand};
use horizon_core::NotifierConfig;
use tracing_subscriber::EnvFilter;

/// Feedback collection demo.
#[derive(Parser)]
#[command(name = "horizon-feedback")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Notifier worker threads
    #[arg(global = true, long, default_value_t = 4)]
    workers: usize,

    /// Notifier queue capacity
    #[arg(global = true, long, default_value_t = 1024)]
    queue_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and store one feedback body
    Submit {
        /// JSON request body
        body: String,

        /// Attach a media file with this name
        #[arg(short, long)]
        attachment: Option<String>,
    },

    /// Run a create/list/patch/delete walk-through
    Scenario {
        /// Number of feedback records to create
        #[arg(short, long, default_value = "3")]
        count: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = NotifierConfig::new()
        .workers(cli.workers)
        .queue_capacity(cli.queue_capacity);
    let app = commands::App::new(config)?;

    match cli.command {
        Commands::Submit { body, attachment } => {
            commands::submit(&app, body.as_bytes(), attachment.as_deref())?;
        }
        Commands::Scenario { count } => {
            commands::scenario(&app, count)?;
        }
    }

    app.shutdown();
    Ok(())
}
