//! cmdpal CLI
//!
//! Runs reconciliation passes outside an editor: settings come from JSON
//! files, state from a local SQLite database, and prompts go to stderr.

use clap::{Parser, Subcommand};
use cmdpal_core::logging_facility::{self, Profile};

mod commands;
mod config;
mod host;

#[derive(Debug, Parser)]
#[command(name = "cmdpal")]
#[command(about = "Keep a command palette manifest in sync with declared commands", long_about = None)]
struct Cli {
    /// Log output: dev (human-readable) or prod (JSON lines)
    #[arg(long, global = true, default_value = "dev")]
    log_format: Profile,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one reconciliation pass and write the manifest if it changed
    Reconcile(commands::reconcile::ReconcileArgs),
    /// Print the entries of a manifest with their owners
    List(commands::list::ListArgs),
    /// Activate, then run one namespaced command
    Invoke(commands::invoke::InvokeArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging_facility::init(cli.log_format);

    let result = match cli.command {
        Commands::Reconcile(args) => commands::reconcile::execute(args).await,
        Commands::List(args) => commands::list::execute(args),
        Commands::Invoke(args) => commands::invoke::execute(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
