//! Medrec CLI Library
//!
//! Command-line interface for reconciling media asset references:
//!
//! - **Reconciliation**: upload local files and normalize stored references
//!   (`medrec reconcile`)
//! - **Auditing**: classify stored references and check local files without
//!   touching anything (`medrec audit`)

pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod summary;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};

/// Medrec - Media Asset Reconciliation
#[derive(Parser, Debug)]
#[command(name = "medrec")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload local media files and normalize stored references
    Reconcile {
        /// Decide and report without uploading or writing records
        #[arg(long)]
        dry_run: bool,

        /// Process at most this many records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Remote folder uploads land in
        #[arg(long, default_value = "properties")]
        folder: String,

        /// Worker pool size
        #[arg(short, long, default_value = "4")]
        concurrency: usize,
    },

    /// Classify stored references and check local files, read-only
    Audit {
        /// Process at most this many records
        #[arg(short, long)]
        limit: Option<usize>,

        /// Example rows to print per problem category
        #[arg(long, default_value = "5")]
        examples: usize,
    },
}
