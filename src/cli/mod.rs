//! Command-line interface.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::run;

#[derive(Parser)]
#[command(name = "indexwatch")]
#[command(about = "Follow search index re-indexation progress")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log progress changes instead of drawing progress bars
    #[arg(long, global = true)]
    pub plain: bool,

    /// Delay between polls in milliseconds (default: 1000)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Admin user name; logs in before polling when a password is also given
    #[arg(long, global = true, env = "INDEXWATCH_USERNAME")]
    pub username: Option<String>,

    /// Admin password
    #[arg(long, global = true, env = "INDEXWATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Login form URL (default: /public/login on the watched server)
    #[arg(long, global = true)]
    pub login_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the progress indicators of an admin re-index page
    Watch {
        /// URL of the admin re-index page
        page_url: String,
        /// Shared progress endpoint (default: <page_url>/progress)
        #[arg(long)]
        progress_url: Option<String>,
        /// Class marking indicators fed by the shared endpoint
        #[arg(long)]
        marker_class: Option<String>,
    },

    /// Poll progress endpoints directly, one indicator per URL
    Poll {
        /// Progress endpoint URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Fetch a progress endpoint once and print what it reports
    Status {
        /// Progress endpoint URL
        url: String,
    },
}
