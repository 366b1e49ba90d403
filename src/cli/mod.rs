//! CLI module - Command-line interface for insurecontent
//!
//! Parsed with clap; each subcommand lives in `commands/`.

mod commands;

use clap::{Parser, Subcommand};

/// insurecontent - weekly social media content for insurance agents
#[derive(Parser)]
#[command(name = "insurecontent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Show an agent's API usage ledger
    #[command(alias = "u")]
    Usage {
        /// Agent login email
        email: String,
    },

    /// Show an agent's subscription and entitlement state
    #[command(alias = "a")]
    Agent {
        /// Agent login email
        email: String,
    },
}

pub use commands::*;
