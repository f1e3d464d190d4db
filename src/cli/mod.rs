//! CLI module for the chat budget service
//!
//! Subcommands:
//! - `serve`: HTTP API server (default)
//! - `migrate`: apply or revert the Postgres schema

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// PMP Chat Budget - per-user spending limits for LLM chat
#[derive(Parser)]
#[command(name = "pmp-chat-budget")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server (default)
    Serve,

    /// Manage the Postgres schema
    Migrate(migrate::MigrateArgs),
}
