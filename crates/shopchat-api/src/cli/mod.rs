//! CLI command definitions for the `shopchat` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the chat
//! server; the other commands operate on the local store and config.

pub mod config;
pub mod conversations;
pub mod maintenance;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use uuid::Uuid;

/// Product-search chat server backed by a hosted model and an MCP tool server.
#[derive(Parser)]
#[command(name = "shopchat", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed logs (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat server.
    Serve {
        /// Host to bind to (overrides config and SHOPCHAT_HOST).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and SHOPCHAT_PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Export spans through OpenTelemetry (stdout exporter).
        #[arg(long)]
        otel: bool,

        /// Emit logs as JSON lines.
        #[arg(long)]
        json_logs: bool,
    },

    /// Delete conversations inactive for longer than the retention period.
    Sweep {
        /// Retention in days (defaults to the configured value).
        #[arg(long)]
        days: Option<u32>,
    },

    /// Inspect and manage stored conversations.
    #[command(alias = "conv")]
    Conversations {
        #[command(subcommand)]
        action: ConversationCommand,
    },

    /// Print the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConversationCommand {
    /// List an owner's conversations, most recent first.
    #[command(alias = "ls")]
    List {
        /// Owner id (defaults to the configured default owner).
        #[arg(long)]
        owner: Option<i64>,
    },

    /// Delete a conversation and its messages.
    #[command(alias = "rm")]
    Delete {
        /// Conversation id.
        id: Uuid,
    },
}

/// Tracing filter used when `RUST_LOG` is unset.
///
/// The server logs at the configured level; one-shot commands stay quiet
/// unless asked.
pub fn default_filter(command: &Commands, verbose: u8, log_level: &str) -> String {
    match verbose {
        0 if matches!(command, Commands::Serve { .. }) => log_level.to_string(),
        0 => "warn".to_string(),
        1 => "info,shopchat=debug".to_string(),
        _ => "trace".to_string(),
    }
}
