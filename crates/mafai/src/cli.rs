//! Command-line interface for mafai.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mafai - Mafia party game server with MCP interface
#[derive(Parser, Debug)]
#[command(name = "mafai")]
#[command(about = "Mafia party game server for humans and LLM agents", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the server config file
    #[arg(short, long, global = true, default_value = "mafai.toml")]
    pub config: PathBuf,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the MCP game server (stdio mode)
    Server,

    /// Run the HTTP game server
    Http {
        /// Port to bind to; overrides the config file
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; overrides the config file
        #[arg(long)]
        host: Option<String>,
    },
}
