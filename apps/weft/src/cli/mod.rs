//! # weft CLI Module
//!
//! This module implements the CLI interface for weft.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `replay` - Apply a JSON script of graph operations and print the result
//! - `config` - Print the effective configuration

mod commands;
mod replay;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use weft_core::WeftError;

pub use commands::{cmd_config, cmd_replay, cmd_serve};
pub use replay::{GraphReport, ReplayReport, ReplayScript, Step, run as run_replay};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// weft - workflow graph server
///
/// Live workflow graphs with snapshot history, point-in-time
/// reconstruction and path highlighting.
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "weft.toml")]
    pub config: PathBuf,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (overrides server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Replay a JSON script against a fresh session
    Replay {
        /// Path to the script file
        #[arg(short, long)]
        file: PathBuf,

        /// Print one line per graph update
        #[arg(short, long)]
        watch: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and loaded configuration.
pub async fn execute(cli: Cli, config: AppConfig) -> Result<(), WeftError> {
    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(&config, host, port).await,
        Some(Commands::Replay { file, watch }) => {
            cmd_replay(&config, &file, watch, cli.json_mode)
        }
        Some(Commands::Config) => cmd_config(&config),
        // No subcommand - serve with configured address
        None => cmd_serve(&config, None, None).await,
    }
}

// =============================================================================
// TESTS
// =============================================================================
