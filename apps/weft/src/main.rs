//! # weft - Workflow Graph Server
//!
//! The main binary for weft.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! weft serve --host 0.0.0.0 --port 8080
//!
//! # Replay a scripted workflow and print its snapshot chain
//! weft replay -f workflow.json --watch
//!
//! # Show the effective configuration
//! weft --config weft.toml config
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use weft::cli;
use weft::config::{AppConfig, LogConfig, LogFormat};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.log);

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `log.filter`.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));

    match log.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}

/// Print the weft startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗    ██╗███████╗███████╗████████╗
  ██║    ██║██╔════╝██╔════╝╚══██╔══╝
  ██║ █╗ ██║█████╗  █████╗     ██║
  ██║███╗██║██╔══╝  ██╔══╝     ██║
  ╚███╔███╔╝███████╗██║        ██║
   ╚══╝╚══╝ ╚══════╝╚═╝        ╚═╝

  Workflow Graph Server v{}

  Snapshots • Replay • Highlights
"#,
        env!("CARGO_PKG_VERSION")
    );
}
