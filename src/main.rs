//! hoststate packet-filter engine daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                  HOSTSTATE                   │
//!                    │                                              │
//!   health checks    │  ┌──────────┐    ┌──────────┐    ┌────────┐  │
//!   ─────────────────┼─▶│ ipc link │───▶│  engine  │───▶│ filter │──┼──▶ pfctl
//!   (hce, parent)    │  │  (imsg)  │    │ registry │    │backend │  │
//!                    │  └──────────┘    └────┬─────┘    └────────┘  │
//!                    │                       │                      │
//!   hoststatectl     │  ┌──────────┐         │                      │
//!   ─────────────────┼─▶│ control  │─────────┘                      │
//!   (UNIX socket)    │  │  socket  │◀── events (monitor)            │
//!                    │  └──────────┘                                │
//!                    │                                              │
//!                    │  config · observability · lifecycle          │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use hoststate::config::load_config;
use hoststate::lifecycle::{startup, Signals};
use hoststate::observability::logging;

#[derive(Parser)]
#[command(name = "hoststate")]
#[command(about = "Keeps packet-filter tables in step with backend health", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'f', long, default_value = "/etc/hoststate.toml")]
    config: PathBuf,

    /// Check the configuration and exit
    #[arg(short = 'n', long)]
    check: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if args.check {
        println!("configuration OK");
        return ExitCode::SUCCESS;
    }

    logging::init(&config.observability, args.verbose);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        services = config.services.len(),
        tables = config.tables.len(),
        "hoststate starting"
    );

    let mut signals = match Signals::new() {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::FAILURE;
        }
    };

    let daemon = match startup::start(&config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let terminate = async {
        let signal = signals.recv().await;
        tracing::info!(signal, "Received signal");
    };

    match daemon.run(terminate).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
