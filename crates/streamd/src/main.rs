//! streamd — the StreamGrid daemon.
//!
//! Single binary with two modes:
//!
//! - **controller** — runs the step reconciler against the single-node
//!   scheduler, plus the REST API for submitting steps
//! - **sidecar** — runs the per-replica dataplane inside a step pod
//!
//! # Usage
//!
//! ```text
//! streamd controller --api-port 8080 --data-dir /var/lib/streamgrid
//! streamd sidecar --port 3569
//! ```

mod api;
mod controller_mode;
mod sidecar_mode;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use streamgrid_metrics::{init_telemetry, Registry};

#[derive(Parser)]
#[command(name = "streamd", about = "StreamGrid daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the step controller and REST API (single-node scheduler).
    Controller {
        /// HTTP API port.
        #[arg(long, default_value = "8080")]
        api_port: u16,

        /// Data directory for the object store. In-memory when omitted.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Run the replica dataplane (inside a step pod).
    Sidecar {
        /// Port for source ingestion, readiness, and metrics.
        #[arg(long, default_value = "3569")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let registry = Registry::new();
    init_telemetry(&registry);

    let cli = Cli::parse();
    match cli.command {
        Command::Controller { api_port, data_dir } => {
            controller_mode::run(api_port, data_dir, registry).await
        }
        Command::Sidecar { port } => sidecar_mode::run(port, registry).await,
    }
}
