//! Demo server for the panic reporting middleware.
//!
//! ```text
//! panic-reporter --config reporter.toml
//! curl localhost:8080/panic   # reported, then answered with 500
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

use panic_reporter::config::{load_config, ReporterConfig};
use panic_reporter::http::ReportingServer;
use panic_reporter::observability::{logging, metrics};
use panic_reporter::sink::HttpSink;
use panic_reporter::{init, Hub, Shutdown};

#[derive(Parser)]
#[command(name = "panic-reporter")]
#[command(about = "Demo server reporting handler panics to a collector", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ReporterConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("panic-reporter v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = match &config.client.endpoint {
        Some(endpoint) => {
            let sink = HttpSink::new(Url::parse(endpoint)?, config.client.queue_size);
            Some(init(config.client.client_options(), Arc::new(sink)))
        }
        None => {
            tracing::warn!("No client.endpoint configured; panics will not be reported");
            None
        }
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = ReportingServer::new(&config, Hub::main());
    server.run(listener, shutdown).await?;

    if let Some(client) = client {
        if !client.flush(Duration::from_secs(2)).await {
            tracing::warn!("Pending reports not delivered before exit");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
