//! serverless-serve
//!
//! Runs declared serverless functions behind a local HTTP front that
//! behaves like an API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing (method, pattern) ──▶ RouteBinding
//!                          │
//!                          ▼
//!                    invoke::event (body < path < query)
//!                          │
//!                          ▼
//!                    invoke::dispatcher ──▶ registry ──▶ native | process loader
//!                          │
//!                          ▼
//!                    integration::selector (ordered response rules)
//!                          │
//!     Client Response      ▼
//!     ◀────────────── http::response (status, headers, JSON body)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use serverless_serve::config::{load_config, GatewayConfig, RuntimeKind};
use serverless_serve::observability::{logging, metrics};
use serverless_serve::{Gateway, HandlerRegistry, ProcessLoader};

const INIT_HOOK_NOTE: &str =
    "Init hooks are not loaded by this binary; embed the library and use Gateway::with_init_hook.";

#[derive(Parser, Debug)]
#[command(name = "serverless-serve")]
#[command(version, about = "Local API Gateway simulator for serverless functions", long_about = None)]
#[command(after_help = INIT_HOOK_NOTE)]
struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Path prefix added in front of every endpoint
    #[arg(short, long)]
    prefix: Option<String>,

    /// Stage used to populate response rule templates
    #[arg(short, long)]
    stage: Option<String>,

    /// Region used to populate response rule templates
    #[arg(short, long)]
    region: Option<String>,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,
}

impl Cli {
    /// Flags take precedence over the configuration file.
    fn apply(self, config: &mut GatewayConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(prefix) = self.prefix {
            config.server.prefix = prefix;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if self.stage.is_some() {
            config.stage = self.stage;
        }
        if self.region.is_some() {
            config.region = self.region;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    let config_path = cli.config.clone();
    cli.apply(&mut config);

    logging::init_logging(&config.observability.log_level);

    tracing::info!("serverless-serve v{} starting", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => tracing::info!(
            path = %path.display(),
            functions = config.functions.len(),
            "Configuration loaded"
        ),
        None => tracing::warn!("No configuration file given, serving no functions"),
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let registry = HandlerRegistry::new()
        .with_loader(RuntimeKind::Process, ProcessLoader::from_config(&config.handlers));

    let listener = TcpListener::bind(config.server.bind_address()).await?;
    let gateway = Gateway::new(config, registry);
    tracing::info!(routes = gateway.routes().len(), "Routes registered");

    gateway.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
