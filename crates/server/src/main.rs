use std::future::IntoFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use streamgate_gateway::{CacheTtlConfig, ContentGatewayBuilder};
use streamgate_server::api::AppState;
use streamgate_server::config::StreamgateConfig;
use streamgate_upstream::XtreamHttpProvider;

/// Streamgate content-access HTTP server.
#[derive(Parser, Debug)]
#[command(
    name = "streamgate-server",
    about = "Caching and session-quota gateway for IPTV upstream providers"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "streamgate.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run database migrations for the configured ledger backend, then exit.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let config_exists = Path::new(&cli.config).exists();
    let config: StreamgateConfig = if config_exists {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };

    streamgate_server::telemetry::init(&config.telemetry);

    if !config_exists {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    if let Some(Commands::Migrate) = cli.command {
        return run_migrate(&config).await;
    }

    let cache = streamgate_server::cache_factory::create_cache(&config.cache)?;
    info!(backend = %config.cache.backend, "cache store initialized");

    let backend =
        streamgate_server::ledger_factory::create_ledger(&config.ledger, &config.tenants).await?;
    info!(backend = %config.ledger.backend, "usage ledger initialized");

    let upstream = XtreamHttpProvider::new(&config.upstream)?;

    let gateway = ContentGatewayBuilder::new()
        .tenants(backend.tenants)
        .cache(cache)
        .ledger(backend.ledger)
        .upstream(Arc::new(upstream))
        .ttl(CacheTtlConfig::from(&config.cache.ttl))
        .cache_timeout(config.cache.timeout())
        .ledger_timeout(config.ledger.timeout())
        .upstream_timeout(Duration::from_secs(config.upstream.timeout_seconds))
        .build()?;

    let app = streamgate_server::api::router(AppState {
        gateway: Arc::new(gateway),
    });

    // Resolve the bind address (CLI overrides take precedence).
    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(address = %addr, error = %e, "failed to bind listener");
            return Err(e.into());
        }
    };
    info!(address = %addr, "streamgate-server listening");

    // Serve with graceful shutdown on SIGINT / SIGTERM, bounded by the
    // configured drain timeout once a signal arrives.
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    tokio::select! {
        result = server => result?,
        () = async {
            shutdown_signal().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_seconds,
                "shutdown timeout exceeded, dropping in-flight requests"
            );
        }
    }

    info!("streamgate-server shut down");
    Ok(())
}

/// Run the `migrate` subcommand: initialize the ledger schema and exit.
async fn run_migrate(config: &StreamgateConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(backend = %config.ledger.backend, "running ledger backend migrations...");
    let _backend =
        streamgate_server::ledger_factory::create_ledger(&config.ledger, &config.tenants).await?;
    info!(backend = %config.ledger.backend, "ledger backend migrations complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
