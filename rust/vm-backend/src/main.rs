//! VM Backend - Main Entry Point

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use mimalloc::MiMalloc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vm_backend::api;
use vm_backend::config::{AppConfig, ConfigValidator};
use vm_backend::server;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Command-line arguments. Flags override file and environment configuration.
#[derive(Parser, Debug)]
#[command(name = "vm-backend")]
#[command(about = "Fake cloud backend simulating VM lifecycle management")]
#[command(version)]
struct Args {
    /// Listen address for the backend (host:port or :port).
    #[arg(long)]
    address: Option<String>,

    /// JSON file holding the VM list; created with seed VMs when missing.
    #[arg(long)]
    vms_file: Option<PathBuf>,

    /// Log level, used when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,

    /// Extra config file path.
    #[arg(short, long, env = "VM_BACKEND_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_unchecked(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(vms_file) = args.vms_file {
        config.storage.vms_file = vms_file;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    ConfigValidator::validate(&config)
        .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

    init_tracing(&config.logging.level, config.logging.json);

    let addr = config.server.bind_address();
    let app = server::build(config).await?;

    api::write_api_doc(&mut io::stdout().lock())?;

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "{e}\n^ You can avoid binding issues by using the address flag:\n{} (currently {addr})",
                flag_usage("address")
            );
        }
        Err(e) => return Err(e).with_context(|| format!("failed to bind {addr}")),
    };
    tracing::info!("Server listening at {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Render one flag the way `--help` lists it.
fn flag_usage(id: &str) -> String {
    let command = Args::command();
    let Some(arg) = command.get_arguments().find(|a| a.get_id() == id) else {
        return format!("  --{id}");
    };
    let long = arg.get_long().unwrap_or(id);
    let value = arg
        .get_value_names()
        .and_then(|names| names.first())
        .map_or_else(|| id.to_uppercase(), ToString::to_string);
    let help = arg.get_help().map(ToString::to_string).unwrap_or_default();
    format!("  --{long} <{value}>  {help}")
}

/// Initialize tracing. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
