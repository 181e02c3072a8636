use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mediagate_server::api::{self, AppState};
use mediagate_server::config::MediaGateConfig;
use mediagate_server::manager_factory;

/// Signed, expiring links for stored media files.
#[derive(Parser, Debug)]
#[command(name = "mediagate-server", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "mediagate.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration from TOML file, or use defaults if the file does not exist.
    let config_exists = Path::new(&cli.config).exists();
    let mut config: MediaGateConfig = if config_exists {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        toml::from_str("")?
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let telemetry_guard = mediagate_server::telemetry::init(&config.telemetry);

    if !config_exists {
        info!(path = %cli.config, "config file not found, using defaults");
    }

    let manager = Arc::new(manager_factory::create_manager(&config)?);
    let app = api::router(AppState::new(
        Arc::clone(&manager),
        config.upload.clone(),
        config.route.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        address = %addr,
        secure_path = %config.route.secure_path(),
        "mediagate-server listening"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let graceful = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { graceful.cancelled().await })
            .await
    });

    // In-flight downloads get `shutdown_timeout_seconds` to finish once a
    // signal arrives; anything still streaming after that is cut off.
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    tokio::select! {
        joined = &mut server => joined??,
        () = shutdown.cancelled() => {
            match tokio::time::timeout(shutdown_timeout, &mut server).await {
                Ok(joined) => joined??,
                Err(_) => {
                    warn!(
                        timeout_secs = config.server.shutdown_timeout_seconds,
                        "shutdown timeout exceeded, aborting open connections"
                    );
                    server.abort();
                }
            }
        }
    }

    // Flush pending OpenTelemetry spans before exit.
    telemetry_guard.shutdown();

    let snapshot = manager.metrics().snapshot();
    info!(
        issued = snapshot.issued,
        served = snapshot.served,
        rejected = snapshot.rejected,
        "mediagate-server shut down"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
