use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use db_provisioner::health::HealthState;
use db_provisioner::{Config, build_app, run_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install the TLS crypto provider before any TLS operations
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
        && rustls::crypto::CryptoProvider::get_default().is_none()
    {
        return Err("Failed to install rustls crypto provider and no provider is available".into());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("db_provisioner=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    info!("Starting db-provisioner");

    let config = Config::from_env();
    info!(
        port = config.port,
        default_namespace = %config.default_namespace,
        identity_poll_attempts = config.identity_poll_attempts,
        retract_on_failure = config.retract_on_failure,
        "Loaded configuration"
    );

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let health_state = Arc::new(HealthState::new());
    let app = build_app(client, &config, health_state.clone());
    health_state.set_ready(true).await;

    let shutdown = {
        let health_state = health_state.clone();
        async move {
            shutdown_signal().await;
            info!("Received shutdown signal, initiating graceful shutdown...");
            // Stop receiving new traffic before draining
            health_state.set_ready(false).await;
        }
    };

    let server = tokio::spawn(run_server(config.port, app, shutdown));
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            error!("API server error: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            error!("API server task panicked: {}", e);
            return Err(e.into());
        }
    }

    info!("db-provisioner stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
