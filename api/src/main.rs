use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use hotmap_api::{apply_middleware, router, AppState, Config, MiddlewareConfig};
use hotmap_core::{PgStore, Store};

fn init_tracing(filter: &str, pretty: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if pretty {
        builder.pretty().init();
    } else {
        builder.json().init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => tracing::error!(error = %err, "failed to listen for SIGTERM"),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(&config.log_filter, config.log_pretty);

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("install metrics recorder")?;
    {
        let handle = metrics_handle.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(30));
            loop {
                tick.tick().await;
                handle.run_upkeep();
            }
        });
    }

    let store = PgStore::connect(&config.database_url, config.db_max_connections)
        .await
        .context("connect to database")?;
    let store: Arc<dyn Store> = Arc::new(store);
    let state = AppState::new(store, config.admin_token.clone(), metrics_handle);

    let app = apply_middleware(
        router(state),
        &MiddlewareConfig {
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            concurrency_limit: config.concurrency_limit,
            allowed_origins: config.allowed_origins.clone(),
        },
    );

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .context("bind listen address")?;
    tracing::info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    tracing::info!("shutdown complete");
    Ok(())
}
