//! Fleet Server - movement simulation engine for simulated aerial vehicles

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleet_server::config::{Config, StoreBackend};
use fleet_server::persistence::{init_database, SqliteStore};
use fleet_server::store::{MemoryStore, VehicleStore};
use fleet_server::{api, Dispatcher};

/// How long shutdown waits for cancelled flights to write `stopped`.
const SHUTDOWN_GRACE_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(Config::log_json_from_env())?;

    tracing::info!("Starting fleet server...");

    let config = Config::from_env();
    match config.store_backend {
        StoreBackend::Sqlite => {
            let db = init_database(&config.database_path, config.database_max_connections).await?;
            serve(SqliteStore::new(db), config).await
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; vehicle state is lost on exit");
            serve(MemoryStore::new(), config).await
        }
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("fleet_server=debug".parse()?);
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
    Ok(())
}

async fn serve<S: VehicleStore>(store: S, config: Config) -> Result<()> {
    let dispatcher = Arc::new(
        Dispatcher::new(Arc::new(store), config.simulation_rules())
            .with_privileged_role(config.privileged_role),
    );
    let rules = dispatcher.rules();
    tracing::info!(
        "Simulation tick {:?}, drain {} per tick ({:?})",
        rules.tick,
        rules.battery_drain_per_tick,
        rules.drain_mode
    );

    let app = api::routes::<S>()
        .with_state(dispatcher.clone())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let handles = dispatcher.shutdown();
    let landed = async {
        for handle in &handles {
            handle.finished().await;
        }
    };
    if tokio::time::timeout(Duration::from_secs(SHUTDOWN_GRACE_SECS), landed)
        .await
        .is_err()
    {
        tracing::warn!("Timed out waiting for flights to stop");
    }

    tracing::info!("Fleet server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
