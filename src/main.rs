use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crosspost::config::Config;
use crosspost::state::AppState;
use crosspost::store::{MemoryQueueStore, PgQueueStore, QueueStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Load config
    let config = Config::from_env().expect("Failed to load configuration");

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting crosspost");

    let store: Arc<dyn QueueStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .expect("Failed to connect to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("Failed to run migrations");

            tracing::info!("Migrations applied");
            Arc::new(PgQueueStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory posting queue");
            Arc::new(MemoryQueueStore::new())
        }
    };

    let registry = Arc::new(crosspost::build_registry(&config)?);
    let state = Arc::new(AppState::new(store, registry, config.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if config.poll_interval_secs > 0 {
        Some(crosspost::worker::run_pool(
            state.processor.clone(),
            shutdown_rx,
            config.worker_threads,
            Duration::from_secs(config.poll_interval_secs),
            config.batch_size,
        )?)
    } else {
        tracing::info!("Scheduler disabled, batches run only on demand");
        None
    };

    let addr = SocketAddr::new(config.host, config.port);
    let app = crosspost::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        let _ = tokio::task::spawn_blocking(move || handle.join()).await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
