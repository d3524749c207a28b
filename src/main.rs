use std::sync::Arc;

use biasengine::api::{router, AppState};
use biasengine::config::{init_tracing, load_env, Config};
use biasengine::models::now_ms;
use biasengine::projection::ProjectionCache;
use biasengine::scheduler;
use biasengine::store::Store;
use biasengine::winrate::WinRateTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = Arc::new(Config::from_env());
    tracing::info!(port = config.port, data_dir = %config.data_dir, "starting biasengine");

    let store = Arc::new(Store::new(config.data_dir.clone()));
    store.restore().await;

    let tracker = Arc::new(WinRateTracker::new(config.data_dir.clone()));
    tracker.restore().await;

    let cache = Arc::new(ProjectionCache::new());

    let state = AppState {
        store: store.clone(),
        tracker: tracker.clone(),
        cache,
        config: config.clone(),
        started_at_ms: now_ms(),
    };

    let scheduler_task = {
        let store = store.clone();
        let tracker = tracker.clone();
        let api_key = config.sosovalue_api_key.clone();
        tokio::spawn(async move {
            scheduler::run(store, tracker, api_key).await;
        })
    };

    let app = router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown signal received, saving state");
    scheduler_task.abort();
    store.snapshot_save().await;
    tracker.snapshot_save().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
