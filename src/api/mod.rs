pub mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::projection::cache::ProjectionCache;
use crate::store::Store;
use crate::winrate::WinRateTracker;

/// The coin universe every `:coin` path parameter is validated against.
pub const COINS: &[&str] = &["BTC", "ETH", "SOL"];

/// The exchange universe every `:exchange` path parameter is validated against.
pub const EXCHANGES: &[&str] = &[
    "binance",
    "bybit",
    "okx",
    "coinbase",
    "kraken",
    "hyperliquid",
    "asterdex",
    "nado",
];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub tracker: Arc<WinRateTracker>,
    pub cache: Arc<ProjectionCache>,
    pub config: Arc<Config>,
    pub started_at_ms: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        .route("/api/data/all", get(handlers::data_all))
        .route("/api/data/:exchange", get(handlers::data_exchange))
        .route("/api/snapshot/:exchange", get(handlers::snapshot_exchange))
        .route("/api/whale-trades", get(handlers::whale_trades))
        .route("/api/vwap/:coin", get(handlers::vwap))
        .route("/api/spot-cvd", get(handlers::spot_cvd_default))
        .route("/api/spot-cvd/:coin", get(handlers::spot_cvd_coin))
        .route("/api/exchange-flow", get(handlers::exchange_flow_default))
        .route("/api/exchange-flow/:coin", get(handlers::exchange_flow_coin))
        .route("/api/etf-flows", get(handlers::etf_flows))
        .route("/api/liquidations", get(handlers::liquidations_default))
        .route("/api/liquidations/:coin", get(handlers::liquidations_coin))
        .route("/api/:coin/projection", get(handlers::projection_12h))
        .route("/api/:coin/4hr-bias", get(handlers::projection_4h))
        .route("/api/:coin/daily-bias", get(handlers::projection_daily))
        .route("/api/:coin/liquidation-zones", get(handlers::liquidation_zones_handler))
        .route("/api/win-rates", get(handlers::win_rates_default))
        .route("/api/win-rates/:coin", get(handlers::win_rates_coin))
        .route("/api/predictions", get(handlers::predictions_default))
        .route("/api/predictions/:coin", get(handlers::predictions_coin))
        .route("/api/backtest/predictions", get(handlers::backtest_predictions))
        .route("/api/backtest/stats", get(handlers::backtest_stats))
        .route("/api/backtest/equity-curve", get(handlers::backtest_equity_curve))
        .route("/api/backtest/streaks", get(handlers::backtest_streaks))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
