use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::AppError;
use crate::factors::liquidation_cascade::liquidation_cascade;
use crate::factors::liquidation_zones::liquidation_zones;
use crate::factors::spot_perp_divergence::spot_perp_divergence;
use crate::models::{now_ms, ProjectionType};
use crate::projection::cache::Horizon;
use crate::projection::engine::{project_12h, project_4h, project_daily, PRIMARY_EXCHANGE};
use crate::projection::types::{ConfidenceLevel, Projection, ProjectionStatus};

use super::{AppState, COINS, EXCHANGES};

fn check_coin(coin: &str) -> Result<String, AppError> {
    let upper = coin.to_uppercase();
    if COINS.contains(&upper.as_str()) {
        Ok(upper)
    } else {
        Err(AppError::bad_coin(coin, COINS))
    }
}

fn check_exchange(exchange: &str) -> Result<(), AppError> {
    if EXCHANGES.contains(&exchange) {
        Ok(())
    } else {
        Err(AppError::bad_exchange(exchange, EXCHANGES))
    }
}

pub async fn not_found(uri: axum::http::Uri) -> AppError {
    AppError::NotFound { path: uri.path().to_string() }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.stats();
    Json(json!({
        "status": "ok",
        "uptimeSeconds": (now_ms() - state.started_at_ms) / 1000,
        "store": stats,
    }))
}

pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.stats();
    Json(json!({
        "status": "ok",
        "uptimeSeconds": (now_ms() - state.started_at_ms) / 1000,
        "store": stats,
        "exchanges": state.store.exchanges(),
    }))
}

pub async fn data_all(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.get_all_series())
}

pub async fn data_exchange(State(state): State<AppState>, Path(exchange): Path<String>) -> Result<impl IntoResponse, AppError> {
    check_exchange(&exchange)?;
    let data = state.store.get_exchange_data(&exchange).unwrap_or_default();
    Ok(Json(data))
}

pub async fn snapshot_exchange(State(state): State<AppState>, Path(exchange): Path<String>) -> Result<impl IntoResponse, AppError> {
    check_exchange(&exchange)?;
    Ok(Json(state.store.get_current_snapshot(&exchange)))
}

#[derive(serde::Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

pub async fn whale_trades(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> impl IntoResponse {
    Json(state.store.get_large_trades(q.limit.unwrap_or(100)))
}

pub async fn vwap(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    match state.store.get_vwap(&coin) {
        Some(bundle) => Ok(Json(json!(bundle))),
        None => Ok(Json(json!({ "coin": coin, "vwap": null }))),
    }
}

const SPOT_EXCHANGES: [&str; 3] = ["binance", "bybit", "coinbase"];
const PERP_EXCHANGES: [&str; 3] = ["binance", "bybit", "okx"];

pub async fn spot_cvd_default(state: State<AppState>) -> Result<impl IntoResponse, AppError> {
    spot_cvd_coin(state, Path("BTC".to_string())).await
}

pub async fn spot_cvd_coin(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    let now = now_ms();
    let spot_history = state.store.get_aggregated_spot_cvd_history(&coin, &SPOT_EXCHANGES);
    let perp_history = state.store.get_aggregated_perp_cvd_history(&coin, &PERP_EXCHANGES);
    let spot_6h: f64 = spot_history.iter().filter(|(t, _)| *t >= now - 6 * 3_600_000).map(|(_, v)| v).sum();
    let perp_6h: f64 = perp_history.iter().filter(|(t, _)| *t >= now - 6 * 3_600_000).map(|(_, v)| v).sum();
    let divergence = spot_perp_divergence(spot_6h, perp_6h, &coin);
    Ok(Json(json!({
        "coin": coin,
        "spotCvdHistory": spot_history,
        "perpCvdHistory": perp_history,
        "spotCvd6h": spot_6h,
        "perpCvd6h": perp_6h,
        "divergence": { "label": divergence.label, "score": divergence.score },
    })))
}

#[derive(serde::Deserialize)]
pub struct WindowQuery {
    pub window: Option<u64>,
}

pub async fn exchange_flow_default(state: State<AppState>, query: Query<WindowQuery>) -> Result<impl IntoResponse, AppError> {
    exchange_flow_coin(state, Path("BTC".to_string()), query).await
}

pub async fn exchange_flow_coin(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    let window = q.window.unwrap_or(5);
    if ![5, 15, 60].contains(&window) {
        return Err(AppError::BadRequest {
            message: "window must be one of 5, 15, 60".to_string(),
            valid: crate::error::Valid::None,
        });
    }
    Ok(Json(json!({
        "coin": coin,
        "windowMinutes": window,
        "buckets": state.store.get_exchange_flow(&coin),
    })))
}

pub async fn etf_flows(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.get_etf_flows())
}

pub async fn liquidations_default(state: State<AppState>) -> Result<impl IntoResponse, AppError> {
    liquidations_coin(state, Path("BTC".to_string())).await
}

pub async fn liquidations_coin(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    let events = state.store.get_liquidations(&coin);
    let signal = liquidation_cascade(&events, now_ms());
    Ok(Json(json!({
        "coin": coin,
        "signal": { "label": signal.label, "score": signal.score },
        "events": events,
    })))
}

/// Shared path for the three bias endpoints: serve from cache within TTL,
/// otherwise invoke the engine, and on an ACTIVE result populate the cache
/// and record a prediction.
async fn serve_projection(
    state: &AppState,
    coin: &str,
    horizon: Horizon,
    projection_type: ProjectionType,
    compute: impl FnOnce() -> Projection,
) -> Json<serde_json::Value> {
    let now = now_ms();
    if let Some(cached) = state.cache.get(coin, horizon, now) {
        return Json(json!(cached));
    }
    let projection = compute();
    state.cache.put(coin, horizon, projection.clone());

    if matches!(projection.status, ProjectionStatus::Active) {
        if let Some(prediction) = &projection.prediction {
            let record = crate::models::PredictionRecord {
                id: String::new(),
                coin: coin.to_string(),
                projection_type,
                timestamp_ms: now,
                initial_price: projection.current_price,
                predicted_bias: prediction.bias.clone(),
                predicted_direction: prediction.direction,
                score: prediction.score,
                strength: prediction.strength.clone(),
                grade: prediction.grade.clone(),
                confidence_level: projection
                    .confidence
                    .as_ref()
                    .map(|c| confidence_label(c.level))
                    .unwrap_or_default(),
                signals: projection.components.clone(),
                evaluated: false,
                outcome: crate::models::Outcome::Pending,
                final_price: None,
                actual_price_change_pct: None,
                evaluated_at_ms: None,
            };
            if let Err(err) = state.tracker.record(record) {
                tracing::debug!(coin, horizon = projection_type.as_str(), error = %err, "prediction not recorded");
            }
        }
    }
    Json(json!(projection))
}

fn confidence_label(level: ConfidenceLevel) -> String {
    match level {
        ConfidenceLevel::High => "HIGH".to_string(),
        ConfidenceLevel::Medium => "MEDIUM".to_string(),
        ConfidenceLevel::Low => "LOW".to_string(),
    }
}

pub async fn projection_12h(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    if coin != "BTC" {
        return Err(AppError::bad_coin(&coin, &["BTC"]));
    }
    let store = state.store.clone();
    let response = serve_projection(&state, &coin, Horizon::TwelveHour, ProjectionType::TwelveHour, move || {
        project_12h(&store, now_ms(), None)
    })
    .await;
    Ok(response)
}

pub async fn projection_4h(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    if coin != "BTC" {
        return Err(AppError::bad_coin(&coin, &["BTC"]));
    }
    let store = state.store.clone();
    let response = serve_projection(&state, &coin, Horizon::FourHour, ProjectionType::FourHour, move || {
        project_4h(&store, now_ms())
    })
    .await;
    Ok(response)
}

pub async fn projection_daily(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    let store = state.store.clone();
    let coin_for_compute = coin.clone();
    let response = serve_projection(&state, &coin, Horizon::Daily, ProjectionType::Daily, move || {
        project_daily(&store, &coin_for_compute, now_ms(), None)
    })
    .await;
    Ok(response)
}

pub async fn liquidation_zones_handler(
    State(state): State<AppState>,
    Path(coin): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    let now = now_ms();
    let series = state.store.get_series(PRIMARY_EXCHANGE, &coin);
    let price = series.as_ref().and_then(|s| s.current.price).unwrap_or(0.0);
    if price <= 0.0 {
        return Ok(Json(json!({ "coin": coin, "status": "COLLECTING" })));
    }

    let exchanges = ["binance", "bybit", "okx"];
    let fundings: Vec<f64> = exchanges
        .iter()
        .filter_map(|ex| state.store.get_series(ex, &coin))
        .filter_map(|s| s.current.funding_rate)
        .collect();
    let avg_funding = if fundings.is_empty() { 0.0 } else { fundings.iter().sum::<f64>() / fundings.len() as f64 };
    let avg_funding_apr = avg_funding * 3.0 * 365.0 * 100.0;

    let aggregated_oi: f64 = exchanges
        .iter()
        .filter_map(|ex| state.store.get_series(ex, &coin))
        .filter_map(|s| s.current.open_interest)
        .sum();

    let oi_24h_ago: f64 = exchanges
        .iter()
        .filter_map(|ex| state.store.get_series(ex, &coin))
        .filter_map(|s| s.open_interest.front().map(|p| p.value))
        .sum();
    let oi_velocity_pct = if oi_24h_ago > 0.0 { (aggregated_oi - oi_24h_ago) / oi_24h_ago * 100.0 } else { 0.0 };

    let zones = liquidation_zones(price, avg_funding_apr, aggregated_oi, oi_velocity_pct);
    let events = state.store.get_liquidations(&coin);
    let cascade = liquidation_cascade(&events, now);

    Ok(Json(json!({
        "coin": coin,
        "price": price,
        "zones": {
            "longLiqPrice": zones.long_liq_price,
            "shortLiqPrice": zones.short_liq_price,
            "leverageEstimate": zones.leverage_estimate,
            "oiAtRiskUsd": zones.oi_at_risk_usd,
            "probability": format!("{:?}", zones.probability).to_uppercase(),
        },
        "cascade": { "label": cascade.label, "score": cascade.score },
    })))
}

pub async fn win_rates_default(State(state): State<AppState>) -> impl IntoResponse {
    let mut out = HashMap::new();
    for coin in COINS {
        out.insert(coin.to_string(), state.tracker.aggregate(coin));
    }
    Json(json!(out))
}

pub async fn win_rates_coin(State(state): State<AppState>, Path(coin): Path<String>) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    Ok(Json(json!(state.tracker.aggregate(&coin))))
}

pub async fn predictions_default(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> impl IntoResponse {
    Json(state.tracker.predictions(None, q.limit.unwrap_or(50)))
}

pub async fn predictions_coin(
    State(state): State<AppState>,
    Path(coin): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<impl IntoResponse, AppError> {
    let coin = check_coin(&coin)?;
    Ok(Json(state.tracker.predictions(Some(&coin), q.limit.unwrap_or(50))))
}

#[derive(serde::Deserialize, Default)]
pub struct BacktestQuery {
    pub coin: Option<String>,
    #[serde(rename = "projectionType")]
    pub projection_type: Option<String>,
    pub strength: Option<String>,
    pub confidence: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

fn parse_projection_type(raw: &str) -> Option<ProjectionType> {
    [
        ProjectionType::TwelveHour,
        ProjectionType::Daily,
        ProjectionType::FourHour,
        ProjectionType::FourHourComposite,
        ProjectionType::OiFourHour,
        ProjectionType::CvdTwoHour,
    ]
    .into_iter()
    .find(|t| t.as_str() == raw)
}

pub async fn backtest_predictions(State(state): State<AppState>, Query(q): Query<BacktestQuery>) -> impl IntoResponse {
    let ptype = q.projection_type.as_deref().and_then(parse_projection_type);
    Json(state.tracker.filtered(ptype, q.strength.as_deref(), q.confidence.as_deref(), q.from, q.to))
}

pub async fn backtest_stats(State(state): State<AppState>, Query(q): Query<BacktestQuery>) -> impl IntoResponse {
    let coin = q.coin.unwrap_or_else(|| "BTC".to_string());
    Json(json!(state.tracker.aggregate(&coin)))
}

#[derive(serde::Deserialize)]
pub struct EquityQuery {
    pub coin: Option<String>,
    #[serde(rename = "initialCapital")]
    pub initial_capital: Option<f64>,
}

pub async fn backtest_equity_curve(State(state): State<AppState>, Query(q): Query<EquityQuery>) -> impl IntoResponse {
    let coin = q.coin.unwrap_or_else(|| "BTC".to_string());
    let initial_capital = q.initial_capital.unwrap_or(10_000.0);
    Json(json!({
        "coin": coin,
        "initialCapital": initial_capital,
        "curve": state.tracker.equity_curve(&coin, initial_capital),
    }))
}

#[derive(serde::Deserialize)]
pub struct CoinQuery {
    pub coin: Option<String>,
}

pub async fn backtest_streaks(State(state): State<AppState>, Query(q): Query<CoinQuery>) -> impl IntoResponse {
    let coin = q.coin.unwrap_or_else(|| "BTC".to_string());
    Json(json!(state.tracker.streaks(&coin)))
}
