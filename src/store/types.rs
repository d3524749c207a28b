use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::models::{EtfFlowState, LargeTrade, LiquidationEvent, TimestampMs};

pub const RETENTION_MS: i64 = 24 * 3_600_000;
pub const LIQUIDATION_RETENTION_MS: i64 = 2 * 3_600_000;
pub const LIQUIDATION_CAP: usize = 1000;
pub const LARGE_TRADE_CAP: usize = 500;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp_ms: TimestampMs,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderBookPoint {
    pub timestamp_ms: TimestampMs,
    pub imbalance_pct: f64,
    pub bid_depth: f64,
    pub ask_depth: f64,
}

/// O(1) cache of the most recent value of each attribute for an (exchange, coin) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurrentSnapshot {
    pub price: Option<f64>,
    pub open_interest: Option<f64>,
    pub funding_rate: Option<f64>,
    pub orderbook_imbalance_pct: Option<f64>,
    pub updated_at_ms: TimestampMs,
}

/// All series the store holds for one (exchange, coin) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeSeries {
    pub price: VecDeque<SeriesPoint>,
    pub open_interest: VecDeque<SeriesPoint>,
    pub funding_rate: VecDeque<SeriesPoint>,
    pub orderbook: VecDeque<OrderBookPoint>,
    pub cvd: VecDeque<SeriesPoint>,
    pub current: CurrentSnapshot,
}

impl ExchangeSeries {
    fn push_monotone(points: &mut VecDeque<SeriesPoint>, timestamp_ms: TimestampMs, value: f64) {
        if let Some(last) = points.back() {
            if timestamp_ms < last.timestamp_ms {
                // Out-of-order arrival: still append, never reorder; append-ordered by
                // arrival is the contract, callers are expected to supply wall-clock time.
            }
        }
        points.push_back(SeriesPoint { timestamp_ms, value });
    }

    pub fn push_price(&mut self, timestamp_ms: TimestampMs, value: f64) {
        Self::push_monotone(&mut self.price, timestamp_ms, value);
        self.current.price = Some(value);
        self.current.updated_at_ms = timestamp_ms;
    }

    pub fn push_oi(&mut self, timestamp_ms: TimestampMs, value: f64) {
        Self::push_monotone(&mut self.open_interest, timestamp_ms, value);
        self.current.open_interest = Some(value);
        self.current.updated_at_ms = timestamp_ms;
    }

    pub fn push_funding(&mut self, timestamp_ms: TimestampMs, value: f64) {
        Self::push_monotone(&mut self.funding_rate, timestamp_ms, value);
        self.current.funding_rate = Some(value);
        self.current.updated_at_ms = timestamp_ms;
    }

    pub fn push_orderbook(
        &mut self,
        timestamp_ms: TimestampMs,
        imbalance_pct: f64,
        bid_depth: f64,
        ask_depth: f64,
    ) {
        self.orderbook.push_back(OrderBookPoint {
            timestamp_ms,
            imbalance_pct,
            bid_depth,
            ask_depth,
        });
        self.current.orderbook_imbalance_pct = Some(imbalance_pct);
        self.current.updated_at_ms = timestamp_ms;
    }

    pub fn push_cvd(&mut self, timestamp_ms: TimestampMs, delta: f64) {
        Self::push_monotone(&mut self.cvd, timestamp_ms, delta);
    }

    pub fn trim(&mut self, cutoff_ms: TimestampMs) {
        Self::trim_points(&mut self.price, cutoff_ms);
        Self::trim_points(&mut self.open_interest, cutoff_ms);
        Self::trim_points(&mut self.funding_rate, cutoff_ms);
        Self::trim_points(&mut self.cvd, cutoff_ms);
        while let Some(front) = self.orderbook.front() {
            if front.timestamp_ms < cutoff_ms {
                self.orderbook.pop_front();
            } else {
                break;
            }
        }
    }

    fn trim_points(points: &mut VecDeque<SeriesPoint>, cutoff_ms: TimestampMs) {
        while let Some(front) = points.front() {
            if front.timestamp_ms < cutoff_ms {
                points.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Spot CVD for one (spot exchange, coin) pair with pre-maintained rolling sums.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotCvd {
    pub points: VecDeque<SeriesPoint>,
    pub cumulative: f64,
}

impl SpotCvd {
    pub fn push(&mut self, timestamp_ms: TimestampMs, delta: f64) {
        self.points.push_back(SeriesPoint {
            timestamp_ms,
            value: delta,
        });
        self.cumulative += delta;
        let cutoff = timestamp_ms - RETENTION_MS;
        while let Some(front) = self.points.front() {
            if front.timestamp_ms < cutoff {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn sum_since(&self, now_ms: TimestampMs, window_ms: i64) -> f64 {
        let cutoff = now_ms - window_ms;
        self.points
            .iter()
            .filter(|p| p.timestamp_ms >= cutoff)
            .map(|p| p.value)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FlowBucket {
    pub buy_vol_usd: f64,
    pub sell_vol_usd: f64,
    pub timestamp_ms: TimestampMs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VwapBundle {
    pub vwap: f64,
    pub volume: f64,
    pub updated_at_ms: TimestampMs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreInner {
    pub series: HashMap<String, HashMap<String, ExchangeSeries>>, // exchange -> coin -> series
    pub spot_cvd: HashMap<String, HashMap<String, SpotCvd>>,      // exchange -> coin -> cvd
    pub liquidations: HashMap<String, VecDeque<LiquidationEvent>>, // coin -> events, newest last
    pub etf: EtfFlowState,
    pub exchange_flow: HashMap<String, HashMap<String, FlowBucket>>, // "coin:exchange:venue" -> bucket
    pub large_trades: VecDeque<LargeTrade>,                          // newest first
    pub vwap: HashMap<String, VwapBundle>,
    pub dirty: bool,
}

impl StoreInner {
    pub fn exchange_series_mut(&mut self, exchange: &str, coin: &str) -> &mut ExchangeSeries {
        self.series
            .entry(exchange.to_string())
            .or_default()
            .entry(coin.to_string())
            .or_default()
    }

    pub fn spot_cvd_mut(&mut self, exchange: &str, coin: &str) -> &mut SpotCvd {
        self.spot_cvd
            .entry(exchange.to_string())
            .or_default()
            .entry(coin.to_string())
            .or_default()
    }
}
