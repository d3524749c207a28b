use serde::{Deserialize, Serialize};

pub type TimestampMs = i64;

pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

/// A neutral trade event, the common currency every stream driver parses into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub price: f64,
    pub size: f64,
    pub side: Side,
    pub timestamp_ms: TimestampMs,
    pub trade_id: String,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.price * self.size
    }

    pub fn cvd_delta(&self) -> f64 {
        match self.side {
            Side::Buy => self.notional(),
            Side::Sell => -self.notional(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub symbol: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub timestamp_ms: TimestampMs,
    pub source_exchange: String,
}

impl LiquidationEvent {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// `side=Sell` on the wire is a forced sell: a long position liquidated.
    /// `side=Buy` is a forced buy: a short position liquidated.
    pub fn liquidated_long(&self) -> bool {
        matches!(self.side, Side::Sell)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketStatus {
    Open,
    PreMarket,
    AfterHours,
    Closed,
    Weekend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtfFlowDay {
    pub date: String,
    pub net_flow_usd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtfFlowState {
    pub last_updated_ms: TimestampMs,
    pub market_status: MarketStatus,
    pub today_net_flow_usd: f64,
    pub today_breakdown: std::collections::HashMap<String, f64>,
    pub history: Vec<EtfFlowDay>,
}

impl Default for EtfFlowState {
    fn default() -> Self {
        Self {
            last_updated_ms: 0,
            market_status: MarketStatus::Closed,
            today_net_flow_usd: 0.0,
            today_breakdown: Default::default(),
            history: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    Spot,
    Perp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LargeTrade {
    pub exchange: String,
    pub venue: Venue,
    pub symbol: String,
    pub price: f64,
    pub size: f64,
    pub side: Side,
    pub trade_id: String,
    pub timestamp_ms: TimestampMs,
    pub received_at_ms: TimestampMs,
}

impl LargeTrade {
    pub fn notional(&self) -> f64 {
        self.price * self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum ProjectionType {
    TwelveHour,
    Daily,
    FourHour,
    FourHourComposite,
    OiFourHour,
    CvdTwoHour,
}

impl ProjectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionType::TwelveHour => "12hr",
            ProjectionType::Daily => "daily",
            ProjectionType::FourHour => "4hr",
            ProjectionType::FourHourComposite => "4hr-composite",
            ProjectionType::OiFourHour => "oi-4hr",
            ProjectionType::CvdTwoHour => "cvd-2hr",
        }
    }

    /// Minimum spacing between two recorded predictions for the same (coin, type).
    pub fn cooldown_ms(&self) -> i64 {
        match self {
            ProjectionType::TwelveHour | ProjectionType::Daily => 4 * 3_600_000,
            ProjectionType::FourHour
            | ProjectionType::FourHourComposite
            | ProjectionType::OiFourHour => 2 * 3_600_000,
            ProjectionType::CvdTwoHour => 3_600_000,
        }
    }

    /// Minimum age before a prediction may be evaluated against realised price.
    pub fn evaluation_delay_ms(&self) -> i64 {
        match self {
            ProjectionType::TwelveHour => 8 * 3_600_000,
            ProjectionType::Daily => 16 * 3_600_000,
            ProjectionType::FourHour
            | ProjectionType::FourHourComposite
            | ProjectionType::OiFourHour => 3 * 3_600_000,
            ProjectionType::CvdTwoHour => (1.5 * 3_600_000.0) as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Pending,
    Correct,
    Incorrect,
    Inconclusive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub coin: String,
    pub projection_type: ProjectionType,
    pub timestamp_ms: TimestampMs,
    pub initial_price: f64,
    pub predicted_bias: String,
    pub predicted_direction: Direction,
    pub score: f64,
    pub strength: String,
    pub grade: String,
    pub confidence_level: String,
    pub signals: std::collections::HashMap<String, f64>,
    pub evaluated: bool,
    pub outcome: Outcome,
    pub final_price: Option<f64>,
    pub actual_price_change_pct: Option<f64>,
    pub evaluated_at_ms: Option<TimestampMs>,
}
