use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Direction, TimestampMs};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ProjectionStatus {
    Collecting { reason: String },
    WarmingUp { completeness: f64 },
    Veto { reason: String },
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confidence {
    pub level: ConfidenceLevel,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invalidation {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub bias: String,
    pub strength: String,
    pub score: f64,
    pub grade: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub coin: String,
    pub horizon: String,
    pub current_price: f64,
    pub status: ProjectionStatus,
    pub prediction: Option<Prediction>,
    pub confidence: Option<Confidence>,
    pub invalidation: Option<Invalidation>,
    pub key_factors: Vec<String>,
    pub components: HashMap<String, f64>,
    pub generated_at_ms: TimestampMs,
    pub valid_until_ms: TimestampMs,
    pub next_refresh_ms: TimestampMs,
}
