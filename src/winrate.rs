use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{now_ms, Direction, Outcome, PredictionRecord, ProjectionType, TimestampMs};
use crate::store::Store;

const RETENTION_DAYS_MS: i64 = 365 * 24 * 3_600_000;

#[derive(Debug, Default, Serialize, Deserialize)]
struct TrackerInner {
    predictions: Vec<PredictionRecord>,
}

#[derive(Serialize, Deserialize)]
struct TrackerSnapshot {
    predictions: Vec<PredictionRecord>,
    stats: serde_json::Value,
    #[serde(rename = "savedAt")]
    saved_at: TimestampMs,
}

/// Exclusively owns the prediction log: records each emitted ACTIVE
/// projection, evaluates it after a horizon-specific delay against realised
/// price change, and exposes aggregate accuracy statistics.
pub struct WinRateTracker {
    inner: RwLock<TrackerInner>,
    data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    pub total: u64,
    pub correct: u64,
    pub win_rate: f64,
    pub strong_total: u64,
    pub strong_correct: u64,
    pub strong_win_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Streaks {
    pub current_streak: i64,
    pub longest_win: u64,
    pub longest_loss: u64,
}

impl WinRateTracker {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: RwLock::new(TrackerInner::default()),
            data_dir: data_dir.into(),
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join("winrates.json")
    }

    /// Records a prediction, rejecting it if one for the same (coin, type)
    /// already exists within that type's cooldown window.
    pub fn record(&self, mut record: PredictionRecord) -> Result<(), String> {
        let mut inner = self.inner.write();
        let cooldown = record.projection_type.cooldown_ms();
        let has_recent = inner.predictions.iter().any(|p| {
            p.coin == record.coin
                && p.projection_type == record.projection_type
                && record.timestamp_ms - p.timestamp_ms < cooldown
                && record.timestamp_ms >= p.timestamp_ms
        });
        if has_recent {
            return Err(format!(
                "a {} prediction for {} already exists within its cooldown window",
                record.projection_type.as_str(),
                record.coin
            ));
        }
        if record.id.is_empty() {
            record.id = uuid::Uuid::new_v4().to_string();
        }
        inner.predictions.push(record);
        Ok(())
    }

    /// Evaluates every unevaluated prediction old enough per its type's
    /// evaluation delay, reading current price from the store preferring
    /// Binance, then Hyperliquid, then Bybit.
    pub fn evaluate_due(&self, store: &Store) {
        let now = now_ms();
        let mut inner = self.inner.write();
        for pred in inner.predictions.iter_mut() {
            if pred.evaluated {
                continue;
            }
            if now - pred.timestamp_ms < pred.projection_type.evaluation_delay_ms() {
                continue;
            }
            let current_price = ["binance", "hyperliquid", "bybit"]
                .iter()
                .find_map(|ex| store.get_series(ex, &pred.coin).and_then(|s| s.current.price));

            match current_price {
                Some(final_price) => {
                    let pct = (final_price - pred.initial_price) / pred.initial_price * 100.0;
                    let actual_direction = if pct > 0.5 {
                        Direction::Bullish
                    } else if pct < -0.5 {
                        Direction::Bearish
                    } else {
                        Direction::Neutral
                    };
                    pred.outcome = if actual_direction == pred.predicted_direction {
                        Outcome::Correct
                    } else {
                        Outcome::Incorrect
                    };
                    pred.final_price = Some(final_price);
                    pred.actual_price_change_pct = Some(pct);
                }
                None => {
                    pred.outcome = Outcome::Inconclusive;
                }
            }
            pred.evaluated = true;
            pred.evaluated_at_ms = Some(now);
        }
    }

    pub fn aggregate(&self, coin: &str) -> Aggregate {
        let inner = self.inner.read();
        let evaluated: Vec<&PredictionRecord> = inner
            .predictions
            .iter()
            .filter(|p| p.coin == coin && p.evaluated && p.outcome != Outcome::Inconclusive)
            .collect();
        let total = evaluated.len() as u64;
        let correct = evaluated.iter().filter(|p| p.outcome == Outcome::Correct).count() as u64;
        let strong: Vec<&&PredictionRecord> = evaluated.iter().filter(|p| p.strength.contains("STRONG")).collect();
        let strong_total = strong.len() as u64;
        let strong_correct = strong.iter().filter(|p| p.outcome == Outcome::Correct).count() as u64;

        Aggregate {
            total,
            correct,
            win_rate: ratio(correct, total),
            strong_total,
            strong_correct,
            strong_win_rate: ratio(strong_correct, strong_total),
        }
    }

    pub fn predictions(&self, coin: Option<&str>, limit: usize) -> Vec<PredictionRecord> {
        let inner = self.inner.read();
        inner
            .predictions
            .iter()
            .rev()
            .filter(|p| coin.map(|c| p.coin == c).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn filtered(
        &self,
        projection_type: Option<ProjectionType>,
        strength: Option<&str>,
        confidence_level: Option<&str>,
        from_ms: Option<TimestampMs>,
        to_ms: Option<TimestampMs>,
    ) -> Vec<PredictionRecord> {
        self.inner
            .read()
            .predictions
            .iter()
            .filter(|p| projection_type.map(|t| p.projection_type == t).unwrap_or(true))
            .filter(|p| strength.map(|s| p.strength == s).unwrap_or(true))
            .filter(|p| confidence_level.map(|c| p.confidence_level == c).unwrap_or(true))
            .filter(|p| from_ms.map(|f| p.timestamp_ms >= f).unwrap_or(true))
            .filter(|p| to_ms.map(|t| p.timestamp_ms <= t).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Applies +2%/-1.5% per evaluated prediction starting from `initial_capital`.
    pub fn equity_curve(&self, coin: &str, initial_capital: f64) -> Vec<f64> {
        let inner = self.inner.read();
        let mut curve = vec![initial_capital];
        let mut capital = initial_capital;
        for pred in inner.predictions.iter().filter(|p| p.coin == coin && p.evaluated && p.outcome != Outcome::Inconclusive) {
            capital *= if pred.outcome == Outcome::Correct { 1.02 } else { 0.985 };
            curve.push(capital);
        }
        curve
    }

    pub fn streaks(&self, coin: &str) -> Streaks {
        let inner = self.inner.read();
        let mut longest_win = 0u64;
        let mut longest_loss = 0u64;
        let mut run_win = 0u64;
        let mut run_loss = 0u64;
        let mut current_streak = 0i64;

        for pred in inner.predictions.iter().filter(|p| p.coin == coin && p.evaluated && p.outcome != Outcome::Inconclusive) {
            match pred.outcome {
                Outcome::Correct => {
                    run_win += 1;
                    run_loss = 0;
                    longest_win = longest_win.max(run_win);
                    current_streak = if current_streak >= 0 { current_streak + 1 } else { 1 };
                }
                Outcome::Incorrect => {
                    run_loss += 1;
                    run_win = 0;
                    longest_loss = longest_loss.max(run_loss);
                    current_streak = if current_streak <= 0 { current_streak - 1 } else { -1 };
                }
                _ => {}
            }
        }

        Streaks { current_streak, longest_win, longest_loss }
    }

    pub async fn snapshot_save(&self) {
        let now = now_ms();
        let cutoff = now - RETENTION_DAYS_MS;
        let predictions = {
            let mut inner = self.inner.write();
            inner.predictions.retain(|p| p.timestamp_ms >= cutoff);
            inner.predictions.clone()
        };
        let snapshot = TrackerSnapshot {
            predictions,
            stats: serde_json::json!({}),
            saved_at: now,
        };
        let path = self.snapshot_path();
        if let Err(err) = write_json_atomic(&path, &snapshot).await {
            tracing::warn!(error = %err, "win-rate tracker snapshot save failed, state remains in memory");
        }
    }

    pub async fn restore(&self) {
        let path = self.snapshot_path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(_) => return,
        };
        match serde_json::from_slice::<TrackerSnapshot>(&bytes) {
            Ok(snapshot) => {
                self.inner.write().predictions = snapshot.predictions;
                tracing::info!("win-rate tracker restored from snapshot");
            }
            Err(err) => {
                tracing::warn!(error = %err, "win-rate tracker snapshot restore failed, starting empty");
            }
        }
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

async fn write_json_atomic<T: Serialize>(path: &PathBuf, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&tmp_path, body).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Outcome, PredictionRecord};

    fn mk_record(coin: &str, ptype: ProjectionType, timestamp_ms: i64, direction: Direction) -> PredictionRecord {
        PredictionRecord {
            id: String::new(),
            coin: coin.to_string(),
            projection_type: ptype,
            timestamp_ms,
            initial_price: 50_000.0,
            predicted_bias: "BULLISH".into(),
            predicted_direction: direction,
            score: 0.5,
            strength: "STRONG".into(),
            grade: "A".into(),
            confidence_level: "HIGH".into(),
            signals: HashMap::new(),
            evaluated: false,
            outcome: Outcome::Pending,
            final_price: None,
            actual_price_change_pct: None,
            evaluated_at_ms: None,
        }
    }

    #[test]
    fn cooldown_rejects_repeat_within_window() {
        let tracker = WinRateTracker::new("data");
        let t0 = 10_000_000;
        tracker.record(mk_record("BTC", ProjectionType::TwelveHour, t0, Direction::Bullish)).unwrap();
        let err = tracker.record(mk_record("BTC", ProjectionType::TwelveHour, t0 + 1_000, Direction::Bullish));
        assert!(err.is_err());
    }

    #[test]
    fn cooldown_allows_after_window() {
        let tracker = WinRateTracker::new("data");
        let t0 = 10_000_000;
        tracker.record(mk_record("BTC", ProjectionType::TwelveHour, t0, Direction::Bullish)).unwrap();
        let cooldown = ProjectionType::TwelveHour.cooldown_ms();
        tracker
            .record(mk_record("BTC", ProjectionType::TwelveHour, t0 + cooldown + 1, Direction::Bullish))
            .unwrap();
    }

    #[test]
    fn s6_evaluation_marks_correct_bullish_prediction() {
        let tracker = WinRateTracker::new("data");
        let store = Store::new("data");
        let t0 = 10_000_000_000;
        tracker.record(mk_record("BTC", ProjectionType::TwelveHour, t0, Direction::Bullish)).unwrap();

        store.add_price_at("binance", "BTC", 50_600.0, t0 + 8 * 3_600_000 + 1);

        // Evaluation runs "now"; simulate by checking the delay condition directly
        // against a store read at T+8h.
        let before = tracker.aggregate("BTC");
        assert_eq!(before.total, 0);

        // Force evaluation path by calling evaluate_due with the clock effectively
        // at T+8h+1ms: predictions older than the evaluation delay are picked up.
        std::thread::sleep(std::time::Duration::from_millis(0));
        tracker.inner.write().predictions[0].timestamp_ms = crate::models::now_ms() - 9 * 3_600_000;
        tracker.evaluate_due(&store);

        let aggregate = tracker.aggregate("BTC");
        assert_eq!(aggregate.total, 1);
        assert_eq!(aggregate.correct, 1);
    }
}
