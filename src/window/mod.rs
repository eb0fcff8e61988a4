//! Rolling-window aggregation
//!
//! Time-bounded accumulators for metric series. Each insert updates running
//! sums and monotonic min/max deques and evicts points that fell out of the
//! retention window, so window statistics stay O(1) amortized per insert
//! instead of replaying the full history.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Window retention, supplied at engine construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Retention in seconds; points older than this behind the newest
    /// observation are evicted
    /// Default: 3600 (one hour of intraday snapshots)
    pub retention_secs: i64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            retention_secs: 3600,
        }
    }
}

impl WindowConfig {
    /// Tight window: five minutes
    pub fn tight() -> Self {
        Self { retention_secs: 300 }
    }

    /// Daily window: 24 hours
    pub fn daily() -> Self {
        Self {
            retention_secs: 86_400,
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::seconds(self.retention_secs)
    }
}

/// Metric series tracked per (underlying, expiry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    VolumePcr,
    OpenInterestPcr,
    MeanIv,
    MeanDelta,
    MeanGamma,
    MeanTheta,
    MeanVega,
    MeanRho,
}

/// One observation in a metric series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Aggregate view over the currently retained points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f64,
    /// Population variance over the retained points
    pub variance: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// Newest retained value
    pub latest: f64,
}

/// Rolling accumulation of one metric series
#[derive(Debug, Clone, Default)]
pub struct RollingWindow {
    points: VecDeque<MetricPoint>,
    sum: f64,
    sum_sq: f64,
    /// Front holds the current minimum; values increase toward the back
    min_deque: VecDeque<MetricPoint>,
    /// Front holds the current maximum; values decrease toward the back
    max_deque: VecDeque<MetricPoint>,
}

impl RollingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observation and evict everything older than `retention`
    /// behind it. Timestamps must arrive in increasing order; the engine
    /// enforces that per underlying.
    pub fn observe(&mut self, timestamp: DateTime<Utc>, value: f64, retention: Duration) {
        let point = MetricPoint { timestamp, value };

        self.points.push_back(point);
        self.sum += value;
        self.sum_sq += value * value;

        while self.min_deque.back().is_some_and(|p| p.value >= value) {
            self.min_deque.pop_back();
        }
        self.min_deque.push_back(point);

        while self.max_deque.back().is_some_and(|p| p.value <= value) {
            self.max_deque.pop_back();
        }
        self.max_deque.push_back(point);

        self.evict_before(timestamp - retention);
    }

    /// Drop points strictly older than `cutoff`
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) {
        while let Some(front) = self.points.front() {
            if front.timestamp >= cutoff {
                break;
            }
            let evicted = self.points.pop_front().unwrap();
            self.sum -= evicted.value;
            self.sum_sq -= evicted.value * evicted.value;

            if self.min_deque.front().is_some_and(|p| p.timestamp == evicted.timestamp) {
                self.min_deque.pop_front();
            }
            if self.max_deque.front().is_some_and(|p| p.timestamp == evicted.timestamp) {
                self.max_deque.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest retained value, newest point with `timestamp <= ts`.
    ///
    /// Answers only from retained history; evicted points are gone.
    pub fn value_as_of(&self, ts: DateTime<Utc>) -> Option<f64> {
        let idx = self.points.partition_point(|p| p.timestamp <= ts);
        idx.checked_sub(1).map(|i| self.points[i].value)
    }

    /// Aggregate statistics over the retained points
    pub fn stats(&self) -> Option<WindowStats> {
        if self.points.is_empty() {
            return None;
        }

        let n = self.points.len() as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq / n - mean * mean).max(0.0);

        Some(WindowStats {
            mean,
            variance,
            std_dev: variance.sqrt(),
            min: self.min_deque.front().map(|p| p.value).unwrap_or(mean),
            max: self.max_deque.front().map(|p| p.value).unwrap_or(mean),
            count: self.points.len(),
            latest: self.points.back().unwrap().value,
        })
    }

    /// Retained points in time order
    pub fn points(&self) -> impl Iterator<Item = &MetricPoint> {
        self.points.iter()
    }
}
