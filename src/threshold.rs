//! Percentile-based performance thresholds derived from stored samples

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::error::Result;
use crate::query::normalize_query;
use crate::store::{MetricsStore, PerformanceSample};

/// Where a pair of thresholds came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "samples", rename_all = "snake_case")]
pub enum ThresholdSource {
    /// No usable history
    Fallback,
    /// Samples similar to the reference query
    Similar(usize),
    /// Most recent samples of any query
    Window(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub execution_time: f64,
    pub cpu_usage: f64,
    pub source: ThresholdSource,
}

impl Thresholds {
    pub fn fallback(config: &ScoringConfig) -> Self {
        Self {
            execution_time: config.fallback_execution_time,
            cpu_usage: config.fallback_cpu_usage,
            source: ThresholdSource::Fallback,
        }
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.execution_time, self.cpu_usage)
    }
}

/// Linearly interpolated percentile (`pct` in `0..=100`) of unsorted values
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

pub struct ThresholdCalculator<'a> {
    store: &'a MetricsStore,
    config: &'a ScoringConfig,
}

impl<'a> ThresholdCalculator<'a> {
    pub fn new(store: &'a MetricsStore, config: &'a ScoringConfig) -> Self {
        Self { store, config }
    }

    /// Thresholds for `query`, or for the recent workload when `query` is `None`
    ///
    /// With a query, only stored samples similar to it are considered; a
    /// query that cannot be normalized is ungroupable and gets the fallback.
    pub fn calculate_dynamic_thresholds(&self, query: Option<&str>) -> Result<Thresholds> {
        match query {
            Some(query) => {
                let reference = match normalize_query(query) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(error = %e, "query is not groupable, using static thresholds");
                        return Ok(Thresholds::fallback(self.config));
                    }
                };
                let similar = self.store.find_similar(
                    &reference,
                    self.config.similarity_threshold,
                    self.config.similarity_scan_limit,
                )?;
                Ok(self.from_samples(&similar, ThresholdSource::Similar(similar.len())))
            }
            None => {
                let recent = self.store.recent(None, self.config.window_size)?;
                Ok(self.from_samples(&recent, ThresholdSource::Window(recent.len())))
            }
        }
    }

    fn from_samples(&self, samples: &[PerformanceSample], source: ThresholdSource) -> Thresholds {
        if samples.is_empty() {
            return Thresholds::fallback(self.config);
        }

        let exec_times: Vec<f64> = samples.iter().map(|s| s.execution_time).collect();
        let cpu_usages: Vec<f64> = samples.iter().map(|s| s.cpu_usage).collect();

        let pct = self.config.percentile;
        let execution_time = usable_or(percentile(&exec_times, pct), self.config.fallback_execution_time);
        let cpu_usage = usable_or(percentile(&cpu_usages, pct), self.config.fallback_cpu_usage);

        debug!(execution_time, cpu_usage, ?source, "computed dynamic thresholds");
        Thresholds {
            execution_time,
            cpu_usage,
            source,
        }
    }
}

/// A threshold is a divisor; anything not strictly positive is replaced
fn usable_or(value: Option<f64>, fallback: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((percentile(&values, 95.0).unwrap() - 4.8).abs() < 1e-12);
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert_eq!(percentile(&[7.5], 95.0), Some(7.5));
        assert_eq!(percentile(&[], 95.0), None);
    }

    #[test]
    fn test_empty_store_falls_back() {
        let store = MetricsStore::open_in_memory().unwrap();
        let config = ScoringConfig::default();
        let calc = ThresholdCalculator::new(&store, &config);

        assert_eq!(calc.calculate_dynamic_thresholds(None).unwrap().as_pair(), (1.0, 100.0));
        let with_query = calc
            .calculate_dynamic_thresholds(Some("SELECT * FROM users"))
            .unwrap();
        assert_eq!(with_query.as_pair(), (1.0, 100.0));
        assert_eq!(with_query.source, ThresholdSource::Fallback);
    }

    #[test]
    fn test_window_uses_recent_samples() {
        let store = MetricsStore::open_in_memory().unwrap();
        for (i, t) in [1.0, 2.0, 3.0, 4.0, 5.0].iter().enumerate() {
            store
                .store(*t, t * 10.0, &format!("SELECT * FROM t{}", i))
                .unwrap();
        }
        let config = ScoringConfig::default();
        let thresholds = ThresholdCalculator::new(&store, &config)
            .calculate_dynamic_thresholds(None)
            .unwrap();
        assert!((thresholds.execution_time - 4.8).abs() < 1e-9);
        assert!((thresholds.cpu_usage - 48.0).abs() < 1e-9);
        assert_eq!(thresholds.source, ThresholdSource::Window(5));
    }

    #[test]
    fn test_query_uses_similar_samples_only() {
        let store = MetricsStore::open_in_memory().unwrap();
        store.store(0.2, 10.0, "SELECT * FROM users WHERE age > 30").unwrap();
        store.store(0.4, 20.0, "SELECT * FROM users WHERE age > 50").unwrap();
        store
            .store(9.0, 90.0, "INSERT INTO orders (user_id, order_date, total_price) VALUES (1, '2024-01-01', 3)")
            .unwrap();

        let config = ScoringConfig::default();
        let thresholds = ThresholdCalculator::new(&store, &config)
            .calculate_dynamic_thresholds(Some("SELECT * FROM users WHERE age > 18"))
            .unwrap();
        assert_eq!(thresholds.source, ThresholdSource::Similar(2));
        assert!((thresholds.execution_time - 0.39).abs() < 1e-9);
        assert!((thresholds.cpu_usage - 19.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_percentile_falls_back_per_dimension() {
        let store = MetricsStore::open_in_memory().unwrap();
        store.store(0.5, -2.0, "SELECT 1").unwrap();
        store.store(0.5, 0.0, "SELECT 2").unwrap();

        let config = ScoringConfig::default();
        let thresholds = ThresholdCalculator::new(&store, &config)
            .calculate_dynamic_thresholds(None)
            .unwrap();
        assert_eq!(thresholds.execution_time, 0.5);
        assert_eq!(thresholds.cpu_usage, 100.0);
    }

    #[test]
    fn test_unparseable_query_falls_back() {
        let store = MetricsStore::open_in_memory().unwrap();
        store.store(0.5, 5.0, "SELECT 1").unwrap();
        let config = ScoringConfig::default();
        let thresholds = ThresholdCalculator::new(&store, &config)
            .calculate_dynamic_thresholds(Some("SELECT 'broken"))
            .unwrap();
        assert_eq!(thresholds.source, ThresholdSource::Fallback);
    }
}
