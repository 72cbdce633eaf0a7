//! Metrics storage with SQLite
//!
//! Append-only log of performance samples, grouped by normalized query.
//! The store is an explicit handle: open one per database and pass it to
//! whatever needs it.

mod schema;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, ScoreError};
use crate::query::{get_query_group, normalize_query, normalized_similarity, GroupKey, NormalizedQuery};

pub use schema::SCHEMA;

/// One recorded execution of a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSample {
    pub id: String,
    pub execution_time: f64,
    pub cpu_usage: f64,
    pub timestamp: DateTime<Utc>,
    pub group_key: GroupKey,
    pub query_text: String,
}

pub struct MetricsStore {
    conn: Connection,
    max_samples: Option<usize>,
}

impl MetricsStore {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn,
            max_samples: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Cap the number of retained samples; `None` keeps everything
    pub fn with_retention(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples;
        self
    }

    // ============================================
    // WRITES
    // ============================================

    /// Append a sample for `query`
    ///
    /// Fails with a parse error if the query cannot be grouped, and with a
    /// persistence error if the write does not land.
    pub fn store(&self, execution_time: f64, cpu_usage: f64, query: &str) -> Result<PerformanceSample> {
        if !execution_time.is_finite() || execution_time < 0.0 {
            return Err(ScoreError::InvalidSample(format!(
                "execution time must be a non-negative number, got {}",
                execution_time
            )));
        }
        if !cpu_usage.is_finite() {
            return Err(ScoreError::InvalidSample(format!(
                "cpu usage must be finite, got {}",
                cpu_usage
            )));
        }

        let group_key = get_query_group(query)?;
        let timestamp = Utc::now();
        let id = format!(
            "{}_{}_{}",
            group_key.digest(),
            timestamp.timestamp_micros(),
            Uuid::new_v4().simple()
        );

        self.conn.execute(
            "INSERT INTO query_performance (id, execution_time, cpu_usage, timestamp, group_key, query_text)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id,
                execution_time,
                cpu_usage,
                format_timestamp(&timestamp),
                group_key.as_str(),
                query,
            ],
        )?;
        debug!(id = %id, execution_time, cpu_usage, "stored performance sample");

        if let Some(max) = self.max_samples {
            let pruned = self.prune(max)?;
            if pruned > 0 {
                debug!(pruned, max_samples = max, "pruned old performance samples");
            }
        }

        Ok(PerformanceSample {
            id,
            execution_time,
            cpu_usage,
            timestamp,
            group_key,
            query_text: query.to_string(),
        })
    }

    /// Delete all but the `keep` most recent samples, returning how many went
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM query_performance WHERE rowid NOT IN (
                 SELECT rowid FROM query_performance
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT ?
             )",
            params![keep as i64],
        )?;
        Ok(deleted)
    }

    // ============================================
    // QUERIES
    // ============================================

    /// Up to `limit` most recent samples, newest first, optionally for one group
    pub fn recent(&self, group_key: Option<&GroupKey>, limit: usize) -> Result<Vec<PerformanceSample>> {
        let base_query = "SELECT id, execution_time, cpu_usage, timestamp, group_key, query_text
                          FROM query_performance";

        let rows = match group_key {
            Some(group) => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} WHERE group_key = ?1 ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
                    base_query
                ))?;
                let rows = stmt
                    .query_map(params![group.as_str(), limit as i64], map_sample)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "{} ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
                    base_query
                ))?;
                let rows = stmt
                    .query_map(params![limit as i64], map_sample)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(rows)
    }

    /// Samples among the `scan_limit` most recent whose query is at least
    /// `threshold` similar to `reference`, newest first
    ///
    /// Every scanned sample costs one similarity computation, whatever its
    /// group. Stored queries that no longer normalize are skipped.
    pub fn find_similar(
        &self,
        reference: &NormalizedQuery,
        threshold: f64,
        scan_limit: usize,
    ) -> Result<Vec<PerformanceSample>> {
        let candidates = self.recent(None, scan_limit)?;
        let mut similar = Vec::with_capacity(candidates.len());

        for sample in candidates {
            let normalized = match normalize_query(&sample.query_text) {
                Ok(n) => n,
                Err(e) => {
                    warn!(id = %sample.id, error = %e, "skipping unparseable stored query");
                    continue;
                }
            };
            if normalized_similarity(reference, &normalized) >= threshold {
                similar.push(sample);
            }
        }

        Ok(similar)
    }

    pub fn count(&self, group_key: Option<&GroupKey>) -> Result<usize> {
        let count: i64 = match group_key {
            Some(group) => self.conn.query_row(
                "SELECT COUNT(*) FROM query_performance WHERE group_key = ?",
                params![group.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM query_performance", [], |row| row.get(0))?,
        };
        Ok(count as usize)
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_sample(row: &rusqlite::Row) -> rusqlite::Result<PerformanceSample> {
    let raw_ts: String = row.get(3)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw_ts)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let group_key: String = row.get(4)?;

    Ok(PerformanceSample {
        id: row.get(0)?,
        execution_time: row.get(1)?,
        cpu_usage: row.get(2)?,
        timestamp,
        group_key: GroupKey::from(group_key),
        query_text: row.get(5)?,
    })
}
