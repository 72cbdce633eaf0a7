//! SQLite schema for the metrics store
//!
//! Samples are append-only. Timestamps are fixed-width RFC 3339 UTC text, so
//! lexical order is chronological order.

pub const SCHEMA: &str = r#"
-- ============================================
-- PERFORMANCE SAMPLES
-- ============================================

-- One row per scored query execution
CREATE TABLE IF NOT EXISTS query_performance (
    id TEXT PRIMARY KEY,                   -- '<group digest>_<micros>_<uuid>'
    execution_time REAL NOT NULL,          -- seconds
    cpu_usage REAL NOT NULL,               -- percent, may be negative
    timestamp TEXT NOT NULL,               -- 'YYYY-MM-DDTHH:MM:SS.ffffffZ'
    group_key TEXT NOT NULL,               -- canonical text + structure tags
    query_text TEXT NOT NULL               -- original query text
);

CREATE INDEX IF NOT EXISTS idx_query_performance_timestamp
    ON query_performance(timestamp);
CREATE INDEX IF NOT EXISTS idx_query_performance_group
    ON query_performance(group_key, timestamp);
"#;
