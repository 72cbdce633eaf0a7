//! SQLite execution and plan collaborator
//!
//! Opens a fresh connection per call, like a pooled engine would hand out.
//! CPU usage is the process CPU time spent during execution as a percent
//! of one core, read from /proc/self/stat on Linux and 0.0 elsewhere.

use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

use super::{ExecutionMetrics, PlanInspector, PlanRow, QueryExecutor};
use crate::error::{Result, ScoreError};
use crate::query::parse;

pub struct SqliteEngine {
    path: PathBuf,
}

impl SqliteEngine {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.path)
    }
}

impl QueryExecutor for SqliteEngine {
    fn execute(&self, sql: &str) -> Result<ExecutionMetrics> {
        if sql.trim().is_empty() {
            return Err(ScoreError::Execution("empty query".to_string()));
        }
        if let Ok(statements) = parse(sql) {
            if statements.len() > 1 {
                return Err(ScoreError::Execution(format!(
                    "expected a single statement, found {}",
                    statements.len()
                )));
            }
        }

        let conn = self
            .connect()
            .map_err(|e| ScoreError::Execution(e.to_string()))?;

        let cpu_before = process_cpu_seconds();
        let start = Instant::now();

        let rows_affected = run_statement(&conn, sql).map_err(|e| {
            warn!(error = %e, "query execution failed");
            ScoreError::Execution(e.to_string())
        })?;

        let execution_time = start.elapsed().as_secs_f64();
        let cpu_usage = match (cpu_before, process_cpu_seconds()) {
            (Some(before), Some(after)) => cpu_percent(after - before, execution_time),
            _ => 0.0,
        };

        debug!(execution_time, cpu_usage, rows_affected, "query executed");
        Ok(ExecutionMetrics {
            execution_time,
            cpu_usage,
            rows_affected,
        })
    }
}

impl PlanInspector for SqliteEngine {
    fn explain(&self, sql: &str) -> Vec<PlanRow> {
        match self.query_plan(sql) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to run EXPLAIN QUERY PLAN");
                vec![]
            }
        }
    }
}

impl SqliteEngine {
    fn query_plan(&self, sql: &str) -> rusqlite::Result<Vec<PlanRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {}", sql))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(3))?
            .map(|detail| detail.map(PlanRow::new))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Run one statement; row-producing statements report rows returned
fn run_statement(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    let mut stmt = conn.prepare(sql)?;
    if stmt.column_count() > 0 {
        let mut rows = stmt.query([])?;
        let mut count = 0;
        while rows.next()?.is_some() {
            count += 1;
        }
        Ok(count)
    } else {
        Ok(stmt.execute([])? as u64)
    }
}

/// Statements run on one thread, so one full core is the ceiling
const MAX_CPU_PERCENT: f64 = 100.0;

/// CPU seconds over wall seconds as a percent of one core
///
/// Process CPU time advances in clock ticks (usually 10 ms), so a query
/// much shorter than a tick reads either 0 or one whole tick. The ratio is
/// capped at one core to keep that noise bounded.
fn cpu_percent(cpu_seconds: f64, wall_seconds: f64) -> f64 {
    if wall_seconds <= 0.0 || !cpu_seconds.is_finite() {
        return 0.0;
    }
    (cpu_seconds / wall_seconds * 100.0).clamp(0.0, MAX_CPU_PERCENT)
}

#[cfg(target_os = "linux")]
fn process_cpu_seconds() -> Option<f64> {
    let stat = std::fs::read_to_string("/proc/self/stat").ok()?;
    // comm may contain spaces, so index from the closing paren
    let after_comm = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;

    let ticks_per_sec = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks_per_sec <= 0 {
        return None;
    }
    Some((utime + stime) as f64 / ticks_per_sec as f64)
}

#[cfg(not(target_os = "linux"))]
fn process_cpu_seconds() -> Option<f64> {
    None
}

/// Create the demo schema and reset its sample rows
pub fn seed_demo_database(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(DEMO_SCHEMA)?;
    Ok(())
}

const DEMO_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    order_date TEXT NOT NULL,
    total_price REAL NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS order_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL,
    product_id INTEGER NOT NULL,
    quantity INTEGER NOT NULL,
    FOREIGN KEY (order_id) REFERENCES orders(id),
    FOREIGN KEY (product_id) REFERENCES products(id)
);

CREATE TABLE IF NOT EXISTS reviews (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    comment TEXT,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

BEGIN;
DELETE FROM users;
INSERT INTO users (name, age) VALUES ('Alice', 30), ('Bob', 22), ('Charlie', 28);
DELETE FROM orders;
INSERT INTO orders (user_id, order_date, total_price) VALUES (1, '2024-03-20', 60.5);
DELETE FROM products;
INSERT INTO products (name, price) VALUES ('Widget', 25.0), ('Gadget', 15.5);
DELETE FROM order_items;
INSERT INTO order_items (order_id, product_id, quantity) VALUES (1, 1, 2);
DELETE FROM reviews;
INSERT INTO reviews (user_id, comment) VALUES (1, 'Great product!');
COMMIT;
"#;
