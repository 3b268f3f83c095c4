use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use metrio_common::error::{MetrioError, Result};
use metrio_common::retry::RetryPolicy;
use metrio_common::types::{Metric, MetricKind, StoreImage};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};

use crate::traits::MetricStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS gauges (
    name TEXT NOT NULL UNIQUE,
    value REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS counters (
    name TEXT NOT NULL UNIQUE,
    value INTEGER NOT NULL
);
";

const UPSERT_GAUGE: &str = "INSERT INTO gauges (name, value) VALUES (?1, ?2)
    ON CONFLICT(name) DO UPDATE SET value = excluded.value";
const UPSERT_COUNTER: &str = "INSERT INTO counters (name, value) VALUES (?1, ?2)
    ON CONFLICT(name) DO UPDATE SET value = excluded.value";

/// Busy- and locked-class failures race with concurrent writers and are
/// worth another attempt; so are constraint violations, which surface when
/// two upserts insert the same name at once. Everything else is fatal.
fn is_transient(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::ConstraintViolation
        ),
        _ => false,
    }
}

/// Relational backend over a single rusqlite connection. Every statement
/// runs under the shared retry policy; the connection mutex makes counter
/// read-add-write atomic with respect to concurrent handlers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    retry: RetryPolicy,
}

impl SqliteStore {
    pub fn open(dsn: &str) -> Result<Self> {
        let conn = Connection::open(dsn)
            .map_err(|err| MetrioError::DatabaseUnavailable(err.to_string()))?;
        conn.busy_timeout(Duration::from_secs(10))
            .map_err(|err| MetrioError::Storage(err.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|err| MetrioError::Storage(format!("schema init: {err}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            retry: RetryPolicy::fixed(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs one database operation under the retry schedule. The whole
    /// closure executes under a single connection guard per attempt.
    async fn with_retry<T>(
        &self,
        what: &str,
        op: impl Fn(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let op = &op;
        self.retry
            .run(what, is_transient, move || async move { op(&self.lock()) })
            .await
            .map_err(|err| MetrioError::Storage(format!("{what}: {err}")))
    }
}

#[async_trait]
impl MetricStore for SqliteStore {
    async fn gauge(&self, name: &str) -> Result<Option<f64>> {
        self.with_retry("select gauge", |conn| {
            conn.query_row(
                "SELECT value FROM gauges WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn gauges(&self) -> Result<HashMap<String, f64>> {
        self.with_retry("select gauges", |conn| {
            let mut stmt = conn.prepare_cached("SELECT name, value FROM gauges")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
    }

    async fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.with_retry("gauge upsert", |conn| {
            conn.execute(UPSERT_GAUGE, params![name, value]).map(|_| ())
        })
        .await
    }

    async fn counter(&self, name: &str) -> Result<Option<i64>> {
        self.with_retry("select counter", |conn| {
            conn.query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn counters(&self) -> Result<HashMap<String, i64>> {
        self.with_retry("select counters", |conn| {
            let mut stmt = conn.prepare_cached("SELECT name, value FROM counters")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
    }

    async fn add_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.with_retry("counter upsert", |conn| {
            let current: Option<i64> = conn
                .query_row(
                    "SELECT value FROM counters WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            conn.execute(UPSERT_COUNTER, params![name, current.unwrap_or(0) + delta])
                .map(|_| ())
        })
        .await
    }

    async fn dump(&self) -> Result<StoreImage> {
        Ok(StoreImage {
            gauges: self.gauges().await?,
            counters: self.counters().await?,
        })
    }

    /// Every entry is validated before the first statement runs. Gauges
    /// then commit together in one transaction; counter accumulation runs
    /// as independent, immediately-committed statements after it, so a
    /// counter failure leaves the gauges and any earlier counters
    /// committed.
    async fn apply_batch(&self, metrics: &[Metric]) -> Result<()> {
        let mut gauges = Vec::new();
        let mut counters = Vec::new();
        for metric in metrics {
            match metric.kind {
                MetricKind::Gauge => {
                    let value = metric.value.ok_or(MetrioError::MissingValue {
                        id: metric.id.clone(),
                        field: "value",
                    })?;
                    gauges.push((metric.id.as_str(), value));
                }
                MetricKind::Counter => {
                    let delta = metric.delta.ok_or(MetrioError::MissingValue {
                        id: metric.id.clone(),
                        field: "delta",
                    })?;
                    counters.push((metric.id.as_str(), delta));
                }
            }
        }

        self.with_retry("batch gauge upsert", |conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(UPSERT_GAUGE)?;
                for (name, value) in &gauges {
                    stmt.execute(params![name, value])?;
                }
            }
            tx.commit()
        })
        .await?;

        for (name, delta) in counters {
            self.add_counter(name, delta).await?;
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        // Rows are committed per statement, there is nothing extra to flush.
        Ok(())
    }

    async fn restore(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.with_retry("ping", |conn| {
            conn.query_row("SELECT 1", [], |_| Ok(())).map(|_| ())
        })
        .await
        .map_err(|err| MetrioError::DatabaseUnavailable(err.to_string()))
    }
}
