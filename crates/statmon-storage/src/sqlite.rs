use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use statmon_common::types::{Metric, MetricKey, MetricKind};

use crate::{MetricStore, Result, StorageError};

/// SQLite backend. Conflicting updates to one `(id, kind)` row are
/// serialized by a single atomic upsert; counters accumulate with
/// `delta = delta + excluded.delta` rather than a read-then-write pair, so
/// interleaved writers cannot lose increments. The accumulation is clamped
/// to the `i64` range inside the upsert: SQLite widens an overflowing
/// integer `+` to REAL instead of raising, which would leave a REAL in the
/// `delta` column and break every later read of the row.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS metrics (
                id    TEXT NOT NULL,
                kind  TEXT NOT NULL,
                value REAL,
                delta INTEGER,
                PRIMARY KEY (id, kind)
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn upsert(conn: &Connection, metric: &Metric) -> Result<()> {
        match metric.kind {
            MetricKind::Gauge => {
                let mut stmt = conn.prepare_cached(
                    "INSERT INTO metrics (id, kind, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id, kind) DO UPDATE SET value = excluded.value",
                )?;
                stmt.execute(rusqlite::params![
                    &metric.id,
                    metric.kind.to_string(),
                    metric.value,
                ])?;
            }
            MetricKind::Counter => {
                let mut stmt = conn.prepare_cached(
                    "INSERT INTO metrics (id, kind, delta) VALUES (?1, ?2, ?3)
                     ON CONFLICT(id, kind) DO UPDATE SET delta = CAST(
                         MAX(MIN(metrics.delta + excluded.delta, 9223372036854775807),
                             -9223372036854775808) AS INTEGER)",
                )?;
                stmt.execute(rusqlite::params![
                    &metric.id,
                    metric.kind.to_string(),
                    metric.delta,
                ])?;
            }
        }
        Ok(())
    }

    fn fetch(conn: &Connection, kind: MetricKind, id: &str) -> Result<Metric> {
        let mut stmt = conn.prepare_cached(
            "SELECT value, delta FROM metrics WHERE id = ?1 AND kind = ?2",
        )?;
        let row = stmt
            .query_row(rusqlite::params![id, kind.to_string()], |row| {
                let value: Option<f64> = row.get(0)?;
                let delta: Option<i64> = row.get(1)?;
                Ok((value, delta))
            })
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StorageError::NotFound {
                    kind,
                    id: id.to_string(),
                },
                other => StorageError::Sqlite(other),
            })?;
        Ok(Metric {
            id: id.to_string(),
            kind,
            value: row.0,
            delta: row.1,
        })
    }
}

impl MetricStore for SqliteStore {
    fn update(&self, metric: &Metric) -> Result<Metric> {
        metric.validate()?;
        let conn = self.conn.lock().unwrap();
        Self::upsert(&conn, metric)?;
        Self::fetch(&conn, metric.kind, &metric.id)
    }

    fn update_batch(&self, metrics: &[Metric]) -> Result<()> {
        for metric in metrics {
            metric.validate()?;
        }
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        for metric in metrics {
            Self::upsert(&tx, metric)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get(&self, kind: MetricKind, id: &str) -> Result<Metric> {
        let conn = self.conn.lock().unwrap();
        Self::fetch(&conn, kind, id)
    }

    fn get_all(&self) -> Result<HashMap<MetricKey, Metric>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id, kind, value, delta FROM metrics")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let kind: String = row.get(1)?;
            let value: Option<f64> = row.get(2)?;
            let delta: Option<i64> = row.get(3)?;
            Ok((id, kind, value, delta))
        })?;

        let mut out = HashMap::new();
        for row in rows {
            let (id, kind, value, delta) = row?;
            let kind: MetricKind = kind.parse().map_err(StorageError::Invalid)?;
            let metric = Metric {
                id,
                kind,
                value,
                delta,
            };
            out.insert(metric.key(), metric);
        }
        Ok(out)
    }

    fn ping(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT 1")?;
        stmt.query_row([], |_| Ok(()))?;
        Ok(())
    }
}
