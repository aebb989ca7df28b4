//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::dataset::{Dataset, FieldValue, Record};
use crate::state::{FailureKind, HarvestFailure};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Running),
    })
}

fn parse_kind(kind: &str) -> StorageResult<FailureKind> {
    FailureKind::from_db_string(kind).ok_or_else(|| StorageError::Corrupt {
        table: "failures",
        message: format!("unknown failure kind '{}'", kind),
    })
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Text(text) => ToSqlOutput::from(text.as_str()),
            Self::Integer(n) => ToSqlOutput::from(
                i64::try_from(*n)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
            ),
            Self::Decimal(d) => ToSqlOutput::from(*d),
        })
    }
}

impl FromSql for FieldValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Text(_) => Ok(Self::Text(value.as_str()?.to_string())),
            ValueRef::Integer(n) => u64::try_from(n)
                .map(Self::Integer)
                .map_err(|_| FromSqlError::OutOfRange(n)),
            ValueRef::Real(d) => Ok(Self::Decimal(d)),
            ValueRef::Null | ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Results =====

    fn save_dataset(&mut self, run_id: i64, dataset: &Dataset) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO record_fields (run_id, row_index, field, value) VALUES (?1, ?2, ?3, ?4)",
            )?;

            for (row_index, record) in dataset.records().iter().enumerate() {
                for (field, value) in record.iter() {
                    stmt.execute(params![run_id, row_index as i64, field, value])?;
                }
            }
        }
        tx.commit()?;

        tracing::debug!("Stored {} records for run {}", dataset.len(), run_id);
        Ok(dataset.len())
    }

    fn load_dataset(&self, run_id: i64) -> StorageResult<Dataset> {
        let mut stmt = self.conn.prepare(
            "SELECT row_index, field, value FROM record_fields
             WHERE run_id = ?1 ORDER BY row_index, field",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<FieldValue>>(2)?,
            ))
        })?;

        let mut dataset = Dataset::new();
        let mut current: Option<(i64, Record)> = None;

        for row in rows {
            let (row_index, field, value) = row?;

            match current.as_mut() {
                Some((index, record)) if *index == row_index => record.set(&field, value),
                _ => {
                    if let Some((_, record)) = current.take() {
                        dataset.push(record);
                    }
                    let mut record = Record::new();
                    record.set(&field, value);
                    current = Some((row_index, record));
                }
            }
        }

        if let Some((_, record)) = current {
            dataset.push(record);
        }

        Ok(dataset)
    }

    fn save_failures(&mut self, run_id: i64, failures: &[HarvestFailure]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO failures (run_id, url, kind, reason) VALUES (?1, ?2, ?3, ?4)",
            )?;

            for failure in failures {
                stmt.execute(params![
                    run_id,
                    failure.url,
                    failure.kind.to_db_string(),
                    failure.reason
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_failures(&self, run_id: i64) -> StorageResult<Vec<HarvestFailure>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, kind, reason FROM failures WHERE run_id = ?1 ORDER BY url, kind, id",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut failures = Vec::new();
        for row in rows {
            let (url, kind, reason) = row?;
            failures.push(HarvestFailure::new(url, parse_kind(&kind)?, reason));
        }

        Ok(failures)
    }

    // ===== Statistics =====

    fn count_records(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT row_index) FROM record_fields WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_failures_by_kind(&self, run_id: i64) -> StorageResult<BTreeMap<FailureKind, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM failures WHERE run_id = ?1 GROUP BY kind")?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = BTreeMap::new();
        for row in rows {
            let (kind, count) = row?;
            counts.insert(parse_kind(&kind)?, count as u64);
        }

        Ok(counts)
    }

    fn field_coverage(&self, run_id: i64) -> StorageResult<BTreeMap<String, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT field, COUNT(*) FROM record_fields
             WHERE run_id = ?1 AND value IS NOT NULL
             GROUP BY field",
        )?;

        let coverage = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(coverage)
    }
}
