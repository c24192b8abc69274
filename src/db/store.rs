//! SQLite database store implementation.
//!
//! History is append-only: the store exposes inserts and newest-first reads,
//! nothing that updates or removes a row.

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::path::Path;
use thiserror::Error;

use super::models::*;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Single-writer store backed by one SQLite file.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        self.conn
            .execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    // --- Simple-status records ---

    /// Append one simple-status probe result.
    pub fn insert_status_record(&self, record: &StatusRecord) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO up_time (date_and_time, log_who_short_name, http_code, responds_time, responds_size, log_who)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.time.format(DB_TIME_FORMAT).to_string(),
                record.job_name,
                record.http_status,
                record.latency_seconds,
                record.payload_size_bytes,
                record.target,
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` records for a job, newest first.
    pub fn recent_status_records(
        &self,
        job_name: &str,
        limit: usize,
    ) -> Result<Vec<StatusRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT date_and_time, log_who_short_name, http_code, responds_time, responds_size, log_who
             FROM up_time
             WHERE log_who_short_name = ?1
             ORDER BY date_and_time DESC, id DESC LIMIT ?2",
        )?;

        let records = stmt
            .query_map(params![job_name, limit as i64], |row| {
                Ok(StatusRecord {
                    time: time_column(row, 0)?,
                    job_name: row.get(1)?,
                    http_status: row.get(2)?,
                    latency_seconds: row.get(3)?,
                    payload_size_bytes: row.get(4)?,
                    target: row.get(5)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }

    // --- Time-series records ---

    /// Append one time-series probe result to the source's table.
    pub fn insert_series_record(
        &self,
        source: SeriesSource,
        record: &SeriesRecord,
    ) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} (date_and_time, parameter, http_code, responds_time, days_requested, days_received, url, responds_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            source.table()
        );
        self.conn.execute(
            &sql,
            params![
                record.time.format(DB_TIME_FORMAT).to_string(),
                record.parameter,
                record.http_status,
                record.latency_seconds,
                record.days_requested,
                record.days_received,
                record.url,
                record.body,
            ],
        )?;
        Ok(())
    }

    /// The most recent `limit` records of a source across all parameters, newest first.
    pub fn recent_series_records(
        &self,
        source: SeriesSource,
        limit: usize,
    ) -> Result<Vec<SeriesRecord>, DbError> {
        let sql = format!(
            "SELECT date_and_time, parameter, http_code, responds_time, days_requested, days_received, url, responds_text
             FROM {}
             ORDER BY date_and_time DESC, id DESC LIMIT ?1",
            source.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(SeriesRecord {
                    time: time_column(row, 0)?,
                    parameter: row.get(1)?,
                    http_status: row.get(2)?,
                    latency_seconds: row.get(3)?,
                    days_requested: row.get(4)?,
                    days_received: row.get(5)?,
                    url: row.get(6)?,
                    body: row.get(7)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }
}

fn time_column(row: &Row<'_>, idx: usize) -> SqlResult<NaiveDateTime> {
    let time_str: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&time_str, DB_TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
