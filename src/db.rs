//! Database module for Triage Desk
//!
//! Provides persistence for completed patient records.

mod schema;

pub use schema::*;

use crate::triage::Ward;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Patient not found: {0}")]
    PatientNotFound(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Patient Operations ====================

    /// Insert a completed patient record. Records are write-once.
    pub fn insert_patient(&self, record: &PatientRecord) -> DbResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO patients (id, patient_name, patient_age, patient_query, ward, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.patient_name,
                record.patient_age,
                record.patient_query,
                record.ward.as_str(),
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a patient record by ID
    pub fn get_patient(&self, id: &str) -> DbResult<PatientRecord> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, patient_name, patient_age, patient_query, ward, created_at
             FROM patients WHERE id = ?1",
        )?;

        stmt.query_row(params![id], parse_patient_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => DbError::PatientNotFound(id.to_string()),
                other => DbError::Sqlite(other),
            })
    }

    /// List all patient records, newest first
    pub fn list_patients(&self) -> DbResult<Vec<PatientRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, patient_name, patient_age, patient_query, ward, created_at
             FROM patients
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], parse_patient_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

fn parse_patient_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PatientRecord> {
    let ward: String = row.get(4)?;
    let ward = ward.parse::<Ward>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(PatientRecord {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        patient_age: row.get(2)?,
        patient_query: row.get(3)?,
        ward,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
