//! Trait abstractions for completion I/O
//!
//! These traits let the session runtime run against mock stores and
//! notifiers in tests.

use crate::db::{Database, PatientRecord};
use crate::webhook::{NotifyError, NotifyOutcome, WebhookNotifier, WebhookPayload};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable storage for completed patient records
#[async_trait]
pub trait PatientStore: Send + Sync {
    /// Persist a completed record. Records are write-once.
    async fn insert_patient(&self, record: &PatientRecord) -> Result<(), String>;

    /// Fetch a record by id
    #[allow(dead_code)] // API completeness
    async fn get_patient(&self, id: &str) -> Result<PatientRecord, String>;

    /// All records, newest first
    #[allow(dead_code)] // API completeness
    async fn list_patients(&self) -> Result<Vec<PatientRecord>, String>;
}

/// Outbound notification for completed records
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, record: &PatientRecord) -> Result<NotifyOutcome, NotifyError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: PatientStore + ?Sized> PatientStore for Arc<T> {
    async fn insert_patient(&self, record: &PatientRecord) -> Result<(), String> {
        (**self).insert_patient(record).await
    }

    async fn get_patient(&self, id: &str) -> Result<PatientRecord, String> {
        (**self).get_patient(id).await
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>, String> {
        (**self).list_patients().await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn notify(&self, record: &PatientRecord) -> Result<NotifyOutcome, NotifyError> {
        (**self).notify(record).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `PatientStore`
///
/// SQLite calls run on the blocking pool so a slow disk never stalls the
/// async workers that serve chat replies.
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> crate::db::DbResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| format!("Database task failed: {e}"))?
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl PatientStore for DatabaseStore {
    async fn insert_patient(&self, record: &PatientRecord) -> Result<(), String> {
        let record = record.clone();
        self.blocking(move |db| db.insert_patient(&record)).await
    }

    async fn get_patient(&self, id: &str) -> Result<PatientRecord, String> {
        let id = id.to_string();
        self.blocking(move |db| db.get_patient(&id)).await
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>, String> {
        self.blocking(Database::list_patients).await
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, record: &PatientRecord) -> Result<NotifyOutcome, NotifyError> {
        self.send(&WebhookPayload::from(record)).await
    }
}
