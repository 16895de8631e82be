//! Completion handler
//!
//! Turns a completed intake into a `PatientRecord` and dispatches persistence
//! and notification in a detached task. The chat reply never waits on either.

use crate::db::PatientRecord;
use crate::runtime::{Notifier, PatientStore};
use crate::state_machine::CompletedIntake;
use crate::webhook::NotifyOutcome;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Result of one side effect in a dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery<T> {
    Ok(T),
    Failed(String),
    TimedOut,
}

impl<T> Delivery<T> {
    #[allow(dead_code)] // Used in tests
    pub fn is_ok(&self) -> bool {
        matches!(self, Delivery::Ok(_))
    }
}

/// What happened to persistence and notification for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub record_id: String,
    pub persisted: Delivery<()>,
    pub notified: Delivery<NotifyOutcome>,
}

/// A dispatched record plus the background task working on it
#[derive(Debug)]
pub struct Dispatch {
    pub record: PatientRecord,
    pub task: JoinHandle<DispatchReport>,
}

/// Runs the side effects of a completed intake
pub struct CompletionHandler<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    store: Arc<S>,
    notifier: Arc<N>,
    persist_timeout: Duration,
    notify_timeout: Duration,
}

impl<S, N> Clone for CompletionHandler<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
            persist_timeout: self.persist_timeout,
            notify_timeout: self.notify_timeout,
        }
    }
}

impl<S, N> CompletionHandler<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store: Arc::new(store),
            notifier: Arc::new(notifier),
            persist_timeout: Duration::from_secs(10),
            notify_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeouts(mut self, persist: Duration, notify: Duration) -> Self {
        self.persist_timeout = persist;
        self.notify_timeout = notify;
        self
    }

    #[allow(dead_code)] // Used in tests
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Build the record and spawn its dispatch. Returns immediately.
    pub fn complete(&self, session_key: &str, intake: CompletedIntake) -> Dispatch {
        let record = PatientRecord::from_intake(intake);

        tracing::info!(
            session = %session_key,
            record_id = %record.id,
            ward = %record.ward,
            "Intake complete, dispatching record"
        );

        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let persist_timeout = self.persist_timeout;
        let notify_timeout = self.notify_timeout;
        let session = session_key.to_string();
        let task_record = record.clone();

        let task = tokio::spawn(async move {
            let (persisted, notified) = tokio::join!(
                persist(store.as_ref(), &task_record, persist_timeout),
                notify(notifier.as_ref(), &task_record, notify_timeout),
            );

            let report = DispatchReport {
                record_id: task_record.id,
                persisted,
                notified,
            };
            tracing::debug!(session = %session, report = ?report, "Dispatch finished");
            report
        });

        Dispatch { record, task }
    }
}

async fn persist<S: PatientStore>(
    store: &S,
    record: &PatientRecord,
    limit: Duration,
) -> Delivery<()> {
    match tokio::time::timeout(limit, store.insert_patient(record)).await {
        Ok(Ok(())) => {
            tracing::info!(record_id = %record.id, "Patient record saved");
            Delivery::Ok(())
        }
        Ok(Err(e)) => {
            tracing::error!(record_id = %record.id, error = %e, "Failed to save patient record");
            Delivery::Failed(e)
        }
        Err(_) => {
            tracing::error!(record_id = %record.id, timeout = ?limit, "Saving patient record timed out");
            Delivery::TimedOut
        }
    }
}

async fn notify<N: Notifier>(
    notifier: &N,
    record: &PatientRecord,
    limit: Duration,
) -> Delivery<NotifyOutcome> {
    match tokio::time::timeout(limit, notifier.notify(record)).await {
        Ok(Ok(outcome)) => {
            if let NotifyOutcome::Delivered { status } = outcome {
                tracing::info!(record_id = %record.id, status, "Webhook delivered");
            }
            Delivery::Ok(outcome)
        }
        Ok(Err(e)) => {
            tracing::warn!(
                record_id = %record.id,
                kind = ?e.kind,
                error = %e,
                "Webhook notification failed"
            );
            Delivery::Failed(e.to_string())
        }
        Err(_) => {
            tracing::warn!(record_id = %record.id, timeout = ?limit, "Webhook notification timed out");
            Delivery::TimedOut
        }
    }
}
