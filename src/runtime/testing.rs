//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::PatientRecord;
use crate::webhook::{NotifyError, NotifyOutcome};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// In-Memory Patient Store
// ============================================================================

/// Patient store backed by a vector
#[allow(dead_code)]
pub struct InMemoryPatientStore {
    records: Mutex<Vec<PatientRecord>>,
    inserted: Notify,
}

#[allow(dead_code)]
impl InMemoryPatientStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            inserted: Notify::new(),
        }
    }

    pub fn records(&self) -> Vec<PatientRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Wait until at least `count` records exist
    pub async fn wait_for_records(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.inserted.notified();
            if self.records.lock().unwrap().len() >= count {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.records.lock().unwrap().len() >= count;
            }
        }
    }
}

impl Default for InMemoryPatientStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientStore for InMemoryPatientStore {
    async fn insert_patient(&self, record: &PatientRecord) -> Result<(), String> {
        {
            let mut records = self.records.lock().unwrap();
            if records.iter().any(|r| r.id == record.id) {
                return Err(format!("Duplicate patient id {}", record.id));
            }
            records.push(record.clone());
        }
        self.inserted.notify_waiters();
        Ok(())
    }

    async fn get_patient(&self, id: &str) -> Result<PatientRecord, String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| format!("Patient not found: {id}"))
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>, String> {
        let mut records = self.records();
        records.reverse();
        Ok(records)
    }
}

// ============================================================================
// Failing / Slow Patient Stores
// ============================================================================

/// Store whose every write fails
pub struct FailingPatientStore;

#[async_trait]
impl PatientStore for FailingPatientStore {
    async fn insert_patient(&self, _record: &PatientRecord) -> Result<(), String> {
        Err("disk I/O error".to_string())
    }

    async fn get_patient(&self, id: &str) -> Result<PatientRecord, String> {
        Err(format!("Patient not found: {id}"))
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>, String> {
        Ok(Vec::new())
    }
}

/// Store that takes `delay` before each write
#[allow(dead_code)]
pub struct SlowPatientStore {
    delay: Duration,
    inner: InMemoryPatientStore,
}

impl SlowPatientStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: InMemoryPatientStore::new(),
        }
    }
}

#[async_trait]
impl PatientStore for SlowPatientStore {
    async fn insert_patient(&self, record: &PatientRecord) -> Result<(), String> {
        tokio::time::sleep(self.delay).await;
        self.inner.insert_patient(record).await
    }

    async fn get_patient(&self, id: &str) -> Result<PatientRecord, String> {
        self.inner.get_patient(id).await
    }

    async fn list_patients(&self) -> Result<Vec<PatientRecord>, String> {
        self.inner.list_patients().await
    }
}

// ============================================================================
// Recording Notifier
// ============================================================================

/// Notifier that records what it was asked to send
pub struct RecordingNotifier {
    fail: bool,
    /// Record of all notified records
    pub notified: Mutex<Vec<PatientRecord>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            fail: false,
            notified: Mutex::new(Vec::new()),
        }
    }

    /// A notifier whose target always answers 502
    pub fn failing() -> Self {
        Self {
            fail: true,
            notified: Mutex::new(Vec::new()),
        }
    }

    pub fn notified_ids(&self) -> Vec<String> {
        self.notified
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, record: &PatientRecord) -> Result<NotifyOutcome, NotifyError> {
        self.notified.lock().unwrap().push(record.clone());
        if self.fail {
            Err(NotifyError::status(502, "bad gateway"))
        } else {
            Ok(NotifyOutcome::Delivered { status: 200 })
        }
    }
}

// ============================================================================
// Session Runtime Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionHandler, Delivery};
    use crate::runtime::{SessionLimits, SessionManager};
    use crate::triage::Ward;
    use std::sync::Arc;

    type TestManager = SessionManager<Arc<InMemoryPatientStore>, Arc<RecordingNotifier>>;

    fn manager_with(limits: SessionLimits) -> (Arc<TestManager>, Arc<InMemoryPatientStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(InMemoryPatientStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let completion = CompletionHandler::new(store.clone(), notifier.clone());
        (
            Arc::new(SessionManager::new(completion, limits)),
            store,
            notifier,
        )
    }

    fn manager() -> (Arc<TestManager>, Arc<InMemoryPatientStore>, Arc<RecordingNotifier>) {
        manager_with(SessionLimits::default())
    }

    async fn send_all<S, N>(
        manager: &SessionManager<S, N>,
        key: &str,
        messages: &[&str],
    ) -> Vec<String>
    where
        S: PatientStore + 'static,
        N: Notifier + 'static,
    {
        let mut replies = Vec::new();
        for message in messages {
            replies.push(manager.send_message(key, message).await.unwrap());
        }
        replies
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemoryPatientStore::new();
        let record = PatientRecord::from_intake(crate::state_machine::CompletedIntake {
            ward: Ward::GeneralWard,
            name: "Ann".to_string(),
            age: 30,
            query: "cough".to_string(),
        });

        store.insert_patient(&record).await.unwrap();
        assert!(store.insert_patient(&record).await.is_err());
        assert_eq!(store.get_patient(&record.id).await.unwrap(), record);
        assert!(store.wait_for_records(1, Duration::from_millis(10)).await);
        assert!(!store.wait_for_records(2, Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_emergency_intake_end_to_end() {
        let (manager, store, notifier) = manager();

        let replies = send_all(
            &manager,
            "abc",
            &["I have chest pain", "John Doe", "45", "sharp pain since morning"],
        )
        .await;
        assert!(replies[3].contains("Emergency information recorded for John Doe"));

        let session = manager.snapshot("abc").await.unwrap();
        assert!(session.is_completed());
        assert_eq!(session.ward(), Some(Ward::EmergencyWard));
        assert_eq!(session.name(), Some("John Doe"));
        assert_eq!(session.age(), Some(45));
        assert_eq!(session.query(), Some("sharp pain since morning"));

        let dispatch = manager.take_dispatch("abc").await.unwrap();
        let report = dispatch.task.await.unwrap();
        assert_eq!(report.persisted, Delivery::Ok(()));

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].patient_name, "John Doe");
        assert_eq!(records[0].patient_age, 45);
        assert_eq!(records[0].ward, Ward::EmergencyWard);
        assert_eq!(notifier.notified_ids(), vec![records[0].id.clone()]);
    }

    #[tokio::test]
    async fn test_age_reprompts_keep_session_in_place() {
        let (manager, store, _) = manager();

        send_all(&manager, "s", &["I have anxiety", "Priya"]).await;
        let first = manager.send_message("s", "abc").await.unwrap();
        let second = manager.send_message("s", "thirty").await.unwrap();
        assert_ne!(first, second);

        let session = manager.snapshot("s").await.unwrap();
        assert_eq!(session.age(), None);
        assert_eq!(session.ward(), Some(Ward::MentalHealthWard));

        send_all(&manager, "s", &["30", "trouble sleeping"]).await;
        assert!(store.wait_for_records(1, Duration::from_secs(1)).await);
        assert_eq!(store.records()[0].patient_age, 30);
    }

    #[tokio::test]
    async fn test_completed_session_never_completes_again() {
        let (manager, store, notifier) = manager();

        send_all(&manager, "s", &["hello", "Ann", "30", "persistent cough"]).await;
        assert!(store.wait_for_records(1, Duration::from_secs(1)).await);

        let reply = manager.send_message("s", "one more thing").await.unwrap();
        assert!(reply.contains("already been recorded"));
        assert!(manager.take_dispatch("s").await.is_some());
        manager.send_message("s", "hello?").await.unwrap();
        assert!(manager.take_dispatch("s").await.is_none());

        assert_eq!(store.records().len(), 1);
        assert_eq!(notifier.notified_ids().len(), 1);
        assert_eq!(manager.snapshot("s").await.unwrap().query(), Some("persistent cough"));
    }

    #[tokio::test]
    async fn test_interleaved_sessions_are_independent() {
        let (manager, store, _) = manager();

        let a = manager.clone();
        let b = manager.clone();
        let (ra, rb) = tokio::join!(
            async move { send_all(&a, "a", &["chest pain", "Alice", "50", "pressure in chest"]).await },
            async move { send_all(&b, "b", &["struggling with depression", "Bob", "22", "low mood for weeks"]).await },
        );
        assert!(ra[3].contains("Alice"));
        assert!(rb[3].contains("Bob"));

        assert!(store.wait_for_records(2, Duration::from_secs(1)).await);
        let session_a = manager.snapshot("a").await.unwrap();
        let session_b = manager.snapshot("b").await.unwrap();
        assert_eq!(session_a.ward(), Some(Ward::EmergencyWard));
        assert_eq!(session_b.ward(), Some(Ward::MentalHealthWard));
        assert_eq!(session_b.name(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_messages_within_a_session_apply_in_order() {
        let (manager, _, _) = manager();

        // Concurrent callers on one key still advance one stage per message
        let mut tasks = Vec::new();
        for _ in 0..4 {
            let m = manager.clone();
            tasks.push(tokio::spawn(async move { m.send_message("shared", "42").await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let session = manager.snapshot("shared").await.unwrap();
        assert!(session.is_completed());
        assert_eq!(session.name(), Some("42"));
        assert_eq!(session.age(), Some(42));
        assert_eq!(session.query(), Some("42"));
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_reply() {
        let completion = CompletionHandler::new(FailingPatientStore, RecordingNotifier::new());
        let manager = SessionManager::new(completion, SessionLimits::default());

        let replies = send_all(&manager, "s", &["hi", "Ann", "30", "cough"]).await;
        assert!(replies[3].contains("Ann"));
        assert!(manager.snapshot("s").await.unwrap().is_completed());

        let report = manager.take_dispatch("s").await.unwrap().task.await.unwrap();
        assert!(matches!(report.persisted, Delivery::Failed(_)));
    }

    #[tokio::test]
    async fn test_slow_store_does_not_delay_reply() {
        let completion = CompletionHandler::new(
            SlowPatientStore::new(Duration::from_secs(30)),
            RecordingNotifier::new(),
        );
        let manager = SessionManager::new(completion, SessionLimits::default());

        send_all(&manager, "s", &["hi", "Ann", "30"]).await;
        let reply = tokio::time::timeout(
            Duration::from_secs(2),
            manager.send_message("s", "cough"),
        )
        .await
        .expect("reply should not wait on persistence")
        .unwrap();
        assert!(reply.contains("Ann"));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent_session() {
        let (manager, _, _) = manager_with(SessionLimits {
            max_sessions: 2,
            ..SessionLimits::default()
        });

        manager.send_message("first", "hi").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.send_message("second", "hi").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.send_message("first", "Ann").await.unwrap();
        manager.send_message("third", "hi").await.unwrap();

        assert_eq!(manager.count().await, 2);
        assert!(manager.snapshot("second").await.is_none());
        assert_eq!(manager.snapshot("first").await.unwrap().name(), Some("Ann"));

        // An evicted key starts over
        manager.send_message("second", "chest pain").await.unwrap();
        let restarted = manager.snapshot("second").await.unwrap();
        assert_eq!(restarted.ward(), Some(Ward::EmergencyWard));
        assert_eq!(restarted.name(), None);
    }

    #[tokio::test]
    async fn test_capacity_eviction_skips_busy_session() {
        let (manager, _, _) = manager_with(SessionLimits {
            max_sessions: 2,
            ..SessionLimits::default()
        });

        // Holding the handle stands in for a message still being processed
        let in_flight = manager.get_or_create("busy").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.send_message("idle", "hi").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        manager.send_message("third", "hi").await.unwrap();

        assert_eq!(manager.count().await, 2);
        assert!(manager.snapshot("idle").await.is_none());
        assert!(manager.snapshot("third").await.is_some());

        // The held handle still reaches the one live runtime for its key
        let (respond_to, reply) = tokio::sync::oneshot::channel();
        in_flight
            .command_tx
            .send(crate::runtime::SessionCommand::Message {
                text: "chest pain".to_string(),
                respond_to,
            })
            .await
            .unwrap();
        reply.await.unwrap();
        drop(in_flight);
        assert_eq!(
            manager.snapshot("busy").await.unwrap().ward(),
            Some(Ward::EmergencyWard)
        );
    }

    #[tokio::test]
    async fn test_busy_session_survives_idle_sweep() {
        let (manager, _, _) = manager_with(SessionLimits {
            idle_ttl: Duration::from_millis(10),
            ..SessionLimits::default()
        });

        let in_flight = manager.get_or_create("busy").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(manager.cleanup_expired().await, 0);
        assert_eq!(manager.count().await, 1);

        drop(in_flight);
        assert_eq!(manager.cleanup_expired().await, 1);
        assert_eq!(manager.count().await, 0);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let (manager, _, _) = manager_with(SessionLimits {
            idle_ttl: Duration::from_millis(20),
            ..SessionLimits::default()
        });

        manager.send_message("old", "hi").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        manager.send_message("fresh", "hi").await.unwrap();

        assert_eq!(manager.cleanup_expired().await, 1);
        assert_eq!(manager.count().await, 1);
        assert!(manager.snapshot("old").await.is_none());
        assert!(manager.snapshot("fresh").await.is_some());
    }

    #[tokio::test]
    async fn test_cleanup_task_stops_on_cancel() {
        let (manager, _, _) = manager_with(SessionLimits {
            idle_ttl: Duration::from_millis(10),
            cleanup_interval: Duration::from_millis(10),
            ..SessionLimits::default()
        });

        let token = manager.start_cleanup_task();
        manager.send_message("s", "hi").await.unwrap();

        let mut evicted = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if manager.count().await == 0 {
                evicted = true;
                break;
            }
        }
        assert!(evicted);
        token.cancel();
    }
}
