//! Runtime for executing intake sessions
//!
//! Every session key gets its own task and command queue, so messages for
//! one key are applied strictly in arrival order while different keys run
//! concurrently. The manager bounds how many sessions it keeps alive.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::completion::{CompletionHandler, Dispatch};
use crate::state_machine::Session;
use crate::webhook::WebhookNotifier;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_util::sync::CancellationToken;

/// Type alias for the production manager with concrete implementations
pub type ProductionManager = SessionManager<DatabaseStore, WebhookNotifier>;

const COMMAND_QUEUE_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session {0} is no longer running")]
    SessionGone(String),
}

/// Commands accepted by a session task
#[derive(Debug)]
pub enum SessionCommand {
    Message {
        text: String,
        respond_to: oneshot::Sender<String>,
    },
    Snapshot {
        respond_to: oneshot::Sender<Session>,
    },
    /// Hand over the dispatch of the last completion (tests await it)
    TakeDispatch {
        respond_to: oneshot::Sender<Option<Dispatch>>,
    },
}

/// Handle to interact with a running session
pub struct SessionHandle {
    pub command_tx: mpsc::Sender<SessionCommand>,
}

struct SessionEntry {
    /// Callers hold a clone until their reply arrives
    handle: Arc<SessionHandle>,
    last_active: Instant,
}

impl SessionEntry {
    /// A message for this session is queued or being processed
    fn is_busy(&self) -> bool {
        Arc::strong_count(&self.handle) > 1
    }
}

/// Session lifecycle limits
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// Manager for all session runtimes
pub struct SessionManager<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    completion: CompletionHandler<S, N>,
    limits: SessionLimits,
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl<S, N> SessionManager<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(completion: CompletionHandler<S, N>, limits: SessionLimits) -> Self {
        Self {
            completion,
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get the handle for a key, starting a fresh session if needed
    async fn get_or_create(&self, key: &str) -> Arc<SessionHandle> {
        // Fast path
        {
            let sessions = self.sessions.read().await;
            if let Some(entry) = sessions.get(key) {
                if !entry.handle.command_tx.is_closed() {
                    return Arc::clone(&entry.handle);
                }
            }
        }

        let mut sessions = self.sessions.write().await;

        // Another caller may have created it while we waited for the lock
        if let Some(entry) = sessions.get_mut(key) {
            if !entry.handle.command_tx.is_closed() {
                entry.last_active = Instant::now();
                return Arc::clone(&entry.handle);
            }
        }

        if !sessions.contains_key(key) && sessions.len() >= self.limits.max_sessions {
            evict_least_recent(&mut sessions);
        }

        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let runtime = SessionRuntime::new(key, self.completion.clone(), command_rx);
        tokio::spawn(runtime.run());

        tracing::info!(session = %key, active = sessions.len() + 1, "Session started");

        let handle = Arc::new(SessionHandle { command_tx });
        sessions.insert(
            key.to_string(),
            SessionEntry {
                handle: Arc::clone(&handle),
                last_active: Instant::now(),
            },
        );
        handle
    }

    async fn touch(&self, key: &str) {
        if let Some(entry) = self.sessions.write().await.get_mut(key) {
            entry.last_active = Instant::now();
        }
    }

    /// Apply one message to a session and return the reply
    pub async fn send_message(&self, key: &str, text: &str) -> Result<String, RuntimeError> {
        let handle = self.get_or_create(key).await;
        self.touch(key).await;

        let (respond_to, reply) = oneshot::channel();
        handle
            .command_tx
            .send(SessionCommand::Message {
                text: text.to_string(),
                respond_to,
            })
            .await
            .map_err(|_| RuntimeError::SessionGone(key.to_string()))?;

        reply
            .await
            .map_err(|_| RuntimeError::SessionGone(key.to_string()))
    }

    /// Current state of a live session, if there is one
    #[allow(dead_code)] // Used in tests
    pub async fn snapshot(&self, key: &str) -> Option<Session> {
        let handle = Arc::clone(&self.sessions.read().await.get(key)?.handle);
        let (respond_to, rx) = oneshot::channel();
        handle
            .command_tx
            .send(SessionCommand::Snapshot { respond_to })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Take the dispatch started by a session's completion
    #[allow(dead_code)] // Used in tests
    pub async fn take_dispatch(&self, key: &str) -> Option<Dispatch> {
        let handle = Arc::clone(&self.sessions.read().await.get(key)?.handle);
        let (respond_to, rx) = oneshot::channel();
        handle
            .command_tx
            .send(SessionCommand::TakeDispatch { respond_to })
            .await
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Number of live sessions
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    ///
    /// Busy sessions are kept; a second task for the same key would break
    /// in-order processing.
    pub async fn cleanup_expired(&self) -> usize {
        let ttl = self.limits.idle_ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|key, entry| {
            let keep = entry.is_busy() || entry.last_active.elapsed() < ttl;
            if !keep {
                tracing::debug!(session = %key, "Evicting idle session");
            }
            keep
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, remaining = sessions.len(), "Expired idle sessions");
        }
        removed
    }

    /// Start the periodic eviction sweep. Cancel the returned token to stop it.
    pub fn start_cleanup_task(self: &Arc<Self>) -> CancellationToken {
        let token = CancellationToken::new();
        let manager = Arc::clone(self);
        let stop = token.clone();
        let period = self.limits.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        manager.cleanup_expired().await;
                    }
                }
            }
            tracing::info!("Session cleanup task stopped");
        });

        token
    }
}

/// Removing the entry drops its sender, which ends the session task.
/// Busy sessions are never evicted; if every session is busy the map grows
/// past capacity until one frees up.
fn evict_least_recent(sessions: &mut HashMap<String, SessionEntry>) {
    let oldest = sessions
        .iter()
        .filter(|(_, entry)| !entry.is_busy())
        .min_by_key(|(_, entry)| entry.last_active)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        tracing::info!(session = %key, "Session capacity reached, evicting least recent");
        sessions.remove(&key);
    } else {
        tracing::warn!(active = sessions.len(), "Session capacity reached, all sessions busy");
    }
}
