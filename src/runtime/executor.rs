//! Session runtime executor

use super::traits::{Notifier, PatientStore};
use super::SessionCommand;

use crate::completion::{CompletionHandler, Dispatch};
use crate::state_machine::{transition, Effect, IntakeState, Session};
use tokio::sync::mpsc;

/// Owns one session's state and applies its messages one at a time
pub struct SessionRuntime<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    session: Session,
    completion: CompletionHandler<S, N>,
    command_rx: mpsc::Receiver<SessionCommand>,
    /// Dispatch handed off by the last completion, if any
    last_dispatch: Option<Dispatch>,
}

impl<S, N> SessionRuntime<S, N>
where
    S: PatientStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(
        key: impl Into<String>,
        completion: CompletionHandler<S, N>,
        command_rx: mpsc::Receiver<SessionCommand>,
    ) -> Self {
        Self {
            session: Session::new(key),
            completion,
            command_rx,
            last_dispatch: None,
        }
    }

    pub async fn run(mut self) {
        tracing::debug!(session = %self.session.key, "Starting session runtime");

        while let Some(command) = self.command_rx.recv().await {
            match command {
                SessionCommand::Message { text, respond_to } => {
                    let reply = self.process_message(&text);
                    if respond_to.send(reply).is_err() {
                        tracing::debug!(session = %self.session.key, "Caller went away before reply");
                    }
                }
                SessionCommand::Snapshot { respond_to } => {
                    let _ = respond_to.send(self.session.clone());
                }
                SessionCommand::TakeDispatch { respond_to } => {
                    let _ = respond_to.send(self.last_dispatch.take());
                }
            }
        }

        tracing::debug!(session = %self.session.key, "Session runtime stopped");
    }

    fn process_message(&mut self, text: &str) -> String {
        let result = transition(&self.session.state, text);

        let old_label = self.session.state.label();
        self.session.state = result.new_state;
        if old_label != self.session.state.label() {
            tracing::debug!(
                session = %self.session.key,
                from = old_label,
                to = self.session.state.label(),
                ward = ?self.session.ward(),
                completed = self.session.is_completed(),
                "State changed"
            );
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        result.reply
    }

    fn execute_effect(&mut self, effect: Effect) {
        let key = &self.session.key;
        match effect {
            Effect::WardAssigned { ward, keyword } => {
                tracing::info!(session = %key, ward = %ward, keyword = ?keyword, "Ward assigned");
            }
            Effect::SlotFilled { slot } => {
                tracing::debug!(session = %key, slot = %slot, "Slot filled");
            }
            Effect::SlotRejected { slot, retries } => {
                tracing::debug!(session = %key, slot = %slot, retries, "Slot value rejected");
            }
            Effect::CompleteIntake { intake } => {
                debug_assert!(matches!(self.session.state, IntakeState::Complete { .. }));
                let dispatch = self.completion.complete(key, intake);
                self.last_dispatch = Some(dispatch);
            }
        }
    }
}
