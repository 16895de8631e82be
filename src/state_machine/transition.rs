//! Pure state transition function
//!
//! Given the same state and message this always yields the same next state,
//! reply and effects. No I/O happens here; the runtime executes effects.

use super::state::CompletedIntake;
use super::{Effect, IntakeState};
use crate::prompts;
use crate::slots::{self, Slot, SlotValue};
use crate::triage;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: IntakeState,
    /// Text returned to the patient
    pub reply: String,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: IntakeState, reply: impl Into<String>) -> Self {
        Self {
            new_state: state,
            reply: reply.into(),
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Advance the intake by one patient message.
///
/// Extraction failures never error; they re-ask the same question and bump
/// the slot's retry counter.
pub fn transition(state: &IntakeState, message: &str) -> TransitionResult {
    match state {
        // The opening message only decides the ward; it fills no slot
        IntakeState::AwaitingWard => {
            let classification = triage::classify_with_reason(message);
            let ward = classification.ward;
            TransitionResult::new(
                IntakeState::AwaitingName { ward, retries: 0 },
                prompts::ask_name(ward),
            )
            .with_effect(Effect::WardAssigned {
                ward,
                keyword: classification.keyword,
            })
        }

        IntakeState::AwaitingName { ward, retries } => {
            match slots::extract(Slot::Name, message) {
                Some(SlotValue::Name(name)) => {
                    let reply = prompts::ask_age(*ward, &name);
                    TransitionResult::new(
                        IntakeState::AwaitingAge {
                            ward: *ward,
                            name,
                            retries: 0,
                        },
                        reply,
                    )
                    .with_effect(Effect::SlotFilled { slot: Slot::Name })
                }
                _ => {
                    let retries = retries.saturating_add(1);
                    rejected(
                        IntakeState::AwaitingName {
                            ward: *ward,
                            retries,
                        },
                        retries,
                        prompts::reask_name(*ward),
                    )
                }
            }
        }

        IntakeState::AwaitingAge {
            ward,
            name,
            retries,
        } => match slots::extract(Slot::Age, message) {
            Some(SlotValue::Age(age)) => TransitionResult::new(
                IntakeState::AwaitingQuery {
                    ward: *ward,
                    name: name.clone(),
                    age,
                    retries: 0,
                },
                prompts::ask_query(*ward),
            )
            .with_effect(Effect::SlotFilled { slot: Slot::Age }),
            _ => {
                let retries = retries.saturating_add(1);
                rejected(
                    IntakeState::AwaitingAge {
                        ward: *ward,
                        name: name.clone(),
                        retries,
                    },
                    retries,
                    prompts::reask_age(retries),
                )
            }
        },

        IntakeState::AwaitingQuery {
            ward,
            name,
            age,
            retries,
        } => match slots::extract(Slot::Query, message) {
            Some(SlotValue::Query(query)) => {
                let intake = CompletedIntake {
                    ward: *ward,
                    name: name.clone(),
                    age: *age,
                    query,
                };
                TransitionResult::new(
                    IntakeState::Complete {
                        intake: intake.clone(),
                    },
                    prompts::closing(*ward, name),
                )
                .with_effect(Effect::SlotFilled { slot: Slot::Query })
                .with_effect(Effect::complete(intake))
            }
            _ => {
                let retries = retries.saturating_add(1);
                rejected(
                    IntakeState::AwaitingQuery {
                        ward: *ward,
                        name: name.clone(),
                        age: *age,
                        retries,
                    },
                    retries,
                    prompts::reask_query(*ward),
                )
            }
        },

        // Terminal: acknowledge, never mutate, never complete twice
        IntakeState::Complete { intake } => {
            TransitionResult::new(state.clone(), prompts::already_recorded(&intake.name))
        }
    }
}

/// Ask the same question again. The rejected slot is whatever `next` is
/// still waiting for.
fn rejected(next: IntakeState, retries: u32, reply: String) -> TransitionResult {
    let effect = next
        .pending_slot()
        .map(|slot| Effect::SlotRejected { slot, retries });
    let mut result = TransitionResult::new(next, reply);
    result.effects.extend(effect);
    result
}
