//! Session state types

use crate::slots::Slot;
use crate::triage::Ward;
use serde::{Deserialize, Serialize};

/// The four collected fields of a finished intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedIntake {
    pub ward: Ward,
    pub name: String,
    pub age: u8,
    pub query: String,
}

/// Intake progress. Each variant carries exactly the fields collected so far,
/// so a session is complete iff every field is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntakeState {
    /// Nothing known yet; the next message decides the ward
    #[default]
    AwaitingWard,

    AwaitingName {
        ward: Ward,
        /// Failed extraction attempts for this slot
        #[serde(default)]
        retries: u32,
    },

    AwaitingAge {
        ward: Ward,
        name: String,
        #[serde(default)]
        retries: u32,
    },

    AwaitingQuery {
        ward: Ward,
        name: String,
        age: u8,
        #[serde(default)]
        retries: u32,
    },

    /// Terminal
    Complete { intake: CompletedIntake },
}

impl IntakeState {
    pub fn ward(&self) -> Option<Ward> {
        match self {
            IntakeState::AwaitingWard => None,
            IntakeState::AwaitingName { ward, .. }
            | IntakeState::AwaitingAge { ward, .. }
            | IntakeState::AwaitingQuery { ward, .. } => Some(*ward),
            IntakeState::Complete { intake } => Some(intake.ward),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn name(&self) -> Option<&str> {
        match self {
            IntakeState::AwaitingWard | IntakeState::AwaitingName { .. } => None,
            IntakeState::AwaitingAge { name, .. } | IntakeState::AwaitingQuery { name, .. } => {
                Some(name)
            }
            IntakeState::Complete { intake } => Some(&intake.name),
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn age(&self) -> Option<u8> {
        match self {
            IntakeState::AwaitingQuery { age, .. } => Some(*age),
            IntakeState::Complete { intake } => Some(intake.age),
            _ => None,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn query(&self) -> Option<&str> {
        match self {
            IntakeState::Complete { intake } => Some(&intake.query),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, IntakeState::Complete { .. })
    }

    /// The slot the controller is currently asking for
    pub fn pending_slot(&self) -> Option<Slot> {
        match self {
            IntakeState::AwaitingName { .. } => Some(Slot::Name),
            IntakeState::AwaitingAge { .. } => Some(Slot::Age),
            IntakeState::AwaitingQuery { .. } => Some(Slot::Query),
            IntakeState::AwaitingWard | IntakeState::Complete { .. } => None,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            IntakeState::AwaitingWard => "awaiting_ward",
            IntakeState::AwaitingName { .. } => "awaiting_name",
            IntakeState::AwaitingAge { .. } => "awaiting_age",
            IntakeState::AwaitingQuery { .. } => "awaiting_query",
            IntakeState::Complete { .. } => "complete",
        }
    }
}

/// One conversation, keyed by the caller-supplied session id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub key: String,
    pub state: IntakeState,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: IntakeState::default(),
        }
    }

    pub fn ward(&self) -> Option<Ward> {
        self.state.ward()
    }

    #[allow(dead_code)] // Used in tests
    pub fn name(&self) -> Option<&str> {
        self.state.name()
    }

    #[allow(dead_code)] // Used in tests
    pub fn age(&self) -> Option<u8> {
        self.state.age()
    }

    #[allow(dead_code)] // Used in tests
    pub fn query(&self) -> Option<&str> {
        self.state.query()
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_completed()
    }
}
