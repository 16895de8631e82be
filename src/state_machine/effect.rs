//! Effects produced by state transitions

use super::state::CompletedIntake;
use crate::slots::Slot;
use crate::triage::Ward;

/// Effects to be executed by the session runtime after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The opening message was classified
    WardAssigned {
        ward: Ward,
        keyword: Option<&'static str>,
    },

    /// A slot was extracted and stored
    SlotFilled { slot: Slot },

    /// Extraction failed; the same question is asked again
    SlotRejected { slot: Slot, retries: u32 },

    /// All fields collected: persist and notify
    CompleteIntake { intake: CompletedIntake },
}

impl Effect {
    pub fn complete(intake: CompletedIntake) -> Self {
        Effect::CompleteIntake { intake }
    }
}
