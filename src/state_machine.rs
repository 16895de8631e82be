//! Core intake state machine
//!
//! Pure transitions in the Elm Architecture style: state + message in,
//! new state + reply + effects out.

mod effect;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use state::{CompletedIntake, IntakeState, Session};
pub use transition::transition;
