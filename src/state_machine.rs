//! Send-message workflow state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.
//! The runtime executes the effects and feeds the results back as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{Outcome, SendContext, SendState};
pub use transition::{transition, TransitionError};
