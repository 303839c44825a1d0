//! Runtime for executing send workflows
//!
//! Performs the I/O the state machine asks for: store mutations, the
//! loading indicator timer and calls to the backend services.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{SendError, SendWorkflow};
pub use traits::*;

use crate::backend::{HttpBackend, LoggingBackend};
use crate::session::Session;

/// Type alias for the production session with concrete implementations
pub type ProductionSession = Session<LoggingBackend<HttpBackend>, LoggingBackend<HttpBackend>>;
