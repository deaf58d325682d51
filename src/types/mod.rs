//! Core conversation and agent-message types.

pub mod agent;
pub mod generation;
pub mod message;

pub use agent::*;
pub use generation::*;
pub use message::*;
