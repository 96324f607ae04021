//! Domain types for the voice command gateway.

pub mod caller;
pub mod config;
pub mod error;
pub mod outcome;
