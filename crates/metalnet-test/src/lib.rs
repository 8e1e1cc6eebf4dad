//! Integration test infrastructure for the metalnet registry
//!
//! Provides:
//! - A registry wired to in-memory and recorded switches
//! - Test fixtures for common tenant layouts
//! - Graph invariant verification helpers
//! - Switch state verification helpers

pub mod fixtures;
mod verification;

pub use fixtures::*;
pub use verification::*;
