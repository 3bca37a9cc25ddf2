//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the processor (clock, persistence) are abstracted
//! behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected failures
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod gateway;

pub use clock::NullClock;
pub use gateway::NullGateway;
