//! Shared test utilities for autobatch integration tests.
//!
//! This module provides:
//! - `FakeBackend`, a scriptable in-memory job backend
//! - `TestHarness` wiring an orchestrator around it with an in-memory store
//! - Record builders for seeding the backend

pub mod builders;
pub mod fake_backend;
pub mod harness;

pub use builders::*;
pub use fake_backend::{server_error, status_record, FakeBackend, Op};
pub use harness::{TestHarness, OWNER};
