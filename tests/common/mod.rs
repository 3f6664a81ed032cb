//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Store and manager fixtures
//! - Mock origin helpers built on wiremock

pub mod fixtures;
pub mod mock_server;

// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_server::*;
