//! Property-based tests

pub mod classify_proptest;
pub mod retry_proptest;
