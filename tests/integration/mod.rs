//! Integration tests against mock origins

pub mod interception;
pub mod offline_sync;
