//! Test suite for Chat Ping Offline
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
pub mod property;
