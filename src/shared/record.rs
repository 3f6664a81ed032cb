//! Offline Data Model
//!
//! Records and queue items that live in the local persistent store, and the
//! closed set of data categories they are tagged with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::event::SyncTag;

/// Store-assigned identifier
pub type RecordId = i64;

/// Data category of an offline record or queued mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Attendance check-ins
    Attendance,
    /// User notifications
    Notification,
    /// User profile data
    UserProfile,
}

impl Category {
    /// Every category, in replay order
    pub const ALL: [Category; 3] = [
        Category::Attendance,
        Category::Notification,
        Category::UserProfile,
    ];

    /// Name of the store collection holding this category's records
    pub fn collection_name(self) -> &'static str {
        match self {
            Category::Attendance => "attendance",
            Category::Notification => "notifications",
            Category::UserProfile => "user_data",
        }
    }

    /// Remote write path for this category
    pub fn sync_path(self) -> &'static str {
        match self {
            Category::Attendance => "/api/attendance/sync",
            Category::Notification => "/api/notifications/sync",
            Category::UserProfile => "/api/user/sync",
        }
    }

    /// Background sync tag that replays this category
    pub fn sync_tag(self) -> SyncTag {
        match self {
            Category::Attendance => SyncTag::Attendance,
            Category::Notification => SyncTag::Notification,
            Category::UserProfile => SyncTag::UserData,
        }
    }

    /// Infer the category of a request target from its path
    pub fn from_target(target: &str) -> Option<Category> {
        let target = target.to_ascii_lowercase();
        if target.contains("attendance") {
            Some(Category::Attendance)
        } else if target.contains("notification") {
            Some(Category::Notification)
        } else if target.contains("/user") {
            Some(Category::UserProfile)
        } else {
            None
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attendance" => Ok(Category::Attendance),
            "notifications" | "notification" => Ok(Category::Notification),
            "user_data" | "user_profile" => Ok(Category::UserProfile),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// One pending or synced unit of domain data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflineRecord {
    /// Store-assigned id (0 until persisted)
    #[serde(default)]
    pub id: RecordId,
    /// Data category
    pub category: Category,
    /// Opaque domain payload
    pub payload: serde_json::Value,
    /// When the record was created
    pub created_at: DateTime<Utc>,
    /// Set once the remote confirmed the write; never resent afterwards
    #[serde(default)]
    pub synced: bool,
}

impl OfflineRecord {
    /// Create an unsynced record stamped with the current time
    pub fn new(category: Category, payload: serde_json::Value) -> Self {
        Self {
            id: 0,
            category,
            payload,
            created_at: Utc::now(),
            synced: false,
        }
    }
}

/// A durable intent to mutate remote state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncQueueItem {
    /// Store-assigned id (0 until persisted)
    #[serde(default)]
    pub id: RecordId,
    /// Data category
    pub category: Category,
    /// Mutation payload
    pub data: serde_json::Value,
    /// When the item was enqueued
    pub enqueued_at: DateTime<Utc>,
    /// Failed attempts so far
    #[serde(default)]
    pub retry_count: u32,
    /// Timestamp of the last failed attempt
    #[serde(default)]
    pub last_attempt: Option<DateTime<Utc>>,
    /// Error from the last failed attempt
    #[serde(default)]
    pub last_error: Option<String>,
}

impl SyncQueueItem {
    /// Create a fresh queue item
    pub fn new(category: Category, data: serde_json::Value) -> Self {
        Self {
            id: 0,
            category,
            data,
            enqueued_at: Utc::now(),
            retry_count: 0,
            last_attempt: None,
            last_error: None,
        }
    }

    /// Record one failed attempt
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retry_count += 1;
        self.last_attempt = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}
