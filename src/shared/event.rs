/**
 * Cross-Context Events
 *
 * Events exchanged between the page context (offline manager, scheduler)
 * and the worker context (interceptor, background sync). The two contexts
 * share no mutable state; everything travels through these types.
 */
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::record::Category;

/// Connectivity edge raised by the network monitor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    /// Transitioned offline -> online
    Online,
    /// Transitioned online -> offline
    Offline,
}

/// Named background sync task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncTag {
    #[serde(rename = "attendance-sync")]
    Attendance,
    #[serde(rename = "notification-sync")]
    Notification,
    #[serde(rename = "user-data-sync")]
    UserData,
    #[serde(rename = "general-sync")]
    General,
}

impl SyncTag {
    /// Every tag registered on activation
    pub const ALL: [SyncTag; 4] = [
        SyncTag::Attendance,
        SyncTag::Notification,
        SyncTag::UserData,
        SyncTag::General,
    ];

    /// Tag name as registered with the platform
    pub fn as_str(self) -> &'static str {
        match self {
            SyncTag::Attendance => "attendance-sync",
            SyncTag::Notification => "notification-sync",
            SyncTag::UserData => "user-data-sync",
            SyncTag::General => "general-sync",
        }
    }

    /// Category replayed by this tag; `None` replays everything
    pub fn category(self) -> Option<Category> {
        match self {
            SyncTag::Attendance => Some(Category::Attendance),
            SyncTag::Notification => Some(Category::Notification),
            SyncTag::UserData => Some(Category::UserProfile),
            SyncTag::General => None,
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown sync tag: {}", s))
    }
}

/// Command sent from the page context to the worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate a waiting worker immediately
    SkipWaiting,
    /// Replay every queued request now
    SyncNow,
    /// Persist an arbitrary payload into the offline partition
    CacheData(serde_json::Value),
    /// Register a background sync tag for later firing
    RegisterSync(SyncTag),
    /// Platform fired a background sync tag
    Sync(SyncTag),
    /// Push payload received; kept for offline viewing
    Push(serde_json::Value),
}
