//! Request classification and strategy selection
//!
//! Paths are classified into a [`ResourceClass`] by pattern; each class maps
//! to a caching [`Strategy`] through a [`StrategyTable`] built from the
//! worker configuration.

use crate::shared::config::{Strategy, WorkerConfig};
use std::fmt;

/// Substrings marking static assets
pub const STATIC_PATTERNS: [&str; 3] = ["/static/", "/icons/", "/manifest.json"];

/// Substrings marking API calls
pub const API_PATTERNS: [&str; 3] = ["/api/", "/attendance/", "/notifications/"];

/// Exact page paths
pub const PAGE_PATHS: [&str; 4] = ["/", "/dashboard", "/attendance", "/notifications"];

/// Resource classes with their own caching strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Static,
    Api,
    Pages,
}

impl ResourceClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceClass::Static => "static",
            ResourceClass::Api => "api",
            ResourceClass::Pages => "pages",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a request path (query string ignored)
///
/// Static patterns win over API patterns, which win over page paths.
pub fn classify(path: &str) -> Option<ResourceClass> {
    let path = path.split(['?', '#']).next().unwrap_or(path);

    if STATIC_PATTERNS.iter().any(|pattern| path.contains(pattern)) {
        Some(ResourceClass::Static)
    } else if API_PATTERNS.iter().any(|pattern| path.contains(pattern)) {
        Some(ResourceClass::Api)
    } else if PAGE_PATHS.contains(&path) {
        Some(ResourceClass::Pages)
    } else {
        None
    }
}

/// Strategy per resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTable {
    pub static_assets: Strategy,
    pub api: Strategy,
    pub pages: Strategy,
    /// Unclassified paths
    pub unclassified: Strategy,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            static_assets: Strategy::CacheFirst,
            api: Strategy::NetworkFirst,
            pages: Strategy::NetworkFirst,
            unclassified: Strategy::NetworkFirst,
        }
    }
}

impl StrategyTable {
    /// Defaults overridden by `worker.strategies`
    pub fn from_config(config: &WorkerConfig) -> Self {
        let mut table = Self::default();
        for (class, strategy) in &config.strategies {
            match class.as_str() {
                "static" => table.static_assets = *strategy,
                "api" => table.api = *strategy,
                "pages" => table.pages = *strategy,
                "default" => table.unclassified = *strategy,
                other => tracing::warn!("Ignoring strategy for unknown resource class '{}'", other),
            }
        }
        table
    }

    pub fn strategy_for(&self, class: Option<ResourceClass>) -> Strategy {
        match class {
            Some(ResourceClass::Static) => self.static_assets,
            Some(ResourceClass::Api) => self.api,
            Some(ResourceClass::Pages) => self.pages,
            None => self.unclassified,
        }
    }

    /// Classify and look up in one step
    pub fn select(&self, path: &str) -> Strategy {
        self.strategy_for(classify(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_classify_patterns() {
        assert_eq!(classify("/static/css/main.css"), Some(ResourceClass::Static));
        assert_eq!(classify("/icons/icon-192x192.png"), Some(ResourceClass::Static));
        assert_eq!(classify("/manifest.json"), Some(ResourceClass::Static));
        assert_eq!(classify("/api/chat"), Some(ResourceClass::Api));
        assert_eq!(classify("/attendance/today"), Some(ResourceClass::Api));
        assert_eq!(classify("/notifications/1"), Some(ResourceClass::Api));
        assert_eq!(classify("/"), Some(ResourceClass::Pages));
        assert_eq!(classify("/dashboard"), Some(ResourceClass::Pages));
        assert_eq!(classify("/attendance"), Some(ResourceClass::Pages));
        assert_eq!(classify("/dashboard?tab=2"), Some(ResourceClass::Pages));
        assert_eq!(classify("/sw.js"), None);
        assert_eq!(classify("/dashboard/settings"), None);
    }

    #[test]
    fn test_static_wins_over_api() {
        assert_eq!(classify("/api/static/logo.png"), Some(ResourceClass::Static));
    }

    #[test]
    fn test_default_strategies() {
        let table = StrategyTable::default();
        assert_eq!(table.select("/static/js/main.js"), Strategy::CacheFirst);
        assert_eq!(table.select("/api/attendance"), Strategy::NetworkFirst);
        assert_eq!(table.select("/dashboard"), Strategy::NetworkFirst);
        assert_eq!(table.select("/unknown"), Strategy::NetworkFirst);
    }

    #[test]
    fn test_config_overrides() {
        let config = WorkerConfig {
            strategies: BTreeMap::from([
                ("pages".to_string(), Strategy::OfflineOnly),
                ("default".to_string(), Strategy::CacheFirst),
                ("bogus".to_string(), Strategy::CacheFirst),
            ]),
            ..WorkerConfig::default()
        };
        let table = StrategyTable::from_config(&config);
        assert_eq!(table.select("/"), Strategy::OfflineOnly);
        assert_eq!(table.select("/other"), Strategy::CacheFirst);
        assert_eq!(table.select("/api/x"), Strategy::NetworkFirst);
    }
}
