//! Property-based tests for path classification

use chatping_offline::shared::config::{Strategy, WorkerConfig};
use chatping_offline::worker::strategy::{classify, ResourceClass, StrategyTable};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_query_string_never_changes_class(
        path in "/[a-z/._-]{0,24}",
        query in "[a-z0-9=&/]{0,16}",
    ) {
        let with_query = format!("{}?{}", path, query);
        prop_assert_eq!(classify(&with_query), classify(&path));
    }

    #[test]
    fn test_static_wins_over_api(prefix in "[a-z]{0,8}", file in "[a-z]{1,8}\\.js") {
        let path = format!("/api/{}/static/{}", prefix, file);
        prop_assert_eq!(classify(&path), Some(ResourceClass::Static));
    }

    #[test]
    fn test_every_path_gets_a_strategy(path in "/[a-z/._-]{0,32}") {
        let table = StrategyTable::from_config(&WorkerConfig::default());
        let expected = if classify(&path) == Some(ResourceClass::Static) {
            Strategy::CacheFirst
        } else {
            Strategy::NetworkFirst
        };
        prop_assert_eq!(table.select(&path), expected);
    }
}
