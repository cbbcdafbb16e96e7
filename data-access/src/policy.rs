use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Expiration of each family of cached reads, and the time budget of a
/// single cache call.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Idiom by id and by implementation id. Refreshed on every save.
    pub idiom_ttl: Duration,
    /// Bulk listing. Nothing invalidates it.
    pub all_idioms_ttl: Duration,
    pub search_ttl: Duration,
    /// Recent and popular idioms.
    pub listing_ttl: Duration,
    pub languages_ttl: Duration,
    pub messages_ttl: Duration,
    pub app_config_ttl: Duration,
    /// A cache call running longer than this is treated as a cache failure.
    pub operation_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            idiom_ttl: 24 * HOUR,
            all_idioms_ttl: Duration::from_secs(30),
            search_ttl: 10 * MINUTE,
            listing_ttl: 10 * MINUTE,
            languages_ttl: 5 * MINUTE,
            messages_ttl: 2 * HOUR,
            app_config_ttl: 24 * HOUR,
            operation_timeout: Duration::from_millis(500),
        }
    }
}
