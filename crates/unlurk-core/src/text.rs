//! Cache of sanitized display text keyed by item identity.

use std::sync::Arc;

use tracing::trace;

use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::format::{default_cache_for, sanitize_and_format_title};
use crate::item::{Item, ItemKey};

/// Sanitized text per item, with TTLs from [`default_cache_for`].
#[derive(Debug)]
pub struct TextCache {
    cache: TtlCache<ItemKey, Arc<str>>,
}

impl TextCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: TtlCache::new(clock, |key: &ItemKey, now| {
                default_cache_for(key.item(), now)
            }),
        }
    }

    /// Sanitized text for `item`, formatted on a miss.
    pub fn text_for(&self, item: &Arc<Item>) -> Arc<str> {
        let key = ItemKey(Arc::clone(item));
        self.cache.get_or_insert_with(&key, || {
            trace!(id = item.id, "formatting item text");
            Arc::from(sanitize_and_format_title(item, true))
        })
    }

    /// Drop expired entries.
    pub fn sweep(&self) -> usize {
        self.cache.sweep()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    const NOW: i64 = 1_714_600_000;

    fn comment(id: u64, time: i64, text: &str) -> Arc<Item> {
        Arc::new(Item {
            id,
            time,
            parent: Some(1),
            text: Some(text.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_old_item_text_is_cached_by_id() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let cache = TextCache::new(clock.clone());

        let original = comment(10, NOW - 3 * 86400, "first <i>version</i>");
        assert_eq!(&*cache.text_for(&original), "first version");

        // A refetch of the same id hits the cached text
        let refetched = comment(10, NOW - 3 * 86400, "edited");
        assert_eq!(&*cache.text_for(&refetched), "first version");

        clock.advance(Duration::from_secs(3600));
        assert_eq!(&*cache.text_for(&refetched), "edited");
    }

    #[test]
    fn test_fresh_item_text_not_cached() {
        let clock = Arc::new(ManualClock::at_unix(NOW));
        let cache = TextCache::new(clock);

        let fresh = comment(11, NOW - 30, "typo");
        assert_eq!(&*cache.text_for(&fresh), "typo");
        assert!(cache.is_empty());

        let fixed = comment(11, NOW - 30, "fixed");
        assert_eq!(&*cache.text_for(&fixed), "fixed");
    }
}
