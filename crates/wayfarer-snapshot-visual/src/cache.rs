//! Screenshot caching with TTL support.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::DashMap;

use crate::models::Screenshot;

pub struct ScreenshotCache {
    cache: Arc<DashMap<String, CachedScreenshot>>,
    default_ttl: Duration,
}

struct CachedScreenshot {
    screenshot: Screenshot,
    expires_at: SystemTime,
}

impl ScreenshotCache {
    pub fn new(default_ttl_secs: u64) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_secs),
        }
    }

    pub fn get(&self, key: &str) -> Option<Screenshot> {
        if let Some(entry) = self.cache.get(key) {
            if entry.expires_at > SystemTime::now() {
                return Some(entry.screenshot.clone());
            }
            drop(entry);
            self.cache.remove(key);
        }
        None
    }

    pub fn put(&self, key: String, screenshot: Screenshot, ttl: Option<Duration>) {
        let expires_at = SystemTime::now() + ttl.unwrap_or(self.default_ttl);
        self.cache.insert(
            key,
            CachedScreenshot {
                screenshot,
                expires_at,
            },
        );
    }

    pub fn invalidate_page(&self, page_id: &str) {
        self.cache.retain(|k, _| !k.starts_with(page_id));
    }

    pub fn clear(&self) {
        self.cache.clear();
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
    use crate::models::{CaptureMode, ImageFormat};

    fn sample(id: &str) -> Screenshot {
        Screenshot {
            id: id.to_string(),
            data: vec![1, 2, 3],
            format: ImageFormat::Png,
            width: 100,
            height: 100,
            timestamp: SystemTime::now(),
            page_id: "page-1".to_string(),
            capture_mode: CaptureMode::Viewport,
            clip: None,
        }
    }

    #[test]
    fn basic_put_and_get_round_trips() {
        let cache = ScreenshotCache::new(60);
        assert!(cache.is_empty());

        cache.put("key-1".to_string(), sample("test-1"), None);
        assert_eq!(cache.len(), 1);

        let retrieved = cache.get("key-1");
        assert_eq!(retrieved.unwrap().id, "test-1");
    }

    #[test]
    fn invalidate_page_drops_matching_keys() {
        let cache = ScreenshotCache::new(60);
        cache.put("page-1:viewport".to_string(), sample("test-1"), None);
        assert_eq!(cache.len(), 1);

        cache.invalidate_page("page-1");
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expired_entries_are_evicted_on_read() {
        let cache = ScreenshotCache::new(60);
        cache.put(
            "key-1".to_string(),
            sample("test-1"),
            Some(Duration::from_millis(0)),
        );
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("key-1").is_none());
    }
}
