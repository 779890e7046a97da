//! Downloaded-image cache with time-based expiry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use image::DynamicImage;

/// How long a downloaded image stays cached.
pub const IMAGE_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug)]
struct CachedImage {
    image: Arc<DynamicImage>,
    added: Instant,
}

/// URL -> decoded image. Expired entries are purged on every access.
#[derive(Debug)]
pub struct ImageCache {
    entries: DashMap<String, CachedImage>,
    ttl: Duration,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(IMAGE_CACHE_TTL)
    }
}

impl ImageCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Drop every entry older than the TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.added.elapsed() < ttl);
    }

    pub fn get(&self, url: &str) -> Option<Arc<DynamicImage>> {
        self.purge_expired();
        self.entries.get(url).map(|entry| Arc::clone(&entry.image))
    }

    pub fn insert(&self, url: impl Into<String>, image: DynamicImage) -> Arc<DynamicImage> {
        self.purge_expired();
        let image = Arc::new(image);
        self.entries.insert(
            url.into(),
            CachedImage {
                image: Arc::clone(&image),
                added: Instant::now(),
            },
        );
        image
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn pixel() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(1, 1))
    }

    #[test]
    fn test_insert_then_get() {
        let cache = ImageCache::default();
        cache.insert("http://x/a.png", pixel());
        assert!(cache.get("http://x/a.png").is_some());
        assert!(cache.get("http://x/b.png").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entries_are_purged() {
        let cache = ImageCache::new(Duration::ZERO);
        cache.insert("http://x/a.png", pixel());
        assert!(cache.get("http://x/a.png").is_none());
        assert!(cache.is_empty());
    }
}
