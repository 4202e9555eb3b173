//! File-based cache for provider responses, with TTL support.
//!
//! The cache directory is process-wide and append-only: writers create
//! entries idempotently and concurrent readers are safe.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::PathBuf;

/// Cache entry with timestamp
#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

/// Cache categories with different TTLs
#[derive(Debug, Clone, Copy)]
pub enum CacheCategory {
    Schedule, // 24 hours
    Session,  // 7 days
}

impl CacheCategory {
    /// Get TTL duration
    pub fn ttl(&self) -> Duration {
        match self {
            CacheCategory::Schedule => Duration::hours(24),
            CacheCategory::Session => Duration::hours(24 * 7),
        }
    }

    /// Get directory name for this category
    pub fn dir_name(&self) -> &str {
        match self {
            CacheCategory::Schedule => "schedule",
            CacheCategory::Session => "session",
        }
    }
}

/// File-based cache
pub struct Cache {
    base_dir: PathBuf,
}

impl Cache {
    /// Create a new cache with the given base directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get cache directory for a category
    fn category_dir(&self, category: CacheCategory) -> PathBuf {
        self.base_dir.join(category.dir_name())
    }

    /// Get cache file path for a key
    fn cache_path(&self, category: CacheCategory, key: &str) -> PathBuf {
        self.category_dir(category).join(format!("{}.json", key))
    }

    /// Get cached data if valid
    pub fn get<T: DeserializeOwned>(&self, category: CacheCategory, key: &str) -> Option<T> {
        let path = self.cache_path(category, key);

        if !path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<T> = serde_json::from_str(&content).ok()?;

        // Check if expired
        let elapsed = Utc::now() - entry.cached_at;
        if elapsed > category.ttl() {
            // Remove expired cache
            let _ = std::fs::remove_file(&path);
            return None;
        }

        Some(entry.data)
    }

    /// Set cache data
    pub fn set<T: Serialize>(&self, category: CacheCategory, key: &str, data: &T) -> Result<()> {
        let dir = self.category_dir(category);
        std::fs::create_dir_all(&dir)?;

        let entry = CacheEntry {
            data,
            cached_at: Utc::now(),
        };

        let path = self.cache_path(category, key);
        let content = serde_json::to_string_pretty(&entry)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Clear cache for a category
    #[allow(dead_code)]
    pub fn clear(&self, category: CacheCategory) -> Result<()> {
        let dir = self.category_dir(category);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());

        assert!(cache
            .get::<serde_json::Value>(CacheCategory::Session, "2024_5_Q")
            .is_none());

        let payload = json!([{"Abbreviation": "VER"}]);
        cache
            .set(CacheCategory::Session, "2024_5_Q", &payload)
            .unwrap();

        let cached: serde_json::Value = cache.get(CacheCategory::Session, "2024_5_Q").unwrap();
        assert_eq!(cached, payload);
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());

        let path = dir.path().join("schedule").join("2024.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let stale = CacheEntry {
            data: json!(["a"]),
            cached_at: Utc::now() - Duration::hours(48),
        };
        std::fs::write(&path, serde_json::to_string(&stale).unwrap()).unwrap();

        assert!(cache
            .get::<serde_json::Value>(CacheCategory::Schedule, "2024")
            .is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_categories_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf());

        cache
            .set(CacheCategory::Schedule, "2024", &json!(["a"]))
            .unwrap();
        assert!(cache
            .get::<serde_json::Value>(CacheCategory::Session, "2024")
            .is_none());
    }
}
