use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 缓存项
#[derive(Debug, Clone)]
struct CacheItem<T> {
    value: T,
    expires_at: Instant,
}

/// 并发内存缓存，按键过期
#[derive(Debug, Clone)]
pub struct TtlCache<K: Eq + Hash, T: Clone> {
    data: Arc<DashMap<K, CacheItem<T>>>,
    default_ttl: Duration,
}

impl<K: Eq + Hash + Clone, T: Clone> TtlCache<K, T> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            default_ttl,
        }
    }

    pub fn set(&self, key: K, value: T) {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    pub fn set_with_ttl(&self, key: K, value: T, ttl: Duration) {
        self.data.insert(
            key,
            CacheItem {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// 获取未过期的缓存项；过期项在此处顺带删除
    pub fn get(&self, key: &K) -> Option<T> {
        let now = Instant::now();
        let hit = self.data.get(key).map(|item| {
            if item.expires_at > now {
                Some(item.value.clone())
            } else {
                None
            }
        });

        match hit {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.data.remove_if(key, |_, item| item.expires_at <= now);
                None
            }
            None => None,
        }
    }

    pub fn delete(&self, key: &K) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 清理过期项，返回清掉的条数
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, item| item.expires_at > now);
        before.saturating_sub(self.data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[test]
    fn test_cache_basic_operations() {
        let cache = TtlCache::new(Duration::from_secs(60));

        cache.set(1_i64, vec![3_i64, 2, 1]);
        assert_eq!(cache.get(&1), Some(vec![3, 2, 1]));
        assert_eq!(cache.get(&2), None);

        assert!(cache.delete(&1));
        assert_eq!(cache.get(&1), None);
    }

    #[tokio::test]
    async fn test_cache_expiration() {
        let cache = TtlCache::new(Duration::from_millis(50));

        cache.set("temp_key".to_string(), "temp_value".to_string());
        assert_eq!(cache.get(&"temp_key".to_string()), Some("temp_value".to_string()));

        sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get(&"temp_key".to_string()), None);
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_evicts_unread_entries() {
        let cache = TtlCache::new(Duration::from_millis(50));

        for user in 0..10_i64 {
            cache.set(user, vec![user]);
        }
        cache.set_with_ttl(99, vec![99], Duration::from_secs(60));
        assert_eq!(cache.size(), 11);

        sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.cleanup_expired(), 10);
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.get(&99), Some(vec![99]));
    }
}
