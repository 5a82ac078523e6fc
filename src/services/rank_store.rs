use crate::error::Result;
use crate::models::rank::{RankEntry, RankSlice};
use crate::services::store::RankStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Generation {
    number: u64,
    ids: Vec<i64>,
}

/// 进程内排行：新一代在锁外构建好，再整体替换指针
#[derive(Debug, Default)]
pub struct MemoryRankStore {
    current: RwLock<Arc<Generation>>,
}

impl MemoryRankStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankStore for MemoryRankStore {
    async fn replace_all(&self, entries: &[RankEntry]) -> Result<u64> {
        let mut ordered = entries.to_vec();
        ordered.sort_by_key(|e| e.rank);
        let ids: Vec<i64> = ordered.into_iter().map(|e| e.news_id).collect();

        let mut current = self.current.write();
        let number = current.number + 1;
        *current = Arc::new(Generation { number, ids });
        Ok(number)
    }

    async fn range_by_rank(&self, start: usize, end: usize) -> Result<RankSlice> {
        let generation = self.current.read().clone();
        let total = generation.ids.len();

        let ids = if start >= total || end < start {
            Vec::new()
        } else {
            generation.ids[start..=end.min(total - 1)].to_vec()
        };

        Ok(RankSlice {
            generation: generation.number,
            total,
            ids,
        })
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.current.read().ids.len())
    }
}

#[cfg(feature = "redis-cache")]
pub use redis_store::RedisRankStore;

#[cfg(feature = "redis-cache")]
mod redis_store {
    use super::*;
    use redis::aio::ConnectionManager;
    use tracing::{debug, info};

    /// Redis 有序集合排行。
    ///
    /// 有序集合的分数存名次而不是热度分：ZRANGE 按名次升序读出即为热度降序，
    /// 同分时的 id 降序不会被成员的字典序打乱。
    #[derive(Clone)]
    pub struct RedisRankStore {
        conn: ConnectionManager,
        key: String,
    }

    impl RedisRankStore {
        pub async fn connect(url: &str, key: &str) -> Result<Self> {
            info!("Connecting HOT rank store to Redis at {}", url);
            let client = redis::Client::open(url)?;
            let conn = ConnectionManager::new(client).await?;
            Ok(Self {
                conn,
                key: key.to_string(),
            })
        }

        fn staging_key(&self) -> String {
            format!("{}:staging", self.key)
        }

        fn generation_key(&self) -> String {
            format!("{}:generation", self.key)
        }
    }

    #[async_trait]
    impl RankStore for RedisRankStore {
        async fn replace_all(&self, entries: &[RankEntry]) -> Result<u64> {
            let mut conn = self.conn.clone();

            if entries.is_empty() {
                let (generation,): (u64,) = redis::pipe()
                    .atomic()
                    .del(&self.key)
                    .ignore()
                    .incr(self.generation_key(), 1)
                    .query_async(&mut conn)
                    .await?;
                return Ok(generation);
            }

            let staging = self.staging_key();
            let members: Vec<(f64, i64)> = entries.iter().map(|e| (e.rank as f64, e.news_id)).collect();

            redis::pipe()
                .del(&staging)
                .ignore()
                .zadd_multiple(&staging, &members)
                .ignore()
                .query_async::<_, ()>(&mut conn)
                .await?;

            // 读者只会看到旧的或新的完整一代
            let (generation,): (u64,) = redis::pipe()
                .atomic()
                .rename(&staging, &self.key)
                .ignore()
                .incr(self.generation_key(), 1)
                .query_async(&mut conn)
                .await?;

            debug!("Swapped {} entries into {}", entries.len(), self.key);
            Ok(generation)
        }

        async fn range_by_rank(&self, start: usize, end: usize) -> Result<RankSlice> {
            let mut conn = self.conn.clone();

            // 超出 isize 的下标在 ZRANGE 中会变成负数，从末尾倒数
            let Ok(start) = isize::try_from(start) else {
                let (generation, total): (Option<u64>, usize) = redis::pipe()
                    .atomic()
                    .get(self.generation_key())
                    .zcard(&self.key)
                    .query_async(&mut conn)
                    .await?;
                return Ok(RankSlice {
                    generation: generation.unwrap_or(0),
                    total,
                    ids: Vec::new(),
                });
            };
            let end = isize::try_from(end).unwrap_or(isize::MAX);

            let (generation, total, ids): (Option<u64>, usize, Vec<i64>) = redis::pipe()
                .atomic()
                .get(self.generation_key())
                .zcard(&self.key)
                .zrange(&self.key, start, end)
                .query_async(&mut conn)
                .await?;

            Ok(RankSlice {
                generation: generation.unwrap_or(0),
                total,
                ids,
            })
        }

        async fn count(&self) -> Result<usize> {
            let mut conn = self.conn.clone();
            let total: usize = redis::cmd("ZCARD")
                .arg(&self.key)
                .query_async(&mut conn)
                .await?;
            Ok(total)
        }
    }
}
