use crate::config::Config;
use crate::error::Result;
use crate::metrics;
use crate::models::rank::{RankEntry, RankSlice, RebuildSummary};
use crate::services::scoring::{age_in_hours, hot_score};
use crate::services::store::{ArticleStore, RankStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// HOT 排行缓存：整代重建，按位置读取
#[derive(Clone)]
pub struct RankCache {
    store: Arc<dyn RankStore>,
    top_n: usize,
}

impl RankCache {
    pub fn new(store: Arc<dyn RankStore>, top_n: usize) -> Self {
        Self { store, top_n }
    }

    /// 分数降序，同分 id 降序，截取前 `top_n` 并编排名次
    pub fn rank(mut candidates: Vec<(i64, f64)>, top_n: usize) -> Vec<RankEntry> {
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));
        candidates.truncate(top_n);
        candidates
            .into_iter()
            .enumerate()
            .map(|(rank, (news_id, score))| RankEntry {
                news_id,
                score,
                rank,
            })
            .collect()
    }

    pub async fn rebuild(&self, candidates: Vec<(i64, f64)>) -> Result<RebuildSummary> {
        let entries = Self::rank(candidates, self.top_n);
        let generation = self.store.replace_all(&entries).await?;
        Ok(RebuildSummary {
            generation,
            size: entries.len(),
        })
    }

    pub async fn page_by_offset(&self, offset: usize, count: usize) -> Result<RankSlice> {
        if count == 0 {
            let mut slice = self.store.range_by_rank(offset, offset).await?;
            slice.ids.clear();
            return Ok(slice);
        }
        self.store
            .range_by_rank(offset, offset.saturating_add(count - 1))
            .await
    }

    pub async fn size(&self) -> Result<usize> {
        self.store.count().await
    }
}

/// 候选范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotSettings {
    pub window_days: i64,
    pub min_views: i64,
    pub min_bookmarks: i64,
}

impl HotSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            window_days: config.hot_window_days,
            min_views: config.hot_min_views,
            min_bookmarks: config.hot_min_bookmarks,
        }
    }
}

impl Default for HotSettings {
    fn default() -> Self {
        Self {
            window_days: 7,
            min_views: 50,
            min_bookmarks: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeOutcome {
    Completed(RebuildSummary),
    /// 上一次重算尚未结束，本次直接放弃
    Skipped,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// HOT 重算任务，同一时刻至多一次在跑
pub struct HotRecomputer {
    articles: Arc<dyn ArticleStore>,
    cache: RankCache,
    settings: HotSettings,
    running: AtomicBool,
}

impl HotRecomputer {
    pub fn new(articles: Arc<dyn ArticleStore>, cache: RankCache, settings: HotSettings) -> Self {
        Self {
            articles,
            cache,
            settings,
            running: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &RankCache {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<RunningGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunningGuard(&self.running))
    }

    pub async fn recompute(&self) -> Result<RecomputeOutcome> {
        self.recompute_at(Utc::now()).await
    }

    pub async fn recompute_at(&self, now: DateTime<Utc>) -> Result<RecomputeOutcome> {
        let Some(_guard) = self.try_begin() else {
            warn!("HOT recompute already running, skipping this tick");
            metrics::record_recompute("skipped");
            return Ok(RecomputeOutcome::Skipped);
        };

        let result = self.rebuild_from_store(now).await;
        match &result {
            Ok(summary) => {
                info!(
                    "HOT ranking rebuilt: generation {} with {} entries",
                    summary.generation, summary.size
                );
                metrics::record_recompute("completed");
                metrics::set_hot_generation(summary.generation);
            }
            Err(_) => metrics::record_recompute("failed"),
        }

        result.map(RecomputeOutcome::Completed)
    }

    async fn rebuild_from_store(&self, now: DateTime<Utc>) -> Result<RebuildSummary> {
        let since = now - Duration::days(self.settings.window_days);
        let candidates = self
            .articles
            .hot_candidates(since, self.settings.min_views, self.settings.min_bookmarks)
            .await?;

        debug!("Scoring {} HOT candidates since {}", candidates.len(), since);

        let scored = candidates
            .iter()
            .map(|c| {
                let age = age_in_hours(c.published_at, now);
                (c.news_id, hot_score(c.view_count, c.bookmark_count, age))
            })
            .collect();

        self.cache.rebuild(scored).await
    }
}
