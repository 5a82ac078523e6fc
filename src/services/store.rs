//! 外部存储的接口。
//!
//! 服务层只依赖这些 trait；内存实现与 SurrealDB 实现各自满足同一份契约：
//! `query` 必须按排序键严格降序返回，且只返回严格排在边界之后的行。

use crate::error::Result;
use crate::models::{
    article::{Article, Category, HotCandidate},
    bookmark::Bookmark,
    cursor::{Boundary, LatestCursor, RelevanceCursor, ViewsCursor},
    rank::{RankEntry, RankSlice},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 主存储可直接执行的排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    /// `(published_sec DESC, news_id DESC)`
    Recency,
    /// `(views DESC, published_sec DESC, news_id DESC)`
    Views,
}

impl OrderKey {
    /// 某一行在本排序下的键元组
    pub fn key_of(&self, article: &Article) -> Boundary {
        match self {
            OrderKey::Recency => Boundary::Recency(LatestCursor {
                published_sec: article.published_sec(),
                news_id: article.id,
            }),
            OrderKey::Views => Boundary::Views(ViewsCursor {
                views: article.view_count,
                published_sec: article.published_sec(),
                news_id: article.id,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub category: Option<Category>,
}

impl ArticleFilter {
    pub fn category(category: Category) -> Self {
        Self {
            category: Some(category),
        }
    }

    pub fn matches(&self, article: &Article) -> bool {
        self.category.map_or(true, |c| article.category == c)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub keyword: String,
    pub category: Option<Category>,
}

/// 检索命中：id、相关度与秒级发布时间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub news_id: i64,
    pub score: f64,
    pub published_sec: i64,
}

impl SearchHit {
    pub fn key(&self) -> RelevanceCursor {
        RelevanceCursor {
            score: self.score,
            published_sec: self.published_sec,
            news_id: self.news_id,
        }
    }
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// 按 `order` 降序取至多 `limit` 行，只包含严格排在 `boundary` 之后的行
    async fn query(
        &self,
        order: OrderKey,
        filter: &ArticleFilter,
        boundary: Option<&Boundary>,
        limit: usize,
    ) -> Result<Vec<Article>>;

    /// 无序批量读取，不存在的 id 直接缺席
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>>;

    /// 浏览量 +1，返回更新后的行
    async fn increment_views(&self, id: i64) -> Result<Option<Article>>;

    /// 窗口期内且达到活跃门槛的 HOT 候选
    async fn hot_candidates(
        &self,
        since: DateTime<Utc>,
        min_views: i64,
        min_bookmarks: i64,
    ) -> Result<Vec<HotCandidate>>;
}

#[async_trait]
pub trait BookmarkStore: Send + Sync {
    async fn find_bookmark(&self, user_id: i64, article_id: i64) -> Result<Option<Bookmark>>;

    /// 新增收藏并给文章的收藏计数 +1
    async fn insert_bookmark(&self, user_id: i64, article_id: i64) -> Result<Bookmark>;

    /// 删除收藏并给文章的收藏计数 -1（不低于 0）
    async fn delete_bookmark(&self, bookmark: &Bookmark) -> Result<()>;

    /// 按收藏 id 降序，`before` 为上一页最后一条的 id
    async fn bookmarks_page(
        &self,
        user_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Bookmark>>;
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// 按 `(score DESC, published_sec DESC, news_id DESC)` 返回严格排在边界之后的命中
    async fn search(
        &self,
        request: &SearchRequest,
        boundary: Option<&RelevanceCursor>,
        limit: usize,
    ) -> Result<Vec<SearchHit>>;
}

/// HOT 排行的外部物化存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RankStore: Send + Sync {
    /// 整代替换，返回新一代的代数
    async fn replace_all(&self, entries: &[RankEntry]) -> Result<u64>;

    /// 名次闭区间 `[start, end]` 内的 id（分数降序），连同代数与总数一并读出
    async fn range_by_rank(&self, start: usize, end: usize) -> Result<RankSlice>;

    async fn count(&self) -> Result<usize>;
}
