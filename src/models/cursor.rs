//! 各排序的游标边界形状。
//!
//! 每种形状使用互不相同的字段名并拒绝未知字段，因此一个排序签发的游标
//! 不可能被另一个排序当作合法边界解码。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 最新 / 分区最新 / 无检索词的检索：`(published_sec DESC, news_id DESC)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatestCursor {
    pub published_sec: i64,
    pub news_id: i64,
}

/// 按浏览量的 HOT（直查主存储）：`(views DESC, published_sec DESC, news_id DESC)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewsCursor {
    pub views: i64,
    pub published_sec: i64,
    pub news_id: i64,
}

/// 带检索词的检索：`(score DESC, published_sec DESC, news_id DESC)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelevanceCursor {
    pub score: f64,
    pub published_sec: i64,
    pub news_id: i64,
}

/// 收藏流：`(scrap_id DESC)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookmarkCursor {
    pub scrap_id: i64,
}

/// HOT 排行缓存的位置游标，绑定签发时的排行代数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HotOffsetCursor {
    pub offset: usize,
    pub generation: u64,
}

/// 推荐列表的位置游标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendOffsetCursor {
    pub rec_offset: usize,
}

impl LatestCursor {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.published_sec
            .cmp(&other.published_sec)
            .then(self.news_id.cmp(&other.news_id))
    }
}

impl ViewsCursor {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.views
            .cmp(&other.views)
            .then(self.published_sec.cmp(&other.published_sec))
            .then(self.news_id.cmp(&other.news_id))
    }
}

impl RelevanceCursor {
    fn cmp_key(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.published_sec.cmp(&other.published_sec))
            .then(self.news_id.cmp(&other.news_id))
    }
}

/// 一行在某个排序下的完整键元组，同时也是翻页边界
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Boundary {
    Recency(LatestCursor),
    Views(ViewsCursor),
    Relevance(RelevanceCursor),
}

impl Boundary {
    /// 同形状键的升序比较；形状不同返回 `None`
    pub fn compare(&self, other: &Boundary) -> Option<Ordering> {
        match (self, other) {
            (Boundary::Recency(a), Boundary::Recency(b)) => Some(a.cmp_key(b)),
            (Boundary::Views(a), Boundary::Views(b)) => Some(a.cmp_key(b)),
            (Boundary::Relevance(a), Boundary::Relevance(b)) => Some(a.cmp_key(b)),
            _ => None,
        }
    }

    /// 在降序排列中，`key` 是否严格排在本边界之后
    ///
    /// 即 `k1 < b1 OR (k1 = b1 AND k2 < b2) OR (k1 = b1 AND k2 = b2 AND k3 < b3)`。
    pub fn admits(&self, key: &Boundary) -> bool {
        key.compare(self) == Some(Ordering::Less)
    }

    pub fn news_id(&self) -> i64 {
        match self {
            Boundary::Recency(c) => c.news_id,
            Boundary::Views(c) => c.news_id,
            Boundary::Relevance(c) => c.news_id,
        }
    }
}
