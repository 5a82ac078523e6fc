use crate::models::article::ArticleCard;
use serde::{Deserialize, Serialize};

/// 游标分页响应，`next_cursor` 存在当且仅当 `has_next`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_next: bool,
}

impl<T> CursorPage<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        let has_next = next_cursor.is_some();
        Self {
            items,
            next_cursor,
            has_next,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), None)
    }
}

/// 首页三段：HOT、推荐、最新
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeFeed {
    pub hot: Vec<ArticleCard>,
    pub recommend: Vec<ArticleCard>,
    pub latest: Vec<ArticleCard>,
}
