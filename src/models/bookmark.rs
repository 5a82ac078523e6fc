use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户收藏（scrap），(user_id, article_id) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// 单调递增，收藏流按它倒序翻页
    pub id: i64,
    pub user_id: i64,
    pub article_id: i64,
    pub created_at: DateTime<Utc>,
}

/// 收藏/取消收藏的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkToggleResponse {
    pub scrapped: bool,
    pub scrap_id: Option<i64>,
}
