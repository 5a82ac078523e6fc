use crate::utils::serde_helpers::numeric_id;
use serde::{Deserialize, Serialize};

/// 推荐服务 `GET {url}{user_id}{params}` 的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(default)]
    pub recommendations: Vec<RecommendedNews>,
    /// 推荐结果生成时间，ISO-8601 字符串，可按字典序比较新旧
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedNews {
    #[serde(with = "numeric_id")]
    pub news_id: i64,
    #[serde(default)]
    pub score: f64,
}
