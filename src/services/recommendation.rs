use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::recommendation::RecommendationResponse;
use crate::utils::cache::TtlCache;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// 用户推荐列表在本地缓存的默认时长
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// 预先计算好的个性化推荐列表
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    /// 向推荐服务拉取最新列表，仅当上游时间戳更新时替换本地缓存，返回当前缓存的列表
    async fn refresh(&self, user_id: i64) -> Result<Vec<i64>>;

    /// 已缓存的列表；没有缓存时等同于 `refresh`
    async fn recommended_ids(&self, user_id: i64) -> Result<Vec<i64>>;

    /// 清掉已过期的本地缓存，返回清掉的用户数
    fn evict_expired(&self) -> usize {
        0
    }
}

/// 推荐服务未配置时使用，永远返回空列表
#[derive(Debug, Clone, Default)]
pub struct StaticRecommendationSource;

#[async_trait]
impl RecommendationSource for StaticRecommendationSource {
    async fn refresh(&self, _user_id: i64) -> Result<Vec<i64>> {
        Ok(Vec::new())
    }

    async fn recommended_ids(&self, _user_id: i64) -> Result<Vec<i64>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CachedList {
    ids: Vec<i64>,
    timestamp: Option<String>,
}

impl CachedList {
    /// ISO-8601 时间戳按字典序比较；任一方缺失时间戳都以上游为准
    fn is_superseded_by(&self, upstream: Option<&str>) -> bool {
        match (self.timestamp.as_deref(), upstream) {
            (Some(cached), Some(fresh)) => fresh > cached,
            _ => true,
        }
    }
}

/// 推荐服务 HTTP 客户端
#[derive(Clone)]
pub struct HttpRecommendationSource {
    client: reqwest::Client,
    base_url: String,
    params: String,
    cache: TtlCache<i64, CachedList>,
}

impl HttpRecommendationSource {
    pub fn new(base_url: &str, params: &str, timeout: Duration) -> Result<Self> {
        // 用户 id 直接拼在 base_url 之后，这里只校验它本身是合法 URL
        Url::parse(base_url)
            .map_err(|e| AppError::Internal(format!("Invalid RECOMMEND_URL {}: {}", base_url, e)))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            params: params.to_string(),
            cache: TtlCache::new(DEFAULT_CACHE_TTL),
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = TtlCache::new(ttl);
        self
    }

    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        match &config.recommend_url {
            Some(url) if !url.trim().is_empty() => Ok(Some(
                Self::new(
                    url.trim(),
                    &config.recommend_params,
                    Duration::from_secs(config.recommend_timeout_secs),
                )?
                .with_cache_ttl(Duration::from_secs(config.recommend_cache_ttl_secs)),
            )),
            _ => Ok(None),
        }
    }

    fn endpoint(&self, user_id: i64) -> String {
        format!("{}{}{}", self.base_url, user_id, self.params)
    }

    async fn fetch(&self, user_id: i64) -> Result<RecommendationResponse> {
        let url = self.endpoint(user_id);
        debug!("Fetching recommendations from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<RecommendationResponse>()
            .await?;

        Ok(response)
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommendationSource {
    async fn refresh(&self, user_id: i64) -> Result<Vec<i64>> {
        let response = self.fetch(user_id).await.map_err(|e| {
            warn!("Recommendation fetch failed for user {}: {}", user_id, e);
            e
        })?;

        if response.recommendations.is_empty() {
            debug!("Recommender returned nothing for user {}", user_id);
            return Ok(Vec::new());
        }

        let cached = self.cache.get(&user_id);
        let needs_update = cached
            .as_ref()
            .map_or(true, |c| c.is_superseded_by(response.timestamp.as_deref()));

        if !needs_update {
            if let Some(cached) = cached {
                return Ok(cached.ids);
            }
        }

        let fresh = CachedList {
            ids: response.recommendations.iter().map(|r| r.news_id).collect(),
            timestamp: response.timestamp,
        };
        info!(
            "Cached {} recommendations for user {} (timestamp {:?})",
            fresh.ids.len(),
            user_id,
            fresh.timestamp
        );
        self.cache.set(user_id, fresh.clone());
        Ok(fresh.ids)
    }

    async fn recommended_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        match self.cache.get(&user_id) {
            Some(cached) => Ok(cached.ids),
            None => self.refresh(user_id).await,
        }
    }

    fn evict_expired(&self) -> usize {
        self.cache.cleanup_expired()
    }
}
