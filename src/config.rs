use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_format: String,

    // Storage backend: "memory" or "surreal"
    pub store_backend: String,
    pub seed_path: Option<String>,

    // Database configuration
    pub database_url: String,
    pub database_namespace: String,
    pub database_name: String,
    pub database_username: String,
    pub database_password: String,

    // Redis configuration (HOT ranking)
    pub redis_url: Option<String>,
    pub hot_ranking_key: String,

    // HOT recompute
    pub hot_refresh_interval: u64,
    pub hot_top_n: usize,
    pub hot_window_days: i64,
    pub hot_min_views: i64,
    pub hot_min_bookmarks: i64,

    // Paging
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub home_section_size: usize,

    // Recommendation engine
    pub recommend_url: Option<String>,
    pub recommend_params: String,
    pub recommend_timeout_secs: u64,
    pub recommend_cache_ttl_secs: u64,
    pub recommend_cache_cleanup_interval: u64,

    // CORS configuration
    pub cors_allowed_origins: String,

    // Monitoring
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "issue_feed=debug,tower_http=debug".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),

            store_backend: env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string()),
            seed_path: env::var("SEED_PATH").ok(),

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            database_namespace: env::var("DATABASE_NAMESPACE")
                .unwrap_or_else(|_| "myissue".to_string()),
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| "news".to_string()),
            database_username: env::var("DATABASE_USERNAME")
                .unwrap_or_else(|_| "root".to_string()),
            database_password: env::var("DATABASE_PASSWORD")
                .unwrap_or_else(|_| "root".to_string()),

            redis_url: env::var("REDIS_URL").ok(),
            hot_ranking_key: env::var("HOT_RANKING_KEY").unwrap_or_else(|_| "hot:news".to_string()),

            hot_refresh_interval: env::var("HOT_REFRESH_INTERVAL")
                .unwrap_or_else(|_| "1800".to_string())
                .parse()?,
            hot_top_n: env::var("HOT_TOP_N")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            hot_window_days: env::var("HOT_WINDOW_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()?,
            hot_min_views: env::var("HOT_MIN_VIEWS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            hot_min_bookmarks: env::var("HOT_MIN_BOOKMARKS")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,

            default_page_size: env::var("DEFAULT_PAGE_SIZE")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,
            max_page_size: env::var("MAX_PAGE_SIZE")
                .unwrap_or_else(|_| "50".to_string())
                .parse()?,
            home_section_size: env::var("HOME_SECTION_SIZE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            recommend_url: env::var("RECOMMEND_URL").ok(),
            recommend_params: env::var("RECOMMEND_PARAMS").unwrap_or_default(),
            recommend_timeout_secs: env::var("RECOMMEND_TIMEOUT_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
            recommend_cache_ttl_secs: env::var("RECOMMEND_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()?,
            recommend_cache_cleanup_interval: env::var("RECOMMEND_CACHE_CLEANUP_INTERVAL")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),

            metrics_enabled: env::var("METRICS_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()?,
            metrics_port: env::var("METRICS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn uses_surreal(&self) -> bool {
        self.store_backend.eq_ignore_ascii_case("surreal")
    }
}

impl Default for Config {
    /// 与 `from_env` 在没有任何环境变量时得到的值一致
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            environment: "development".to_string(),
            log_level: "issue_feed=debug,tower_http=debug".to_string(),
            log_format: "text".to_string(),
            store_backend: "memory".to_string(),
            seed_path: None,
            database_url: "http://localhost:8000".to_string(),
            database_namespace: "myissue".to_string(),
            database_name: "news".to_string(),
            database_username: "root".to_string(),
            database_password: "root".to_string(),
            redis_url: None,
            hot_ranking_key: "hot:news".to_string(),
            hot_refresh_interval: 1800,
            hot_top_n: 100,
            hot_window_days: 7,
            hot_min_views: 50,
            hot_min_bookmarks: 0,
            default_page_size: 20,
            max_page_size: 50,
            home_section_size: 5,
            recommend_url: None,
            recommend_params: String::new(),
            recommend_timeout_secs: 3,
            recommend_cache_ttl_secs: 86_400,
            recommend_cache_cleanup_interval: 3600,
            cors_allowed_origins: "http://localhost:3001".to_string(),
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}
