use axum::http::{HeaderValue, Method};
use issue_feed::{
    config::Config,
    metrics,
    models::article::NewArticle,
    routes,
    services::{
        store::{ArticleFilter, ArticleStore, OrderKey, RankStore},
        Database, FeedStores, HttpRecommendationSource, MemoryRankStore,
        MemoryStore, RecommendationSource, StaticRecommendationSource,
        SurrealStore,
    },
    state::AppState,
};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    // 初始化日志
    let filter = EnvFilter::new(&config.log_level);
    if config.log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    info!("Starting issue-feed service ({})...", config.environment);

    let stores = build_stores(&config).await?;
    let rank_store = build_rank_store(&config).await?;
    let recommender = build_recommender(&config)?;

    // 创建应用状态
    let app_state = Arc::new(AppState::new(
        config.clone(),
        stores,
        rank_store,
        recommender,
    ));

    // 启动后台任务
    start_background_tasks(app_state.clone());

    if config.metrics_enabled {
        metrics::install_exporter(config.metrics_port)?;
    }

    // 配置 CORS
    let origins = config
        .cors_allowed_origins
        .split(',')
        .map(|origin| origin.trim().parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(origins);

    let app = routes::app(app_state)
        .layer(cors)
        .layer(CompressionLayer::new());

    // 启动主服务器
    let addr = format!("{}:{}", config.server_host, config.server_port);
    info!("Starting server on http://{}", addr);

    axum::Server::bind(&addr.parse()?)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn load_seed(config: &Config) -> anyhow::Result<Vec<NewArticle>> {
    match &config.seed_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path).await?;
            let articles: Vec<NewArticle> = serde_json::from_str(&raw)?;
            info!("Read {} seed articles from {}", articles.len(), path);
            Ok(articles)
        }
        None => Ok(Vec::new()),
    }
}

async fn build_stores(config: &Config) -> anyhow::Result<FeedStores> {
    let seed = load_seed(config).await?;

    if config.uses_surreal() {
        let db = Database::new(config).await?;
        db.verify_connection().await?;
        db.define_schema().await?;
        let store = SurrealStore::new(Arc::new(db));
        // 只给空库灌种子数据，重启不会重复写入
        let existing = store
            .query(OrderKey::Recency, &ArticleFilter::default(), None, 1)
            .await?;
        if existing.is_empty() {
            let count = seed.len();
            for article in seed {
                store.insert(article).await?;
            }
            info!("Seeded {} articles into SurrealDB", count);
        }
        info!("Using SurrealDB article store");
        return Ok(FeedStores::shared(Arc::new(store)));
    }

    if config.is_production() {
        warn!("Running production with the in-memory article store");
    }

    let store = MemoryStore::new();
    store.seed(seed);
    warn!("Using in-memory article store, data is not persisted");
    Ok(FeedStores::shared(Arc::new(store)))
}

#[cfg(feature = "redis-cache")]
async fn build_rank_store(config: &Config) -> anyhow::Result<Arc<dyn RankStore>> {
    use issue_feed::services::rank_store::RedisRankStore;

    match &config.redis_url {
        Some(url) => {
            let store = RedisRankStore::connect(url, &config.hot_ranking_key).await?;
            Ok(Arc::new(store))
        }
        None => {
            info!("REDIS_URL not set, keeping HOT ranking in memory");
            Ok(Arc::new(MemoryRankStore::new()))
        }
    }
}

#[cfg(not(feature = "redis-cache"))]
async fn build_rank_store(config: &Config) -> anyhow::Result<Arc<dyn RankStore>> {
    if config.redis_url.is_some() {
        warn!("REDIS_URL is set but the binary was built without redis-cache, keeping HOT ranking in memory");
    }
    Ok(Arc::new(MemoryRankStore::new()))
}

fn build_recommender(config: &Config) -> anyhow::Result<Arc<dyn RecommendationSource>> {
    match HttpRecommendationSource::from_config(config)? {
        Some(source) => {
            info!("Recommendation engine enabled");
            Ok(Arc::new(source))
        }
        None => {
            info!("RECOMMEND_URL not set, recommendations disabled");
            Ok(Arc::new(StaticRecommendationSource))
        }
    }
}

fn start_background_tasks(app_state: Arc<AppState>) {
    info!("Starting background tasks...");

    // HOT 排行定时重算；第一次 tick 立即触发，启动时就有排行可读
    let recompute_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(
            recompute_state.config.hot_refresh_interval.max(1),
        ));

        loop {
            interval.tick().await;
            if let Err(e) = recompute_state.recomputer.recompute().await {
                error!("Failed to recompute HOT ranking: {}", e);
            }
        }
    });

    // 清理过期的推荐缓存
    let cleanup_state = app_state.clone();
    tokio::spawn(async move {
        let mut interval = interval(Duration::from_secs(
            cleanup_state.config.recommend_cache_cleanup_interval.max(1),
        ));

        loop {
            interval.tick().await;
            let evicted = cleanup_state.recommender.evict_expired();
            if evicted > 0 {
                debug!("Evicted {} expired recommendation lists", evicted);
            }
        }
    });

    info!("Background tasks started successfully");
}
