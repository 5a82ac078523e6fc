use crate::{
    config::Config,
    services::{
        feed::{FeedService, FeedStores},
        rank_cache::{HotRecomputer, HotSettings, RankCache},
        recommendation::RecommendationSource,
        store::RankStore,
    },
    utils::validation::PageLimits,
};
use std::sync::Arc;

/// 应用程序的共享状态
#[derive(Clone)]
pub struct AppState {
    /// 应用配置
    pub config: Config,

    /// 新闻流服务
    pub feed_service: FeedService,

    /// HOT 重算任务，后台定时任务与手动刷新共用同一个实例
    pub recomputer: Arc<HotRecomputer>,

    /// 推荐来源，过期缓存由后台任务定期清理
    pub recommender: Arc<dyn RecommendationSource>,
}

impl AppState {
    pub fn new(
        config: Config,
        stores: FeedStores,
        rank_store: Arc<dyn RankStore>,
        recommender: Arc<dyn RecommendationSource>,
    ) -> Self {
        let cache = RankCache::new(rank_store, config.hot_top_n);
        let recomputer = Arc::new(HotRecomputer::new(
            stores.articles.clone(),
            cache,
            HotSettings::from_config(&config),
        ));

        let feed_service = FeedService::new(
            stores,
            recomputer.clone(),
            recommender.clone(),
            PageLimits::new(config.default_page_size, config.max_page_size),
            config.home_section_size,
        );

        Self {
            config,
            feed_service,
            recomputer,
            recommender,
        }
    }
}
