use crate::{
    error::{AppError, Result},
    metrics,
    models::{
        article::{ArticleCard, ArticleDetail, Category},
        bookmark::BookmarkToggleResponse,
        cursor::{HotOffsetCursor, RecommendOffsetCursor},
        page::{CursorPage, HomeFeed},
    },
    services::{
        assembler::FeedAssembler,
        bookmark::BookmarkService,
        pager::{KeysetPager, SortOrder},
        rank_cache::{HotRecomputer, RankCache, RecomputeOutcome},
        recommendation::RecommendationSource,
        store::{ArticleStore, BookmarkStore, SearchIndex},
    },
    utils::{
        cursor::CursorCodec,
        validation::{normalize_keyword, PageLimits},
    },
};
use std::sync::Arc;
use tracing::debug;

/// 服务层依赖的三个存储
#[derive(Clone)]
pub struct FeedStores {
    pub articles: Arc<dyn ArticleStore>,
    pub bookmarks: Arc<dyn BookmarkStore>,
    pub search: Arc<dyn SearchIndex>,
}

impl FeedStores {
    /// 同一个实现同时充当三种存储（内存实现、SurrealDB 实现都是如此）
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ArticleStore + BookmarkStore + SearchIndex + 'static,
    {
        Self {
            articles: store.clone(),
            bookmarks: store.clone(),
            search: store,
        }
    }
}

/// 新闻流的对外入口：首页、HOT、最新、分区、检索、推荐、收藏、详情
#[derive(Clone)]
pub struct FeedService {
    articles: Arc<dyn ArticleStore>,
    pager: KeysetPager,
    assembler: FeedAssembler,
    recomputer: Arc<HotRecomputer>,
    recommender: Arc<dyn RecommendationSource>,
    bookmarks: BookmarkService,
    limits: PageLimits,
    home_size: usize,
}

impl FeedService {
    pub fn new(
        stores: FeedStores,
        recomputer: Arc<HotRecomputer>,
        recommender: Arc<dyn RecommendationSource>,
        limits: PageLimits,
        home_size: usize,
    ) -> Self {
        let pager = KeysetPager::new(
            stores.articles.clone(),
            stores.bookmarks.clone(),
            stores.search.clone(),
        );
        let assembler = FeedAssembler::new(stores.articles.clone());
        let bookmarks = BookmarkService::new(stores.articles.clone(), stores.bookmarks);

        Self {
            articles: stores.articles,
            pager,
            assembler,
            recomputer,
            recommender,
            bookmarks,
            limits,
            home_size,
        }
    }

    fn rank_cache(&self) -> &RankCache {
        self.recomputer.cache()
    }

    /// 首页：HOT、推荐、最新各取固定条数
    pub async fn get_home(&self, user_id: Option<i64>) -> Result<HomeFeed> {
        let (hot, recommend, latest) = tokio::try_join!(
            self.home_hot(),
            self.home_recommend(user_id),
            self.pager.page(&SortOrder::Latest, None, self.home_size),
        )?;

        Ok(HomeFeed {
            hot,
            recommend,
            latest: latest.records.iter().map(ArticleCard::from).collect(),
        })
    }

    async fn home_hot(&self) -> Result<Vec<ArticleCard>> {
        let slice = self.rank_cache().page_by_offset(0, self.home_size).await?;
        let articles = self.assembler.assemble(&slice.ids).await?;
        Ok(articles.iter().map(ArticleCard::from).collect())
    }

    async fn home_recommend(&self, user_id: Option<i64>) -> Result<Vec<ArticleCard>> {
        let Some(user_id) = user_id else {
            return Ok(Vec::new());
        };

        let ids = self.recommender.refresh(user_id).await?;
        let top: Vec<i64> = ids.into_iter().take(self.home_size).collect();
        let articles = self.assembler.assemble(&top).await?;
        Ok(articles.iter().map(ArticleCard::from).collect())
    }

    /// HOT 排行缓存的位置翻页
    ///
    /// 游标绑定签发时的排行代数，排行被整代替换后旧游标返回 `FeedRefreshed`。
    pub async fn get_hot(
        &self,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        let size = self.limits.clamp(size);
        let issued = CursorCodec::decode_opt::<HotOffsetCursor>(cursor)?;
        let offset = issued.map_or(0, |c| c.offset);

        let slice = self.rank_cache().page_by_offset(offset, size).await?;

        // 代数先于空排行判断：旧游标遇到被清空的新一代同样要求重新翻页
        if let Some(issued) = issued {
            if issued.generation != slice.generation {
                return Err(AppError::FeedRefreshed {
                    issued: issued.generation,
                    current: slice.generation,
                });
            }
        }

        if slice.total == 0 {
            debug!("HOT rank cache is empty, serving an empty page");
            metrics::record_hot_cache_empty();
            return Ok(CursorPage::empty());
        }

        if offset > slice.total {
            return Err(AppError::malformed_cursor(format!(
                "HOT offset {} is past the {} ranked entries",
                offset, slice.total
            )));
        }

        let next_offset = offset.saturating_add(slice.ids.len());
        let next_cursor = if next_offset < slice.total {
            Some(CursorCodec::encode(&HotOffsetCursor {
                offset: next_offset,
                generation: slice.generation,
            })?)
        } else {
            None
        };

        let articles = self.assembler.assemble(&slice.ids).await?;
        debug!(
            "HOT page at offset {} (generation {}): {} of {} ranked",
            offset,
            slice.generation,
            articles.len(),
            slice.total
        );

        Ok(CursorPage::new(
            articles.iter().map(ArticleCard::from).collect(),
            next_cursor,
        ))
    }

    /// 按浏览量直查主存储的 HOT
    pub async fn get_most_viewed(
        &self,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        self.pager
            .fetch(&SortOrder::MostViewed, cursor, self.limits.clamp(size))
            .await
    }

    pub async fn get_latest(
        &self,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        self.pager
            .fetch(&SortOrder::Latest, cursor, self.limits.clamp(size))
            .await
    }

    pub async fn get_by_category(
        &self,
        category: Category,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        self.pager
            .fetch(&SortOrder::Category(category), cursor, self.limits.clamp(size))
            .await
    }

    /// 有检索词按相关度排序；没有检索词时等同于最新（或分区最新）
    pub async fn search(
        &self,
        keyword: Option<&str>,
        category: Option<Category>,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        let order = SortOrder::for_search(normalize_keyword(keyword), category);
        self.pager
            .fetch(&order, cursor, self.limits.clamp(size))
            .await
    }

    /// 推荐列表的位置翻页
    pub async fn get_recommended(
        &self,
        user_id: i64,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        let size = self.limits.clamp(size);
        let start = CursorCodec::decode_opt::<RecommendOffsetCursor>(cursor)?
            .map_or(0, |c| c.rec_offset);

        let ids = self.recommender.recommended_ids(user_id).await?;
        if start >= ids.len() {
            return Ok(CursorPage::empty());
        }

        let end = (start + size).min(ids.len());
        let articles = self.assembler.assemble(&ids[start..end]).await?;

        let next_cursor = if end < ids.len() {
            Some(CursorCodec::encode(&RecommendOffsetCursor { rec_offset: end })?)
        } else {
            None
        };

        Ok(CursorPage::new(
            articles.iter().map(ArticleCard::from).collect(),
            next_cursor,
        ))
    }

    pub async fn get_bookmarks(
        &self,
        user_id: i64,
        cursor: Option<&str>,
        size: Option<i64>,
    ) -> Result<CursorPage<ArticleCard>> {
        self.pager
            .bookmarks(user_id, cursor, self.limits.clamp(size))
            .await
    }

    /// 详情：浏览量 +1，并标记当前用户是否已收藏
    pub async fn get_detail(&self, article_id: i64, user_id: Option<i64>) -> Result<ArticleDetail> {
        let article = self
            .articles
            .increment_views(article_id)
            .await?
            .ok_or_else(|| AppError::not_found("News"))?;

        let is_scraped = match user_id {
            Some(user_id) => self.bookmarks.is_bookmarked(user_id, article_id).await?,
            None => false,
        };

        Ok(ArticleDetail::new(article, is_scraped))
    }

    pub async fn toggle_bookmark(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<BookmarkToggleResponse> {
        self.bookmarks.toggle(user_id, article_id).await
    }

    /// 立即重算 HOT 排行
    pub async fn refresh_hot(&self) -> Result<RecomputeOutcome> {
        self.recomputer.recompute().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::NewArticle;
    use crate::services::memory::MemoryStore;
    use crate::services::rank_cache::HotSettings;
    use crate::services::rank_store::MemoryRankStore;
    use crate::services::recommendation::StaticRecommendationSource;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    struct FixedRecommendations(Vec<i64>);

    #[async_trait]
    impl RecommendationSource for FixedRecommendations {
        async fn refresh(&self, _user_id: i64) -> Result<Vec<i64>> {
            Ok(self.0.clone())
        }

        async fn recommended_ids(&self, _user_id: i64) -> Result<Vec<i64>> {
            Ok(self.0.clone())
        }
    }

    fn seed(store: &MemoryStore, n: i64) {
        let now = Utc::now();
        for i in 1..=n {
            store.insert(NewArticle {
                title: format!("기사 {}", i),
                category: if i % 2 == 0 { Category::Economy } else { Category::World },
                newspaper: "한겨레".to_string(),
                author: String::new(),
                published_at: now - Duration::minutes(n - i),
                view_count: 50 + i * 10,
                bookmark_count: 0,
                body: String::new(),
                thumbnail: None,
            });
        }
    }

    fn service(store: &MemoryStore, recommender: Arc<dyn RecommendationSource>) -> FeedService {
        let shared = Arc::new(store.clone());
        let cache = RankCache::new(Arc::new(MemoryRankStore::new()), 100);
        let recomputer = Arc::new(HotRecomputer::new(
            shared.clone(),
            cache,
            HotSettings::default(),
        ));
        FeedService::new(
            FeedStores::shared(shared),
            recomputer,
            recommender,
            PageLimits::new(20, 50),
            5,
        )
    }

    fn ids(page: &CursorPage<ArticleCard>) -> Vec<i64> {
        page.items.iter().map(|c| c.news_id).collect()
    }

    #[tokio::test]
    async fn test_hot_is_empty_before_first_recompute() {
        let store = MemoryStore::new();
        seed(&store, 3);
        let feed = service(&store, Arc::new(StaticRecommendationSource));

        let page = feed.get_hot(None, None).await.unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn test_hot_pages_by_offset_and_detects_refresh() {
        let store = MemoryStore::new();
        seed(&store, 12);
        let feed = service(&store, Arc::new(StaticRecommendationSource));
        feed.refresh_hot().await.unwrap();

        let first = feed.get_hot(None, Some(5)).await.unwrap();
        assert_eq!(first.items.len(), 5);
        let second = feed
            .get_hot(first.next_cursor.as_deref(), Some(5))
            .await
            .unwrap();
        let third = feed
            .get_hot(second.next_cursor.as_deref(), Some(5))
            .await
            .unwrap();
        assert_eq!(third.items.len(), 2);
        assert!(!third.has_next);

        let mut all = ids(&first);
        all.extend(ids(&second));
        all.extend(ids(&third));
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 12);

        feed.refresh_hot().await.unwrap();
        let err = feed
            .get_hot(first.next_cursor.as_deref(), Some(5))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::FeedRefreshed {
                issued: 1,
                current: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_hot_cursor_into_emptied_ranking_is_refreshed() {
        let store = MemoryStore::new();
        seed(&store, 6);
        let feed = service(&store, Arc::new(StaticRecommendationSource));
        feed.refresh_hot().await.unwrap();

        let first = feed.get_hot(None, Some(3)).await.unwrap();
        assert!(first.has_next);

        for id in 1..=6 {
            store.remove(id);
        }
        match feed.refresh_hot().await.unwrap() {
            RecomputeOutcome::Completed(summary) => {
                assert_eq!(summary.generation, 2);
                assert_eq!(summary.size, 0);
            }
            RecomputeOutcome::Skipped => panic!("recompute was skipped"),
        }

        let err = feed
            .get_hot(first.next_cursor.as_deref(), Some(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::FeedRefreshed {
                issued: 1,
                current: 2
            }
        ));

        let restarted = feed.get_hot(None, Some(3)).await.unwrap();
        assert!(restarted.items.is_empty());
        assert!(!restarted.has_next);
    }

    #[tokio::test]
    async fn test_hot_offset_past_ranking_is_rejected() {
        let store = MemoryStore::new();
        seed(&store, 6);
        let feed = service(&store, Arc::new(StaticRecommendationSource));
        feed.refresh_hot().await.unwrap();

        let forged = CursorCodec::encode(&HotOffsetCursor {
            offset: usize::MAX,
            generation: 1,
        })
        .unwrap();
        let err = feed.get_hot(Some(&forged), Some(3)).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedCursor(_)));
    }

    #[tokio::test]
    async fn test_page_size_is_clamped() {
        let store = MemoryStore::new();
        seed(&store, 60);
        let feed = service(&store, Arc::new(StaticRecommendationSource));

        assert_eq!(feed.get_latest(None, None).await.unwrap().items.len(), 20);
        assert_eq!(feed.get_latest(None, Some(0)).await.unwrap().items.len(), 20);
        assert_eq!(feed.get_latest(None, Some(500)).await.unwrap().items.len(), 50);
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_reported() {
        let store = MemoryStore::new();
        seed(&store, 3);
        let feed = service(&store, Arc::new(StaticRecommendationSource));

        assert!(matches!(
            feed.get_latest(Some("%%%"), None).await,
            Err(AppError::MalformedCursor(_))
        ));
        assert!(matches!(
            feed.get_hot(Some(""), None).await,
            Err(AppError::MalformedCursor(_))
        ));
    }

    #[tokio::test]
    async fn test_home_sections() {
        let store = MemoryStore::new();
        seed(&store, 10);
        let feed = service(&store, Arc::new(FixedRecommendations(vec![3, 99, 1])));
        feed.refresh_hot().await.unwrap();

        let anonymous = feed.get_home(None).await.unwrap();
        assert_eq!(anonymous.hot.len(), 5);
        assert!(anonymous.recommend.is_empty());
        assert_eq!(
            anonymous.latest.iter().map(|c| c.news_id).collect::<Vec<_>>(),
            vec![10, 9, 8, 7, 6]
        );

        let home = feed.get_home(Some(1)).await.unwrap();
        assert_eq!(
            home.recommend.iter().map(|c| c.news_id).collect::<Vec<_>>(),
            vec![3, 1]
        );
    }

    #[tokio::test]
    async fn test_recommended_pages_by_offset() {
        let store = MemoryStore::new();
        seed(&store, 10);
        let feed = service(&store, Arc::new(FixedRecommendations(vec![9, 7, 5, 3, 1])));

        let first = feed.get_recommended(1, None, Some(2)).await.unwrap();
        assert_eq!(ids(&first), vec![9, 7]);
        let second = feed
            .get_recommended(1, first.next_cursor.as_deref(), Some(2))
            .await
            .unwrap();
        assert_eq!(ids(&second), vec![5, 3]);
        let third = feed
            .get_recommended(1, second.next_cursor.as_deref(), Some(2))
            .await
            .unwrap();
        assert_eq!(ids(&third), vec![1]);
        assert!(!third.has_next);
    }

    #[tokio::test]
    async fn test_detail_counts_view_and_bookmark_flag() {
        let store = MemoryStore::new();
        seed(&store, 2);
        let feed = service(&store, Arc::new(StaticRecommendationSource));

        let before = feed.get_detail(1, None).await.unwrap();
        feed.toggle_bookmark(4, 1).await.unwrap();
        let after = feed.get_detail(1, Some(4)).await.unwrap();

        assert_eq!(after.views, before.views + 1);
        assert!(after.is_scraped);
        assert_eq!(after.scrap_count, 1);
        assert!(!feed.get_detail(1, Some(5)).await.unwrap().is_scraped);

        assert!(matches!(
            feed.get_detail(77, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_without_keyword_matches_category_feed() {
        let store = MemoryStore::new();
        seed(&store, 8);
        let feed = service(&store, Arc::new(StaticRecommendationSource));

        let by_search = feed
            .search(Some("  "), Some(Category::Economy), None, Some(3))
            .await
            .unwrap();
        let by_category = feed
            .get_by_category(Category::Economy, None, Some(3))
            .await
            .unwrap();
        assert_eq!(by_search, by_category);
        assert_eq!(ids(&by_search), vec![8, 6, 4]);
    }
}
