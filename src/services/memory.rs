use crate::error::{AppError, Result};
use crate::models::{
    article::{Article, HotCandidate, NewArticle},
    bookmark::Bookmark,
    cursor::{Boundary, RelevanceCursor},
};
use crate::services::store::{
    ArticleFilter, ArticleStore, BookmarkStore, OrderKey, SearchHit, SearchIndex, SearchRequest,
};
use crate::utils::validation::tokenize;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// 标题命中的权重高于正文
const TITLE_WEIGHT: f64 = 2.0;
const BODY_WEIGHT: f64 = 1.0;

#[derive(Debug, Default)]
struct Inner {
    articles: BTreeMap<i64, Article>,
    bookmarks: BTreeMap<i64, Bookmark>,
    next_article_id: i64,
    next_bookmark_id: i64,
}

/// 进程内的文章/收藏存储与检索，用于本地开发和测试
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入新文章并分配递增 id
    pub fn insert(&self, article: NewArticle) -> Article {
        let mut inner = self.inner.write();
        inner.next_article_id += 1;
        let article = article.into_article(inner.next_article_id);
        inner.articles.insert(article.id, article.clone());
        article
    }

    pub fn seed(&self, articles: Vec<NewArticle>) -> usize {
        let count = articles.len();
        for article in articles {
            self.insert(article);
        }
        debug!("Seeded {} articles into memory store", count);
        count
    }

    /// 按给定 id 写入或覆盖（时间戳同样规整到秒）
    pub fn put(&self, mut article: Article) {
        article.published_at = crate::models::article::truncate_to_seconds(article.published_at);
        let mut inner = self.inner.write();
        inner.next_article_id = inner.next_article_id.max(article.id);
        inner.articles.insert(article.id, article);
    }

    pub fn remove(&self, id: i64) -> Option<Article> {
        self.inner.write().articles.remove(&id)
    }
}

fn descending(a: &Boundary, b: &Boundary) -> Ordering {
    b.compare(a).unwrap_or(Ordering::Equal)
}

fn relevance(tokens: &[String], article: &Article) -> f64 {
    let title = article.title.to_lowercase();
    let body = article.body.to_lowercase();

    tokens
        .iter()
        .map(|token| {
            TITLE_WEIGHT * title.matches(token.as_str()).count() as f64
                + BODY_WEIGHT * body.matches(token.as_str()).count() as f64
        })
        .sum()
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn query(
        &self,
        order: OrderKey,
        filter: &ArticleFilter,
        boundary: Option<&Boundary>,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let inner = self.inner.read();

        let mut rows: Vec<(Boundary, &Article)> = inner
            .articles
            .values()
            .filter(|a| filter.matches(a))
            .map(|a| (order.key_of(a), a))
            .filter(|(key, _)| boundary.map_or(true, |b| b.admits(key)))
            .collect();

        rows.sort_by(|a, b| descending(&a.0, &b.0));

        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, a)| a.clone())
            .collect())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        let inner = self.inner.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.articles.get(id).cloned())
            .collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        Ok(self.inner.read().articles.get(&id).cloned())
    }

    async fn increment_views(&self, id: i64) -> Result<Option<Article>> {
        let mut inner = self.inner.write();
        Ok(inner.articles.get_mut(&id).map(|article| {
            article.view_count += 1;
            article.clone()
        }))
    }

    async fn hot_candidates(
        &self,
        since: DateTime<Utc>,
        min_views: i64,
        min_bookmarks: i64,
    ) -> Result<Vec<HotCandidate>> {
        let inner = self.inner.read();
        Ok(inner
            .articles
            .values()
            .filter(|a| {
                a.published_at >= since
                    && a.view_count >= min_views
                    && a.bookmark_count >= min_bookmarks
            })
            .map(HotCandidate::from)
            .collect())
    }
}

#[async_trait]
impl BookmarkStore for MemoryStore {
    async fn find_bookmark(&self, user_id: i64, article_id: i64) -> Result<Option<Bookmark>> {
        let inner = self.inner.read();
        Ok(inner
            .bookmarks
            .values()
            .find(|b| b.user_id == user_id && b.article_id == article_id)
            .cloned())
    }

    async fn insert_bookmark(&self, user_id: i64, article_id: i64) -> Result<Bookmark> {
        let mut inner = self.inner.write();

        if let Some(existing) = inner
            .bookmarks
            .values()
            .find(|b| b.user_id == user_id && b.article_id == article_id)
        {
            return Ok(existing.clone());
        }

        let article = inner
            .articles
            .get_mut(&article_id)
            .ok_or_else(|| AppError::not_found("News"))?;
        article.bookmark_count += 1;

        inner.next_bookmark_id += 1;
        let bookmark = Bookmark {
            id: inner.next_bookmark_id,
            user_id,
            article_id,
            created_at: crate::models::article::truncate_to_seconds(Utc::now()),
        };
        inner.bookmarks.insert(bookmark.id, bookmark.clone());
        Ok(bookmark)
    }

    async fn delete_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.bookmarks.remove(&bookmark.id).is_some() {
            if let Some(article) = inner.articles.get_mut(&bookmark.article_id) {
                article.bookmark_count = (article.bookmark_count - 1).max(0);
            }
        }
        Ok(())
    }

    async fn bookmarks_page(
        &self,
        user_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Bookmark>> {
        let inner = self.inner.read();
        let upper = before.unwrap_or(i64::MAX);

        Ok(inner
            .bookmarks
            .range(..upper)
            .rev()
            .map(|(_, b)| b)
            .filter(|b| b.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SearchIndex for MemoryStore {
    async fn search(
        &self,
        request: &SearchRequest,
        boundary: Option<&RelevanceCursor>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let tokens = tokenize(&request.keyword);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let boundary = boundary.copied().map(Boundary::Relevance);
        let inner = self.inner.read();

        let mut hits: Vec<SearchHit> = inner
            .articles
            .values()
            .filter(|a| request.category.map_or(true, |c| a.category == c))
            .filter_map(|a| {
                let score = relevance(&tokens, a);
                (score > 0.0).then(|| SearchHit {
                    news_id: a.id,
                    score,
                    published_sec: a.published_sec(),
                })
            })
            .filter(|hit| {
                boundary
                    .as_ref()
                    .map_or(true, |b| b.admits(&Boundary::Relevance(hit.key())))
            })
            .collect();

        hits.sort_by(|a, b| {
            descending(&Boundary::Relevance(a.key()), &Boundary::Relevance(b.key()))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::Category;
    use crate::models::cursor::LatestCursor;
    use chrono::TimeZone;

    fn new_article(title: &str, category: Category, sec: i64, views: i64) -> NewArticle {
        NewArticle {
            title: title.to_string(),
            category,
            newspaper: "연합뉴스".to_string(),
            author: "기자".to_string(),
            published_at: Utc.timestamp_opt(sec, 0).unwrap(),
            view_count: views,
            bookmark_count: 0,
            body: String::new(),
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_query_respects_strict_boundary_and_filter() {
        let store = MemoryStore::new();
        store.insert(new_article("a", Category::Economy, 100, 0));
        store.insert(new_article("b", Category::Politics, 100, 0));
        store.insert(new_article("c", Category::Economy, 200, 0));

        let boundary = Boundary::Recency(LatestCursor {
            published_sec: 100,
            news_id: 2,
        });
        let rows = store
            .query(OrderKey::Recency, &ArticleFilter::default(), Some(&boundary), 10)
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);

        let economy = store
            .query(
                OrderKey::Recency,
                &ArticleFilter::category(Category::Economy),
                None,
                10,
            )
            .await
            .unwrap();
        assert_eq!(economy.iter().map(|a| a.id).collect::<Vec<_>>(), vec![3, 1]);
    }

    #[tokio::test]
    async fn test_bookmark_toggle_adjusts_counter() {
        let store = MemoryStore::new();
        let article = store.insert(new_article("a", Category::World, 100, 0));

        let bookmark = store.insert_bookmark(7, article.id).await.unwrap();
        let again = store.insert_bookmark(7, article.id).await.unwrap();
        assert_eq!(bookmark.id, again.id);
        assert_eq!(store.find_by_id(article.id).await.unwrap().unwrap().bookmark_count, 1);

        store.delete_bookmark(&bookmark).await.unwrap();
        store.delete_bookmark(&bookmark).await.unwrap();
        assert_eq!(store.find_by_id(article.id).await.unwrap().unwrap().bookmark_count, 0);
        assert!(store.find_bookmark(7, article.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_bookmark_on_missing_article_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert_bookmark(1, 999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_weights_title_over_body() {
        let store = MemoryStore::new();
        let mut in_body = new_article("경제 동향", Category::Economy, 100, 0);
        in_body.body = "금리 인상".to_string();
        store.insert(in_body);
        store.insert(new_article("금리 결정", Category::Economy, 50, 0));
        store.insert(new_article("날씨", Category::Society, 300, 0));

        let hits = store
            .search(
                &SearchRequest {
                    keyword: "금리".to_string(),
                    category: None,
                },
                None,
                10,
            )
            .await
            .unwrap();

        assert_eq!(hits.iter().map(|h| h.news_id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(hits[0].score, 2.0);
        assert_eq!(hits[1].score, 1.0);
    }
}
