//! SurrealDB 上的文章/收藏存储与全文检索。
//!
//! 边界条件在 SurrealQL 中展开为严格的字典序比较，排序键与内存实现一致。

use crate::error::{AppError, Result};
use crate::models::{
    article::{from_epoch_seconds, Article, Category, HotCandidate, NewArticle},
    bookmark::Bookmark,
    cursor::{Boundary, RelevanceCursor},
};
use crate::services::database::Database;
use crate::services::store::{
    ArticleFilter, ArticleStore, BookmarkStore, OrderKey, SearchHit, SearchIndex, SearchRequest,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

/// 标题命中的权重
const TITLE_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NewsRecord {
    news_id: i64,
    title: String,
    category: Category,
    #[serde(default)]
    newspaper: String,
    #[serde(default)]
    author: String,
    published_sec: i64,
    #[serde(default)]
    view_count: i64,
    #[serde(default)]
    bookmark_count: i64,
    #[serde(default)]
    body: String,
    thumbnail: Option<String>,
}

impl From<NewsRecord> for Article {
    fn from(r: NewsRecord) -> Self {
        Article {
            id: r.news_id,
            title: r.title,
            category: r.category,
            newspaper: r.newspaper,
            author: r.author,
            published_at: from_epoch_seconds(r.published_sec),
            view_count: r.view_count,
            bookmark_count: r.bookmark_count,
            body: r.body,
            thumbnail: r.thumbnail,
        }
    }
}

impl From<&Article> for NewsRecord {
    fn from(a: &Article) -> Self {
        NewsRecord {
            news_id: a.id,
            title: a.title.clone(),
            category: a.category,
            newspaper: a.newspaper.clone(),
            author: a.author.clone(),
            published_sec: a.published_sec(),
            view_count: a.view_count,
            bookmark_count: a.bookmark_count,
            body: a.body.clone(),
            thumbnail: a.thumbnail.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateRecord {
    news_id: i64,
    published_sec: i64,
    view_count: i64,
    bookmark_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScrapRecord {
    scrap_id: i64,
    user_id: i64,
    news_id: i64,
    created_at_sec: i64,
}

impl From<ScrapRecord> for Bookmark {
    fn from(r: ScrapRecord) -> Self {
        Bookmark {
            id: r.scrap_id,
            user_id: r.user_id,
            article_id: r.news_id,
            created_at: from_epoch_seconds(r.created_at_sec),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HitRecord {
    news_id: i64,
    published_sec: i64,
    score: f64,
}

/// 一条查询的 WHERE 片段与参数
#[derive(Debug, Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Map<String, Value>,
}

impl Conditions {
    fn push(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    fn bind(&mut self, name: &str, value: impl Into<Value>) {
        self.params.insert(name.to_string(), value.into());
    }

    fn category(&mut self, category: Option<Category>) {
        if let Some(category) = category {
            self.push("category = $category");
            self.bind("category", category.as_str());
        }
    }

    /// 严格边界：`k1 < b1 OR (k1 = b1 AND k2 < b2) OR ...`
    fn boundary(&mut self, boundary: &Boundary) {
        match boundary {
            Boundary::Recency(c) => {
                self.push(
                    "(published_sec < $b_sec OR (published_sec = $b_sec AND news_id < $b_id))",
                );
                self.bind("b_sec", c.published_sec);
                self.bind("b_id", c.news_id);
            }
            Boundary::Views(c) => {
                self.push(
                    "(view_count < $b_views \
                     OR (view_count = $b_views AND published_sec < $b_sec) \
                     OR (view_count = $b_views AND published_sec = $b_sec AND news_id < $b_id))",
                );
                self.bind("b_views", c.views);
                self.bind("b_sec", c.published_sec);
                self.bind("b_id", c.news_id);
            }
            Boundary::Relevance(c) => {
                self.push(
                    "(score < $b_score \
                     OR (score = $b_score AND published_sec < $b_sec) \
                     OR (score = $b_score AND published_sec = $b_sec AND news_id < $b_id))",
                );
                self.bind("b_score", c.score);
                self.bind("b_sec", c.published_sec);
                self.bind("b_id", c.news_id);
            }
        }
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn into_params(self) -> Value {
        Value::Object(self.params)
    }
}

fn order_by(order: OrderKey) -> &'static str {
    match order {
        OrderKey::Recency => "ORDER BY published_sec DESC, news_id DESC",
        OrderKey::Views => "ORDER BY view_count DESC, published_sec DESC, news_id DESC",
    }
}

#[derive(Clone)]
pub struct SurrealStore {
    db: Arc<Database>,
}

impl SurrealStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 采集侧写入新文章，id 由计数器分配
    pub async fn insert(&self, article: NewArticle) -> Result<Article> {
        let id = self.db.next_sequence("news").await?;
        let article = article.into_article(id);

        self.db
            .query_with_params(
                "CREATE type::thing('news', $id) CONTENT $record",
                json!({ "id": id, "record": NewsRecord::from(&article) }),
            )
            .await?
            .check()?;

        Ok(article)
    }

    async fn select_news(&self, sql: &str, params: Value) -> Result<Vec<Article>> {
        let mut response = self.db.query_with_params(sql, params).await?;
        let records: Vec<NewsRecord> = response.take(0)?;
        Ok(records.into_iter().map(Article::from).collect())
    }
}

#[async_trait]
impl ArticleStore for SurrealStore {
    async fn query(
        &self,
        order: OrderKey,
        filter: &ArticleFilter,
        boundary: Option<&Boundary>,
        limit: usize,
    ) -> Result<Vec<Article>> {
        let mut conditions = Conditions::default();
        conditions.category(filter.category);
        if let Some(boundary) = boundary {
            conditions.boundary(boundary);
        }

        let sql = format!(
            "SELECT * FROM news {} {} LIMIT {}",
            conditions.where_clause(),
            order_by(order),
            limit
        );
        self.select_news(&sql, conditions.into_params()).await
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Article>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select_news(
            "SELECT * FROM news WHERE news_id IN $ids",
            json!({ "ids": ids }),
        )
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Article>> {
        let rows = self
            .select_news(
                "SELECT * FROM news WHERE news_id = $id LIMIT 1",
                json!({ "id": id }),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn increment_views(&self, id: i64) -> Result<Option<Article>> {
        let rows = self
            .select_news(
                "UPDATE news SET view_count += 1 WHERE news_id = $id RETURN AFTER",
                json!({ "id": id }),
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn hot_candidates(
        &self,
        since: DateTime<Utc>,
        min_views: i64,
        min_bookmarks: i64,
    ) -> Result<Vec<HotCandidate>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT news_id, published_sec, view_count, bookmark_count FROM news \
                 WHERE published_sec >= $since AND view_count >= $min_views \
                 AND bookmark_count >= $min_bookmarks",
                json!({
                    "since": since.timestamp(),
                    "min_views": min_views,
                    "min_bookmarks": min_bookmarks,
                }),
            )
            .await?;

        let records: Vec<CandidateRecord> = response.take(0)?;
        Ok(records
            .into_iter()
            .map(|r| HotCandidate {
                news_id: r.news_id,
                published_at: from_epoch_seconds(r.published_sec),
                view_count: r.view_count,
                bookmark_count: r.bookmark_count,
            })
            .collect())
    }
}

#[async_trait]
impl BookmarkStore for SurrealStore {
    async fn find_bookmark(&self, user_id: i64, article_id: i64) -> Result<Option<Bookmark>> {
        let mut response = self
            .db
            .query_with_params(
                "SELECT * FROM news_scrap WHERE user_id = $user_id AND news_id = $news_id LIMIT 1",
                json!({ "user_id": user_id, "news_id": article_id }),
            )
            .await?;
        let records: Vec<ScrapRecord> = response.take(0)?;
        Ok(records.into_iter().next().map(Bookmark::from))
    }

    async fn insert_bookmark(&self, user_id: i64, article_id: i64) -> Result<Bookmark> {
        if let Some(existing) = self.find_bookmark(user_id, article_id).await? {
            return Ok(existing);
        }
        if self.find_by_id(article_id).await?.is_none() {
            return Err(AppError::not_found("News"));
        }

        let record = ScrapRecord {
            scrap_id: self.db.next_sequence("news_scrap").await?,
            user_id,
            news_id: article_id,
            created_at_sec: Utc::now().timestamp(),
        };

        self.db
            .query_with_params(
                "BEGIN TRANSACTION; \
                 CREATE news_scrap CONTENT $record; \
                 UPDATE news SET bookmark_count += 1 WHERE news_id = $news_id; \
                 COMMIT TRANSACTION;",
                json!({ "record": &record, "news_id": article_id }),
            )
            .await?
            .check()?;

        debug!("Created scrap {} for user {}", record.scrap_id, user_id);
        Ok(Bookmark::from(record))
    }

    async fn delete_bookmark(&self, bookmark: &Bookmark) -> Result<()> {
        self.db
            .query_with_params(
                "BEGIN TRANSACTION; \
                 LET $removed = (DELETE news_scrap WHERE scrap_id = $scrap_id RETURN BEFORE); \
                 IF array::len($removed) > 0 THEN \
                     (UPDATE news SET bookmark_count = math::max([bookmark_count - 1, 0]) WHERE news_id = $news_id) \
                 END; \
                 COMMIT TRANSACTION;",
                json!({ "scrap_id": bookmark.id, "news_id": bookmark.article_id }),
            )
            .await?
            .check()?;
        Ok(())
    }

    async fn bookmarks_page(
        &self,
        user_id: i64,
        before: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Bookmark>> {
        let mut conditions = Conditions::default();
        conditions.push("user_id = $user_id");
        conditions.bind("user_id", user_id);
        if let Some(before) = before {
            conditions.push("scrap_id < $before");
            conditions.bind("before", before);
        }

        let sql = format!(
            "SELECT * FROM news_scrap {} ORDER BY scrap_id DESC LIMIT {}",
            conditions.where_clause(),
            limit
        );
        let mut response = self
            .db
            .query_with_params(&sql, conditions.into_params())
            .await?;
        let records: Vec<ScrapRecord> = response.take(0)?;
        Ok(records.into_iter().map(Bookmark::from).collect())
    }
}

#[async_trait]
impl SearchIndex for SurrealStore {
    async fn search(
        &self,
        request: &SearchRequest,
        boundary: Option<&RelevanceCursor>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut inner = Conditions::default();
        inner.push("(title @1@ $keyword OR body @2@ $keyword)");
        inner.bind("keyword", request.keyword.as_str());
        inner.category(request.category);

        let mut outer = Conditions::default();
        if let Some(boundary) = boundary {
            outer.boundary(&Boundary::Relevance(*boundary));
        }

        let sql = format!(
            "SELECT * FROM (\
                SELECT news_id, published_sec, \
                       (search::score(1) * {} + search::score(2)) AS score \
                FROM news {}\
             ) {} ORDER BY score DESC, published_sec DESC, news_id DESC LIMIT {}",
            TITLE_WEIGHT,
            inner.where_clause(),
            outer.where_clause(),
            limit
        );

        let mut params = inner.params;
        params.extend(outer.params);

        let mut response = self
            .db
            .query_with_params(&sql, Value::Object(params))
            .await
            .map_err(|e| AppError::upstream(format!("search index: {}", e)))?;
        let hits: Vec<HitRecord> = response.take(0)?;

        Ok(hits
            .into_iter()
            .map(|h| SearchHit {
                news_id: h.news_id,
                score: h.score,
                published_sec: h.published_sec,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cursor::{LatestCursor, ViewsCursor};

    #[test]
    fn test_recency_boundary_clause() {
        let mut c = Conditions::default();
        c.category(Some(Category::Economy));
        c.boundary(&Boundary::Recency(LatestCursor {
            published_sec: 100,
            news_id: 7,
        }));

        assert_eq!(
            c.where_clause(),
            "WHERE category = $category AND \
             (published_sec < $b_sec OR (published_sec = $b_sec AND news_id < $b_id))"
        );
        let params = c.into_params();
        assert_eq!(params["category"], "economy");
        assert_eq!(params["b_sec"], 100);
        assert_eq!(params["b_id"], 7);
    }

    #[test]
    fn test_views_boundary_binds_all_keys() {
        let mut c = Conditions::default();
        c.boundary(&Boundary::Views(ViewsCursor {
            views: 10,
            published_sec: 100,
            news_id: 3,
        }));
        let params = c.into_params();
        assert_eq!(params["b_views"], 10);
        assert_eq!(params["b_sec"], 100);
        assert_eq!(params["b_id"], 3);
    }

    #[test]
    fn test_empty_conditions_have_no_where() {
        assert_eq!(Conditions::default().where_clause(), "");
    }

    #[test]
    fn test_record_round_trips_article() {
        let article = NewArticle {
            title: "t".into(),
            category: Category::ItScience,
            newspaper: "n".into(),
            author: "a".into(),
            published_at: from_epoch_seconds(1_700_000_000),
            view_count: 3,
            bookmark_count: 1,
            body: "b".into(),
            thumbnail: None,
        }
        .into_article(9);

        assert_eq!(Article::from(NewsRecord::from(&article)), article);
    }
}
