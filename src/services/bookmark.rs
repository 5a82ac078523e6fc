use crate::{
    error::{AppError, Result},
    models::bookmark::BookmarkToggleResponse,
    services::store::{ArticleStore, BookmarkStore},
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct BookmarkService {
    articles: Arc<dyn ArticleStore>,
    bookmarks: Arc<dyn BookmarkStore>,
}

impl BookmarkService {
    pub fn new(articles: Arc<dyn ArticleStore>, bookmarks: Arc<dyn BookmarkStore>) -> Self {
        Self {
            articles,
            bookmarks,
        }
    }

    /// 收藏与取消收藏互相切换
    pub async fn toggle(&self, user_id: i64, article_id: i64) -> Result<BookmarkToggleResponse> {
        debug!("Toggling bookmark of article {} for user {}", article_id, user_id);

        if self.articles.find_by_id(article_id).await?.is_none() {
            return Err(AppError::not_found("News"));
        }

        match self.bookmarks.find_bookmark(user_id, article_id).await? {
            Some(existing) => {
                self.bookmarks.delete_bookmark(&existing).await?;
                info!("User {} removed bookmark {}", user_id, existing.id);
                Ok(BookmarkToggleResponse {
                    scrapped: false,
                    scrap_id: None,
                })
            }
            None => {
                let bookmark = self.bookmarks.insert_bookmark(user_id, article_id).await?;
                info!("User {} bookmarked article {} as {}", user_id, article_id, bookmark.id);
                Ok(BookmarkToggleResponse {
                    scrapped: true,
                    scrap_id: Some(bookmark.id),
                })
            }
        }
    }

    pub async fn is_bookmarked(&self, user_id: i64, article_id: i64) -> Result<bool> {
        Ok(self
            .bookmarks
            .find_bookmark(user_id, article_id)
            .await?
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::{Category, NewArticle};
    use crate::services::memory::MemoryStore;
    use chrono::Utc;

    fn service_with_article() -> (BookmarkService, MemoryStore, i64) {
        let store = MemoryStore::new();
        let article = store.insert(NewArticle {
            title: "환율 급등".to_string(),
            category: Category::Economy,
            newspaper: String::new(),
            author: String::new(),
            published_at: Utc::now(),
            view_count: 0,
            bookmark_count: 0,
            body: String::new(),
            thumbnail: None,
        });
        let shared = Arc::new(store.clone());
        (BookmarkService::new(shared.clone(), shared), store, article.id)
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let (service, store, id) = service_with_article();

        let on = service.toggle(1, id).await.unwrap();
        assert!(on.scrapped);
        assert!(on.scrap_id.is_some());
        assert!(service.is_bookmarked(1, id).await.unwrap());
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().bookmark_count, 1);

        let off = service.toggle(1, id).await.unwrap();
        assert!(!off.scrapped);
        assert_eq!(off.scrap_id, None);
        assert!(!service.is_bookmarked(1, id).await.unwrap());
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().bookmark_count, 0);
    }

    #[tokio::test]
    async fn test_toggle_missing_article() {
        let (service, _, _) = service_with_article();
        assert!(matches!(
            service.toggle(1, 404).await,
            Err(AppError::NotFound(_))
        ));
    }
}
