use crate::error::Result;
use crate::models::article::Article;
use crate::services::store::ArticleStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 把外部给出的有序 id 序列还原为完整文章，保持顺序，跳过已不存在的行
#[derive(Clone)]
pub struct FeedAssembler {
    store: Arc<dyn ArticleStore>,
}

impl FeedAssembler {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    pub async fn assemble(&self, ordered_ids: &[i64]) -> Result<Vec<Article>> {
        if ordered_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<i64, Article> = self
            .store
            .find_by_ids(ordered_ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();

        let articles: Vec<Article> = ordered_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        if articles.len() < ordered_ids.len() {
            debug!(
                "Assembled {} of {} ranked ids, the rest no longer exist",
                articles.len(),
                ordered_ids.len()
            );
        }

        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::article::{Category, NewArticle};
    use crate::services::memory::MemoryStore;
    use chrono::Utc;

    fn seed(store: &MemoryStore, n: usize) {
        for i in 0..n {
            store.insert(NewArticle {
                title: format!("article {}", i + 1),
                category: Category::Society,
                newspaper: String::new(),
                author: String::new(),
                published_at: Utc::now(),
                view_count: 0,
                bookmark_count: 0,
                body: String::new(),
                thumbnail: None,
            });
        }
    }

    #[tokio::test]
    async fn test_preserves_order_and_skips_missing() {
        let store = MemoryStore::new();
        seed(&store, 10);
        store.remove(2);

        let assembler = FeedAssembler::new(Arc::new(store));
        let ids: Vec<i64> = assembler
            .assemble(&[5, 2, 9])
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();

        assert_eq!(ids, vec![5, 9]);
    }

    #[tokio::test]
    async fn test_duplicate_ids_emit_once() {
        let store = MemoryStore::new();
        seed(&store, 3);

        let assembler = FeedAssembler::new(Arc::new(store));
        let ids: Vec<i64> = assembler
            .assemble(&[3, 1, 3])
            .await
            .unwrap()
            .iter()
            .map(|a| a.id)
            .collect();

        assert_eq!(ids, vec![3, 1]);
    }
}
