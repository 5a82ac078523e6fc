//! Keyset 翻页。
//!
//! 每个排序都多取一行来判断是否还有下一页，下一页的边界取自本页最后一条的完整键元组。
//! 边界比较是严格的，同键的两行不会同时落在边界上。

use crate::error::{AppError, Result};
use crate::models::{
    article::{Article, ArticleCard, Category},
    cursor::{BookmarkCursor, Boundary, LatestCursor, RelevanceCursor, ViewsCursor},
    page::CursorPage,
};
use crate::services::assembler::FeedAssembler;
use crate::services::store::{
    ArticleFilter, ArticleStore, BookmarkStore, OrderKey, SearchIndex, SearchRequest,
};
use crate::utils::cursor::CursorCodec;
use std::sync::Arc;
use tracing::debug;

/// 一种排序连同它自己的游标形状
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOrder {
    Latest,
    MostViewed,
    Category(Category),
    Search(SearchRequest),
}

impl SortOrder {
    /// 没有检索词时退化为最新（或分区最新），游标形状随之改变
    pub fn for_search(keyword: Option<String>, category: Option<Category>) -> Self {
        match (keyword, category) {
            (Some(keyword), category) => SortOrder::Search(SearchRequest { keyword, category }),
            (None, Some(category)) => SortOrder::Category(category),
            (None, None) => SortOrder::Latest,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortOrder::Latest => "latest",
            SortOrder::MostViewed => "most_viewed",
            SortOrder::Category(_) => "category",
            SortOrder::Search(_) => "search",
        }
    }

    /// 按本排序的形状解码游标；`None` 为第一页
    pub fn decode_cursor(&self, cursor: Option<&str>) -> Result<Option<Boundary>> {
        let boundary = match self {
            SortOrder::Latest | SortOrder::Category(_) => {
                CursorCodec::decode_opt::<LatestCursor>(cursor)?.map(Boundary::Recency)
            }
            SortOrder::MostViewed => {
                CursorCodec::decode_opt::<ViewsCursor>(cursor)?.map(Boundary::Views)
            }
            SortOrder::Search(_) => {
                CursorCodec::decode_opt::<RelevanceCursor>(cursor)?.map(Boundary::Relevance)
            }
        };
        Ok(boundary)
    }

    pub fn encode_cursor(boundary: &Boundary) -> Result<String> {
        match boundary {
            Boundary::Recency(c) => CursorCodec::encode(c),
            Boundary::Views(c) => CursorCodec::encode(c),
            Boundary::Relevance(c) => CursorCodec::encode(c),
        }
    }

    fn store_plan(&self) -> Option<(OrderKey, ArticleFilter)> {
        match self {
            SortOrder::Latest => Some((OrderKey::Recency, ArticleFilter::default())),
            SortOrder::MostViewed => Some((OrderKey::Views, ArticleFilter::default())),
            SortOrder::Category(c) => Some((OrderKey::Recency, ArticleFilter::category(*c))),
            SortOrder::Search(_) => None,
        }
    }

    fn accepts(&self, boundary: &Boundary) -> bool {
        matches!(
            (self, boundary),
            (SortOrder::Latest | SortOrder::Category(_), Boundary::Recency(_))
                | (SortOrder::MostViewed, Boundary::Views(_))
                | (SortOrder::Search(_), Boundary::Relevance(_))
        )
    }
}

/// 一页原始结果
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice {
    pub records: Vec<Article>,
    pub has_next: bool,
    pub next: Option<Boundary>,
}

impl PageSlice {
    pub fn into_cards(self) -> Result<CursorPage<ArticleCard>> {
        let next_cursor = match (self.has_next, &self.next) {
            (true, Some(boundary)) => Some(SortOrder::encode_cursor(boundary)?),
            _ => None,
        };
        let cards = self.records.iter().map(ArticleCard::from).collect();
        Ok(CursorPage::new(cards, next_cursor))
    }
}

/// 收藏流的一页
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkSlice {
    pub records: Vec<Article>,
    pub next: Option<BookmarkCursor>,
}

#[derive(Clone)]
pub struct KeysetPager {
    store: Arc<dyn ArticleStore>,
    bookmarks: Arc<dyn BookmarkStore>,
    search: Arc<dyn SearchIndex>,
    assembler: FeedAssembler,
}

impl KeysetPager {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        bookmarks: Arc<dyn BookmarkStore>,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        let assembler = FeedAssembler::new(store.clone());
        Self {
            store,
            bookmarks,
            search,
            assembler,
        }
    }

    /// 解码游标并取一页卡片
    pub async fn fetch(
        &self,
        order: &SortOrder,
        cursor: Option<&str>,
        size: usize,
    ) -> Result<CursorPage<ArticleCard>> {
        let boundary = order.decode_cursor(cursor)?;
        self.page(order, boundary, size).await?.into_cards()
    }

    pub async fn page(
        &self,
        order: &SortOrder,
        boundary: Option<Boundary>,
        size: usize,
    ) -> Result<PageSlice> {
        if let Some(b) = &boundary {
            if !order.accepts(b) {
                return Err(AppError::malformed_cursor(format!(
                    "boundary does not belong to the {} order",
                    order.name()
                )));
            }
        }

        if size == 0 {
            return Ok(PageSlice {
                records: Vec::new(),
                has_next: false,
                next: None,
            });
        }

        let slice = match (order, order.store_plan()) {
            (SortOrder::Search(request), _) => {
                let relevance = match boundary {
                    Some(Boundary::Relevance(c)) => Some(c),
                    _ => None,
                };
                self.page_search(request, relevance, size).await?
            }
            (_, Some((key, filter))) => self.page_store(key, &filter, boundary, size).await?,
            (_, None) => return Err(AppError::internal("order has no store plan")),
        };

        debug!(
            "Paged {} order: {} records, has_next={}",
            order.name(),
            slice.records.len(),
            slice.has_next
        );

        Ok(slice)
    }

    async fn page_store(
        &self,
        key: OrderKey,
        filter: &ArticleFilter,
        boundary: Option<Boundary>,
        size: usize,
    ) -> Result<PageSlice> {
        let mut rows = self
            .store
            .query(key, filter, boundary.as_ref(), size + 1)
            .await?;

        let has_next = rows.len() > size;
        rows.truncate(size);

        let next = if has_next {
            rows.last().map(|a| key.key_of(a))
        } else {
            None
        };

        Ok(PageSlice {
            records: rows,
            has_next,
            next,
        })
    }

    async fn page_search(
        &self,
        request: &SearchRequest,
        boundary: Option<RelevanceCursor>,
        size: usize,
    ) -> Result<PageSlice> {
        let mut hits = self
            .search
            .search(request, boundary.as_ref(), size + 1)
            .await?;

        let has_next = hits.len() > size;
        hits.truncate(size);

        // 边界取自命中本身：即使某些命中在主存储里已不存在，也能继续向后翻
        let next = if has_next {
            hits.last().map(|h| Boundary::Relevance(h.key()))
        } else {
            None
        };

        let ids: Vec<i64> = hits.iter().map(|h| h.news_id).collect();
        let records = self.assembler.assemble(&ids).await?;

        Ok(PageSlice {
            records,
            has_next,
            next,
        })
    }

    /// 用户收藏流，按收藏 id 降序
    pub async fn bookmarks(
        &self,
        user_id: i64,
        cursor: Option<&str>,
        size: usize,
    ) -> Result<CursorPage<ArticleCard>> {
        let before = CursorCodec::decode_opt::<BookmarkCursor>(cursor)?;
        let slice = self
            .bookmark_slice(user_id, before.map(|c| c.scrap_id), size)
            .await?;

        let next_cursor = slice.next.as_ref().map(CursorCodec::encode).transpose()?;
        let cards = slice.records.iter().map(ArticleCard::from).collect();
        Ok(CursorPage::new(cards, next_cursor))
    }

    pub async fn bookmark_slice(
        &self,
        user_id: i64,
        before: Option<i64>,
        size: usize,
    ) -> Result<BookmarkSlice> {
        if size == 0 {
            return Ok(BookmarkSlice {
                records: Vec::new(),
                next: None,
            });
        }

        let mut rows = self.bookmarks.bookmarks_page(user_id, before, size + 1).await?;
        let has_next = rows.len() > size;
        rows.truncate(size);

        let next = if has_next {
            rows.last().map(|b| BookmarkCursor { scrap_id: b.id })
        } else {
            None
        };

        let ids: Vec<i64> = rows.iter().map(|b| b.article_id).collect();
        let records = self.assembler.assemble(&ids).await?;

        Ok(BookmarkSlice { records, next })
    }
}
