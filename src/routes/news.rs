use crate::{
    error::Result,
    models::{
        article::{ArticleCard, ArticleDetail, Category},
        bookmark::BookmarkToggleResponse,
        page::{CursorPage, HomeFeed},
        response::ApiResponse,
    },
    services::rank_cache::RecomputeOutcome,
    state::AppState,
    utils::{
        middleware::{ApiPath, ApiQuery, CurrentUser},
        validation::parse_page_size,
    },
};
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub cursor: Option<String>,
    pub size: Option<String>,
}

impl PageQuery {
    fn size(&self) -> Option<i64> {
        parse_page_size(self.size.as_deref())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(max = 100, message = "Keyword must be at most 100 characters"))]
    pub keyword: Option<String>,
    pub category: Option<String>,
    pub cursor: Option<String>,
    pub size: Option<String>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(search_news))
        .route("/main", get(get_home))
        .route("/hot", get(get_hot))
        .route("/hot/views", get(get_most_viewed))
        .route("/hot/update", post(refresh_hot))
        .route("/trend", get(get_latest))
        .route("/category/:category", get(get_by_category))
        .route("/recommend", get(get_recommended))
        .route("/bookmarks", get(get_bookmarks))
        .route("/:id/bookmark", post(toggle_bookmark))
        .route("/:id", get(get_detail))
}

/// 首页三段
/// GET /api/news/main
async fn get_home(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<HomeFeed>>> {
    debug!("Fetching home feed for user {:?}", user.0);
    let home = state.feed_service.get_home(user.0).await?;
    Ok(Json(ApiResponse::success(home)))
}

/// GET /api/news/hot
async fn get_hot(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    debug!("Fetching HOT page: {:?}", query);
    let page = state
        .feed_service
        .get_hot(query.cursor.as_deref(), query.size())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/news/hot/views
async fn get_most_viewed(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    let page = state
        .feed_service
        .get_most_viewed(query.cursor.as_deref(), query.size())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// 手动触发 HOT 重算
/// POST /api/news/hot/update
async fn refresh_hot(State(state): State<Arc<AppState>>) -> Result<Json<ApiResponse<Value>>> {
    info!("Manual HOT recompute requested");

    let response = match state.feed_service.refresh_hot().await? {
        RecomputeOutcome::Completed(summary) => ApiResponse::success(json!({
            "updated": true,
            "generation": summary.generation,
            "size": summary.size,
        })),
        RecomputeOutcome::Skipped => ApiResponse::success_with_message(
            json!({ "updated": false }),
            "HOT recompute already in progress".to_string(),
        ),
    };

    Ok(Json(response))
}

/// GET /api/news/trend
async fn get_latest(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    debug!("Fetching latest page: {:?}", query);
    let page = state
        .feed_service
        .get_latest(query.cursor.as_deref(), query.size())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/news/category/:category
async fn get_by_category(
    State(state): State<Arc<AppState>>,
    ApiPath(category): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    let category: Category = category.parse()?;
    let page = state
        .feed_service
        .get_by_category(category, query.cursor.as_deref(), query.size())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// 检索；没有 keyword 时退化为最新
/// GET /api/news?keyword=&category=&cursor=&size=
async fn search_news(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    debug!("Searching news: {:?}", query);
    query.validate()?;

    let category = query
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(str::parse::<Category>)
        .transpose()?;

    let page = state
        .feed_service
        .search(
            query.keyword.as_deref(),
            category,
            query.cursor.as_deref(),
            parse_page_size(query.size.as_deref()),
        )
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/news/recommend
async fn get_recommended(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    let user_id = user.require()?;
    let page = state
        .feed_service
        .get_recommended(user_id, query.cursor.as_deref(), query.size())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// GET /api/news/bookmarks
async fn get_bookmarks(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<ApiResponse<CursorPage<ArticleCard>>>> {
    let user_id = user.require()?;
    debug!("Fetching bookmarks for user {}", user_id);
    let page = state
        .feed_service
        .get_bookmarks(user_id, query.cursor.as_deref(), query.size())
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

/// POST /api/news/:id/bookmark
async fn toggle_bookmark(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<BookmarkToggleResponse>>> {
    let user_id = user.require()?;
    let result = state.feed_service.toggle_bookmark(user_id, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/news/:id
async fn get_detail(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiResponse<ArticleDetail>>> {
    debug!("Fetching news detail: {}", id);
    let detail = state.feed_service.get_detail(id, user.0).await?;
    Ok(Json(ApiResponse::success(detail)))
}
