pub mod news;

use crate::{state::AppState, utils::middleware::request_logging_middleware};
use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 应用路由；CORS 与压缩在 `main` 中按配置追加
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/news", news::router())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "issue-feed"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::article::{Category, NewArticle};
    use crate::services::{
        FeedStores, MemoryRankStore, MemoryStore, StaticRecommendationSource,
    };
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<AppState>) {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 1..=30 {
            store.insert(NewArticle {
                title: format!("속보 {}", i),
                category: if i % 3 == 0 { Category::Politics } else { Category::Society },
                newspaper: "조선일보".to_string(),
                author: "기자".to_string(),
                published_at: now - Duration::minutes(30 - i),
                view_count: 100 + i,
                bookmark_count: 0,
                body: r#"[{"type":"text","content":"본문"}]"#.to_string(),
                thumbnail: None,
            });
        }

        let state = Arc::new(AppState::new(
            Config::default(),
            FeedStores::shared(Arc::new(store)),
            Arc::new(MemoryRankStore::new()),
            Arc::new(StaticRecommendationSource),
        ));
        (app(state.clone()), state)
    }

    async fn call(app: Router, method: Method, uri: &str, user: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let response = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app();
        let (status, body) = call(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_latest_page_shape() {
        let (app, _) = test_app();
        let (status, body) = call(app, Method::GET, "/api/news/trend?size=3", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let items = body["data"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["newsId"], 30);
        assert_eq!(body["data"]["hasNext"], true);
        assert!(body["data"]["nextCursor"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_400() {
        let (app, _) = test_app();
        let (status, body) =
            call(app, Method::GET, "/api/news/trend?cursor=garbage", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_CURSOR");
    }

    #[tokio::test]
    async fn test_hot_flow_and_refresh_conflict() {
        let (app, _) = test_app();

        let (_, empty) = call(app.clone(), Method::GET, "/api/news/hot", None).await;
        assert_eq!(empty["data"]["items"].as_array().unwrap().len(), 0);
        assert_eq!(empty["data"]["hasNext"], false);

        let (status, refreshed) = call(app.clone(), Method::POST, "/api/news/hot/update", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(refreshed["data"]["updated"], true);

        let (_, first) = call(app.clone(), Method::GET, "/api/news/hot?size=10", None).await;
        let cursor = first["data"]["nextCursor"].as_str().unwrap().to_string();

        call(app.clone(), Method::POST, "/api/news/hot/update", None).await;

        let (status, body) = call(
            app,
            Method::GET,
            &format!("/api/news/hot?size=10&cursor={}", cursor),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "FEED_REFRESHED");
    }

    #[tokio::test]
    async fn test_category_route_accepts_tag() {
        let (app, _) = test_app();
        let (status, body) =
            call(app.clone(), Method::GET, "/api/news/category/politics?size=50", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 10);

        let (status, body) = call(app, Method::GET, "/api/news/category/sports", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_search_rejects_long_keyword() {
        let (app, _) = test_app();
        let keyword = "a".repeat(101);
        let (status, body) = call(
            app,
            Method::GET,
            &format!("/api/news?keyword={}", keyword),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_bookmark_routes_need_user() {
        let (app, _) = test_app();

        let (status, body) = call(app.clone(), Method::GET, "/api/news/bookmarks", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED_ACCESS");

        let (status, body) =
            call(app.clone(), Method::POST, "/api/news/7/bookmark", Some("3")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["scrapped"], true);

        let (_, body) = call(app.clone(), Method::GET, "/api/news/bookmarks", Some("3")).await;
        assert_eq!(body["data"]["items"][0]["newsId"], 7);

        let (_, detail) = call(app, Method::GET, "/api/news/7", Some("3")).await;
        assert_eq!(detail["data"]["isScraped"], true);
        assert_eq!(detail["data"]["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_oversized_page_size_is_clamped() {
        let (app, _) = test_app();
        let (status, body) = call(
            app.clone(),
            Method::GET,
            "/api/news/trend?size=99999999999999999999",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 30);

        let (status, body) = call(app, Method::GET, "/api/news/trend?size=abc", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_bad_path_id_uses_error_envelope() {
        let (app, _) = test_app();
        let (status, body) = call(app.clone(), Method::GET, "/api/news/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER");

        let (status, body) =
            call(app, Method::POST, "/api/news/abc/bookmark", Some("3")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_PARAMETER");
    }

    #[tokio::test]
    async fn test_unknown_article_is_404() {
        let (app, _) = test_app();
        let (status, body) = call(app, Method::GET, "/api/news/9999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NEWS_NOT_FOUND");
    }
}
