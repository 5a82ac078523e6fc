use crate::error::AppError;
use axum::{
    body::Body,
    extract::{FromRequestParts, Path, Query},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use tracing::{debug, info};

/// 上游认证网关写入的用户头
pub const USER_ID_HEADER: &str = "x-user-id";

/// 请求日志中间件
pub async fn request_logging_middleware(request: Request<Body>, next: Next<Body>) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = get_client_ip(&request);

    let start_time = std::time::Instant::now();

    debug!("Incoming request: {} {} from {}", method, uri, client_ip);

    let response = next.run(request).await;

    let elapsed = start_time.elapsed();
    let status = response.status();

    info!(
        "Request completed: {} {} {} - {}ms",
        method,
        uri,
        status.as_u16(),
        elapsed.as_millis()
    );

    response
}

/// 获取客户端 IP 地址
fn get_client_ip(request: &Request<Body>) -> String {
    let headers = request.headers();

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return ip.trim().to_string();
    }

    if let Some(ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// 当前用户（可能匿名）
///
/// 认证本身在网关完成，这里只读取网关转发的用户 id。
/// 头存在但不是整数时视为参数错误，而不是匿名。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Option<i64>);

impl CurrentUser {
    /// 需要登录的接口使用
    pub fn require(&self) -> Result<i64, AppError> {
        self.0.ok_or(AppError::Unauthorized)
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(CurrentUser(None));
        };

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::invalid_parameter("X-User-Id must be an integer"))?;

        Ok(CurrentUser(Some(user_id)))
    }
}

/// 查询串提取，解析失败走统一错误格式
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait::async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidParameter(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// 路径参数提取，解析失败走统一错误格式
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

#[async_trait::async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidParameter(rejection.body_text()))?;
        Ok(ApiPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn extract(header: Option<&str>) -> Result<CurrentUser, AppError> {
        let mut builder = Request::builder().uri("/api/news/bookmarks");
        if let Some(value) = header {
            builder = builder.header(USER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        CurrentUser::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let user = extract(None).await.unwrap();
        assert_eq!(user, CurrentUser(None));
        assert!(matches!(user.require(), Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_numeric_header_is_user() {
        let user = extract(Some(" 42 ")).await.unwrap();
        assert_eq!(user.require().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_garbage_header_is_rejected() {
        assert!(matches!(
            extract(Some("abc")).await,
            Err(AppError::InvalidParameter(_))
        ));
    }
}
