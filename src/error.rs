use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// 游标无法解码，或与当前排序的形状不符
    #[error("Malformed cursor: {0}")]
    MalformedCursor(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 检索、排行缓存、推荐服务或主存储不可用，调用方可重试
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// HOT 排行已被新一代替换，客户端需从第一页重新翻页
    #[error("Feed refreshed: cursor generation {issued} superseded by {current}")]
    FeedRefreshed { issued: u64, current: u64 },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[cfg(feature = "redis-cache")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    ValidatorError(#[from] validator::ValidationErrors),
}

impl AppError {
    /// 稳定的机器可读错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::MalformedCursor(_) => "INVALID_CURSOR",
            AppError::NotFound(_) => "NEWS_NOT_FOUND",
            AppError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            AppError::InvalidParameter(_) | AppError::ValidatorError(_) => "INVALID_PARAMETER",
            AppError::FeedRefreshed { .. } => "FEED_REFRESHED",
            AppError::Unauthorized => "UNAUTHORIZED_ACCESS",
            AppError::Internal(_) | AppError::Serialization(_) => "INTERNAL_ERROR",
            AppError::Database(_) => "UPSTREAM_UNAVAILABLE",
            #[cfg(feature = "redis-cache")]
            AppError::Redis(_) => "UPSTREAM_UNAVAILABLE",
            AppError::Request(_) => "UPSTREAM_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedCursor(_)
            | AppError::InvalidParameter(_)
            | AppError::ValidatorError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::FeedRefreshed { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::UpstreamUnavailable(_) | AppError::Database(_) | AppError::Request(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            #[cfg(feature = "redis-cache")]
            AppError::Redis(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = match &self {
            AppError::MalformedCursor(msg) => {
                tracing::debug!("Rejected cursor: {}", msg);
                "Cursor is not valid for this feed".to_string()
            }
            AppError::NotFound(msg) | AppError::InvalidParameter(msg) => msg.clone(),
            AppError::FeedRefreshed { .. } => {
                "Feed was refreshed, restart pagination".to_string()
            }
            AppError::Unauthorized => "Authentication required".to_string(),
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                "Upstream service unavailable".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Upstream service unavailable".to_string()
            }
            #[cfg(feature = "redis-cache")]
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                "Upstream service unavailable".to_string()
            }
            AppError::Request(e) => {
                tracing::error!("Request error: {}", e);
                "Upstream service unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {}", e);
                "Internal server error".to_string()
            }
            AppError::ValidatorError(e) => {
                let details = e
                    .field_errors()
                    .iter()
                    .map(|(field, errors)| {
                        (
                            field.to_string(),
                            errors
                                .iter()
                                .map(|e| {
                                    e.message
                                        .as_ref()
                                        .map(|m| m.to_string())
                                        .unwrap_or_else(|| "Invalid value".to_string())
                                })
                                .collect::<Vec<_>>(),
                        )
                    })
                    .collect::<std::collections::HashMap<String, Vec<String>>>();

                return (
                    status,
                    Json(json!({
                        "error": {
                            "code": code,
                            "message": "Validation failed",
                            "details": details
                        }
                    })),
                )
                    .into_response();
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

// 便利函数，用于创建常见错误
impl AppError {
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{} not found", resource))
    }

    pub fn malformed_cursor(msg: impl std::fmt::Display) -> Self {
        Self::MalformedCursor(msg.to_string())
    }

    pub fn invalid_parameter(msg: &str) -> Self {
        Self::InvalidParameter(msg.to_string())
    }

    pub fn upstream(msg: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable(msg.to_string())
    }

    pub fn internal(msg: &str) -> Self {
        Self::Internal(msg.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
