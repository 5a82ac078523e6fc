use crate::config::Config;
use crate::error::{AppError, Result};
use serde::Serialize;
use surrealdb::engine::remote::http::{Client, Http};
use surrealdb::opt::auth::Root;
use surrealdb::{Response, Surreal};
use tracing::{debug, error, info, warn};

/// 表结构与检索索引；重复执行会覆盖为同样的定义
const SCHEMA: &str = r#"
DEFINE TABLE news SCHEMALESS;
DEFINE INDEX news_id_idx ON news FIELDS news_id UNIQUE;
DEFINE INDEX news_latest_idx ON news FIELDS published_sec, news_id;
DEFINE INDEX news_category_idx ON news FIELDS category, published_sec, news_id;
DEFINE INDEX news_views_idx ON news FIELDS view_count, published_sec, news_id;

DEFINE TABLE news_scrap SCHEMALESS;
DEFINE INDEX news_scrap_id_idx ON news_scrap FIELDS scrap_id UNIQUE;
DEFINE INDEX news_scrap_user_news_idx ON news_scrap FIELDS user_id, news_id UNIQUE;

DEFINE ANALYZER news_analyzer TOKENIZERS blank, class FILTERS lowercase;
DEFINE INDEX news_title_search ON news FIELDS title SEARCH ANALYZER news_analyzer BM25;
DEFINE INDEX news_body_search ON news FIELDS body SEARCH ANALYZER news_analyzer BM25;
"#;

/// 数据库服务
#[derive(Clone)]
pub struct Database {
    client: Surreal<Client>,
}

impl Database {
    /// 创建新的数据库实例
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Initializing database connection to {}", config.database_url);

        let address = strip_scheme(&config.database_url);
        if config.database_url.starts_with("https://") {
            warn!("HTTPS database URLs are not supported by this build, connecting over HTTP");
        }

        let client = Surreal::new::<Http>(address).await?;
        client
            .signin(Root {
                username: &config.database_username,
                password: &config.database_password,
            })
            .await?;
        client
            .use_ns(&config.database_namespace)
            .use_db(&config.database_name)
            .await?;

        Ok(Self { client })
    }

    /// 验证数据库连接
    pub async fn verify_connection(&self) -> Result<()> {
        match self.client.query("INFO FOR DB").await {
            Ok(_) => {
                info!("Database connection verified successfully");
                Ok(())
            }
            Err(e) => {
                error!("Failed to verify database connection: {}", e);
                Err(AppError::from(e))
            }
        }
    }

    pub async fn define_schema(&self) -> Result<()> {
        self.client.query(SCHEMA).await?.check()?;
        info!("News schema and search indexes defined");
        Ok(())
    }

    /// 执行带参数的查询
    pub async fn query_with_params<P>(&self, sql: &str, params: P) -> Result<Response>
    where
        P: Serialize,
    {
        debug!("Executing query: {}", sql);
        Ok(self.client.query(sql).bind(params).await?)
    }

    /// 计数器表上的自增序列
    pub async fn next_sequence(&self, counter: &str) -> Result<i64> {
        let mut response = self
            .query_with_params(
                "UPDATE type::thing('counter', $counter) SET value += 1 RETURN VALUE value",
                serde_json::json!({ "counter": counter }),
            )
            .await?;

        let value: Option<i64> = response.take(0)?;
        value.ok_or_else(|| AppError::internal("Counter update returned nothing"))
    }
}

fn strip_scheme(url: &str) -> &str {
    url.trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_scheme() {
        assert_eq!(strip_scheme("http://localhost:8000"), "localhost:8000");
        assert_eq!(strip_scheme("https://db.internal:8000/"), "db.internal:8000");
        assert_eq!(strip_scheme("127.0.0.1:8000"), "127.0.0.1:8000");
    }
}
