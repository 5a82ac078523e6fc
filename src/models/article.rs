use crate::error::AppError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// 新闻分区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Politics,
    Economy,
    Society,
    World,
    LifeCulture,
    ItScience,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Politics,
        Category::Economy,
        Category::Society,
        Category::World,
        Category::LifeCulture,
        Category::ItScience,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Politics => "politics",
            Category::Economy => "economy",
            Category::Society => "society",
            Category::World => "world",
            Category::LifeCulture => "life_culture",
            Category::ItScience => "it_science",
        }
    }

    /// 客户端展示用的分区名
    pub fn label(&self) -> &'static str {
        match self {
            Category::Politics => "정치",
            Category::Economy => "경제",
            Category::Society => "사회",
            Category::World => "세계",
            Category::LifeCulture => "생활/문화",
            Category::ItScience => "IT/과학",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed) || c.label() == trimmed)
            .ok_or_else(|| AppError::InvalidParameter(format!("Unknown category: {}", trimmed)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub newspaper: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub view_count: i64,
    pub bookmark_count: i64,
    pub body: String,
    pub thumbnail: Option<String>,
}

impl Article {
    /// 排序与游标统一使用的秒级时间戳
    pub fn published_sec(&self) -> i64 {
        self.published_at.timestamp()
    }
}

/// 采集侧写入的新文章（id 由存储分配）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub category: Category,
    #[serde(default)]
    pub newspaper: String,
    #[serde(default)]
    pub author: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub bookmark_count: i64,
    #[serde(default)]
    pub body: String,
    pub thumbnail: Option<String>,
}

impl NewArticle {
    pub fn into_article(self, id: i64) -> Article {
        Article {
            id,
            title: self.title,
            category: self.category,
            newspaper: self.newspaper,
            author: self.author,
            published_at: truncate_to_seconds(self.published_at),
            view_count: self.view_count,
            bookmark_count: self.bookmark_count,
            body: self.body,
            thumbnail: self.thumbnail,
        }
    }
}

/// 去掉亚秒部分，保证行与游标中的时间键一致
pub fn truncate_to_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    from_epoch_seconds(ts.timestamp())
}

pub fn from_epoch_seconds(sec: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(sec, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// 列表卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCard {
    pub news_id: i64,
    pub title: String,
    pub newspaper: String,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub thumbnail: Option<String>,
}

impl From<&Article> for ArticleCard {
    fn from(article: &Article) -> Self {
        Self {
            news_id: article.id,
            title: article.title.clone(),
            newspaper: article.newspaper.clone(),
            category: article.category,
            created_at: article.published_at,
            views: article.view_count,
            thumbnail: article.thumbnail.clone(),
        }
    }
}

/// 正文块：`text` | `image` | `img_desc`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl ContentBlock {
    /// 正文若是块数组的 JSON 则按块解析，否则整体视为一个文本块
    pub fn parse_body(body: &str) -> Vec<ContentBlock> {
        if body.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<ContentBlock>>(body) {
            Ok(blocks) => blocks,
            Err(_) => vec![ContentBlock {
                kind: "text".to_string(),
                content: body.to_string(),
            }],
        }
    }
}

/// 详情页
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDetail {
    pub news_id: i64,
    pub title: String,
    pub content: Vec<ContentBlock>,
    pub category: Category,
    pub author: String,
    pub newspaper: String,
    pub created_at: DateTime<Utc>,
    pub views: i64,
    pub scrap_count: i64,
    pub is_scraped: bool,
}

impl ArticleDetail {
    pub fn new(article: Article, is_scraped: bool) -> Self {
        Self {
            news_id: article.id,
            content: ContentBlock::parse_body(&article.body),
            title: article.title,
            category: article.category,
            author: article.author,
            newspaper: article.newspaper,
            created_at: article.published_at,
            views: article.view_count,
            scrap_count: article.bookmark_count,
            is_scraped,
        }
    }
}

/// HOT 重算的候选行
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotCandidate {
    pub news_id: i64,
    pub published_at: DateTime<Utc>,
    pub view_count: i64,
    pub bookmark_count: i64,
}

impl From<&Article> for HotCandidate {
    fn from(article: &Article) -> Self {
        Self {
            news_id: article.id,
            published_at: article.published_at,
            view_count: article.view_count,
            bookmark_count: article.bookmark_count,
        }
    }
}
