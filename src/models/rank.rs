use serde::{Deserialize, Serialize};

/// 一代排行中的一项，`rank` 从 0 开始
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankEntry {
    pub news_id: i64,
    pub score: f64,
    pub rank: usize,
}

/// 一次按名次读取的结果。代数、总数与 id 在同一原子步骤内读出。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RankSlice {
    pub generation: u64,
    pub total: usize,
    pub ids: Vec<i64>,
}

/// 一次重建写入后的排行概况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildSummary {
    pub generation: u64,
    pub size: usize,
}
