pub mod assembler;
pub mod bookmark;
pub mod database;
pub mod feed;
pub mod memory;
pub mod pager;
pub mod rank_cache;
pub mod rank_store;
pub mod recommendation;
pub mod scoring;
pub mod store;
pub mod surreal_store;

// 重新导出常用类型
pub use bookmark::BookmarkService;
pub use database::Database;
pub use feed::{FeedService, FeedStores};
pub use memory::MemoryStore;
pub use rank_cache::{HotRecomputer, HotSettings, RankCache, RecomputeOutcome};
pub use rank_store::MemoryRankStore;
pub use recommendation::{HttpRecommendationSource, RecommendationSource, StaticRecommendationSource};
pub use surreal_store::SurrealStore;
