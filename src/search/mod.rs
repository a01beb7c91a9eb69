//! Search orchestration and the result cache.

pub mod cache;
pub mod orchestrator;

pub use cache::{cache_key, CacheEntry, SearchCache};
pub use orchestrator::SearchOrchestrator;
