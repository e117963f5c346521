//! Content-addressed repair cache

mod key;
mod repository;

pub use key::CacheKey;
pub use repository::{CacheEntry, CacheStats, RepairCache};

#[cfg(test)]
pub use repository::mock::MockRepairCache;
