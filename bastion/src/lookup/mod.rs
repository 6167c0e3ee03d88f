pub mod cache;
pub mod entry;
pub mod stats;

pub use cache::AdminLookupCache;
pub use entry::EntrySnapshot;
pub use stats::CacheStats;
