pub mod health;
pub mod lookup_cache;
pub mod whoami;

pub use health::health_check;
pub use lookup_cache::{cache_entries, cache_stats, clear_cache, invalidate_entry};
pub use whoami::whoami;
