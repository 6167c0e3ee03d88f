pub mod access;
pub mod directory;
pub mod identity;
pub mod lookup;
pub mod principal;

// Re-export commonly used types
pub use access::{AccessDecisionEngine, AdminRoles, SYSTEM_DATABASE};
pub use directory::{DirectoryError, GroupMembershipProvider};
pub use identity::Identity;
pub use lookup::{AdminLookupCache, CacheStats, EntrySnapshot};
pub use principal::{DatabaseClaims, DirectoryPrincipal, Principal};
pub use shared::config::{AnonymousAccessMode, LookupSettings};
