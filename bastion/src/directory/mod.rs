// Ports to the external directory service. The cache never looks behind these.

pub mod error;
pub mod host_mode;
pub mod static_directory;

pub use error::DirectoryError;
pub use host_mode::{DirectoryMode, HostEnvironment, HostModeProvider, KerberosHostEnvironment};
pub use static_directory::StaticGroupMembership;

use async_trait::async_trait;

/// Answers whether an account transitively belongs to an administrator-equivalent group.
///
/// Implementations own their timeouts; callers wait for as long as the query takes.
#[async_trait]
pub trait GroupMembershipProvider: Send + Sync {
    async fn is_admin_equivalent(&self, name: &str) -> Result<bool, DirectoryError>;
}
