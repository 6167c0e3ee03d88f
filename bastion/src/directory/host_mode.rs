use super::{DirectoryError, GroupMembershipProvider};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Where group membership queries should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryMode {
    /// Host is joined to a domain: query the domain directory.
    Domain,
    /// Standalone host: query local machine groups.
    Local,
}

/// Probe for the environment the server process runs in.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    async fn is_domain_joined(&self) -> Result<bool, DirectoryError>;
}

/// Treats the host as domain joined when its Kerberos config names a default realm.
#[derive(Debug, Clone)]
pub struct KerberosHostEnvironment {
    krb5_conf: PathBuf,
}

impl KerberosHostEnvironment {
    pub const DEFAULT_PATH: &str = "/etc/krb5.conf";

    pub fn new(krb5_conf: impl Into<PathBuf>) -> Self {
        Self {
            krb5_conf: krb5_conf.into(),
        }
    }
}

impl Default for KerberosHostEnvironment {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PATH)
    }
}

#[async_trait]
impl HostEnvironment for KerberosHostEnvironment {
    async fn is_domain_joined(&self) -> Result<bool, DirectoryError> {
        let contents = match tokio::fs::read_to_string(&self.krb5_conf).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(DirectoryError::Detection(format!(
                    "{}: {e}",
                    self.krb5_conf.display()
                )));
            }
        };

        Ok(default_realm(&contents).is_some())
    }
}

fn default_realm(krb5_conf: &str) -> Option<String> {
    let mut in_libdefaults = false;
    for line in krb5_conf.lines().map(str::trim) {
        if line.starts_with('#') || line.starts_with(';') || line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            in_libdefaults = line.eq_ignore_ascii_case("[libdefaults]");
            continue;
        }
        if !in_libdefaults {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            if key.trim() == "default_realm" && !value.trim().is_empty() {
                return Some(value.trim().to_string());
            }
        }
    }
    None
}

/// Routes membership queries to the domain or the local provider.
///
/// The host is probed once per provider; a failed probe falls back to local mode
/// and is not retried. The server builds a single provider at startup, so this is
/// the process-wide detection state.
pub struct HostModeProvider {
    environment: Arc<dyn HostEnvironment>,
    domain: Arc<dyn GroupMembershipProvider>,
    local: Arc<dyn GroupMembershipProvider>,
    mode: OnceCell<DirectoryMode>,
}

impl HostModeProvider {
    pub fn new(
        environment: Arc<dyn HostEnvironment>,
        domain: Arc<dyn GroupMembershipProvider>,
        local: Arc<dyn GroupMembershipProvider>,
    ) -> Self {
        Self {
            environment,
            domain,
            local,
            mode: OnceCell::new(),
        }
    }

    pub async fn mode(&self) -> DirectoryMode {
        *self
            .mode
            .get_or_init(|| async {
                let mode = match self.environment.is_domain_joined().await {
                    Ok(true) => DirectoryMode::Domain,
                    Ok(false) => DirectoryMode::Local,
                    Err(e) => {
                        warn!(error = %e, "Could not detect domain membership, using local groups");
                        DirectoryMode::Local
                    }
                };
                info!(?mode, "Directory mode selected");
                mode
            })
            .await
    }
}

#[async_trait]
impl GroupMembershipProvider for HostModeProvider {
    async fn is_admin_equivalent(&self, name: &str) -> Result<bool, DirectoryError> {
        match self.mode().await {
            DirectoryMode::Domain => self.domain.is_admin_equivalent(name).await,
            DirectoryMode::Local => self.local.is_admin_equivalent(name).await,
        }
    }
}
