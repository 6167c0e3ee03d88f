use crate::directory::GroupMembershipProvider;
use crate::identity::Identity;
use crate::lookup::AdminLookupCache;
use crate::principal::{DirectoryPrincipal, Principal};
use shared::config::{AnonymousAccessMode, Config};
use std::sync::Arc;
use tracing::debug;

/// Database whose admins are server admins.
pub const SYSTEM_DATABASE: &str = "<system>";

/// Role markers that grant admin rights without a directory query.
#[derive(Debug, Clone)]
pub struct AdminRoles(Vec<String>);

impl AdminRoles {
    pub const BUILTIN_ADMINISTRATORS: &str = "BUILTIN\\Administrators";

    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    pub fn matches_any(&self, roles: &[String]) -> bool {
        roles
            .iter()
            .any(|role| self.0.iter().any(|admin| admin.eq_ignore_ascii_case(role)))
    }
}

impl Default for AdminRoles {
    fn default() -> Self {
        Self::new([Self::BUILTIN_ADMINISTRATORS])
    }
}

/// Decides whether a caller is a server administrator.
///
/// Local rules run first; only directory users who match none of them reach the
/// lookup cache and, on a miss, the directory.
pub struct AccessDecisionEngine {
    provider: Arc<dyn GroupMembershipProvider>,
    cache: Arc<AdminLookupCache>,
    process_identity: Option<Identity>,
    admin_roles: AdminRoles,
}

impl AccessDecisionEngine {
    pub fn new(provider: Arc<dyn GroupMembershipProvider>, cache: Arc<AdminLookupCache>) -> Self {
        Self {
            provider,
            cache,
            process_identity: None,
            admin_roles: AdminRoles::default(),
        }
    }

    pub fn from_config(config: &Config, provider: Arc<dyn GroupMembershipProvider>) -> Self {
        let cache = Arc::new(AdminLookupCache::new(config.lookup));
        let mut engine = Self::new(provider, cache).with_admin_roles(AdminRoles::new(
            config.admin_roles.iter().cloned(),
        ));
        if let Some(id) = &config.process_identity {
            engine = engine.with_process_identity(Identity::new(id.clone()));
        }
        engine
    }

    /// Identity the server process runs as; callers with the same identity are trusted
    pub fn with_process_identity(mut self, identity: Identity) -> Self {
        self.process_identity = Some(identity);
        self
    }

    pub fn with_admin_roles(mut self, roles: AdminRoles) -> Self {
        self.admin_roles = roles;
        self
    }

    pub fn cache(&self) -> &Arc<AdminLookupCache> {
        &self.cache
    }

    pub async fn is_administrator(&self, principal: &Principal, mode: AnonymousAccessMode) -> bool {
        self.is_administrator_for(principal, mode, SYSTEM_DATABASE)
            .await
    }

    /// Same as [`is_administrator`](Self::is_administrator), with database-scoped
    /// claims checked against `database`.
    pub async fn is_administrator_for(
        &self,
        principal: &Principal,
        mode: AnonymousAccessMode,
        database: &str,
    ) -> bool {
        match principal {
            Principal::Anonymous => mode == AnonymousAccessMode::Admin,
            Principal::Process => true,
            Principal::DatabaseScoped(claims) => claims.is_admin_of(database),
            Principal::Directory(user) => self.is_directory_admin(user).await,
        }
    }

    async fn is_directory_admin(&self, user: &DirectoryPrincipal) -> bool {
        if user.identity.is_some() && user.identity == self.process_identity {
            debug!(user = %user.name, "Caller runs as the server process");
            return true;
        }

        if self.admin_roles.matches_any(&user.roles) {
            debug!(user = %user.name, "Caller carries an admin role");
            return true;
        }

        let Some(identity) = &user.identity else {
            debug!(user = %user.name, "Caller identity unresolved, not an admin");
            return false;
        };

        self.cache
            .resolve(identity, || self.provider.is_admin_equivalent(&user.name))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryError, StaticGroupMembership};
    use crate::principal::DatabaseClaims;
    use async_trait::async_trait;
    use shared::config::LookupSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        inner: StaticGroupMembership,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GroupMembershipProvider for CountingProvider {
        async fn is_admin_equivalent(&self, name: &str) -> Result<bool, DirectoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.is_admin_equivalent(name).await
        }
    }

    fn engine() -> (AccessDecisionEngine, Arc<CountingProvider>) {
        let provider = Arc::new(CountingProvider {
            inner: StaticGroupMembership::new(["Domain Admins"])
                .with_user("CORP\\alice", ["Domain Admins"])
                .with_user("CORP\\bob", ["Sales"]),
            calls: AtomicUsize::new(0),
        });
        let engine = AccessDecisionEngine::new(
            provider.clone(),
            Arc::new(AdminLookupCache::new(LookupSettings::default())),
        )
        .with_process_identity(Identity::from("S-1-5-18"));
        (engine, provider)
    }

    fn user(name: &str, sid: Option<&str>) -> DirectoryPrincipal {
        DirectoryPrincipal::new(name, sid.map(Identity::from))
    }

    #[tokio::test]
    async fn test_anonymous_depends_on_mode() {
        let (engine, provider) = engine();

        for mode in [
            AnonymousAccessMode::None,
            AnonymousAccessMode::Get,
            AnonymousAccessMode::All,
        ] {
            assert!(!engine.is_administrator(&Principal::Anonymous, mode).await);
        }
        assert!(
            engine
                .is_administrator(&Principal::Anonymous, AnonymousAccessMode::Admin)
                .await
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_database_claims() {
        let (engine, provider) = engine();
        let scoped = Principal::DatabaseScoped(DatabaseClaims::new("token", ["Orders"]));
        let global = Principal::DatabaseScoped(DatabaseClaims::new("ops", ["*"]));
        let mode = AnonymousAccessMode::None;

        assert!(engine.is_administrator_for(&scoped, mode, "orders").await);
        assert!(!engine.is_administrator_for(&scoped, mode, "billing").await);
        assert!(!engine.is_administrator(&scoped, mode).await);
        assert!(engine.is_administrator(&global, mode).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_process_identity_is_trusted() {
        let (engine, provider) = engine();
        let service = Principal::Directory(user("NT AUTHORITY\\SYSTEM", Some("S-1-5-18")));

        assert!(engine.is_administrator(&service, AnonymousAccessMode::None).await);
        assert!(engine.is_administrator(&Principal::Process, AnonymousAccessMode::None).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admin_role_marker_skips_directory() {
        let (engine, provider) = engine();
        let local_admin = Principal::Directory(
            user("HOST\\carol", Some("S-1-5-21-7")).with_roles(["builtin\\administrators"]),
        );

        assert!(engine.is_administrator(&local_admin, AnonymousAccessMode::None).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(engine.cache().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_identity_is_not_admin() {
        let (engine, provider) = engine();
        let ghost = Principal::Directory(user("CORP\\alice", None));

        assert!(!engine.is_administrator(&ghost, AnonymousAccessMode::Admin).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_directory_lookup_is_cached() {
        let (engine, provider) = engine();
        let alice = Principal::Directory(user("CORP\\alice", Some("S-1-5-21-1")));
        let bob = Principal::Directory(user("CORP\\bob", Some("S-1-5-21-2")));

        for _ in 0..3 {
            assert!(engine.is_administrator(&alice, AnonymousAccessMode::None).await);
            assert!(!engine.is_administrator(&bob, AnonymousAccessMode::None).await);
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache().usage(&Identity::from("S-1-5-21-1")), Some(3));
    }

    #[tokio::test]
    async fn test_directory_failure_denies() {
        let (engine, provider) = engine();
        let stranger = Principal::Directory(user("CORP\\mallory", Some("S-1-5-21-9")));

        assert!(!engine.is_administrator(&stranger, AnonymousAccessMode::None).await);
        assert!(!engine.is_administrator(&stranger, AnonymousAccessMode::None).await);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cache().stats().failures, 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_vars(|key| match key {
            "BASTION_PROCESS_IDENTITY" => Some("S-1-5-20".to_string()),
            "BASTION_ADMIN_ROLES" => Some("Ops Admins".to_string()),
            "BASTION_LOOKUP_CAPACITY" => Some("4".to_string()),
            _ => None,
        });
        let engine = AccessDecisionEngine::from_config(
            &config,
            Arc::new(StaticGroupMembership::new(config.admin_groups.iter())),
        );

        assert_eq!(engine.process_identity, Some(Identity::from("S-1-5-20")));
        assert!(engine.admin_roles.matches_any(&["ops admins".to_string()]));
        assert_eq!(engine.cache().settings().capacity, 4);
    }
}
