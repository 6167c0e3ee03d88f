use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Database name (or `*`) granting admin rights over every database.
pub const ALL_DATABASES: &str = "*";

/// Caller of a request, resolved once at the edge of the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// No credentials were presented.
    Anonymous,
    /// Work issued by the server process itself.
    Process,
    /// A user authenticated against the host or domain directory.
    Directory(DirectoryPrincipal),
    /// A token-authenticated user carrying per-database admin claims.
    DatabaseScoped(DatabaseClaims),
}

impl Principal {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Principal::Anonymous)
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Principal::Anonymous | Principal::Process => None,
            Principal::Directory(p) => Some(&p.name),
            Principal::DatabaseScoped(c) => Some(&c.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPrincipal {
    /// Account name used for directory queries, e.g. `CORP\alice`.
    pub name: String,
    /// `None` when the identity provider could not map the account to a stable key.
    pub identity: Option<Identity>,
    /// Role markers supplied directly by the identity provider.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl DirectoryPrincipal {
    pub fn new(name: impl Into<String>, identity: Option<Identity>) -> Self {
        Self {
            name: name.into(),
            identity,
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseClaims {
    pub name: String,
    #[serde(default)]
    pub admin_databases: Vec<String>,
}

impl DatabaseClaims {
    pub fn new<I, S>(name: impl Into<String>, admin_databases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            admin_databases: admin_databases.into_iter().map(Into::into).collect(),
        }
    }

    /// Named entries compare case-insensitively; `*` matches any database.
    pub fn is_admin_of(&self, database: &str) -> bool {
        self.admin_databases
            .iter()
            .any(|db| db == ALL_DATABASES || db.eq_ignore_ascii_case(database))
    }
}
