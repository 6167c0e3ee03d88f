use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// What an unauthenticated caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnonymousAccessMode {
    #[default]
    None,
    Get,
    All,
    Admin,
}

impl FromStr for AnonymousAccessMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "get" => Ok(Self::Get),
            "all" => Ok(Self::All),
            "admin" => Ok(Self::Admin),
            other => Err(Error::Config(format!("unknown anonymous access mode '{other}'"))),
        }
    }
}

impl fmt::Display for AnonymousAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Get => "get",
            Self::All => "all",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// Bounds for the admin lookup cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupSettings {
    pub capacity: usize,
    pub ttl: Duration,
    /// TTL applied to negative results caused by a directory failure.
    pub failure_ttl: Duration,
}

impl LookupSettings {
    pub const DEFAULT_CAPACITY: usize = 1024;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            ttl: Self::DEFAULT_TTL,
            failure_ttl: Self::DEFAULT_TTL,
        }
    }
}

pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub lookup: LookupSettings,
    pub anonymous_access: AnonymousAccessMode,
    pub admin_roles: Vec<String>,
    pub admin_groups: Vec<String>,
    pub process_identity: Option<String>,
    pub directory_file: Option<String>,
    pub local_groups_file: Option<String>,
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_ADMIN_ROLES: &str = "BUILTIN\\Administrators";
    const DEFAULT_ADMIN_GROUPS: &str = "Administrators,Domain Admins,Enterprise Admins";

    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl = parse_or(&var, "BASTION_LOOKUP_TTL_SECS", LookupSettings::DEFAULT_TTL.as_secs());
        let failure_ttl = parse_or(&var, "BASTION_LOOKUP_FAILURE_TTL_SECS", ttl);
        let capacity = parse_or(
            &var,
            "BASTION_LOOKUP_CAPACITY",
            LookupSettings::DEFAULT_CAPACITY,
        );

        let anonymous_access = match var("BASTION_ANONYMOUS_ACCESS") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{e}, falling back to 'none'");
                AnonymousAccessMode::None
            }),
            None => AnonymousAccessMode::None,
        };

        Self {
            host: var("BASTION_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string()),
            http_port: parse_or(&var, "BASTION_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            lookup: LookupSettings {
                capacity: capacity.max(1),
                ttl: Duration::from_secs(ttl),
                failure_ttl: Duration::from_secs(failure_ttl),
            },
            anonymous_access,
            admin_roles: split_list(
                &var("BASTION_ADMIN_ROLES").unwrap_or_else(|| Self::DEFAULT_ADMIN_ROLES.to_string()),
            ),
            admin_groups: split_list(
                &var("BASTION_ADMIN_GROUPS")
                    .unwrap_or_else(|| Self::DEFAULT_ADMIN_GROUPS.to_string()),
            ),
            process_identity: var("BASTION_PROCESS_IDENTITY").filter(|s| !s.trim().is_empty()),
            directory_file: var("BASTION_DIRECTORY_FILE").filter(|s| !s.trim().is_empty()),
            local_groups_file: var("BASTION_LOCAL_GROUPS_FILE").filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + fmt::Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{key}='{raw}' is not valid, using default {default}");
            default
        }),
        None => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
