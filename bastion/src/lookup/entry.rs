use crate::identity::Identity;
use serde::Serialize;
use shared::config::LookupSettings;
use std::time::Duration;
use tokio::time::Instant;

/// Cached outcome of one group membership lookup.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CacheEntry {
    pub value: bool,
    /// Reads plus writes since the entry was first created, kept across refreshes.
    pub usage: u64,
    /// When `value` was last computed; hits leave it alone.
    pub written_at: Instant,
    /// `value` stands in for a failed lookup.
    pub failed: bool,
}

impl CacheEntry {
    pub fn new(value: bool, failed: bool, written_at: Instant) -> Self {
        Self {
            value,
            usage: 1,
            written_at,
            failed,
        }
    }

    /// Replace the value of a stale entry, carrying its usage forward.
    pub fn refreshed(&self, value: bool, failed: bool, written_at: Instant) -> Self {
        Self {
            value,
            usage: self.usage + 1,
            written_at,
            failed,
        }
    }

    pub fn ttl(&self, settings: &LookupSettings) -> Duration {
        if self.failed {
            settings.failure_ttl
        } else {
            settings.ttl
        }
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.written_at)
    }

    pub fn is_stale(&self, now: Instant, settings: &LookupSettings) -> bool {
        self.age(now) > self.ttl(settings)
    }
}

/// Point-in-time view of a cached entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    pub identity: Identity,
    pub is_admin: bool,
    pub usage: u64,
    pub age_ms: u64,
    pub stale: bool,
    pub from_failure: bool,
}
