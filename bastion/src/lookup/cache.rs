use super::entry::{CacheEntry, EntrySnapshot};
use super::stats::{CacheCounters, CacheStats};
use crate::directory::DirectoryError;
use crate::identity::Identity;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::config::LookupSettings;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Bounded, time-limited cache of "is this identity an administrator" lookups.
///
/// Fresh hits only bump the entry's usage counter. Misses and stale entries run the
/// supplied lookup once per identity, however many callers are waiting on it. When
/// an insert pushes the cache over capacity, the inserting caller sweeps expired
/// entries first, then trims the least used ones, sparing the entry it just wrote.
pub struct AdminLookupCache {
    entries: DashMap<Identity, CacheEntry>,
    // Identities with a lookup in progress; callers join the pending result.
    in_flight: DashMap<Identity, Flight>,
    settings: LookupSettings,
    counters: CacheCounters,
}

impl AdminLookupCache {
    pub fn new(settings: LookupSettings) -> Self {
        Self {
            entries: DashMap::new(),
            in_flight: DashMap::new(),
            settings: LookupSettings {
                capacity: settings.capacity.max(1),
                ..settings
            },
            counters: CacheCounters::default(),
        }
    }

    /// Create with the default bounds (1024 entries, 15 minute TTL)
    pub fn with_defaults() -> Self {
        Self::new(LookupSettings::default())
    }

    pub fn settings(&self) -> &LookupSettings {
        &self.settings
    }

    /// Return the cached outcome for `identity`, running `lookup` when there is none
    /// or it has gone stale.
    ///
    /// A failed lookup resolves to `false`; the failure is logged and cached for
    /// the failure TTL, never returned.
    pub async fn resolve<F, Fut>(&self, identity: &Identity, lookup: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool, DirectoryError>>,
    {
        if let Some(value) = self.hit(identity, Instant::now()) {
            return value;
        }

        // Dropping the seat, on return or cancellation, releases the marker once
        // nobody else waits on it.
        let seat = FlightSeat::join(&self.in_flight, identity);

        let mut led = false;
        let value = *seat
            .cell
            .get_or_init(|| {
                led = true;
                self.compute_and_store(identity, lookup)
            })
            .await;

        if !led {
            // Joined someone else's lookup; count it as a use of the entry they wrote.
            if let Some(mut entry) = self.entries.get_mut(identity) {
                entry.usage += 1;
            }
            self.counters.record_hit();
        }

        value
    }

    fn hit(&self, identity: &Identity, now: Instant) -> Option<bool> {
        let mut entry = self.entries.get_mut(identity)?;
        if entry.is_stale(now, &self.settings) {
            return None;
        }
        entry.usage += 1;
        self.counters.record_hit();
        Some(entry.value)
    }

    async fn compute_and_store<F, Fut>(&self, identity: &Identity, lookup: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<bool, DirectoryError>>,
    {
        // An earlier flight may have finished between our miss and taking the slot.
        if let Some(value) = self.hit(identity, Instant::now()) {
            return value;
        }

        let (value, failed) = match lookup().await {
            Ok(value) => (value, false),
            Err(e) => {
                warn!(
                    identity = %identity,
                    error = %e,
                    "Admin group lookup failed, treating identity as non-admin"
                );
                self.counters.record_failure();
                (false, true)
            }
        };

        let written_at = Instant::now();
        match self.entries.entry(identity.clone()) {
            Entry::Occupied(mut occupied) => {
                let refreshed = occupied.get().refreshed(value, failed, written_at);
                occupied.insert(refreshed);
                self.counters.record_refresh();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, failed, written_at));
                self.counters.record_miss();
            }
        }
        debug!(identity = %identity, is_admin = value, "Cached admin lookup");

        if self.entries.len() > self.settings.capacity {
            self.evict(identity, Instant::now());
        }

        value
    }

    /// Bring the cache back under capacity, keeping `protected` no matter how it ranks.
    fn evict(&self, protected: &Identity, now: Instant) {
        self.entries.retain(|identity, entry| {
            if identity == protected || !entry.is_stale(now, &self.settings) {
                return true;
            }
            info!(
                identity = %identity,
                usage = entry.usage,
                reason = "expired",
                "Evicting admin lookup entry"
            );
            self.counters.record_expired_eviction();
            false
        });

        let capacity = self.settings.capacity;
        if self.entries.len() <= capacity {
            return;
        }

        let mut ranked: Vec<(Identity, u64, Instant)> = self
            .entries
            .iter()
            .filter(|e| e.key() != protected)
            .map(|e| (e.key().clone(), e.usage, e.written_at))
            .collect();

        // Most used first; among equals the most recently written wins.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.2.cmp(&a.2)));

        let keep = if self.entries.contains_key(protected) {
            capacity - 1
        } else {
            capacity
        };

        for (identity, usage, written_at) in ranked.into_iter().skip(keep) {
            // Skip entries refreshed since the ranking was taken.
            let removed = self
                .entries
                .remove_if(&identity, |_, entry| entry.written_at == written_at);
            if removed.is_some() {
                info!(
                    identity = %identity,
                    usage,
                    reason = "usage",
                    "Evicting admin lookup entry"
                );
                self.counters.record_usage_eviction();
            }
        }
    }

    /// Drop the cached outcome for one identity
    pub fn invalidate(&self, identity: &Identity) -> bool {
        self.entries.remove(identity).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn usage(&self, identity: &Identity) -> Option<u64> {
        self.entries.get(identity).map(|e| e.usage)
    }

    pub fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(self.entries.len(), self.settings.capacity)
    }

    /// List every entry, most used first
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let now = Instant::now();
        let mut entries: Vec<EntrySnapshot> = self
            .entries
            .iter()
            .map(|e| EntrySnapshot {
                identity: e.key().clone(),
                is_admin: e.value,
                usage: e.usage,
                age_ms: u64::try_from(e.age(now).as_millis()).unwrap_or(u64::MAX),
                stale: e.is_stale(now, &self.settings),
                from_failure: e.failed,
            })
            .collect();
        entries.sort_by(|a, b| b.usage.cmp(&a.usage).then_with(|| a.age_ms.cmp(&b.age_ms)));
        entries
    }
}

/// A pending lookup and the number of callers waiting on it.
struct Flight {
    cell: Arc<OnceCell<bool>>,
    waiters: usize,
}

/// One caller's place in an in-flight lookup.
///
/// If the caller running the lookup is dropped, the next waiter in `get_or_init`
/// runs its own lookup instead.
struct FlightSeat<'a> {
    flights: &'a DashMap<Identity, Flight>,
    identity: &'a Identity,
    cell: Arc<OnceCell<bool>>,
}

impl<'a> FlightSeat<'a> {
    fn join(flights: &'a DashMap<Identity, Flight>, identity: &'a Identity) -> Self {
        let cell = {
            let mut flight = flights.entry(identity.clone()).or_insert_with(|| Flight {
                cell: Arc::new(OnceCell::new()),
                waiters: 0,
            });
            flight.waiters += 1;
            flight.cell.clone()
        };
        Self {
            flights,
            identity,
            cell,
        }
    }
}

impl Drop for FlightSeat<'_> {
    fn drop(&mut self) {
        self.flights.remove_if_mut(self.identity, |_, flight| {
            if !Arc::ptr_eq(&flight.cell, &self.cell) {
                return false;
            }
            flight.waiters -= 1;
            // A finished marker must go even with waiters left, or a later stale
            // refresh would join it and read the old value.
            flight.waiters == 0 || flight.cell.initialized()
        });
    }
}

impl Debug for AdminLookupCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminLookupCache")
            .field("entry_count", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .field("settings", &self.settings)
            .finish()
    }
}
