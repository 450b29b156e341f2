//! Per-client record cache with single-flight fetching.
//!
//! Each identifier maps to a slot that holds either a stored record or the
//! fetch currently in flight for it. The first caller for an identifier
//! starts the fetch as a shared future; concurrent callers for the same
//! identifier await that future and receive its outcome, errors included.
//! Whichever caller is polling drives the fetch, so dropping the caller that
//! started it does not strand the others. Once the outcome is delivered the
//! slot either becomes a stored record or is removed, so errors are never
//! cached. Map guards are only held for synchronous bookkeeping, never across
//! an `.await`, so callers for different identifiers do not block each other.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::config::CacheConfig;
use crate::StoreResult;
use cxinfo_core::types::{ExtensionId, ExtensionRecord};

/// Cached record with the time it was stored
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cached record
    pub record: ExtensionRecord,
    /// When the entry was stored
    pub stored_at: SystemTime,
    /// Insertion order, used for capacity eviction
    order: u64,
}

impl CacheEntry {
    fn new(record: ExtensionRecord, order: u64) -> Self {
        Self {
            record,
            stored_at: SystemTime::now(),
            order,
        }
    }

    /// Check if the entry is still fresh under `ttl`; no TTL never expires
    pub fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        let Some(ttl) = ttl else {
            return true;
        };
        match self.stored_at.elapsed() {
            Ok(elapsed) => elapsed < ttl,
            Err(_) => false, // Clock went backwards, consider stale
        }
    }

    /// Get age of cache entry
    pub fn age(&self) -> Option<Duration> {
        self.stored_at.elapsed().ok()
    }
}

type SharedFetch = Shared<BoxFuture<'static, StoreResult<ExtensionRecord>>>;

/// A fetch in progress for one identifier
#[derive(Clone)]
struct InFlight {
    fetch: SharedFetch,
    /// Tells this fetch apart from later ones for the same identifier
    token: u64,
    /// Callers currently awaiting `fetch`
    waiters: Arc<AtomicUsize>,
}

impl InFlight {
    /// Register one more caller; only called under the map guard
    fn join(&self) -> Self {
        self.waiters.fetch_add(1, Ordering::SeqCst);
        self.clone()
    }
}

enum Slot {
    Ready(CacheEntry),
    Fetching(InFlight),
}

impl Slot {
    fn entry(&self) -> Option<&CacheEntry> {
        match self {
            Slot::Ready(entry) => Some(entry),
            Slot::Fetching(_) => None,
        }
    }

    fn is_fetch(&self, token: u64) -> bool {
        matches!(self, Slot::Fetching(in_flight) if in_flight.token == token)
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Ready(entry) => f.debug_tuple("Ready").field(entry).finish(),
            Slot::Fetching(in_flight) => f
                .debug_struct("Fetching")
                .field("token", &in_flight.token)
                .field("waiters", &in_flight.waiters.load(Ordering::SeqCst))
                .finish(),
        }
    }
}

/// In-memory record cache keyed by canonical identifier
#[derive(Debug, Default)]
pub struct ExtensionCache {
    slots: DashMap<ExtensionId, Slot>,
    policy: CacheConfig,
    next_order: AtomicU64,
}

impl ExtensionCache {
    /// Create an unbounded cache whose entries never expire
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CacheConfig) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &CacheConfig {
        &self.policy
    }

    /// Return the cached record for `id`, fetching it at most once across
    /// concurrent callers.
    ///
    /// Callers that arrive while a fetch is in flight receive that fetch's
    /// outcome, success or error. Only successes are stored.
    pub async fn get_or_fetch<F, Fut>(&self, id: &ExtensionId, fetch: F) -> StoreResult<ExtensionRecord>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<ExtensionRecord>> + Send + 'static,
    {
        let ttl = self.policy.ttl();
        let in_flight = match self.slots.entry(id.clone()) {
            Entry::Occupied(mut occupied) => {
                let joined = match occupied.get() {
                    Slot::Ready(entry) if entry.is_fresh(ttl) => {
                        debug!(%id, "cache hit");
                        return Ok(entry.record.clone());
                    }
                    Slot::Fetching(in_flight) => {
                        debug!(%id, "joining in-flight fetch");
                        Some(in_flight.join())
                    }
                    Slot::Ready(_) => None,
                };
                match joined {
                    Some(in_flight) => in_flight,
                    None => {
                        debug!(%id, "cache entry expired, fetching");
                        let in_flight = self.start(fetch);
                        occupied.insert(Slot::Fetching(in_flight.clone()));
                        in_flight.join()
                    }
                }
            }
            Entry::Vacant(vacant) => {
                debug!(%id, "cache miss, fetching");
                let in_flight = self.start(fetch);
                vacant.insert(Slot::Fetching(in_flight.clone()));
                in_flight.join()
            }
        };

        let mut waiter = Waiter {
            cache: self,
            id,
            token: in_flight.token,
            waiters: Arc::clone(&in_flight.waiters),
            delivered: false,
        };
        let outcome = in_flight.fetch.await;
        waiter.delivered = true;

        if self.settle(id, in_flight.token, &outcome) {
            self.enforce_capacity();
        }
        outcome
    }

    /// Get a cached record if present and fresh
    pub fn lookup(&self, id: &ExtensionId) -> Option<ExtensionRecord> {
        let slot = self.slots.get(id)?;
        slot.value()
            .entry()
            .filter(|entry| entry.is_fresh(self.policy.ttl()))
            .map(|entry| entry.record.clone())
    }

    /// Store a record directly, replacing any previous entry
    pub fn store(&self, record: ExtensionRecord) {
        let id = record.id().clone();
        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        self.slots.insert(id, Slot::Ready(CacheEntry::new(record, order)));
        self.enforce_capacity();
    }

    /// Check if a fresh record is cached for `id`
    pub fn contains(&self, id: &ExtensionId) -> bool {
        self.lookup(id).is_some()
    }

    /// Number of stored records, fresh or stale
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().entry().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches currently in flight
    pub fn in_flight(&self) -> usize {
        self.slots.iter().filter(|slot| slot.value().entry().is_none()).count()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let ttl = self.policy.ttl();
        let mut fresh_entries = 0;
        let mut stale_entries = 0;

        for slot in self.slots.iter() {
            match slot.value().entry() {
                Some(entry) if entry.is_fresh(ttl) => fresh_entries += 1,
                Some(_) => stale_entries += 1,
                None => {}
            }
        }

        CacheStats {
            total_entries: fresh_entries + stale_entries,
            fresh_entries,
            stale_entries,
        }
    }

    /// Clear all cached entries. In-flight fetches finish but are not kept.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Remove stale entries, returning how many were removed
    pub fn cleanup(&self) -> usize {
        let ttl = self.policy.ttl();
        let mut removed = 0;
        self.slots.retain(|_, slot| {
            let keep = slot.entry().map_or(true, |entry| entry.is_fresh(ttl));
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    fn start<F, Fut>(&self, fetch: F) -> InFlight
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<ExtensionRecord>> + Send + 'static,
    {
        InFlight {
            fetch: fetch().boxed().shared(),
            token: self.next_order.fetch_add(1, Ordering::Relaxed),
            waiters: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the in-flight slot with its outcome. Returns true when a
    /// record was stored.
    fn settle(&self, id: &ExtensionId, token: u64, outcome: &StoreResult<ExtensionRecord>) -> bool {
        let Entry::Occupied(mut occupied) = self.slots.entry(id.clone()) else {
            return false;
        };
        // Another waiter settled first, or the slot was cleared or replaced
        if !occupied.get().is_fetch(token) {
            return false;
        }

        match outcome {
            Ok(record) => {
                let order = self.next_order.fetch_add(1, Ordering::Relaxed);
                occupied.insert(Slot::Ready(CacheEntry::new(record.clone(), order)));
                true
            }
            Err(error) => {
                debug!(%id, %error, "fetch failed, nothing cached");
                occupied.remove();
                false
            }
        }
    }

    /// Evict the oldest stored records until the capacity limit holds
    fn enforce_capacity(&self) {
        let Some(max_entries) = self.policy.max_entries else {
            return;
        };

        loop {
            let mut stored = 0;
            let mut oldest: Option<(u64, ExtensionId)> = None;
            for slot in self.slots.iter() {
                if let Some(entry) = slot.value().entry() {
                    stored += 1;
                    if oldest.as_ref().map_or(true, |(order, _)| entry.order < *order) {
                        oldest = Some((entry.order, slot.key().clone()));
                    }
                }
            }

            match oldest {
                Some((_, id)) if stored > max_entries => {
                    debug!(%id, max_entries, "evicting oldest cache entry");
                    self.slots.remove(&id);
                }
                _ => break,
            }
        }
    }
}

/// One caller's registration on an in-flight fetch.
///
/// When the last waiter is dropped before the outcome arrives, the fetch is
/// abandoned and its slot removed so the next caller starts afresh.
struct Waiter<'a> {
    cache: &'a ExtensionCache,
    id: &'a ExtensionId,
    token: u64,
    waiters: Arc<AtomicUsize>,
    delivered: bool,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let remaining = self.waiters.fetch_sub(1, Ordering::SeqCst) - 1;
        if self.delivered || remaining > 0 {
            return;
        }

        // A caller may have joined between the decrement and this removal
        let token = self.token;
        let abandoned = self.cache.slots.remove_if(self.id, |_, slot| {
            matches!(slot, Slot::Fetching(in_flight)
                if in_flight.token == token && in_flight.waiters.load(Ordering::SeqCst) == 0)
        });
        if abandoned.is_some() {
            debug!(id = %self.id, "all callers cancelled, fetch abandoned");
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of stored records
    pub total_entries: usize,
    /// Number of fresh entries
    pub fresh_entries: usize,
    /// Number of stale entries
    pub stale_entries: usize,
}

#[cfg(test)]
mod tests;
