// # Candidate IP Store
//
// In-memory, process-local set of collector addresses that the delivery loop
// dials directly instead of resolving the collector hostname every time.
//
// ## Lifecycle
//
// - Created by the delivery loop, handed out by `Arc` through `DeliveryLoop::store`
// - Grows through `add` (refill), shrinks through `remove` (failed delivery)
// - Never cleared; dropped together with the loop
//
// ## Concurrency
//
// Every read-modify-write happens under one `RwLock`, so concurrent adds on
// the same family never lose entries.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::traits::IpVersion;
use crate::{Error, Result};

/// Thread-safe keyed sequence of candidate IPs
///
/// Order is insertion order; entries already present are skipped on `add`.
///
/// # Example
///
/// ```rust
/// use setip_core::store::CandidateStore;
/// use setip_core::traits::IpVersion;
///
/// let store = CandidateStore::new();
/// store.add(IpVersion::V4, ["1.2.3.4".parse().unwrap()]);
/// store.add(IpVersion::V6, ["::1".parse().unwrap()]);
///
/// assert_eq!(store.count(), 2);
/// assert_eq!(store.len(IpVersion::V4), 1);
/// ```
#[derive(Debug, Default)]
pub struct CandidateStore {
    inner: RwLock<HashMap<IpVersion, Vec<IpAddr>>>,
}

impl CandidateStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<IpVersion, Vec<IpAddr>>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<IpVersion, Vec<IpAddr>>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `ips` to the sequence for `family`, creating it if absent
    ///
    /// An empty `ips` still creates the key; the family then counts as
    /// populated but has no candidates.
    pub fn add(&self, family: IpVersion, ips: impl IntoIterator<Item = IpAddr>) {
        let mut guard = self.write();
        let entries = guard.entry(family).or_default();

        for ip in ips {
            if !entries.contains(&ip) {
                entries.push(ip);
            }
        }

        debug!(family = %family, total = entries.len(), "candidates merged");
    }

    /// Remove every occurrence of `ip` from `family`
    ///
    /// Missing family or missing IP is a no-op.
    pub fn remove(&self, family: IpVersion, ip: &IpAddr) {
        let mut guard = self.write();
        match guard.get_mut(&family) {
            Some(entries) => entries.retain(|entry| entry != ip),
            None => warn!(family = %family, "IP type does not exist"),
        }
    }

    /// Snapshot of the candidates for `family`
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<IpAddr>)`: Candidates in insertion order (possibly empty)
    /// - `Err(Error::UnknownFamily)`: The family was never populated
    /// - `Err(Error::MalformedEntry)`: The bucket holds an address of the other family
    pub fn list(&self, family: IpVersion) -> Result<Vec<IpAddr>> {
        let guard = self.read();
        let entries = guard.get(&family).ok_or(Error::UnknownFamily(family))?;

        if let Some(bad) = entries.iter().find(|ip| IpVersion::of(ip) != family) {
            return Err(Error::MalformedEntry {
                family,
                entry: bad.to_string(),
            });
        }

        Ok(entries.clone())
    }

    /// Total number of candidates across all families
    ///
    /// The delivery loop refills when this reaches zero, even if only one
    /// family ran dry; use [`CandidateStore::len`] for a single family.
    pub fn count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    /// Number of candidates for one family
    pub fn len(&self, family: IpVersion) -> usize {
        self.read().get(&family).map_or(0, Vec::len)
    }

    /// Check if the store holds no candidates at all
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
