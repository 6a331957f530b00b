//! Refill policy
//!
//! Walks the configured DNS servers in order and merges whatever each one
//! returns into the [`CandidateStore`]. A server that fails is logged and
//! skipped; the walk never stops early.

use tracing::{debug, info, warn};

use crate::store::CandidateStore;
use crate::traits::{DnsServer, IpVersion, NameResolver};

/// Outcome of one refill pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefillSummary {
    /// Servers that answered
    pub answered: usize,
    /// Servers whose lookup failed
    pub failed: usize,
    /// Candidates in the store after the pass
    pub candidates: usize,
}

/// Resolves the collector hostname across every server and fills the store
pub struct RefillPolicy {
    resolver: Box<dyn NameResolver>,
    servers: Vec<DnsServer>,
    hostname: String,
}

impl RefillPolicy {
    /// Create a refill policy
    ///
    /// # Parameters
    ///
    /// - `resolver`: Resolver used for each server
    /// - `servers`: Servers to query, in order
    /// - `hostname`: Collector hostname to resolve
    pub fn new(
        resolver: Box<dyn NameResolver>,
        servers: Vec<DnsServer>,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            servers,
            hostname: hostname.into(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn servers(&self) -> &[DnsServer] {
        &self.servers
    }

    /// Query every server and merge the results into `store`
    ///
    /// If all servers fail the store is left as it was.
    pub async fn refill(&self, store: &CandidateStore) -> RefillSummary {
        let mut summary = RefillSummary::default();

        for server in &self.servers {
            match self.resolver.resolve(server, &self.hostname).await {
                Ok(result) => {
                    debug!(
                        server = %server,
                        ipv4 = result.ipv4.len(),
                        ipv6 = result.ipv6.len(),
                        "DNS query answered"
                    );
                    summary.answered += 1;

                    for family in [IpVersion::V4, IpVersion::V6] {
                        let ips = result.family(family);
                        if !ips.is_empty() {
                            store.add(family, ips.iter().copied());
                        }
                    }
                }
                Err(e) => {
                    warn!(server = %server, error = %e, "Failed to query DNS");
                    summary.failed += 1;
                }
            }
        }

        summary.candidates = store.count();
        info!(
            answered = summary.answered,
            failed = summary.failed,
            candidates = summary.candidates,
            "Candidate refill finished"
        );

        summary
    }
}
