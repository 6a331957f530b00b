// # Name Resolver Trait
//
// Defines how the collector hostname is looked up through a single DNS server.
//
// ## Implementations
//
// - System + hickory-based: `setip-dns` crate
//
// ## Usage
//
// ```rust,ignore
// use setip_core::traits::{DnsServer, NameResolver};
//
// let server: DnsServer = "1.1.1.1".parse()?;
// let result = resolver.resolve(&server, "ddns.setip.eu.org").await?;
// println!("v4={:?} v6={:?}", result.ipv4, result.ipv6);
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Sentinel server name meaning "use the operating system resolver"
pub const SYSTEM_RESOLVER: &str = "localhost";

/// Default DNS servers, queried in this order during a refill
pub const DEFAULT_DNS_SERVERS: &[&str] = &[
    SYSTEM_RESOLVER,
    "1.1.1.1",
    "223.5.5.5",
    "119.29.29.29",
    "8.8.8.8",
];

/// Address family bucket (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IpVersion {
    #[serde(rename = "ipv4")]
    V4,
    #[serde(rename = "ipv6")]
    V6,
}

impl IpVersion {
    /// Family of a parsed address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Family of an address literal; any `:` means IPv6
    pub fn of_literal(ip: &str) -> Self {
        if ip.contains(':') {
            IpVersion::V6
        } else {
            IpVersion::V4
        }
    }

    /// The other family
    pub fn toggled(self) -> Self {
        match self {
            IpVersion::V4 => IpVersion::V6,
            IpVersion::V6 => IpVersion::V4,
        }
    }

    /// Store key for this family
    pub fn as_str(self) -> &'static str {
        match self {
            IpVersion::V4 => "ipv4",
            IpVersion::V6 => "ipv6",
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNS server to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DnsServer {
    /// The operating system's default resolution mechanism
    System,
    /// A literal server address, queried over UDP port 53
    Udp(IpAddr),
}

impl FromStr for DnsServer {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(SYSTEM_RESOLVER) {
            return Ok(DnsServer::System);
        }

        s.trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(DnsServer::Udp)
            .map_err(|_| crate::Error::config(format!("Invalid DNS server: {}", s)))
    }
}

impl fmt::Display for DnsServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsServer::System => f.write_str(SYSTEM_RESOLVER),
            DnsServer::Udp(ip) => write!(f, "{}", ip),
        }
    }
}

/// Addresses returned by one (server, hostname) query, split by family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DnsQueryResult {
    pub ipv4: Vec<IpAddr>,
    pub ipv6: Vec<IpAddr>,
}

impl DnsQueryResult {
    /// Classify resolved addresses into v4 and v6 buckets
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) land in the v4 bucket.
    pub fn from_addrs(addrs: impl IntoIterator<Item = IpAddr>) -> Self {
        let mut result = Self::default();
        for ip in addrs {
            let ip = ip.to_canonical();
            match IpVersion::of(&ip) {
                IpVersion::V4 => result.ipv4.push(ip),
                IpVersion::V6 => result.ipv6.push(ip),
            }
        }
        result
    }

    /// Addresses for one family
    pub fn family(&self, version: IpVersion) -> &[IpAddr] {
        match version {
            IpVersion::V4 => &self.ipv4,
            IpVersion::V6 => &self.ipv6,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }
}

/// Trait for DNS resolver implementations
///
/// A resolver answers for a single server per call and never retries;
/// walking the server list is the job of [`crate::RefillPolicy`].
///
/// # Errors
///
/// Implementations return [`crate::Error::Resolution`] on timeout,
/// unreachable server or NXDOMAIN.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Resolve `hostname` (A and AAAA) through `server`
    async fn resolve(&self, server: &DnsServer, hostname: &str)
        -> Result<DnsQueryResult, crate::Error>;
}
