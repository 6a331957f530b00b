// # setip DNS Resolver
//
// This crate resolves the collector hostname through one DNS server at a time.
//
// ## Servers
//
// - `localhost`: the operating system resolver (getaddrinfo via tokio)
// - literal address: a hickory resolver pointed only at `<addr>:53` over UDP
//
// The per-server resolver is built for each call and holds no cache, so a
// refill always sees what the server answers right now.
//
// ## Retries
//
// None. One attempt per call, bounded by the configured timeout. The refill
// policy in setip-core moves on to the next server when a call fails.

use async_trait::async_trait;
use hickory_resolver::config::{LookupIpStrategy, NameServerConfig, ResolverConfig};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::TokioResolver;
use setip_core::traits::{DnsQueryResult, DnsServer, NameResolver};
use setip_core::{Error, Result};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Port explicit DNS servers are queried on
pub const DNS_PORT: u16 = 53;

/// Default lookup timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver that answers through the system or an explicit UDP server
#[derive(Debug, Clone)]
pub struct MultiServerResolver {
    timeout: Duration,
    port: u16,
}

impl MultiServerResolver {
    /// Create a resolver with the default 5 second timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            port: DNS_PORT,
        }
    }

    /// Query explicit servers on `port` instead of 53
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn lookup_system(&self, hostname: &str) -> Result<Vec<IpAddr>> {
        let lookup = tokio::time::timeout(self.timeout, tokio::net::lookup_host((hostname, 0)))
            .await
            .map_err(|_| Error::resolution("localhost", format!("lookup of {} timed out", hostname)))?
            .map_err(|e| {
                Error::resolution(
                    "localhost",
                    format!("failed to lookup IP locally for {}: {}", hostname, e),
                )
            })?;

        Ok(lookup.map(|addr| addr.ip()).collect())
    }

    async fn lookup_udp(&self, server: IpAddr, hostname: &str) -> Result<Vec<IpAddr>> {
        let resolver = self.udp_resolver(server);

        let lookup = resolver.lookup_ip(hostname).await.map_err(|e| {
            tracing::debug!(server = %server, error = %e, "hickory lookup failed");
            Error::resolution(
                server.to_string(),
                format!("failed to lookup IP for {}: {}", hostname, e),
            )
        })?;

        Ok(lookup.iter().collect())
    }

    /// Build a resolver that talks only to `server:port` over UDP
    fn udp_resolver(&self, server: IpAddr) -> TokioResolver {
        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(
            SocketAddr::new(server, self.port),
            Protocol::Udp,
        ));

        let mut builder =
            TokioResolver::builder_with_config(config, TokioConnectionProvider::default());

        let options = builder.options_mut();
        options.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        options.timeout = self.timeout;
        options.attempts = 1;
        options.cache_size = 0;

        builder.build()
    }
}

impl Default for MultiServerResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameResolver for MultiServerResolver {
    async fn resolve(&self, server: &DnsServer, hostname: &str) -> Result<DnsQueryResult> {
        tracing::debug!(server = %server, hostname = %hostname, "resolving collector");

        let addrs = match server {
            DnsServer::System => self.lookup_system(hostname).await?,
            DnsServer::Udp(ip) => self.lookup_udp(*ip, hostname).await?,
        };

        let result = DnsQueryResult::from_addrs(addrs);
        tracing::debug!(
            server = %server,
            ipv4 = result.ipv4.len(),
            ipv6 = result.ipv6.len(),
            "resolution complete"
        );

        Ok(result)
    }
}
