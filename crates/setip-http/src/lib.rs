// # Direct-IP Delivery
//
// This crate sends requests to the collector through a literal IP address
// while keeping the collector's hostname as the virtual host.
//
// ## How the override works
//
// The request URL keeps the logical hostname, so the Host header and the TLS
// SNI both carry it. The client is built with a `resolve` entry mapping that
// hostname to the candidate IP, which means no DNS lookup happens and the TCP
// connection goes straight to `ip:443`.
//
// ## Constraints
//
// - HTTPS only, port 443 only
// - 5 second connect timeout, no overall deadline
// - One attempt per call; the delivery loop owns eviction and retries
// - Proxies from the environment are ignored, they would defeat the override

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use setip_core::traits::{Delivery, DeliveryResponse, IpVersion};
use setip_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use url::Url;

/// The only port the collector is reached on
pub const HTTPS_PORT: u16 = 443;

/// Default connect timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Socket address for a candidate literal, e.g. `[2001:db8::1]:443`
///
/// Any `:` marks the literal as IPv6; it may already be bracketed.
pub fn dial_address(ip: &str) -> Result<SocketAddr> {
    let ip = ip.trim();

    let parsed = match IpVersion::of_literal(ip) {
        IpVersion::V6 => {
            let bare = ip
                .strip_prefix('[')
                .and_then(|s| s.strip_suffix(']'))
                .unwrap_or(ip);
            bare.parse::<Ipv6Addr>().map(IpAddr::V6).ok()
        }
        IpVersion::V4 => ip.parse::<Ipv4Addr>().map(IpAddr::V4).ok(),
    };

    parsed
        .map(|addr| SocketAddr::new(addr, HTTPS_PORT))
        .ok_or_else(|| Error::request(format!("invalid IP address: {}", ip)))
}

/// Where a request is physically sent, and the name it is sent under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectTarget {
    /// Logical request URL
    pub url: Url,
    /// Virtual host presented to the collector
    pub host: String,
    /// Socket actually dialed
    pub dial: SocketAddr,
}

impl DirectTarget {
    /// Pair a logical URL with a candidate IP literal
    ///
    /// # Errors
    ///
    /// `Error::Request` when the URL does not parse, is not https on port 443,
    /// has no host, or when `ip` is not an address literal.
    pub fn new(url: &str, ip: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::request(format!("parsing URL error: {}", e)))?;

        if url.scheme() != "https" {
            return Err(Error::request(format!("only https is supported, got {}", url.scheme())));
        }
        if url.port_or_known_default() != Some(HTTPS_PORT) {
            return Err(Error::request(format!(
                "collector must listen on port {}, URL names {:?}",
                HTTPS_PORT,
                url.port()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::request(format!("URL has no host: {}", url)))?
            .to_string();
        let dial = dial_address(ip)?;

        Ok(Self { url, host, dial })
    }

    pub fn family(&self) -> IpVersion {
        IpVersion::of(&self.dial.ip())
    }
}

/// reqwest-backed direct-to-IP delivery
#[derive(Debug, Clone)]
pub struct DirectIpDelivery {
    connect_timeout: Duration,
}

impl DirectIpDelivery {
    /// Create a delivery with the default 5 second connect timeout
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Send one request to `url` through the literal `ip`
    ///
    /// # Parameters
    ///
    /// - `url`: Logical URL, its host becomes the virtual host
    /// - `ip`: IPv4 or IPv6 literal (brackets optional)
    /// - `method`: HTTP method, `GET` when empty
    /// - `body`: Request body, empty when `None`
    ///
    /// # Returns
    ///
    /// The raw response, whatever its status.
    pub async fn send(
        &self,
        url: &str,
        ip: &str,
        method: &str,
        body: Option<&[u8]>,
    ) -> Result<DeliveryResponse> {
        let target = DirectTarget::new(url, ip)?;
        let method = parse_method(method)?;

        let client = reqwest::Client::builder()
            .resolve(&target.host, target.dial)
            .connect_timeout(self.connect_timeout)
            .no_proxy()
            .build()
            .map_err(|e| Error::request(format!("creating client error: {}", e)))?;

        tracing::debug!(
            host = %target.host,
            dial = %target.dial,
            family = %target.family(),
            method = %method,
            "sending direct request"
        );

        let response = client
            .request(method, target.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body.map(<[u8]>::to_vec).unwrap_or_default())
            .send()
            .await
            .map_err(|e| connect_error(&target, "making request error", e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| connect_error(&target, "reading response error", e))?
            .to_vec();

        tracing::debug!(dial = %target.dial, status, "collector answered");
        Ok(DeliveryResponse { status, body })
    }
}

impl Default for DirectIpDelivery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Delivery for DirectIpDelivery {
    async fn deliver(
        &self,
        url: &str,
        ip: IpAddr,
        method: &str,
        body: Option<&[u8]>,
    ) -> Result<DeliveryResponse> {
        self.send(url, &ip.to_string(), method, body).await
    }
}

fn parse_method(method: &str) -> Result<Method> {
    if method.is_empty() {
        return Ok(Method::GET);
    }

    Method::from_bytes(method.as_bytes())
        .map_err(|_| Error::request(format!("invalid HTTP method: {:?}", method)))
}

fn connect_error(target: &DirectTarget, context: &str, err: reqwest::Error) -> Error {
    let reason = if err.is_timeout() { "timed out" } else { "failed" };
    Error::connect(
        target.dial.ip().to_string(),
        format!("{} ({}): {}", context, reason, err),
    )
}
