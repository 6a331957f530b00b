// # Delivery Trait
//
// Defines how a request reaches the collector through one literal IP while
// still presenting the collector's hostname as the virtual host.
//
// ## Implementations
//
// - reqwest-based: `setip-http` crate

use async_trait::async_trait;
use std::net::IpAddr;

/// Raw collector response
///
/// Non-2xx statuses are still responses; interpreting them is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for direct-to-IP delivery implementations
///
/// One call is one attempt: no retries, no candidate selection. The delivery
/// loop decides what happens after a failure.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// Send `body` to `url`, dialing `ip` instead of resolving the URL's host
    ///
    /// # Parameters
    ///
    /// - `url`: Logical collector URL; its host is the virtual host
    /// - `ip`: Literal address to connect to
    /// - `method`: HTTP method, `GET` when empty
    /// - `body`: Request body, empty when `None`
    ///
    /// # Returns
    ///
    /// - `Ok(DeliveryResponse)`: Any HTTP response, whatever its status
    /// - `Err(Error::Connect)`: Network failure or timeout
    /// - `Err(Error::Request)`: Inputs could not form a request
    async fn deliver(
        &self,
        url: &str,
        ip: IpAddr,
        method: &str,
        body: Option<&[u8]>,
    ) -> Result<DeliveryResponse, crate::Error>;
}
