//! Core traits for the setip agent
//!
//! These are the seams between the delivery loop and the outside world.
//!
//! - [`NameResolver`]: Look up the collector hostname through one DNS server
//! - [`Delivery`]: Send a request to the collector through one literal IP
//! - [`AddressSource`]: Enumerate the host's public interface addresses

pub mod address_source;
pub mod delivery;
pub mod resolver;

pub use address_source::AddressSource;
pub use delivery::{Delivery, DeliveryResponse};
pub use resolver::{DnsQueryResult, DnsServer, IpVersion, NameResolver};
