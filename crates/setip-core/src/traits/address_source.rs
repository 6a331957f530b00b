// # Address Source Trait
//
// Produces the snapshot of local public addresses that goes into each report.
//
// ## Implementations
//
// - if-addrs based: `setip-nic` crate

use async_trait::async_trait;

use crate::report::NicInfo;

/// Trait for local address enumeration
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Current public addresses, one entry per interface that has any
    async fn snapshot(&self) -> Result<Vec<NicInfo>, crate::Error>;
}
