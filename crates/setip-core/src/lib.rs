// # setip-core
//
// Core library for the setip address reporting agent.
//
// ## Architecture Overview
//
// The agent reports the host's public addresses to a collector whose
// hostname may not resolve reliably. It keeps its own set of collector IPs:
// - **NameResolver**: Trait for looking up the collector through one DNS server
// - **CandidateStore**: Thread-safe per-family list of collector IPs
// - **RefillPolicy**: Walks every DNS server and fills the store
// - **Delivery**: Trait for sending a request to one literal IP under the collector's hostname
// - **AddressSource**: Trait for enumerating the host's public addresses
// - **DeliveryLoop**: Alternates families, evicts failing IPs, refills when dry
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the DNS, HTTP and NIC crates
// 2. **Failure Absorption**: Nothing inside an iteration ends the loop
// 3. **Owned State**: The store lives and dies with the loop, no globals
// 4. **Library-First**: The binary is a thin wrapper over this crate

pub mod agent;
pub mod config;
pub mod error;
pub mod refill;
pub mod report;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use agent::{AgentEvent, DeliveryLoop};
pub use config::{AgentConfig, LoopConfig};
pub use error::{Error, Result};
pub use refill::{RefillPolicy, RefillSummary};
pub use report::{NicInfo, Report};
pub use store::CandidateStore;
pub use traits::{AddressSource, Delivery, DeliveryResponse, DnsQueryResult, DnsServer, IpVersion, NameResolver};
