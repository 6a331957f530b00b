// # Candidate Store
//
// Holds the collector IPs discovered through DNS, keyed by address family.

pub mod candidates;

pub use candidates::CandidateStore;
