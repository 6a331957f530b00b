//! Report payload sent to the collector

use serde::{Deserialize, Serialize};

/// One network interface and its public addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicInfo {
    pub name: String,
    pub ipv4: Vec<String>,
    pub ipv6: Vec<String>,
}

impl NicInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the interface carries at least one reportable address
    pub fn has_addresses(&self) -> bool {
        !self.ipv4.is_empty() || !self.ipv6.is_empty()
    }
}

/// Body of `POST /nic`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub nics: Vec<NicInfo>,
    pub client_id: String,
}

impl Report {
    pub fn new(nics: Vec<NicInfo>, client_id: impl Into<String>) -> Self {
        Self {
            nics,
            client_id: client_id.into(),
        }
    }

    /// Encode as the JSON request body
    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
