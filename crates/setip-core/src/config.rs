//! Configuration types for the setip agent
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::traits::resolver::DEFAULT_DNS_SERVERS;
use crate::traits::DnsServer;

/// Collector endpoint that receives reports
pub const DEFAULT_API_URL: &str = "https://ddns.setip.eu.org/nic";

/// Main agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Client identifier sent with every report
    pub client_id: String,

    /// Collector URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// DNS servers for candidate discovery, in query order
    #[serde(default = "default_dns_servers")]
    pub dns_servers: Vec<String>,

    /// Optional loop settings
    #[serde(default, rename = "loop")]
    pub loop_config: LoopConfig,
}

impl AgentConfig {
    /// Create a configuration with defaults for the given client
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_url: default_api_url(),
            dns_servers: default_dns_servers(),
            loop_config: LoopConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.client_id.trim().is_empty() {
            return Err(crate::Error::config("cid is a required parameter"));
        }

        self.collector_host()?;
        self.servers()?;
        self.loop_config.validate()?;

        Ok(())
    }

    /// Hostname of the collector, the name that gets resolved and presented as virtual host
    pub fn collector_host(&self) -> Result<String, crate::Error> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| crate::Error::config(format!("Invalid API URL {}: {}", self.api_url, e)))?;

        if url.scheme() != "https" {
            return Err(crate::Error::config(format!(
                "API URL must use https. Got: {}",
                self.api_url
            )));
        }

        url.host_str()
            .map(str::to_string)
            .ok_or_else(|| crate::Error::config(format!("API URL has no host: {}", self.api_url)))
    }

    /// Parsed DNS servers, in query order
    pub fn servers(&self) -> Result<Vec<DnsServer>, crate::Error> {
        if self.dns_servers.is_empty() {
            return Err(crate::Error::config("No DNS servers configured"));
        }

        self.dns_servers.iter().map(|s| s.parse()).collect()
    }
}

/// Delivery loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Pause between iterations (in seconds)
    #[serde(default = "default_push_interval_secs")]
    pub push_interval_secs: u64,

    /// Back-off after a failed payload build (in seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Connect timeout for delivery and DNS (in seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Capacity of the agent event channel
    ///
    /// When full, new events are dropped.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.push_interval_secs == 0 {
            return Err(crate::Error::config("push interval must be > 0"));
        }
        if self.retry_delay_secs == 0 {
            return Err(crate::Error::config("retry delay must be > 0"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(crate::Error::config("connect timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn push_interval(&self) -> Duration {
        Duration::from_secs(self.push_interval_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            push_interval_secs: default_push_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_dns_servers() -> Vec<String> {
    DEFAULT_DNS_SERVERS.iter().map(|s| s.to_string()).collect()
}

fn default_push_interval_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    100
}
