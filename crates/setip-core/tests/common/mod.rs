//! Test doubles and common utilities for contract tests
//!
//! The doubles are scripted: tests decide up front which servers answer,
//! which IPs refuse connections and what the address snapshot looks like.

#![allow(dead_code)]

use setip_core::agent::AgentEvent;
use setip_core::config::AgentConfig;
use setip_core::error::{Error, Result};
use setip_core::report::NicInfo;
use setip_core::traits::{
    AddressSource, Delivery, DeliveryResponse, DnsQueryResult, DnsServer, NameResolver,
};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const TEST_URL: &str = "https://ddns.setip.eu.org/nic";

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// A resolver whose answers are fixed per server; unknown servers fail
#[derive(Clone, Default)]
pub struct ScriptedResolver {
    answers: Arc<Mutex<HashMap<DnsServer, Vec<IpAddr>>>>,
    /// Servers queried, in call order
    queried: Arc<Mutex<Vec<DnsServer>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `server` answer with `addrs`
    pub fn answer(self, server: &str, addrs: &[&str]) -> Self {
        let server: DnsServer = server.parse().unwrap();
        self.answers
            .lock()
            .unwrap()
            .insert(server, addrs.iter().map(|a| ip(a)).collect());
        self
    }

    /// Get the number of times resolve() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<DnsServer> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NameResolver for ScriptedResolver {
    async fn resolve(&self, server: &DnsServer, _hostname: &str) -> Result<DnsQueryResult> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(*server);

        match self.answers.lock().unwrap().get(server) {
            Some(addrs) => Ok(DnsQueryResult::from_addrs(addrs.iter().copied())),
            None => Err(Error::resolution(server.to_string(), "no answer scripted")),
        }
    }
}

/// A delivery that records attempts; listed IPs fail to connect
#[derive(Clone)]
pub struct ScriptedDelivery {
    failing: Arc<Mutex<HashSet<IpAddr>>>,
    /// IPs dialed, in call order
    attempts: Arc<Mutex<Vec<IpAddr>>>,
    /// Bodies delivered successfully
    bodies: Arc<Mutex<Vec<Vec<u8>>>>,
    status: u16,
}

impl ScriptedDelivery {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            failing: Arc::new(Mutex::new(HashSet::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
            bodies: Arc::new(Mutex::new(Vec::new())),
            status,
        }
    }

    /// Make `addr` refuse every connection
    pub fn fail(self, addr: &str) -> Self {
        self.failing.lock().unwrap().insert(ip(addr));
        self
    }

    pub fn attempts(&self) -> Vec<IpAddr> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Vec<u8>> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Delivery for ScriptedDelivery {
    async fn deliver(
        &self,
        _url: &str,
        ip: IpAddr,
        _method: &str,
        body: Option<&[u8]>,
    ) -> Result<DeliveryResponse> {
        self.attempts.lock().unwrap().push(ip);

        if self.failing.lock().unwrap().contains(&ip) {
            return Err(Error::connect(ip.to_string(), "connection refused"));
        }

        self.bodies
            .lock()
            .unwrap()
            .push(body.map(<[u8]>::to_vec).unwrap_or_default());

        Ok(DeliveryResponse {
            status: self.status,
            body: Vec::new(),
        })
    }
}

/// An address source with a fixed snapshot; can fail the first N calls
#[derive(Clone)]
pub struct StaticAddressSource {
    nics: Vec<NicInfo>,
    failures_left: Arc<AtomicUsize>,
}

impl StaticAddressSource {
    pub fn new() -> Self {
        let mut nic = NicInfo::new("eth0");
        nic.ipv4.push("198.51.100.20".to_string());
        Self {
            nics: vec![nic],
            failures_left: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait::async_trait]
impl AddressSource for StaticAddressSource {
    async fn snapshot(&self) -> Result<Vec<NicInfo>> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(Error::address_source("interfaces unavailable"));
        }
        Ok(self.nics.clone())
    }
}

/// Helper to create a minimal AgentConfig for testing
pub fn minimal_config(dns_servers: &[&str]) -> AgentConfig {
    let mut config = AgentConfig::new("test-client");
    config.api_url = TEST_URL.to_string();
    config.dns_servers = dns_servers.iter().map(|s| s.to_string()).collect();
    config
}

/// Wait (in virtual time) for the first event matching `pred`
pub async fn wait_for(
    rx: &mut mpsc::Receiver<AgentEvent>,
    mut pred: impl FnMut(&AgentEvent) -> bool,
) -> Vec<AgentEvent> {
    let mut seen = Vec::new();
    let found = tokio::time::timeout(Duration::from_secs(3600), async {
        while let Some(event) = rx.recv().await {
            let done = pred(&event);
            seen.push(event);
            if done {
                return true;
            }
        }
        false
    })
    .await;

    assert!(matches!(found, Ok(true)), "event not observed; saw {:?}", seen);
    seen
}
