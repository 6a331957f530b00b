// # Interface Address Source
//
// This crate enumerates the host's network interfaces and keeps only the
// addresses worth reporting: those reachable from the public internet.
//
// ## Filtering
//
// IPv4 is dropped when loopback, private (RFC 1918), multicast or link-local.
// IPv6 is kept only when it is global unicast, so loopback, unspecified,
// link-local (fe80::/10), unique-local (fc00::/7), multicast and the
// documentation range (2001:db8::/32) are dropped.

use async_trait::async_trait;
use setip_core::report::NicInfo;
use setip_core::traits::AddressSource;
use setip_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Whether an IPv4 address is worth reporting
pub fn is_public_ipv4(ip: &Ipv4Addr) -> bool {
    !(ip.is_loopback() || ip.is_private() || ip.is_multicast() || ip.is_link_local())
}

/// Whether an IPv6 address is global unicast
pub fn is_public_ipv6(ip: &Ipv6Addr) -> bool {
    let segments = ip.segments();

    let link_local = segments[0] & 0xffc0 == 0xfe80;
    let unique_local = segments[0] & 0xfe00 == 0xfc00;
    let documentation = segments[0] == 0x2001 && segments[1] == 0x0db8;

    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        || link_local
        || unique_local
        || documentation)
}

/// Group (interface, address) pairs into reportable NICs
///
/// Interfaces keep their first-seen order; those left without a public
/// address are omitted.
pub fn collect_nics(addrs: impl IntoIterator<Item = (String, IpAddr)>) -> Vec<NicInfo> {
    let mut nics: Vec<NicInfo> = Vec::new();

    for (name, ip) in addrs {
        let index = match nics.iter().position(|nic| nic.name == name) {
            Some(index) => index,
            None => {
                nics.push(NicInfo::new(name));
                nics.len() - 1
            }
        };

        match ip {
            IpAddr::V4(v4) if is_public_ipv4(&v4) => nics[index].ipv4.push(v4.to_string()),
            IpAddr::V6(v6) if is_public_ipv6(&v6) => nics[index].ipv6.push(v6.to_string()),
            _ => {}
        }
    }

    nics.retain(NicInfo::has_addresses);
    nics
}

/// Address source backed by the OS interface table
#[derive(Debug, Clone, Default)]
pub struct InterfaceAddressSource;

impl InterfaceAddressSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AddressSource for InterfaceAddressSource {
    async fn snapshot(&self) -> Result<Vec<NicInfo>> {
        let interfaces = if_addrs::get_if_addrs()
            .map_err(|e| Error::address_source(format!("failed to get interfaces: {}", e)))?;

        tracing::debug!(entries = interfaces.len(), "interface table read");

        Ok(collect_nics(
            interfaces.into_iter().map(|iface| {
                let ip = iface.ip();
                (iface.name, ip)
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn v6(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_ipv4_filter() {
        assert!(is_public_ipv4(&v4("203.0.113.5")));
        assert!(is_public_ipv4(&v4("8.8.8.8")));

        assert!(!is_public_ipv4(&v4("127.0.0.1")));
        assert!(!is_public_ipv4(&v4("10.1.2.3")));
        assert!(!is_public_ipv4(&v4("172.16.0.1")));
        assert!(!is_public_ipv4(&v4("192.168.1.1")));
        assert!(!is_public_ipv4(&v4("224.0.0.1")));
        assert!(!is_public_ipv4(&v4("239.255.255.250")));
        assert!(!is_public_ipv4(&v4("169.254.10.10")));
    }

    #[test]
    fn test_ipv6_filter() {
        assert!(is_public_ipv6(&v6("2606:4700:4700::1111")));
        assert!(is_public_ipv6(&v6("2400:3200::1")));

        assert!(!is_public_ipv6(&v6("::1")));
        assert!(!is_public_ipv6(&v6("::")));
        assert!(!is_public_ipv6(&v6("fe80::1")));
        assert!(!is_public_ipv6(&v6("febf::1")));
        assert!(!is_public_ipv6(&v6("fc00::1")));
        assert!(!is_public_ipv6(&v6("fd12:3456::1")));
        assert!(!is_public_ipv6(&v6("ff02::1")));
        assert!(!is_public_ipv6(&v6("2001:db8::1")));
    }

    #[test]
    fn test_collect_groups_by_interface() {
        let nics = collect_nics(vec![
            ("lo".to_string(), IpAddr::from([127, 0, 0, 1])),
            ("eth0".to_string(), IpAddr::from([203, 0, 113, 5])),
            ("wlan0".to_string(), IpAddr::from([192, 168, 1, 4])),
            ("eth0".to_string(), "2606:4700::5".parse().unwrap()),
            ("eth0".to_string(), "fe80::5".parse().unwrap()),
            ("eth1".to_string(), IpAddr::from([198, 51, 100, 9])),
        ]);

        assert_eq!(nics.len(), 2);
        assert_eq!(nics[0].name, "eth0");
        assert_eq!(nics[0].ipv4, vec!["203.0.113.5"]);
        assert_eq!(nics[0].ipv6, vec!["2606:4700::5"]);
        assert_eq!(nics[1].name, "eth1");
    }

    #[tokio::test]
    async fn test_snapshot_never_reports_loopback() {
        let nics = InterfaceAddressSource::new()
            .snapshot()
            .await
            .expect("interface table readable");

        for nic in nics {
            assert!(nic.has_addresses());
            assert!(!nic.ipv4.iter().any(|ip| ip.starts_with("127.")));
            assert!(!nic.ipv6.contains(&"::1".to_string()));
        }
    }
}
