//! TOML configuration for interfaces and static routes.
//!
//! Loading the routing table and interface registry is explicitly out of
//! scope for the core (§1); this is the embedder-side loader the spec
//! assumes exists.

use std::net::Ipv4Addr;
use std::path::Path;

use anyhow::{bail, Context, Result};
use router_core::{Interface, Network, RouteEntry};
use router_wire::MacAddress;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RouterConfig {
    #[serde(rename = "interface")]
    pub interfaces: Vec<InterfaceConfig>,
    #[serde(rename = "route", default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Deserialize)]
pub struct InterfaceConfig {
    pub name: String,
    pub mac: String,
    pub ip: Ipv4Addr,
    /// Path to a pcap file replayed as this interface's inbound traffic.
    pub replay: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RouteConfig {
    pub dest: Ipv4Addr,
    pub mask: Ipv4Addr,
    #[serde(default = "default_gateway")]
    pub gateway: Ipv4Addr,
    pub interface: String,
}

fn default_gateway() -> Ipv4Addr {
    Ipv4Addr::UNSPECIFIED
}

impl RouterConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading router config at {}", path.as_ref().display()))?;
        toml::from_str(&text).with_context(|| "parsing router config")
    }

    pub fn network(&self) -> Result<Network> {
        let interfaces = self
            .interfaces
            .iter()
            .map(|i| Ok(Interface::new(i.name.clone(), parse_mac(&i.mac)?, i.ip)))
            .collect::<Result<Vec<_>>>()?;

        let routes = self
            .routes
            .iter()
            .map(|r| RouteEntry { dest: r.dest, mask: r.mask, gateway: r.gateway, interface: r.interface.clone() })
            .collect();

        Ok(Network::new(interfaces, routes))
    }
}

fn parse_mac(s: &str) -> Result<MacAddress> {
    let mut octets = [0u8; 6];
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        bail!("invalid MAC address {s:?}: expected six colon-separated octets");
    }
    for (i, part) in parts.iter().enumerate() {
        octets[i] = u8::from_str_radix(part, 16).with_context(|| format!("invalid MAC octet {part:?} in {s:?}"))?;
    }
    Ok(MacAddress::new(octets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_two_interface_config() {
        let toml = r#"
            [[interface]]
            name = "eth0"
            mac = "aa:bb:cc:dd:ee:01"
            ip = "10.0.0.1"

            [[interface]]
            name = "eth1"
            mac = "aa:bb:cc:dd:ee:02"
            ip = "10.0.2.1"

            [[route]]
            dest = "10.0.1.0"
            mask = "255.255.255.0"
            gateway = "10.0.2.2"
            interface = "eth1"
        "#;
        let config: RouterConfig = toml::from_str(toml).unwrap();
        let network = config.network().unwrap();
        assert!(network.lookup_by_name("eth0").is_some());
        assert!(network.lpm(Ipv4Addr::new(10, 0, 1, 5)).is_some());
    }

    #[test]
    fn rejects_a_malformed_mac_address() {
        assert!(parse_mac("not-a-mac").is_err());
    }
}
