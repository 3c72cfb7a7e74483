//! Interface registry and static routing table: read-only after construction.

use std::net::Ipv4Addr;

use router_wire::MacAddress;

/// A router-owned network interface. Immutable after registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub mac: MacAddress,
    pub ip: Ipv4Addr,
}

impl Interface {
    pub fn new(name: impl Into<String>, mac: MacAddress, ip: Ipv4Addr) -> Self {
        Self { name: name.into(), mac, ip }
    }
}

/// A static route. `gateway` of `0.0.0.0` means "directly connected" — the
/// next hop is the destination address itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub dest: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub interface: String,
}

impl RouteEntry {
    pub fn next_hop(&self, dst: Ipv4Addr) -> Ipv4Addr {
        if self.gateway == Ipv4Addr::UNSPECIFIED {
            dst
        } else {
            self.gateway
        }
    }
}

/// The interface set and routing table, fixed for the lifetime of the router.
#[derive(Debug, Default)]
pub struct Network {
    interfaces: Vec<Interface>,
    routes: Vec<RouteEntry>,
}

impl Network {
    pub fn new(interfaces: Vec<Interface>, routes: Vec<RouteEntry>) -> Self {
        Self { interfaces, routes }
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn lookup_by_ip(&self, ip: Ipv4Addr) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.ip == ip)
    }

    pub fn interfaces(&self) -> &[Interface] {
        &self.interfaces
    }

    /// Longest-prefix match: among routes where `dst & mask == dest & mask`,
    /// returns the one with the greatest mask. Ties break on table order.
    pub fn lpm(&self, dst: Ipv4Addr) -> Option<&RouteEntry> {
        let dst = u32::from(dst);
        self.routes
            .iter()
            .filter(|r| {
                let mask = u32::from(r.mask);
                (dst & mask) == (u32::from(r.dest) & mask)
            })
            .max_by_key(|r| u32::from(r.mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, ip: [u8; 4]) -> Interface {
        Interface::new(name, MacAddress::new([0; 6]), Ipv4Addr::from(ip))
    }

    fn route(dest: [u8; 4], mask: [u8; 4], gateway: [u8; 4], iface: &str) -> RouteEntry {
        RouteEntry {
            dest: Ipv4Addr::from(dest),
            mask: Ipv4Addr::from(mask),
            gateway: Ipv4Addr::from(gateway),
            interface: iface.to_string(),
        }
    }

    #[test]
    fn lpm_prefers_the_most_specific_matching_route() {
        let net = Network::new(
            vec![],
            vec![
                route([10, 0, 0, 0], [255, 0, 0, 0], [0, 0, 0, 0], "eth0"),
                route([10, 0, 1, 0], [255, 255, 255, 0], [10, 0, 0, 2], "eth1"),
            ],
        );
        let hit = net.lpm(Ipv4Addr::new(10, 0, 1, 7)).unwrap();
        assert_eq!(hit.interface, "eth1");
    }

    #[test]
    fn lpm_returns_none_when_no_route_matches() {
        let net = Network::new(vec![], vec![route([10, 0, 0, 0], [255, 0, 0, 0], [0, 0, 0, 0], "eth0")]);
        assert!(net.lpm(Ipv4Addr::new(192, 168, 1, 1)).is_none());
    }

    #[test]
    fn directly_connected_route_has_dst_as_next_hop() {
        let r = route([10, 0, 0, 0], [255, 0, 0, 0], [0, 0, 0, 0], "eth0");
        assert_eq!(r.next_hop(Ipv4Addr::new(10, 1, 2, 3)), Ipv4Addr::new(10, 1, 2, 3));
    }

    #[test]
    fn lookup_by_name_and_ip() {
        let net = Network::new(vec![iface("eth0", [10, 0, 0, 1])], vec![]);
        assert!(net.lookup_by_name("eth0").is_some());
        assert!(net.lookup_by_ip(Ipv4Addr::new(10, 0, 0, 1)).is_some());
        assert!(net.lookup_by_name("eth1").is_none());
    }
}
