//! Wire-format codecs for the frames a software router touches: Ethernet II,
//! ARP, IPv4 and ICMP. Every type here parses from and writes to plain byte
//! slices — no socket or I/O concerns live in this crate.

pub mod arp;
pub mod checksum;
pub mod ethernet;
pub mod icmp;
pub mod ipv4;

pub use arp::{ArpOp, ArpPacket};
pub use checksum::checksum as internet_checksum;
pub use ethernet::{EthernetHeader, MacAddress};
pub use icmp::{IcmpEcho, IcmpT3};
pub use ipv4::{Ipv4Header, Protocol};

use thiserror::Error;

/// A malformed or truncated frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("{what} too short: need at least {need} bytes, have {have}")]
    TooShort { what: &'static str, need: usize, have: usize },

    #[error("unexpected value for {what}: {value}")]
    BadField { what: &'static str, value: u32 },
}
