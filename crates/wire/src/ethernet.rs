//! Ethernet II frame header: destination, source, ethertype.

use crate::WireError;
use std::fmt;

pub const ETHER_ADDR_LEN: usize = 6;
pub const HEADER_LEN: usize = 14;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

pub const BROADCAST: MacAddress = MacAddress([0xFF; ETHER_ADDR_LEN]);
pub const ZERO: MacAddress = MacAddress([0x00; ETHER_ADDR_LEN]);

/// A 6-byte Ethernet hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; ETHER_ADDR_LEN]);

impl MacAddress {
    pub const fn new(bytes: [u8; ETHER_ADDR_LEN]) -> Self {
        Self(bytes)
    }

    pub fn is_broadcast(&self) -> bool {
        *self == BROADCAST
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// A parsed Ethernet II header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddress,
    pub src: MacAddress,
    pub ethertype: u16,
}

impl EthernetHeader {
    pub fn parse(data: &[u8]) -> Result<Self, WireError> {
        if data.len() < HEADER_LEN {
            return Err(WireError::TooShort {
                what: "ethernet header",
                need: HEADER_LEN,
                have: data.len(),
            });
        }

        let mut dst = [0u8; ETHER_ADDR_LEN];
        let mut src = [0u8; ETHER_ADDR_LEN];
        dst.copy_from_slice(&data[0..6]);
        src.copy_from_slice(&data[6..12]);
        let ethertype = u16::from_be_bytes([data[12], data[13]]);

        Ok(Self {
            dst: MacAddress(dst),
            src: MacAddress(src),
            ethertype,
        })
    }

    /// Writes this header into the first [`HEADER_LEN`] bytes of `out`.
    pub fn write(&self, out: &mut [u8]) {
        out[0..6].copy_from_slice(&self.dst.0);
        out[6..12].copy_from_slice(&self.src.0);
        out[12..14].copy_from_slice(&self.ethertype.to_be_bytes());
    }

    pub fn payload(data: &[u8]) -> &[u8] {
        &data[HEADER_LEN..]
    }
}
