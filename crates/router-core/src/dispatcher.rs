//! Ingress classification, ARP handling, IPv4 local delivery, forwarding,
//! and ICMP generation. Every entry point mutates [`Shared`] under the
//! caller's lock and appends [`Effect`]s instead of transmitting directly,
//! so the lock is never held across a frame-transmit boundary.

use std::net::Ipv4Addr;

use router_wire::{arp as wire_arp, ethernet, icmp, ipv4, ArpOp, ArpPacket, EthernetHeader, IcmpEcho, IcmpT3,
    Ipv4Header, MacAddress, Protocol};

use crate::arp_queue::PendingFrame;
use crate::effect::Effect;
use crate::error::DropReason;
use crate::iface::{Network, RouteEntry};
use crate::shared::Shared;

pub const DEFAULT_TTL: u8 = ipv4::DEFAULT_TTL;

/// The single ingress entry point for a raw Ethernet frame.
pub fn handle_packet(
    shared: &mut Shared,
    network: &Network,
    frame: &[u8],
    interface_name: &str,
    now: u64,
    effects: &mut Vec<Effect>,
) -> Result<(), DropReason> {
    let eth = EthernetHeader::parse(frame)?;
    let payload = EthernetHeader::payload(frame);

    match eth.ethertype {
        ethernet::ETHERTYPE_ARP => handle_arp(shared, network, &eth, payload, interface_name, now, effects),
        ethernet::ETHERTYPE_IPV4 => handle_ipv4(shared, network, &eth, payload, interface_name, now, effects),
        _ => Ok(()),
    }
}

fn handle_arp(
    shared: &mut Shared,
    network: &Network,
    _eth: &EthernetHeader,
    payload: &[u8],
    interface_name: &str,
    now: u64,
    effects: &mut Vec<Effect>,
) -> Result<(), DropReason> {
    let pkt = ArpPacket::parse(payload)?;

    match pkt.op {
        ArpOp::Request => {
            if network.lookup_by_ip(pkt.tpa).is_some() {
                let recv_iface = network
                    .lookup_by_name(interface_name)
                    .ok_or(DropReason::Transient("receiving interface not registered"))?;
                let reply = ArpPacket::reply(recv_iface.mac, recv_iface.ip, pkt.sha, pkt.spa);
                let frame = build_arp_frame(pkt.sha, recv_iface.mac, &reply);
                effects.push(Effect::Transmit { interface: interface_name.to_string(), frame });
            }
            Ok(())
        }
        ArpOp::Reply => {
            shared.cache.insert(pkt.spa, pkt.sha, now);
            if let Some(request) = shared.queue.destroy(pkt.spa) {
                for pending in request.frames {
                    let egress_mac = network.lookup_by_name(&pending.egress_interface).map(|i| i.mac);
                    let Some(egress_mac) = egress_mac else { continue };
                    let mut bytes = pending.bytes;
                    EthernetHeader { dst: pkt.sha, src: egress_mac, ethertype: ethernet::ETHERTYPE_IPV4 }
                        .write(&mut bytes[..ethernet::HEADER_LEN]);
                    effects.push(Effect::Transmit { interface: pending.egress_interface, frame: bytes });
                }
            }
            Ok(())
        }
    }
}

fn handle_ipv4(
    shared: &mut Shared,
    network: &Network,
    eth: &EthernetHeader,
    payload: &[u8],
    interface_name: &str,
    now: u64,
    effects: &mut Vec<Effect>,
) -> Result<(), DropReason> {
    let hdr = Ipv4Header::parse(payload)?;

    if let Some(recv_iface) = network.lookup_by_ip(hdr.dst) {
        if hdr.protocol == Protocol::Icmp {
            let icmp_payload = &payload[hdr.header_len()..];
            if let Ok(echo) = IcmpEcho::parse(icmp_payload) {
                if echo.icmp_type == icmp::TYPE_ECHO_REQUEST {
                    let ping_data = &icmp_payload[icmp::ECHO_HEADER_LEN..];
                    let frame = build_echo_reply(recv_iface.mac, recv_iface.ip, eth.src, hdr.src, &echo, ping_data);
                    effects.push(Effect::Transmit { interface: interface_name.to_string(), frame });
                    return Ok(());
                }
            }
        }

        emit_icmp_error(shared, network, icmp::TYPE_DEST_UNREACHABLE, icmp::CODE_PORT_UNREACHABLE, payload, hdr.src, now, effects);
        return Err(DropReason::PortUnreachable);
    }

    forward(shared, network, payload, &hdr, now, effects)
}

fn forward(
    shared: &mut Shared,
    network: &Network,
    payload: &[u8],
    hdr: &Ipv4Header,
    now: u64,
    effects: &mut Vec<Effect>,
) -> Result<(), DropReason> {
    if hdr.ttl <= 1 {
        emit_icmp_error(shared, network, icmp::TYPE_TIME_EXCEEDED, icmp::CODE_TTL_EXCEEDED, payload, hdr.src, now, effects);
        return Err(DropReason::TtlExpired);
    }

    let mut ip_bytes = payload.to_vec();
    ipv4::decrement_ttl_and_refresh_checksum(&mut ip_bytes);

    let route = match network.lpm(hdr.dst) {
        Some(route) => route.clone(),
        None => {
            // Quotes the post-decrement datagram, matching the reference's
            // forward_ip_packet: TTL/checksum are updated in place before the
            // route lookup, so a no-route ICMP quotes that same mutated buffer.
            emit_icmp_error(shared, network, icmp::TYPE_DEST_UNREACHABLE, icmp::CODE_NET_UNREACHABLE, &ip_bytes, hdr.src, now, effects);
            return Err(DropReason::NoRouteToHost);
        }
    };

    let egress_iface = network
        .lookup_by_name(&route.interface)
        .ok_or(DropReason::Transient("route references unknown interface"))?;

    let mut frame = vec![0u8; ethernet::HEADER_LEN + ip_bytes.len()];
    EthernetHeader { dst: ethernet::ZERO, src: egress_iface.mac, ethertype: ethernet::ETHERTYPE_IPV4 }
        .write(&mut frame[..ethernet::HEADER_LEN]);
    frame[ethernet::HEADER_LEN..].copy_from_slice(&ip_bytes);

    send_via_arp(shared, network, &route, hdr.dst, frame, now, effects);
    Ok(())
}

/// Resolves `dst_ip`'s next hop on `route` and either transmits `frame`
/// immediately (cache hit) or enqueues it and kicks off ARP resolution
/// (cache miss), issuing the first broadcast request itself — the sweeper
/// only handles retries 2 through [`crate::sweeper::MAX_ARP_RETRIES`].
fn send_via_arp(
    shared: &mut Shared,
    network: &Network,
    route: &RouteEntry,
    dst_ip: Ipv4Addr,
    mut frame: Vec<u8>,
    now: u64,
    effects: &mut Vec<Effect>,
) {
    let next_hop = route.next_hop(dst_ip);

    if let Some(entry) = shared.cache.lookup(next_hop, now) {
        frame[0..6].copy_from_slice(&entry.mac.0);
        effects.push(Effect::Transmit { interface: route.interface.clone(), frame });
        return;
    }

    let Some(egress_iface) = network.lookup_by_name(&route.interface) else { return };
    shared.queue.enqueue(next_hop, PendingFrame { bytes: frame, egress_interface: route.interface.clone() });

    let request = shared.queue.get_mut(next_hop).expect("just enqueued");
    if request.times_sent == 0 {
        request.sent = now;
        request.times_sent = 1;
        let arp_frame = build_arp_broadcast(egress_iface.mac, egress_iface.ip, next_hop);
        effects.push(Effect::Transmit { interface: route.interface.clone(), frame: arp_frame });
    }
}

/// Like [`send_via_arp`] but never enqueues on a cache miss — used only for
/// the ARP-timeout Host-Unreachable path, where queueing the ICMP itself
/// behind a second ARP resolution could recurse without bound. Dropping the
/// ICMP there is a deliberate policy, not an oversight.
pub(crate) fn send_via_arp_best_effort(
    shared: &Shared,
    route: &RouteEntry,
    dst_ip: Ipv4Addr,
    mut frame: Vec<u8>,
    now: u64,
    effects: &mut Vec<Effect>,
) {
    let next_hop = route.next_hop(dst_ip);
    if let Some(entry) = shared.cache.lookup(next_hop, now) {
        frame[0..6].copy_from_slice(&entry.mac.0);
        effects.push(Effect::Transmit { interface: route.interface.clone(), frame });
    }
}

/// Builds an ICMP error (Destination Unreachable / Time Exceeded) routed
/// back toward `original_src` and sends it through the same ARP-resolved
/// egress path used for forwarding (miss ⇒ enqueue + request).
pub(crate) fn emit_icmp_error(
    shared: &mut Shared,
    network: &Network,
    icmp_type: u8,
    code: u8,
    original_datagram: &[u8],
    original_src: Ipv4Addr,
    now: u64,
    effects: &mut Vec<Effect>,
) {
    let Some((route, frame)) = build_icmp_error_frame(network, icmp_type, code, original_datagram, original_src)
    else {
        return;
    };
    send_via_arp(shared, network, &route, original_src, frame, now, effects);
}

/// The Host-Unreachable variant used by the sweeper: routed the same way,
/// but dropped (not enqueued) on an ARP miss.
pub(crate) fn emit_icmp_host_unreachable(
    shared: &Shared,
    network: &Network,
    original_datagram: &[u8],
    original_src: Ipv4Addr,
    now: u64,
    effects: &mut Vec<Effect>,
) {
    let Some((route, frame)) = build_icmp_error_frame(
        network,
        icmp::TYPE_DEST_UNREACHABLE,
        icmp::CODE_HOST_UNREACHABLE,
        original_datagram,
        original_src,
    ) else {
        return;
    };
    send_via_arp_best_effort(shared, &route, original_src, frame, now, effects);
}

fn build_icmp_error_frame(
    network: &Network,
    icmp_type: u8,
    code: u8,
    original_datagram: &[u8],
    original_src: Ipv4Addr,
) -> Option<(RouteEntry, Vec<u8>)> {
    let route = network.lpm(original_src)?.clone();
    let egress_iface = network.lookup_by_name(&route.interface)?;

    let t3 = IcmpT3::new(icmp_type, code, original_datagram);
    let mut icmp_buf = [0u8; icmp::T3_HEADER_LEN];
    t3.write(&mut icmp_buf);

    let ip_hdr = Ipv4Header::build(0, 0, DEFAULT_TTL, Protocol::Icmp, egress_iface.ip, original_src, icmp_buf.len() as u16);

    let mut frame = vec![0u8; ethernet::HEADER_LEN + ip_hdr.len() + icmp_buf.len()];
    EthernetHeader { dst: ethernet::ZERO, src: egress_iface.mac, ethertype: ethernet::ETHERTYPE_IPV4 }
        .write(&mut frame[..ethernet::HEADER_LEN]);
    let ip_start = ethernet::HEADER_LEN;
    frame[ip_start..ip_start + ip_hdr.len()].copy_from_slice(&ip_hdr);
    frame[ip_start + ip_hdr.len()..].copy_from_slice(&icmp_buf);

    Some((route, frame))
}

fn build_echo_reply(
    src_mac: MacAddress,
    src_ip: Ipv4Addr,
    dst_mac: MacAddress,
    dst_ip: Ipv4Addr,
    request: &IcmpEcho,
    ping_data: &[u8],
) -> Vec<u8> {
    let mut icmp_buf = vec![0u8; icmp::ECHO_HEADER_LEN + ping_data.len()];
    let reply = IcmpEcho { icmp_type: icmp::TYPE_ECHO_REPLY, code: 0, identifier: request.identifier, sequence: request.sequence };
    reply.write_with_payload(&mut icmp_buf, ping_data);

    let ip_hdr = Ipv4Header::build(0, 0, DEFAULT_TTL, Protocol::Icmp, src_ip, dst_ip, icmp_buf.len() as u16);

    let mut frame = vec![0u8; ethernet::HEADER_LEN + ip_hdr.len() + icmp_buf.len()];
    EthernetHeader { dst: dst_mac, src: src_mac, ethertype: ethernet::ETHERTYPE_IPV4 }.write(&mut frame[..ethernet::HEADER_LEN]);
    let ip_start = ethernet::HEADER_LEN;
    frame[ip_start..ip_start + ip_hdr.len()].copy_from_slice(&ip_hdr);
    frame[ip_start + ip_hdr.len()..].copy_from_slice(&icmp_buf);
    frame
}

pub(crate) fn build_arp_broadcast(sha: MacAddress, spa: Ipv4Addr, tpa: Ipv4Addr) -> Vec<u8> {
    let request = ArpPacket::request(sha, spa, tpa);
    build_arp_frame(ethernet::BROADCAST, sha, &request)
}

fn build_arp_frame(dst: MacAddress, src: MacAddress, pkt: &ArpPacket) -> Vec<u8> {
    let mut frame = vec![0u8; ethernet::HEADER_LEN + wire_arp::HEADER_LEN];
    EthernetHeader { dst, src, ethertype: ethernet::ETHERTYPE_ARP }.write(&mut frame[..ethernet::HEADER_LEN]);
    pkt.write(&mut frame[ethernet::HEADER_LEN..]);
    frame
}
