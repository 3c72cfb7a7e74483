//! Error classification. Nothing here crosses the ingress boundary: every
//! variant collapses into a silent drop or an emitted ICMP message before
//! `handle_packet` returns.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DropReason {
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] router_wire::WireError),

    #[error("no route to host")]
    NoRouteToHost,

    #[error("ttl expired")]
    TtlExpired,

    #[error("port unreachable")]
    PortUnreachable,

    #[error("arp resolution exhausted")]
    HostUnreachable,

    #[error("transient: {0}")]
    Transient(&'static str),
}
