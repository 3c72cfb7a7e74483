//! The packet-plane core of a software IPv4 router: ingress classification,
//! ARP cache and request queue, longest-prefix-match forwarding, ICMP
//! generation, and the background sweeper that drives ARP retry/timeout.
//!
//! Frame transport, interface/route loading, and logging setup are the
//! embedder's job — this crate consumes them through [`sink::FrameSink`]
//! and [`iface::Network`], and exposes itself through [`router::Router`].

pub mod arp_cache;
pub mod arp_queue;
pub mod clock;
mod dispatcher;
mod effect;
pub mod error;
pub mod iface;
mod router;
mod shared;
pub mod sink;
mod sweeper;

pub use clock::{Clock, MockClock, SystemClock};
pub use error::DropReason;
pub use iface::{Interface, Network, RouteEntry};
pub use router::{Router, RouterConfig};
pub use sink::FrameSink;

pub use sweeper::{ARP_RETRY_INTERVAL_SECS, MAX_ARP_RETRIES};
