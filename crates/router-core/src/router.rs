//! Public entry point: wires the dispatcher, shared ARP state, and sweeper
//! together behind the two operations an embedder needs — `init` and
//! `handle_packet`.

use std::sync::{Arc, Mutex};

use tracing::{trace, warn};

use crate::arp_cache::{DEFAULT_CAPACITY, DEFAULT_TTL_SECS};
use crate::clock::{Clock, SystemClock};
use crate::dispatcher;
use crate::effect::Effect;
use crate::error::DropReason;
use crate::iface::Network;
use crate::shared::Shared;
use crate::sink::FrameSink;
use crate::sweeper::Sweeper;

/// Tuning knobs exposed to embedders; all have reference-matched defaults.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub arp_cache_capacity: usize,
    pub arp_cache_ttl_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { arp_cache_capacity: DEFAULT_CAPACITY, arp_cache_ttl_secs: DEFAULT_TTL_SECS }
    }
}

/// The router core. Construct with [`Router::new`], then call
/// [`Router::init`] once to start the sweeper before feeding it frames via
/// [`Router::handle_packet`].
pub struct Router {
    network: Arc<Network>,
    shared: Arc<Mutex<Shared>>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn FrameSink>,
    sweeper: Option<Sweeper>,
}

impl Router {
    pub fn new(network: Network, sink: Arc<dyn FrameSink>, config: RouterConfig) -> Self {
        Self::with_clock(network, sink, Arc::new(SystemClock), config)
    }

    pub fn with_clock(network: Network, sink: Arc<dyn FrameSink>, clock: Arc<dyn Clock>, config: RouterConfig) -> Self {
        Self {
            network: Arc::new(network),
            shared: Arc::new(Mutex::new(Shared::new(config.arp_cache_capacity, config.arp_cache_ttl_secs))),
            clock,
            sink,
            sweeper: None,
        }
    }

    /// Starts the 1 Hz sweeper. Idempotent: a second call is a no-op.
    pub fn init(&mut self) {
        if self.sweeper.is_some() {
            return;
        }
        self.sweeper =
            Some(Sweeper::spawn(Arc::clone(&self.shared), Arc::clone(&self.network), Arc::clone(&self.clock), Arc::clone(&self.sink)));
    }

    /// Stops the sweeper. Not exercised by the reference core but provided
    /// so embedders can shut down cleanly.
    pub fn shutdown(&mut self) {
        if let Some(mut sweeper) = self.sweeper.take() {
            sweeper.stop();
        }
    }

    /// The single ingress entry point. `frame` is borrowed for the duration
    /// of this call only.
    pub fn handle_packet(&self, frame: &[u8], interface_name: &str) {
        let now = self.clock.now_secs();
        let mut effects = Vec::new();

        let result = {
            let mut shared = self.shared.lock().expect("router state mutex poisoned");
            dispatcher::handle_packet(&mut shared, &self.network, frame, interface_name, now, &mut effects)
        };

        if let Err(reason) = result {
            match reason {
                DropReason::MalformedFrame(_) => trace!(%reason, interface = interface_name, "dropping malformed frame"),
                DropReason::Transient(_) => warn!(%reason, interface = interface_name, "transient dispatch error"),
                _ => trace!(%reason, interface = interface_name, "dispatch produced an ICMP error response"),
            }
        }

        for effect in effects {
            let Effect::Transmit { interface, frame } = effect;
            self.sink.send_frame(&frame, &interface);
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown();
    }
}
