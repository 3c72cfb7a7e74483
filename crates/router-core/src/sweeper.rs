//! The 1 Hz background task: expires stale cache entries and drives ARP
//! retry/timeout. Runs as a plain OS thread — there is no async runtime in
//! this core, only a mutex and a sleep.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::trace;

use crate::clock::Clock;
use crate::dispatcher::{build_arp_broadcast, emit_icmp_host_unreachable};
use crate::effect::Effect;
use crate::error::DropReason;
use crate::iface::Network;
use crate::shared::Shared;
use crate::sink::FrameSink;

pub const MAX_ARP_RETRIES: u8 = 5;
pub const ARP_RETRY_INTERVAL_SECS: u64 = 1;

/// Owns the sweeper's background thread; dropping or calling [`Self::stop`]
/// signals it to exit after its current tick.
pub struct Sweeper {
    handle: Option<JoinHandle<()>>,
    running: Arc<std::sync::atomic::AtomicBool>,
}

impl Sweeper {
    pub fn spawn(
        shared: Arc<Mutex<Shared>>,
        network: Arc<Network>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let running = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let thread_running = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("router-sweeper".into())
            .spawn(move || {
                while thread_running.load(std::sync::atomic::Ordering::Relaxed) {
                    thread::sleep(Duration::from_secs(ARP_RETRY_INTERVAL_SECS));
                    tick(&shared, &network, clock.as_ref(), sink.as_ref());
                }
            })
            .expect("failed to spawn sweeper thread");

        Self { handle: Some(handle), running }
    }

    pub fn stop(&mut self) {
        self.running.store(false, std::sync::atomic::Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.running.store(false, std::sync::atomic::Ordering::Relaxed);
    }
}

/// Runs a single sweeper tick. Exposed separately from [`Sweeper::spawn`] so
/// tests can drive it deterministically against a [`crate::clock::MockClock`].
pub fn tick(shared: &Mutex<Shared>, network: &Network, clock: &dyn Clock, sink: &dyn FrameSink) {
    let now = clock.now_secs();
    let mut effects = Vec::new();

    {
        let mut shared = shared.lock().expect("router state mutex poisoned");
        shared.cache.sweep_expired(now);

        let pending_ips: Vec<_> = shared.queue.iter_ips().collect();
        for ip in pending_ips {
            let due = {
                let Some(request) = shared.queue.get(ip) else { continue };
                now.saturating_sub(request.sent) >= ARP_RETRY_INTERVAL_SECS
            };
            if !due {
                continue;
            }

            let times_sent = shared.queue.get(ip).map(|r| r.times_sent).unwrap_or(0);
            if times_sent >= MAX_ARP_RETRIES {
                let request = shared.queue.destroy(ip).expect("checked above");
                let reason = DropReason::HostUnreachable;
                for pending in &request.frames {
                    let ip_datagram = &pending.bytes[router_wire::ethernet::HEADER_LEN..];
                    emit_icmp_host_unreachable(&shared, network, ip_datagram, original_sender(ip_datagram), now, &mut effects);
                    trace!(%reason, ip = %ip, "arp resolution exhausted, emitting host-unreachable");
                }
            } else {
                let request = shared.queue.get_mut(ip).expect("checked above");
                request.sent = now;
                request.times_sent += 1;

                if let Some(first) = request.frames.first() {
                    if let Some(egress_iface) = network.lookup_by_name(&first.egress_interface) {
                        let arp_frame = build_arp_broadcast(egress_iface.mac, egress_iface.ip, ip);
                        effects.push(Effect::Transmit { interface: first.egress_interface.clone(), frame: arp_frame });
                    }
                }
            }
        }
    }

    for effect in effects {
        let Effect::Transmit { interface, frame } = effect;
        sink.send_frame(&frame, &interface);
    }
}

/// Recovers the original sender's IP from an IPv4 datagram's header so the
/// Host-Unreachable ICMP can be routed back toward it.
fn original_sender(ip_datagram: &[u8]) -> std::net::Ipv4Addr {
    std::net::Ipv4Addr::new(ip_datagram[12], ip_datagram[13], ip_datagram[14], ip_datagram[15])
}
