//! The combined ARP cache and request queue, serialized by a single mutex.
//!
//! The original reference guards this state with a *reentrant* mutex
//! because its high-level operations call primitives that lock again
//! internally. Here the primitives (`ArpCache`, `ArpQueue`) never lock —
//! there is exactly one lock, held by whoever calls into [`Shared`], so
//! reentrancy never arises.

use crate::arp_cache::{ArpCache, ArpEntry};
use crate::arp_queue::ArpQueue;

pub struct Shared {
    pub cache: ArpCache,
    pub queue: ArpQueue,
}

impl Shared {
    pub fn new(cache_capacity: usize, cache_ttl_secs: u64) -> Self {
        Self { cache: ArpCache::new(cache_capacity, cache_ttl_secs), queue: ArpQueue::new() }
    }
}

impl Shared {
    pub fn lookup_arp(&self, ip: std::net::Ipv4Addr, now: u64) -> Option<ArpEntry> {
        self.cache.lookup(ip, now)
    }
}
