//! Fixed-capacity ARP cache with TTL invalidation.
//!
//! Callers hold the enclosing [`crate::shared::Shared`] mutex for every
//! operation here; this type has no locking of its own.

use std::net::Ipv4Addr;

use rand::Rng;
use router_wire::MacAddress;

pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_TTL_SECS: u64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    ip: Ipv4Addr,
    mac: MacAddress,
    inserted_at: u64,
    valid: bool,
}

impl Slot {
    fn empty() -> Self {
        Self { ip: Ipv4Addr::UNSPECIFIED, mac: MacAddress::new([0; 6]), inserted_at: 0, valid: false }
    }
}

/// A detached copy of a cache entry, safe to use after the lock is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddress,
}

pub struct ArpCache {
    slots: Vec<Slot>,
    ttl_secs: u64,
}

impl ArpCache {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        Self { slots: vec![Slot::empty(); capacity], ttl_secs }
    }

    /// Inserts a validated binding into the first free slot, evicting a
    /// random occupied slot if the table is full. Existing entries other
    /// than the one evicted are left untouched.
    pub fn insert(&mut self, ip: Ipv4Addr, mac: MacAddress, now: u64) {
        if let Some(slot) = self.slots.iter_mut().find(|s| !s.valid) {
            *slot = Slot { ip, mac, inserted_at: now, valid: true };
            return;
        }

        let victim = rand::thread_rng().gen_range(0..self.slots.len());
        self.slots[victim] = Slot { ip, mac, inserted_at: now, valid: true };
    }

    /// Returns a detached copy of the live entry for `ip`, if any.
    ///
    /// `insert` never dedupes by IP, so an unsolicited reply for an
    /// already-cached IP can leave two valid slots behind. Like the
    /// reference's `sr_arpcache_lookup` (which keeps overwriting its result
    /// on every match instead of breaking on the first), this returns the
    /// *last* slot-order match rather than the first.
    pub fn lookup(&self, ip: Ipv4Addr, now: u64) -> Option<ArpEntry> {
        self.slots
            .iter()
            .rev()
            .find(|s| s.valid && s.ip == ip && now.saturating_sub(s.inserted_at) <= self.ttl_secs)
            .map(|s| ArpEntry { ip: s.ip, mac: s.mac })
    }

    /// Invalidates every entry older than the TTL.
    pub fn sweep_expired(&mut self, now: u64) {
        for slot in &mut self.slots {
            if slot.valid && now.saturating_sub(slot.inserted_at) > self.ttl_secs {
                slot.valid = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_returns_the_binding() {
        let mut cache = ArpCache::new(4, 15);
        let mac = MacAddress::new([1, 2, 3, 4, 5, 6]);
        cache.insert(Ipv4Addr::new(10, 0, 0, 2), mac, 0);
        assert_eq!(cache.lookup(Ipv4Addr::new(10, 0, 0, 2), 0), Some(ArpEntry { ip: Ipv4Addr::new(10, 0, 0, 2), mac }));
    }

    #[test]
    fn lookup_misses_once_ttl_has_elapsed() {
        let mut cache = ArpCache::new(4, 15);
        cache.insert(Ipv4Addr::new(10, 0, 0, 2), MacAddress::new([1; 6]), 0);
        assert!(cache.lookup(Ipv4Addr::new(10, 0, 0, 2), 16).is_none());
    }

    #[test]
    fn sweep_expired_invalidates_stale_entries_only() {
        let mut cache = ArpCache::new(4, 15);
        cache.insert(Ipv4Addr::new(10, 0, 0, 2), MacAddress::new([1; 6]), 0);
        cache.insert(Ipv4Addr::new(10, 0, 0, 3), MacAddress::new([2; 6]), 10);
        cache.sweep_expired(16);
        assert!(cache.lookup(Ipv4Addr::new(10, 0, 0, 2), 16).is_none());
        assert!(cache.lookup(Ipv4Addr::new(10, 0, 0, 3), 16).is_some());
    }

    #[test]
    fn insert_into_a_full_cache_does_not_corrupt_other_entries() {
        let mut cache = ArpCache::new(2, 15);
        cache.insert(Ipv4Addr::new(10, 0, 0, 1), MacAddress::new([1; 6]), 0);
        cache.insert(Ipv4Addr::new(10, 0, 0, 2), MacAddress::new([2; 6]), 0);
        cache.insert(Ipv4Addr::new(10, 0, 0, 3), MacAddress::new([3; 6]), 0);

        let live: Vec<_> =
            [Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2), Ipv4Addr::new(10, 0, 0, 3)].into_iter()
                .filter(|ip| cache.lookup(*ip, 0).is_some())
                .collect();
        assert_eq!(live.len(), 2, "eviction must make room without touching slots beyond the victim");
    }
}
