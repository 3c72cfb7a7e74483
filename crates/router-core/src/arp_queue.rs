//! Per-destination ARP request queue: at most one request per target IP,
//! each carrying the outbound frames waiting on its resolution.

use std::collections::HashMap;
use std::net::Ipv4Addr;

/// An outbound frame buffered pending ARP resolution, owned by exactly one
/// [`ArpRequest`] until it is sent or dropped.
#[derive(Debug, Clone)]
pub struct PendingFrame {
    pub bytes: Vec<u8>,
    pub egress_interface: String,
}

/// State for a single outstanding ARP resolution.
#[derive(Debug, Clone)]
pub struct ArpRequest {
    pub target_ip: Ipv4Addr,
    pub frames: Vec<PendingFrame>,
    pub sent: u64,
    pub times_sent: u8,
}

impl ArpRequest {
    fn new(target_ip: Ipv4Addr) -> Self {
        Self { target_ip, frames: Vec::new(), sent: 0, times_sent: 0 }
    }
}

/// The set of outstanding ARP requests, keyed by target IP so coalescing
/// (at most one request per IP) is structural rather than a scanned
/// invariant.
#[derive(Debug, Default)]
pub struct ArpQueue {
    requests: HashMap<Ipv4Addr, ArpRequest>,
}

impl ArpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a copy of `frame` to the request for `ip`, creating one if
    /// none exists yet. Returns the request's current state after the
    /// attach, so the caller can check whether this is the first frame
    /// queued for `ip` (i.e. whether an ARP broadcast still needs sending).
    pub fn enqueue(&mut self, ip: Ipv4Addr, frame: PendingFrame) -> &ArpRequest {
        let request = self.requests.entry(ip).or_insert_with(|| ArpRequest::new(ip));
        request.frames.push(frame);
        request
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<&ArpRequest> {
        self.requests.get(&ip)
    }

    pub fn get_mut(&mut self, ip: Ipv4Addr) -> Option<&mut ArpRequest> {
        self.requests.get_mut(&ip)
    }

    /// Unlinks and returns the request for `ip`, if any. Its frames are
    /// freed along with it once the caller drops the returned value.
    pub fn destroy(&mut self, ip: Ipv4Addr) -> Option<ArpRequest> {
        self.requests.remove(&ip)
    }

    pub fn iter_ips(&self) -> impl Iterator<Item = Ipv4Addr> + '_ {
        self.requests.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8) -> PendingFrame {
        PendingFrame { bytes: vec![tag], egress_interface: "eth0".into() }
    }

    #[test]
    fn enqueue_coalesces_multiple_frames_for_the_same_ip() {
        let mut q = ArpQueue::new();
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        q.enqueue(ip, frame(1));
        q.enqueue(ip, frame(2));
        assert_eq!(q.len(), 1);
        assert_eq!(q.get(ip).unwrap().frames.len(), 2);
    }

    #[test]
    fn frames_are_attached_in_enqueue_order() {
        let mut q = ArpQueue::new();
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        q.enqueue(ip, frame(1));
        q.enqueue(ip, frame(2));
        q.enqueue(ip, frame(3));
        let tags: Vec<u8> = q.get(ip).unwrap().frames.iter().map(|f| f.bytes[0]).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }

    #[test]
    fn destroy_removes_the_request_entirely() {
        let mut q = ArpQueue::new();
        let ip = Ipv4Addr::new(10, 0, 0, 2);
        q.enqueue(ip, frame(1));
        let destroyed = q.destroy(ip);
        assert!(destroyed.is_some());
        assert!(q.get(ip).is_none());
        assert!(q.is_empty());
    }
}
