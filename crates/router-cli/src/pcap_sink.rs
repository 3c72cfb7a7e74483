//! The demo transport: outbound frames are appended to a per-interface pcap
//! file, and inbound traffic is replayed from one. This stands in for the
//! frame transport the core treats as an external collaborator (§1).

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use pcap_file::pcap::{PcapHeader, PcapPacket, PcapReader, PcapWriter};
use router_core::{FrameSink, Router};
use tracing::{debug, warn};

/// Writes every transmitted frame to `<out_dir>/<interface>.pcap`.
pub struct PcapSink {
    writers: Mutex<HashMap<String, PcapWriter<File>>>,
    out_dir: std::path::PathBuf,
}

impl PcapSink {
    pub fn new(out_dir: impl Into<std::path::PathBuf>) -> Self {
        Self { writers: Mutex::new(HashMap::new()), out_dir: out_dir.into() }
    }

    fn writer_for<'a>(
        writers: &'a mut HashMap<String, PcapWriter<File>>,
        out_dir: &Path,
        interface: &str,
    ) -> Result<&'a mut PcapWriter<File>> {
        if !writers.contains_key(interface) {
            let path = out_dir.join(format!("{interface}.pcap"));
            let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
            let writer = PcapWriter::with_header(file, PcapHeader::default())
                .with_context(|| format!("writing pcap header for {interface}"))?;
            writers.insert(interface.to_string(), writer);
        }
        Ok(writers.get_mut(interface).expect("just inserted"))
    }
}

impl FrameSink for PcapSink {
    fn send_frame(&self, frame: &[u8], interface_name: &str) {
        let mut writers = self.writers.lock().expect("pcap writer mutex poisoned");
        let result = Self::writer_for(&mut writers, &self.out_dir, interface_name).and_then(|writer| {
            writer
                .write_packet(&PcapPacket::new(std::time::Duration::ZERO, frame.len() as u32, frame))
                .with_context(|| format!("writing frame to {interface_name}.pcap"))
        });
        if let Err(err) = result {
            warn!(%err, interface = interface_name, "failed to record outgoing frame");
        }
    }
}

/// Spawns one reader thread per configured interface replay file, feeding
/// each captured frame into `router.handle_packet` as it is read.
pub fn spawn_replay_threads(router: std::sync::Arc<Router>, replays: Vec<(String, String)>) -> Vec<std::thread::JoinHandle<()>> {
    replays
        .into_iter()
        .map(|(interface, path)| {
            let router = std::sync::Arc::clone(&router);
            std::thread::spawn(move || {
                if let Err(err) = replay_one(&router, &interface, &path) {
                    warn!(%err, interface = %interface, file = %path, "replay thread exiting early");
                }
            })
        })
        .collect()
}

fn replay_one(router: &Router, interface: &str, path: &str) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening replay file {path}"))?;
    let mut reader = PcapReader::new(file).with_context(|| format!("reading pcap header from {path}"))?;

    while let Some(packet) = reader.next_packet() {
        let packet = packet.with_context(|| format!("reading packet from {path}"))?;
        debug!(interface, len = packet.data.len(), "replaying captured frame");
        router.handle_packet(&packet.data, interface);
    }
    Ok(())
}
