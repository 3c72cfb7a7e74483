//! Outbound actions produced while the shared-state mutex is held, executed
//! once it has been released. Keeping transmission out of the locked
//! section is what lets a single, non-reentrant mutex guard the cache and
//! request queue (see [`crate::shared::Shared`]).

#[derive(Debug, Clone)]
pub enum Effect {
    Transmit { interface: String, frame: Vec<u8> },
}
