//! Live SysEx session for the Yamaha Magicstomp
//!
//! This crate provides:
//! - MIDI port discovery and connection via midir
//! - A paced background dispatcher for real-time parameter writes
//! - Last-value deduplication so repeated tweaks don't flood the device
//! - Patch dump requests with reassembly of the multi-message response
//! - YAML session configuration
//!
//! # Architecture
//!
//! ```text
//! caller → StompSession ─┬─ immediate ─────────────────────────→ Transport
//!                        ├─ queued → flume → stomp-dispatch ───→ Transport
//!                        └─ request_patch ← PatchReceiver ←──── Transport
//! ```
//!
//! Frame encoding lives in `stomp-core`; this crate only moves bytes.

mod cache;
mod config;
mod connection;
mod dispatcher;
mod receiver;
mod session;
mod transport;

pub use cache::ParameterCache;
pub use config::{default_config_path, load_stomp_config, read_stomp_config, StompConfig};
pub use connection::{list_input_ports, list_output_ports, normalize_port_name, select_port};
pub use dispatcher::{DispatcherStats, RealtimeDispatcher};
pub use receiver::{PatchAssembly, PatchReceiver, ReceiverState};
pub use session::StompSession;
pub use transport::{MidirTransport, Transport, TransportError};

use stomp_core::ProtocolError;

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum StompError {
    #[error("Invalid parameter write: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("MIDI transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("MIDI send failed: {0}")]
    SendFailed(#[from] TransportError),

    #[error("Dispatch queue is full")]
    QueueFull,

    #[error("Failed to spawn dispatcher thread: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("Failed to load configuration: {0}")]
    Config(#[from] anyhow::Error),
}
