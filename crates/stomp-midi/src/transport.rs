//! MIDI transport
//!
//! The session talks to the device through the [`Transport`] trait so the
//! dispatcher and receiver can be driven by a scripted transport in tests.
//! [`MidirTransport`] is the real implementation on top of midir.

use std::sync::Mutex;
use std::time::Duration;

use flume::{Receiver, Sender, TrySendError};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use stomp_core::{format_hex, SYSEX_START};

use crate::connection::{normalize_port_name, select_port};

/// Capacity of the input callback → session channel
const INCOMING_CAPACITY: usize = 64;

/// Error type for transport operations
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to initialize MIDI: {0}")]
    Init(String),

    #[error("No MIDI output ports available")]
    NoPorts,

    #[error("No MIDI port found matching pattern: {0}")]
    PortNotFound(String),

    #[error("Failed to connect to MIDI port: {0}")]
    Connection(String),

    #[error("Failed to send MIDI message: {0}")]
    Send(String),

    #[error("MIDI transport is closed")]
    Closed,
}

/// Byte-level link to the device
///
/// Implementations must tolerate concurrent callers: the dispatcher thread
/// and immediate writes may send at the same time.
pub trait Transport: Send + Sync {
    /// Send one complete SysEx message (F0 ... F7)
    fn send(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `timeout` for the next incoming SysEx message
    fn poll_incoming(&self, timeout: Duration) -> Option<Vec<u8>>;

    /// Release the underlying ports; later sends fail with [`TransportError::Closed`]
    fn close(&self);
}

/// Transport over a midir output/input port pair
pub struct MidirTransport {
    output: Mutex<Option<MidiOutputConnection>>,
    input: Mutex<Option<MidiInputConnection<Sender<Vec<u8>>>>>,
    incoming_rx: Receiver<Vec<u8>>,
    port_name: String,
}

impl MidirTransport {
    /// Connect to the device
    ///
    /// `port_match` is matched case-insensitively against port names; when
    /// `None` the device is auto-detected. The input port is optional: without
    /// it writes still work but patch dumps time out.
    pub fn connect(port_match: Option<&str>) -> Result<Self, TransportError> {
        let midi_out =
            MidiOutput::new("stomp-midi-out").map_err(|e| TransportError::Init(e.to_string()))?;

        let out_ports = midi_out.ports();
        if out_ports.is_empty() {
            return Err(TransportError::NoPorts);
        }
        let out_names: Vec<String> = out_ports
            .iter()
            .map(|port| midi_out.port_name(port).unwrap_or_default())
            .collect();

        let index = select_port(&out_names, port_match).ok_or_else(|| {
            TransportError::PortNotFound(port_match.unwrap_or_default().to_string())
        })?;
        let port_name = out_names[index].clone();
        log::info!("MIDI: Found output port: {}", port_name);

        let output = midi_out
            .connect(&out_ports[index], "stomp-midi-output")
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let (incoming_tx, incoming_rx) = flume::bounded(INCOMING_CAPACITY);
        let input = Self::connect_input(&normalize_port_name(&port_name), incoming_tx);

        log::info!(
            "MIDI: Connected to {} (input: {})",
            port_name,
            if input.is_some() { "yes" } else { "no" }
        );

        Ok(Self {
            output: Mutex::new(Some(output)),
            input: Mutex::new(input),
            incoming_rx,
            port_name,
        })
    }

    /// Open the input port whose name matches the output port
    fn connect_input(
        pattern: &str,
        incoming_tx: Sender<Vec<u8>>,
    ) -> Option<MidiInputConnection<Sender<Vec<u8>>>> {
        let mut midi_in = match MidiInput::new("stomp-midi-in") {
            Ok(input) => input,
            Err(e) => {
                log::warn!("MIDI: Failed to initialize input: {}", e);
                return None;
            }
        };
        // SysEx is filtered by default
        midi_in.ignore(Ignore::None);

        let in_ports = midi_in.ports();
        let in_names: Vec<String> = in_ports
            .iter()
            .map(|port| midi_in.port_name(port).unwrap_or_default())
            .collect();
        let Some(index) = select_port(&in_names, Some(pattern)) else {
            log::warn!("MIDI: No input port matching '{}', patch dumps unavailable", pattern);
            return None;
        };
        log::info!("MIDI: Found input port: {}", in_names[index]);

        match midi_in.connect(
            &in_ports[index],
            "stomp-midi-input",
            Self::midi_callback,
            incoming_tx,
        ) {
            Ok(conn) => Some(conn),
            Err(e) => {
                log::warn!("MIDI: Failed to connect to input: {}", e);
                None
            }
        }
    }

    /// The midir callback function
    ///
    /// Called from the MIDI driver thread. Forwards SysEx only and never blocks.
    fn midi_callback(_timestamp: u64, data: &[u8], incoming_tx: &mut Sender<Vec<u8>>) {
        if data.first() != Some(&SYSEX_START) {
            return;
        }
        log::trace!("[STOMP IN] {}", format_hex(data));
        match incoming_tx.try_send(data.to_vec()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("[STOMP IN] Incoming channel full, dropping {} byte message", data.len());
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl Transport for MidirTransport {
    fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut output = self.output.lock().map_err(|_| TransportError::Closed)?;
        let conn = output.as_mut().ok_or(TransportError::Closed)?;
        conn.send(frame)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    fn poll_incoming(&self, timeout: Duration) -> Option<Vec<u8>> {
        if timeout.is_zero() {
            return self.incoming_rx.try_recv().ok();
        }
        self.incoming_rx.recv_timeout(timeout).ok()
    }

    fn close(&self) {
        if let Ok(mut input) = self.input.lock() {
            if let Some(conn) = input.take() {
                conn.close();
            }
        }
        if let Ok(mut output) = self.output.lock() {
            if let Some(conn) = output.take() {
                conn.close();
                log::info!("MIDI: Closed {}", self.port_name);
            }
        }
    }
}

/// Scripted transport for tests
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    /// Records every sent frame with its send time and replays queued incoming frames
    #[derive(Default)]
    pub struct MockTransport {
        sent: Mutex<Vec<(Instant, Vec<u8>)>>,
        incoming: Mutex<VecDeque<Vec<u8>>>,
        /// Incoming frames released only after the next send (device replies)
        replies: Mutex<VecDeque<Vec<u8>>>,
        /// Sends with these 1-based indices fail
        fail_sends: Mutex<Vec<usize>>,
        send_count: AtomicUsize,
        closed: AtomicBool,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a frame that is already waiting before any request
        pub fn push_incoming(&self, frame: Vec<u8>) {
            self.incoming.lock().unwrap().push_back(frame);
        }

        /// Queue a frame that becomes readable once something has been sent
        pub fn push_reply(&self, frame: Vec<u8>) {
            self.replies.lock().unwrap().push_back(frame);
        }

        /// Make the n-th send (1-based) fail
        pub fn fail_send(&self, n: usize) {
            self.fail_sends.lock().unwrap().push(n);
        }

        pub fn sent(&self) -> Vec<(Instant, Vec<u8>)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_frames(&self) -> Vec<Vec<u8>> {
            self.sent().into_iter().map(|(_, frame)| frame).collect()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl Transport for MockTransport {
        fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
            if self.is_closed() {
                return Err(TransportError::Closed);
            }
            let n = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_sends.lock().unwrap().contains(&n) {
                return Err(TransportError::Send(format!("scripted failure #{}", n)));
            }
            self.sent.lock().unwrap().push((Instant::now(), frame.to_vec()));

            let mut replies = self.replies.lock().unwrap();
            self.incoming.lock().unwrap().extend(replies.drain(..));
            Ok(())
        }

        fn poll_incoming(&self, timeout: Duration) -> Option<Vec<u8>> {
            let frame = self.incoming.lock().unwrap().pop_front();
            if frame.is_none() && !timeout.is_zero() {
                std::thread::sleep(timeout.min(Duration::from_millis(1)));
            }
            frame
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }
}
