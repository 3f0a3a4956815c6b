//! Patch dump request/response
//!
//! A dump arrives as three SysEx messages in any order: the COMMON section,
//! the EFFECT section, and an end-of-dump acknowledgement carrying the patch
//! index. [`PatchAssembly`] collects them; [`PatchReceiver`] drives one
//! request at a time against the transport.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use stomp_core::{
    build_dump_request, classify_incoming, frame_sysex, IncomingFrame, PatchSnapshot, Section,
    ACK_PATCH_DUMP,
};

use crate::transport::Transport;
use crate::StompError;

/// Where the receiver is in the current request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiverState {
    #[default]
    Idle,
    RequestSent,
    Collecting,
    Complete,
    TimedOut,
}

/// Sections and acknowledgement gathered so far for one dump
#[derive(Debug, Clone, Default)]
pub struct PatchAssembly {
    common: Option<Vec<u8>>,
    effect: Option<Vec<u8>>,
    ack_index: Option<u8>,
}

impl PatchAssembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one classified frame
    ///
    /// Returns `true` if the frame belonged to the dump. Section data only
    /// counts when it starts at offset 0 and covers the whole section; a
    /// later copy of a section replaces the earlier one.
    pub fn accept(&mut self, frame: &IncomingFrame) -> bool {
        match frame {
            IncomingFrame::ParameterData {
                section,
                section_offset: 0,
                payload,
            } => {
                let Ok(section) = Section::from_id(*section) else {
                    return false;
                };
                if payload.len() < section.len() {
                    log::debug!(
                        "[STOMP IN] Short {} payload ({} bytes), ignoring",
                        section.name(),
                        payload.len()
                    );
                    return false;
                }
                let data = payload[..section.len()].to_vec();
                match section {
                    Section::Common => self.common = Some(data),
                    Section::Effect => self.effect = Some(data),
                }
                true
            }
            IncomingFrame::Ack {
                sub_command,
                patch_index,
            } if *sub_command == ACK_PATCH_DUMP => {
                self.ack_index = Some(*patch_index);
                true
            }
            _ => false,
        }
    }

    pub fn has_sections(&self) -> bool {
        self.common.is_some() && self.effect.is_some()
    }

    pub fn is_complete(&self, require_ack: bool) -> bool {
        self.has_sections() && (!require_ack || self.ack_index.is_some())
    }

    /// Build the snapshot once complete
    ///
    /// The patch index is the one carried by the acknowledgement, or
    /// `requested_index` when no acknowledgement was seen.
    pub fn build(&self, requested_index: u8, require_ack: bool) -> Option<PatchSnapshot> {
        if !self.is_complete(require_ack) {
            return None;
        }
        let index = self.ack_index.unwrap_or(requested_index);
        PatchSnapshot::from_sections(index, self.common.as_deref()?, self.effect.as_deref()?)
    }
}

/// Issues dump requests and reassembles the responses
pub struct PatchReceiver {
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
    require_ack: bool,
    state: Mutex<ReceiverState>,
    /// One request at a time owns the incoming stream
    request_lock: Mutex<()>,
}

impl PatchReceiver {
    pub fn new(transport: Arc<dyn Transport>, poll_interval: Duration, require_ack: bool) -> Self {
        Self {
            transport,
            poll_interval,
            require_ack,
            state: Mutex::new(ReceiverState::Idle),
            request_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ReceiverState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    fn set_state(&self, state: ReceiverState) {
        if let Ok(mut current) = self.state.lock() {
            *current = state;
        }
    }

    /// Request a patch and wait up to `timeout` for the complete dump
    ///
    /// Returns `Ok(None)` on timeout. A failure to send the request is an
    /// error. Incoming messages left over from earlier traffic are drained
    /// before the request goes out.
    pub fn request_patch(
        &self,
        patch_index: u8,
        timeout: Duration,
    ) -> Result<Option<PatchSnapshot>, StompError> {
        let _guard = self
            .request_lock
            .lock()
            .map_err(|_| StompError::TransportUnavailable("receiver poisoned".to_string()))?;
        let patch_index = patch_index & 0x7F;

        self.set_state(ReceiverState::Idle);
        let stale = std::iter::from_fn(|| self.transport.poll_incoming(Duration::ZERO)).count();
        if stale > 0 {
            log::debug!("[STOMP IN] Drained {} stale message(s)", stale);
        }

        let request = frame_sysex(&build_dump_request(patch_index));
        self.transport.send(&request)?;
        self.set_state(ReceiverState::RequestSent);
        log::info!("STOMP: Requested dump of patch {}", patch_index);

        let started = Instant::now();
        let mut assembly = PatchAssembly::new();

        while let Some(remaining) = timeout.checked_sub(started.elapsed()) {
            if remaining.is_zero() {
                break;
            }
            let Some(message) = self.transport.poll_incoming(Duration::ZERO) else {
                thread::sleep(self.poll_interval.min(remaining));
                continue;
            };

            let frame = classify_incoming(&message);
            if !assembly.accept(&frame) {
                continue;
            }
            self.set_state(ReceiverState::Collecting);
            log::debug!("[STOMP IN] {}", frame_summary(&frame));

            if let Some(snapshot) = assembly.build(patch_index, self.require_ack) {
                if snapshot.patch_index != patch_index {
                    log::warn!(
                        "STOMP: Requested patch {} but device acknowledged {}",
                        patch_index,
                        snapshot.patch_index
                    );
                }
                self.set_state(ReceiverState::Complete);
                log::info!(
                    "STOMP: Received patch {} '{}'",
                    snapshot.patch_index,
                    snapshot.patch_name()
                );
                return Ok(Some(snapshot));
            }
        }

        self.set_state(ReceiverState::TimedOut);
        log::warn!(
            "STOMP: Patch {} dump incomplete after {:?} (common: {}, effect: {}, ack: {})",
            patch_index,
            timeout,
            assembly.common.is_some(),
            assembly.effect.is_some(),
            assembly.ack_index.is_some()
        );
        Ok(None)
    }
}

fn frame_summary(frame: &IncomingFrame) -> String {
    match frame {
        IncomingFrame::ParameterData {
            section, payload, ..
        } => format!("section {} ({} bytes)", section, payload.len()),
        IncomingFrame::Ack { patch_index, .. } => format!("ack patch {}", patch_index),
        IncomingFrame::Unrecognized => "unrecognized".to_string(),
    }
}
