//! Public parameter-write and patch-read API

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use stomp_core::{
    build_parameter_write, build_section_write, encode_patch_name, load_inventory, locate,
    to_global, ParameterInfo, ParameterInventory, PatchSnapshot, Section, TransformInput,
    PATCH_NAME_OFFSET,
};

use crate::cache::ParameterCache;
use crate::config::{default_config_path, load_stomp_config, read_stomp_config, StompConfig};
use crate::dispatcher::{DispatcherStats, RealtimeDispatcher};
use crate::receiver::{PatchReceiver, ReceiverState};
use crate::transport::{MidirTransport, Transport};
use crate::StompError;

/// A live connection to one Magicstomp
///
/// Writes are either queued (deduplicated, paced by the dispatcher) or
/// immediate (sent on the caller's thread). All methods take `&self`, so a
/// session can be shared across threads behind an `Arc`.
pub struct StompSession {
    config: StompConfig,
    inventory: ParameterInventory,
    cache: ParameterCache,
    dispatcher: RealtimeDispatcher,
    receiver: PatchReceiver,
}

impl StompSession {
    /// Load configuration and connect
    ///
    /// With no path, the default config file is used if present. An explicit
    /// path must exist and parse.
    pub fn open(config_path: Option<&Path>) -> Result<Self, StompError> {
        let config = match config_path {
            Some(path) => read_stomp_config(path)?,
            None => load_stomp_config(&default_config_path()),
        };
        Self::connect(config)
    }

    /// Connect to the device over midir
    pub fn connect(config: StompConfig) -> Result<Self, StompError> {
        let inventory = match &config.inventory_path {
            Some(path) => load_inventory(path),
            None => ParameterInventory::builtin(),
        };
        let transport = MidirTransport::connect(config.port_match.as_deref())
            .map_err(|e| StompError::TransportUnavailable(e.to_string()))?;
        Ok(Self::with_transport(config, inventory, Arc::new(transport)))
    }

    /// Build a session over any transport
    pub fn with_transport(
        config: StompConfig,
        inventory: ParameterInventory,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let dispatcher = RealtimeDispatcher::new(
            transport.clone(),
            config.min_send_interval(),
            config.queue_capacity,
            config.worker_join_timeout(),
        );
        let receiver = PatchReceiver::new(transport, config.poll_interval(), config.require_ack);

        log::info!(
            "STOMP: Session ready ({} parameters in inventory)",
            inventory.len()
        );

        Self {
            config,
            inventory,
            cache: ParameterCache::new(),
            dispatcher,
            receiver,
        }
    }

    /// Write one byte at a global offset (0-158)
    ///
    /// Queued writes are dropped when `value` matches the last value sent to
    /// `global_offset`; immediate writes always go out. Returns whether a
    /// frame was sent or queued.
    pub fn tweak_parameter(
        &self,
        global_offset: u16,
        value: u8,
        immediate: bool,
    ) -> Result<bool, StompError> {
        let value = value & 0x7F;
        let frame = build_parameter_write(global_offset, &[value])?;
        self.write(global_offset, value, frame, immediate)
    }

    /// Write one byte addressed by section and section offset
    pub fn tweak_section_parameter(
        &self,
        section: Section,
        section_offset: u8,
        value: u8,
        immediate: bool,
    ) -> Result<bool, StompError> {
        let value = value & 0x7F;
        let global_offset = to_global(section, section_offset)?;
        let frame = build_section_write(section, section_offset, &[value])?;
        self.write(global_offset, value, frame, immediate)
    }

    /// Write a parameter by inventory label (`gain` or `amp_multi.gain`)
    pub fn tweak_by_name(
        &self,
        label: &str,
        value: u8,
        immediate: bool,
    ) -> Result<bool, StompError> {
        let location = self.inventory.find(label)?;
        self.tweak_parameter(location.global_offset, value, immediate)
    }

    /// Write a parameter of a specific effect
    pub fn tweak_effect_parameter(
        &self,
        effect: &str,
        label: &str,
        value: u8,
        immediate: bool,
    ) -> Result<bool, StompError> {
        let location = self.inventory.get(effect, label)?;
        self.tweak_parameter(location.global_offset, value, immediate)
    }

    /// Write several parameters in order
    ///
    /// Every offset is checked before anything is sent. Returns the number of
    /// frames sent or queued.
    pub fn tweak_many(&self, entries: &[(u16, u8)], immediate: bool) -> Result<usize, StompError> {
        for &(global_offset, _) in entries {
            locate(global_offset)?;
        }

        let mut written = 0;
        for &(global_offset, value) in entries {
            if self.tweak_parameter(global_offset, value, immediate)? {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Write a parameter from a human value through its inventory transform
    pub fn tweak_mapped(
        &self,
        label: &str,
        input: impl Into<TransformInput>,
        immediate: bool,
    ) -> Result<bool, StompError> {
        let location = self.inventory.find(label)?;
        let value = location.transform.apply_for(label, &input.into())?;
        self.tweak_parameter(location.global_offset, value, immediate)
    }

    /// Rename the loaded patch
    ///
    /// Writes all 12 name bytes in one frame; not subject to deduplication.
    pub fn set_patch_name(&self, name: &str, immediate: bool) -> Result<(), StompError> {
        let bytes = encode_patch_name(name);
        let start = PATCH_NAME_OFFSET as u16;
        let frame = build_parameter_write(start, &bytes)?;

        if immediate {
            self.dispatcher.send_immediate(&frame)?;
        } else {
            self.dispatcher.enqueue(frame)?;
        }
        for (offset, &byte) in (start..).zip(bytes.iter()) {
            self.cache.record(offset, byte);
        }
        log::info!("STOMP: Patch name set to '{}'", name.trim_end());
        Ok(())
    }

    /// Request a patch dump and wait for it
    ///
    /// `timeout` defaults to the configured dump timeout. Returns `Ok(None)`
    /// if the dump is incomplete when the timeout elapses.
    pub fn request_patch(
        &self,
        patch_index: u8,
        timeout: Option<Duration>,
    ) -> Result<Option<PatchSnapshot>, StompError> {
        if self.dispatcher.is_stopped() {
            return Err(StompError::TransportUnavailable("session stopped".to_string()));
        }
        let timeout = timeout.unwrap_or_else(|| self.config.dump_timeout());
        self.receiver.request_patch(patch_index, timeout)
    }

    /// Describe a global offset
    pub fn parameter_info(&self, global_offset: u16) -> Result<ParameterInfo, StompError> {
        Ok(self.inventory.describe(global_offset)?)
    }

    pub fn inventory(&self) -> &ParameterInventory {
        &self.inventory
    }

    pub fn config(&self) -> &StompConfig {
        &self.config
    }

    /// Last value written to `global_offset` this session
    pub fn last_value(&self, global_offset: u16) -> Option<u8> {
        self.cache.last_value(global_offset)
    }

    pub fn dispatcher_stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }

    pub fn receiver_state(&self) -> ReceiverState {
        self.receiver.state()
    }

    /// Stop the dispatcher and close the transport
    ///
    /// Later writes and requests fail with
    /// [`StompError::TransportUnavailable`]. Safe to call more than once.
    pub fn stop(&self) {
        self.dispatcher.stop();
    }

    fn write(
        &self,
        global_offset: u16,
        value: u8,
        frame: Vec<u8>,
        immediate: bool,
    ) -> Result<bool, StompError> {
        if self.dispatcher.is_stopped() {
            return Err(StompError::TransportUnavailable("session stopped".to_string()));
        }

        if immediate {
            self.dispatcher.send_immediate(&frame)?;
            self.cache.record(global_offset, value);
            return Ok(true);
        }

        let Some(previous) = self.cache.update(global_offset, value) else {
            log::trace!("[STOMP OUT] offset {} already {}, skipping", global_offset, value);
            return Ok(false);
        };
        if let Err(e) = self.dispatcher.enqueue(frame) {
            self.cache.restore(global_offset, value, previous);
            return Err(e);
        }
        Ok(true)
    }
}

impl Drop for StompSession {
    fn drop(&mut self) {
        self.stop();
    }
}
