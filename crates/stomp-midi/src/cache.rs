//! Last-sent value tracking for parameter writes
//!
//! Suppresses writes that would repeat the value already sent to the same
//! offset. Entries are never cleared during a session.

use std::collections::HashMap;
use std::sync::Mutex;

/// Last value sent per global offset
#[derive(Debug, Default)]
pub struct ParameterCache {
    last_values: Mutex<HashMap<u16, u8>>,
}

impl ParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if value has changed and update the cache
    ///
    /// Returns `true` if the write should go out, `false` if `value` matches
    /// the last one recorded for `global_offset`.
    pub fn should_send(&self, global_offset: u16, value: u8) -> bool {
        self.update(global_offset, value).is_some()
    }

    /// Store `value` if it differs from the cached one
    ///
    /// Returns `None` when unchanged, otherwise `Some(previous)` so a write
    /// that never goes out can be rolled back with [`Self::restore`].
    pub fn update(&self, global_offset: u16, value: u8) -> Option<Option<u8>> {
        let Ok(mut last_values) = self.last_values.lock() else {
            return Some(None);
        };
        if last_values.get(&global_offset) == Some(&value) {
            None
        } else {
            Some(last_values.insert(global_offset, value))
        }
    }

    /// Record a value without checking it (immediate writes)
    pub fn record(&self, global_offset: u16, value: u8) {
        if let Ok(mut last_values) = self.last_values.lock() {
            last_values.insert(global_offset, value);
        }
    }

    /// Undo an [`Self::update`] whose write never made it out
    ///
    /// Only rolls back while the entry still holds `value`; a newer write
    /// from another caller is left alone.
    pub fn restore(&self, global_offset: u16, value: u8, previous: Option<u8>) {
        let Ok(mut last_values) = self.last_values.lock() else {
            return;
        };
        if last_values.get(&global_offset) != Some(&value) {
            return;
        }
        match previous {
            Some(previous) => {
                last_values.insert(global_offset, previous);
            }
            None => {
                last_values.remove(&global_offset);
            }
        }
    }

    pub fn last_value(&self, global_offset: u16) -> Option<u8> {
        self.last_values
            .lock()
            .ok()
            .and_then(|last_values| last_values.get(&global_offset).copied())
    }

    pub fn len(&self) -> usize {
        self.last_values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
