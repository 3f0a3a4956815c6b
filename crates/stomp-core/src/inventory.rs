//! Parameter inventory
//!
//! Maps `(effect, label)` onto a parameter location. A built-in table covers
//! the COMMON section and the Amp Multi effect; a YAML file can replace or
//! extend it:
//!
//! ```yaml
//! effects:
//!   - name: mono_delay
//!     parameters:
//!       - { label: delay_level, section: effect, offset: 46 }
//!       - { label: time, section: effect, offset: 2, builtin: delay.time_ms }
//!       - { label: amp_level, offset: 9, transform: { kind: normalized } }
//! ```
//!
//! `offset` is global unless `section` is given, in which case it is relative
//! to that section.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::address::{locate, to_global, Section, PATCH_COMMON_LENGTH};
use crate::error::{ProtocolError, ProtocolResult};
use crate::transform::{builtin_transform, ValueTransform};

/// Name of the effect holding the COMMON section parameters
pub const COMMON_EFFECT: &str = "common";

const COMMON_PARAMETERS: &[(&str, u8)] = &[
    ("patch_type", 0),
    ("control1", 2),
    ("control2", 4),
    ("control3", 6),
    ("amp_type", 8),
    ("amp_level", 9),
    ("amp_gain", 10),
    ("amp_treble", 11),
    ("amp_middle", 12),
    ("amp_bass", 13),
    ("amp_presence", 14),
    ("amp_master", 15),
    ("patch_name", 16),
];

// Offsets relative to the EFFECT section
const AMP_MULTI_PARAMETERS: &[(&str, u8)] = &[
    ("compressor_threshold", 4),
    ("amp_type", 16),
    ("speaker_simulator", 17),
    ("mod_wave", 25),
    ("gain", 30),
    ("master", 31),
    ("tone", 34),
    ("treble", 36),
    ("high_middle", 37),
    ("low_middle", 38),
    ("bass", 39),
    ("presence", 40),
    ("noise_gate_threshold", 42),
    ("noise_gate_attack", 43),
    ("noise_gate_hold", 44),
    ("noise_gate_decay", 45),
    ("mod_speed", 63),
    ("mod_depth", 64),
    ("chorus_level", 65),
    ("flange_phaser_level", 66),
    ("delay_tap_l", 74),
    ("delay_tap_r", 75),
    ("delay_feedback_gain", 76),
    ("delay_high", 77),
    ("delay_level", 78),
    ("delay_hpf", 82),
    ("delay_lpf", 83),
    ("reverb_time", 85),
    ("reverb_high", 86),
    ("reverb_diffusion", 87),
    ("reverb_density", 88),
    ("reverb_level", 89),
];

/// A resolved parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLocation {
    /// Global offset (0-158)
    pub global_offset: u16,
    pub label: String,
    pub transform: ValueTransform,
}

impl ParameterLocation {
    pub fn section(&self) -> Section {
        if (self.global_offset as usize) < PATCH_COMMON_LENGTH {
            Section::Common
        } else {
            Section::Effect
        }
    }

    pub fn section_offset(&self) -> u8 {
        (self.global_offset - self.section().base()) as u8
    }
}

/// Description of a global offset, with its label when the inventory has one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub offset: u16,
    pub section: Section,
    pub section_offset: u8,
    /// `effect.label` of the first matching inventory entry
    pub label: Option<String>,
}

/// On-disk inventory file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFile {
    #[serde(default)]
    pub effects: Vec<EffectDefinition>,
}

/// One effect in the inventory file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectDefinition {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

/// One parameter in the inventory file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub label: String,
    /// When set, `offset` is relative to this section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    pub offset: u16,
    /// Explicit transform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<ValueTransform>,
    /// Built-in transform key such as `delay.time_ms`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin: Option<String>,
}

impl ParameterDefinition {
    fn resolve(&self) -> ProtocolResult<ParameterLocation> {
        let global_offset = match self.section {
            Some(section) => {
                let offset = u8::try_from(self.offset).map_err(|_| {
                    ProtocolError::OffsetOutOfRange(section.base().saturating_add(self.offset))
                })?;
                to_global(section, offset)?
            }
            None => {
                locate(self.offset)?;
                self.offset
            }
        };

        let transform = match (&self.transform, &self.builtin) {
            (Some(transform), _) => transform.clone(),
            (None, Some(key)) => {
                let (block, name) = key.split_once('.').unwrap_or((key.as_str(), ""));
                builtin_transform(block, name)
                    .cloned()
                    .ok_or_else(|| ProtocolError::UnknownParameter(key.clone()))?
            }
            (None, None) => ValueTransform::Raw,
        };

        Ok(ParameterLocation {
            global_offset,
            label: self.label.clone(),
            transform,
        })
    }
}

#[derive(Debug, Clone)]
struct EffectEntry {
    name: String,
    parameters: Vec<ParameterLocation>,
}

/// Immutable `(effect, label) → location` table
#[derive(Debug, Clone)]
pub struct ParameterInventory {
    effects: Vec<EffectEntry>,
}

impl Default for ParameterInventory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ParameterInventory {
    /// The built-in table: `common` and `amp_multi`
    pub fn builtin() -> Self {
        let common = COMMON_PARAMETERS
            .iter()
            .map(|&(label, offset)| raw_location(Section::Common, label, offset));
        let amp_multi = AMP_MULTI_PARAMETERS
            .iter()
            .map(|&(label, offset)| raw_location(Section::Effect, label, offset));

        Self {
            effects: vec![
                EffectEntry {
                    name: COMMON_EFFECT.to_string(),
                    parameters: common.collect(),
                },
                EffectEntry {
                    name: "amp_multi".to_string(),
                    parameters: amp_multi.collect(),
                },
            ],
        }
    }

    /// Built-in table overlaid with `file`
    ///
    /// An effect in the file replaces the built-in effect of the same name;
    /// new effects are appended in file order.
    pub fn from_file(file: &InventoryFile) -> ProtocolResult<Self> {
        let mut inventory = Self::builtin();
        for definition in &file.effects {
            let parameters = definition
                .parameters
                .iter()
                .map(ParameterDefinition::resolve)
                .collect::<ProtocolResult<Vec<_>>>()?;
            let entry = EffectEntry {
                name: definition.name.clone(),
                parameters,
            };
            match inventory.effects.iter_mut().find(|e| e.name == entry.name) {
                Some(existing) => *existing = entry,
                None => inventory.effects.push(entry),
            }
        }
        Ok(inventory)
    }

    /// Parse an inventory YAML file, failing on any read, parse or offset error
    pub fn from_yaml_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory file: {:?}", path))?;
        let file: InventoryFile = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse inventory file: {:?}", path))?;
        Self::from_file(&file).with_context(|| format!("Invalid parameter in {:?}", path))
    }

    /// Resolve a label
    ///
    /// Accepts `effect.label`, or a plain label searched in `common` first
    /// and then in load order.
    pub fn find(&self, label: &str) -> ProtocolResult<&ParameterLocation> {
        if let Some((effect, name)) = label.split_once('.') {
            return self.get(effect, name);
        }

        let common = self.effects.iter().filter(|e| e.name == COMMON_EFFECT);
        let others = self.effects.iter().filter(|e| e.name != COMMON_EFFECT);
        common
            .chain(others)
            .flat_map(|e| e.parameters.iter())
            .find(|p| p.label == label)
            .ok_or_else(|| ProtocolError::UnknownParameter(label.to_string()))
    }

    /// Resolve a label within one effect
    pub fn get(&self, effect: &str, label: &str) -> ProtocolResult<&ParameterLocation> {
        self.effects
            .iter()
            .find(|e| e.name == effect)
            .and_then(|e| e.parameters.iter().find(|p| p.label == label))
            .ok_or_else(|| ProtocolError::UnknownParameter(format!("{}.{}", effect, label)))
    }

    /// Describe a global offset
    pub fn describe(&self, global_offset: u16) -> ProtocolResult<ParameterInfo> {
        let addr = locate(global_offset)?;
        let label = self.effects.iter().find_map(|e| {
            e.parameters
                .iter()
                .find(|p| p.global_offset == global_offset)
                .map(|p| format!("{}.{}", e.name, p.label))
        });
        Ok(ParameterInfo {
            offset: global_offset,
            section: addr.section,
            section_offset: addr.offset,
            label,
        })
    }

    /// Effect names in load order
    pub fn effect_names(&self) -> impl Iterator<Item = &str> {
        self.effects.iter().map(|e| e.name.as_str())
    }

    /// Total number of parameter entries
    pub fn len(&self) -> usize {
        self.effects.iter().map(|e| e.parameters.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn raw_location(section: Section, label: &str, offset: u8) -> ParameterLocation {
    ParameterLocation {
        global_offset: section.base() + u16::from(offset),
        label: label.to_string(),
        transform: ValueTransform::Raw,
    }
}

/// Load the inventory from a YAML file
///
/// If the file doesn't exist, returns the built-in table.
/// If the file exists but is invalid, logs a warning and returns the built-in table.
pub fn load_inventory(path: &Path) -> ParameterInventory {
    log::info!("load_inventory: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_inventory: No inventory file, using built-in parameters");
        return ParameterInventory::builtin();
    }

    match ParameterInventory::from_yaml_file(path) {
        Ok(inventory) => {
            log::info!(
                "load_inventory: Loaded {} parameter(s) across {} effect(s)",
                inventory.len(),
                inventory.effects.len()
            );
            inventory
        }
        Err(e) => {
            log::warn!("load_inventory: {:#}", e);
            ParameterInventory::builtin()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_lookup() {
        let inventory = ParameterInventory::builtin();
        assert_eq!(inventory.find("amp_level").unwrap().global_offset, 9);
        assert_eq!(inventory.find("gain").unwrap().global_offset, 62);
        assert_eq!(inventory.find("reverb_level").unwrap().global_offset, 121);

        let delay = inventory.find("delay_level").unwrap();
        assert_eq!(delay.section(), Section::Effect);
        assert_eq!(delay.section_offset(), 78);
    }

    #[test]
    fn test_plain_label_prefers_common() {
        let inventory = ParameterInventory::builtin();
        assert_eq!(inventory.find("amp_type").unwrap().global_offset, 8);
        assert_eq!(inventory.find("amp_multi.amp_type").unwrap().global_offset, 48);
        assert_eq!(inventory.get("amp_multi", "amp_type").unwrap().global_offset, 48);
    }

    #[test]
    fn test_unknown_label() {
        let inventory = ParameterInventory::builtin();
        assert_eq!(
            inventory.find("wah_depth"),
            Err(ProtocolError::UnknownParameter("wah_depth".to_string()))
        );
        assert!(inventory.get("mono_delay", "gain").is_err());
    }

    #[test]
    fn test_describe() {
        let inventory = ParameterInventory::builtin();
        let info = inventory.describe(62).unwrap();
        assert_eq!(info.section, Section::Effect);
        assert_eq!(info.section_offset, 30);
        assert_eq!(info.label.as_deref(), Some("amp_multi.gain"));

        assert_eq!(inventory.describe(1).unwrap().label, None);
        assert_eq!(inventory.describe(159), Err(ProtocolError::OffsetOutOfRange(159)));
    }

    #[test]
    fn test_from_file_adds_and_replaces_effects() {
        let yaml = r#"
effects:
  - name: mono_delay
    parameters:
      - { label: delay_level, section: effect, offset: 46 }
      - { label: time, section: effect, offset: 2, builtin: delay.time_ms }
      - { label: amp_level, offset: 9, transform: { kind: normalized } }
  - name: common
    parameters:
      - { label: patch_type, offset: 0 }
"#;
        let file: InventoryFile = serde_yaml::from_str(yaml).unwrap();
        let inventory = ParameterInventory::from_file(&file).unwrap();

        assert_eq!(inventory.get("mono_delay", "delay_level").unwrap().global_offset, 78);
        assert_eq!(
            inventory.get("mono_delay", "time").unwrap().transform,
            ValueTransform::LogTime
        );
        // common was replaced, so amp_level now resolves through mono_delay
        assert!(inventory.get("common", "amp_level").is_err());
        assert_eq!(
            inventory.find("amp_level").unwrap().transform,
            ValueTransform::Normalized { scale: 1.0 }
        );
        assert_eq!(
            inventory.effect_names().collect::<Vec<_>>(),
            vec!["common", "amp_multi", "mono_delay"]
        );
    }

    #[test]
    fn test_from_file_rejects_bad_offsets() {
        let file: InventoryFile = serde_yaml::from_str(
            "effects:\n  - name: x\n    parameters:\n      - { label: a, section: common, offset: 40 }\n",
        )
        .unwrap();
        assert!(ParameterInventory::from_file(&file).is_err());

        let file: InventoryFile = serde_yaml::from_str(
            "effects:\n  - name: x\n    parameters:\n      - { label: a, offset: 200 }\n",
        )
        .unwrap();
        assert_eq!(
            ParameterInventory::from_file(&file).unwrap_err(),
            ProtocolError::OffsetOutOfRange(200)
        );
    }

    #[test]
    fn test_load_inventory_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let inventory = load_inventory(&dir.path().join("missing.yaml"));
        assert_eq!(inventory.len(), ParameterInventory::builtin().len());
    }

    #[test]
    fn test_load_inventory_invalid_file_falls_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "effects: [not, a, list, of, effects").unwrap();
        let inventory = load_inventory(file.path());
        assert!(inventory.find("amp_level").is_ok());
        assert!(ParameterInventory::from_yaml_file(file.path()).is_err());
    }

    #[test]
    fn test_load_inventory_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "effects:\n  - name: mono_delay\n    parameters:\n      - {{ label: delay_level, section: effect, offset: 46 }}"
        )
        .unwrap();
        let inventory = load_inventory(file.path());
        assert_eq!(inventory.find("mono_delay.delay_level").unwrap().global_offset, 78);
    }
}
