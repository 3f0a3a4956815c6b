//! Complete patch snapshots assembled from a bulk dump

use crate::address::{locate, Section, PATCH_COMMON_LENGTH, PATCH_EFFECT_LENGTH};
use crate::effect::EffectType;

/// COMMON offset of the 12-character patch name
pub const PATCH_NAME_OFFSET: usize = 16;
/// Length of the patch name in bytes
pub const PATCH_NAME_LENGTH: usize = 12;

const CONTROL_OFFSETS: [usize; 3] = [2, 4, 6];

/// Both sections of one patch
///
/// Only built once both sections have been received in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSnapshot {
    pub patch_index: u8,
    pub common: [u8; PATCH_COMMON_LENGTH],
    pub effect: [u8; PATCH_EFFECT_LENGTH],
}

impl PatchSnapshot {
    /// Build a snapshot from section payloads
    ///
    /// Returns `None` unless each payload covers its whole section. Extra
    /// trailing bytes are ignored.
    pub fn from_sections(patch_index: u8, common: &[u8], effect: &[u8]) -> Option<Self> {
        let common: [u8; PATCH_COMMON_LENGTH] =
            common.get(..PATCH_COMMON_LENGTH)?.try_into().ok()?;
        let effect: [u8; PATCH_EFFECT_LENGTH] =
            effect.get(..PATCH_EFFECT_LENGTH)?.try_into().ok()?;
        Some(Self {
            patch_index,
            common,
            effect,
        })
    }

    /// Patch name with trailing spaces and NULs removed
    pub fn patch_name(&self) -> String {
        let raw = &self.common[PATCH_NAME_OFFSET..PATCH_NAME_OFFSET + PATCH_NAME_LENGTH];
        raw.iter()
            .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { ' ' })
            .collect::<String>()
            .trim_end_matches([' ', '\0'])
            .to_string()
    }

    /// Effect algorithm, `None` for ids the device does not define
    pub fn effect_type(&self) -> Option<EffectType> {
        EffectType::from_id(self.common[0])
    }

    /// Raw parameter ids assigned to the three control knobs
    pub fn control_assignments(&self) -> [u8; 3] {
        CONTROL_OFFSETS.map(|offset| self.common[offset])
    }

    /// Byte at a global offset, `None` past the end of the patch
    pub fn value_at(&self, global_offset: u16) -> Option<u8> {
        let addr = locate(global_offset).ok()?;
        let offset = addr.offset as usize;
        Some(match addr.section {
            Section::Common => self.common[offset],
            Section::Effect => self.effect[offset],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_patch_name;

    fn snapshot() -> PatchSnapshot {
        let mut common = [0u8; PATCH_COMMON_LENGTH];
        common[0] = 0x38;
        common[2] = 0x11;
        common[4] = 0x22;
        common[6] = 0x33;
        common[PATCH_NAME_OFFSET..PATCH_NAME_OFFSET + PATCH_NAME_LENGTH]
            .copy_from_slice(&encode_patch_name("Crunch"));
        let mut effect = [0u8; PATCH_EFFECT_LENGTH];
        effect[68] = 99;
        PatchSnapshot::from_sections(4, &common, &effect).unwrap()
    }

    #[test]
    fn test_from_sections_requires_full_payloads() {
        assert!(PatchSnapshot::from_sections(0, &[0; 31], &[0; 127]).is_none());
        assert!(PatchSnapshot::from_sections(0, &[0; 32], &[0; 126]).is_none());
        assert!(PatchSnapshot::from_sections(0, &[0; 32], &[0; 130]).is_some());
    }

    #[test]
    fn test_snapshot_accessors() {
        let patch = snapshot();
        assert_eq!(patch.patch_index, 4);
        assert_eq!(patch.patch_name(), "Crunch");
        assert_eq!(patch.effect_type(), Some(EffectType::AmpMultiFlange));
        assert_eq!(patch.control_assignments(), [0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_patch_name_trims_nul_padding() {
        let mut patch = snapshot();
        patch.common[PATCH_NAME_OFFSET..PATCH_NAME_OFFSET + PATCH_NAME_LENGTH]
            .copy_from_slice(b"Clean\0\0\0\0\0\0\0");
        assert_eq!(patch.patch_name(), "Clean");
    }

    #[test]
    fn test_value_at() {
        let patch = snapshot();
        assert_eq!(patch.value_at(0), Some(0x38));
        assert_eq!(patch.value_at(100), Some(99));
        assert_eq!(patch.value_at(159), None);
    }
}
