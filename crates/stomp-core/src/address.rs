//! Patch address space
//!
//! Callers address parameters by a global offset (0-158). On the wire the
//! device wants the section id and an offset relative to that section.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};

/// Length of the COMMON section (patch type, knob assignments, name)
pub const PATCH_COMMON_LENGTH: usize = 0x20;
/// Length of the EFFECT section
pub const PATCH_EFFECT_LENGTH: usize = 0x7F;
/// Total addressable bytes in a patch
pub const PATCH_TOTAL_LENGTH: usize = PATCH_COMMON_LENGTH + PATCH_EFFECT_LENGTH;

/// Patch section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Global offsets 0-31
    Common,
    /// Global offsets 32-158
    Effect,
}

impl Section {
    /// Parse the section byte used on the wire
    pub fn from_id(id: u8) -> ProtocolResult<Self> {
        match id {
            0x00 => Ok(Self::Common),
            0x01 => Ok(Self::Effect),
            other => Err(ProtocolError::InvalidSection(other)),
        }
    }

    /// Section byte used on the wire
    pub fn id(self) -> u8 {
        match self {
            Self::Common => 0x00,
            Self::Effect => 0x01,
        }
    }

    /// Number of bytes in this section
    pub fn len(self) -> usize {
        match self {
            Self::Common => PATCH_COMMON_LENGTH,
            Self::Effect => PATCH_EFFECT_LENGTH,
        }
    }

    /// Global offset of the first byte of this section
    pub fn base(self) -> u16 {
        match self {
            Self::Common => 0,
            Self::Effect => PATCH_COMMON_LENGTH as u16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Effect => "effect",
        }
    }
}

/// A section-relative address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionAddress {
    pub section: Section,
    pub offset: u8,
}

/// Map a global offset onto its section and section offset
pub fn locate(global_offset: u16) -> ProtocolResult<SectionAddress> {
    if global_offset as usize >= PATCH_TOTAL_LENGTH {
        return Err(ProtocolError::OffsetOutOfRange(global_offset));
    }
    let section = if (global_offset as usize) < PATCH_COMMON_LENGTH {
        Section::Common
    } else {
        Section::Effect
    };
    Ok(SectionAddress {
        section,
        offset: (global_offset - section.base()) as u8,
    })
}

/// Inverse of [`locate`]
///
/// Fails when `section_offset` lies past the end of `section`.
pub fn to_global(section: Section, section_offset: u8) -> ProtocolResult<u16> {
    let global = section.base() + u16::from(section_offset);
    if section_offset as usize >= section.len() {
        return Err(ProtocolError::OffsetOutOfRange(global));
    }
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_common_range() {
        for offset in 0..32u16 {
            let addr = locate(offset).unwrap();
            assert_eq!(addr.section, Section::Common);
            assert_eq!(addr.offset as u16, offset);
        }
    }

    #[test]
    fn test_locate_effect_range() {
        for offset in 32..=158u16 {
            let addr = locate(offset).unwrap();
            assert_eq!(addr.section, Section::Effect);
            assert_eq!(addr.offset as u16, offset - 32);
        }
    }

    #[test]
    fn test_locate_out_of_range() {
        assert_eq!(locate(159), Err(ProtocolError::OffsetOutOfRange(159)));
        assert!(locate(u16::MAX).is_err());
    }

    #[test]
    fn test_to_global() {
        assert_eq!(to_global(Section::Common, 9), Ok(9));
        assert_eq!(to_global(Section::Effect, 0), Ok(32));
        assert_eq!(to_global(Section::Effect, 68), Ok(100));
        assert_eq!(to_global(Section::Effect, 126), Ok(158));
        assert!(to_global(Section::Common, 32).is_err());
        assert!(to_global(Section::Effect, 127).is_err());
    }

    #[test]
    fn test_section_ids() {
        assert_eq!(Section::from_id(0), Ok(Section::Common));
        assert_eq!(Section::from_id(1), Ok(Section::Effect));
        assert_eq!(Section::from_id(2), Err(ProtocolError::InvalidSection(2)));
        assert_eq!(Section::Effect.id(), 1);
        assert_eq!(Section::Common.len() + Section::Effect.len(), PATCH_TOTAL_LENGTH);
    }
}
