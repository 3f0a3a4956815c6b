//! SysEx protocol layer for the Yamaha Magicstomp
//!
//! This crate provides:
//! - The device's 7-bit checksum
//! - Global offset ↔ (section, section offset) address mapping
//! - Parameter-write / dump-request frame builders and incoming frame classification
//! - Patch snapshots with name, effect type and knob assignment accessors
//! - The static parameter inventory (effect + label → offset)
//! - Value transforms from human units to 7-bit parameter values
//!
//! Nothing here performs I/O; the live session lives in `stomp-midi`.
//!
//! # Patch layout
//!
//! ```text
//! global offset   0 ........ 31 | 32 ....................... 158
//! section         COMMON (0x00) | EFFECT (0x01)
//! section offset  0 ........ 31 | 0 ........................ 126
//! ```

mod address;
mod checksum;
mod codec;
mod effect;
mod error;
mod inventory;
mod patch;
mod transform;

pub use address::{
    locate, to_global, Section, SectionAddress, PATCH_COMMON_LENGTH, PATCH_EFFECT_LENGTH,
    PATCH_TOTAL_LENGTH,
};
pub use checksum::{checksum, verify};
pub use codec::{
    build_dump_request, build_parameter_write, build_section_write, classify_incoming,
    encode_patch_name, format_hex, frame_sysex, IncomingFrame, ACK_PATCH_DUMP,
    BULK_RESPONSE_PREFIX, DUMP_REQUEST_PREFIX, PARAMETER_SEND_CMD, SYSEX_END, SYSEX_HEADER,
    SYSEX_START,
};
pub use effect::EffectType;
pub use error::{ProtocolError, ProtocolResult};
pub use inventory::{
    load_inventory, EffectDefinition, InventoryFile, ParameterDefinition, ParameterInfo,
    ParameterInventory, ParameterLocation, COMMON_EFFECT,
};
pub use patch::{PatchSnapshot, PATCH_NAME_LENGTH, PATCH_NAME_OFFSET};
pub use transform::{builtin_transform, TransformInput, ValueTransform};
