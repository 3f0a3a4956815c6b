//! SysEx frame encoding and classification
//!
//! Outgoing parameter write:
//!
//! ```text
//! F0 43 7D 40 55 42 | 20 | section | offset | value... | checksum | F7
//! ```
//!
//! The checksum covers everything from the command byte (0x20) through the
//! last value byte. Incoming bulk responses start with
//! `43 7D 30 55 42 39 39`, followed by an unused byte, `length`, `command`,
//! then either section/offset/payload (command 0x20) or an acknowledgement
//! (length 0, command 0x30).

use crate::address::{locate, to_global, Section};
use crate::checksum::checksum;
use crate::error::{ProtocolError, ProtocolResult};
use crate::patch::PATCH_NAME_LENGTH;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Prefix of every parameter-write frame (Yamaha id, Magicstomp model bytes)
pub const SYSEX_HEADER: [u8; 6] = [SYSEX_START, 0x43, 0x7D, 0x40, 0x55, 0x42];

/// Command byte for real-time parameter writes
pub const PARAMETER_SEND_CMD: u8 = 0x20;

/// Dump request body, followed by the patch index
pub const DUMP_REQUEST_PREFIX: [u8; 7] = [0x43, 0x7D, 0x50, 0x55, 0x42, 0x30, 0x01];

/// Prefix of every bulk response from the device
pub const BULK_RESPONSE_PREFIX: [u8; 7] = [0x43, 0x7D, 0x30, 0x55, 0x42, 0x39, 0x39];

/// Sub-command marking the end of a patch dump
pub const ACK_PATCH_DUMP: u8 = 0x11;

const BULK_ACK_CMD: u8 = 0x30;
const BULK_LENGTH_INDEX: usize = 8;
const BULK_COMMAND_INDEX: usize = 9;
const BULK_PAYLOAD_INDEX: usize = 12;

/// Classified incoming frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingFrame {
    /// Section data from a bulk dump
    ParameterData {
        section: u8,
        section_offset: u8,
        payload: Vec<u8>,
    },
    /// End-of-dump acknowledgement
    Ack { sub_command: u8, patch_index: u8 },
    /// Anything else (other devices, truncated frames); callers ignore these
    Unrecognized,
}

/// Build a parameter write for `values` starting at `global_offset`
///
/// A multi-byte write must stay inside the section it starts in.
pub fn build_parameter_write(global_offset: u16, values: &[u8]) -> ProtocolResult<Vec<u8>> {
    let addr = locate(global_offset)?;
    build_section_write(addr.section, addr.offset, values)
}

/// Build a parameter write addressed by an explicit section and section offset
pub fn build_section_write(
    section: Section,
    section_offset: u8,
    values: &[u8],
) -> ProtocolResult<Vec<u8>> {
    let start = to_global(section, section_offset)?;
    if section_offset as usize + values.len() > section.len() {
        let last = start + values.len().saturating_sub(1) as u16;
        return Err(ProtocolError::OffsetOutOfRange(last));
    }

    let mut frame = Vec::with_capacity(SYSEX_HEADER.len() + values.len() + 5);
    frame.extend_from_slice(&SYSEX_HEADER);
    frame.push(PARAMETER_SEND_CMD);
    frame.push(section.id());
    frame.push(section_offset);
    frame.extend(values.iter().map(|v| v & 0x7F));

    let sum = checksum(&frame[SYSEX_HEADER.len()..]);
    frame.push(sum);
    frame.push(SYSEX_END);
    Ok(frame)
}

/// Build the dump-request body for `patch_index` (without F0/F7)
pub fn build_dump_request(patch_index: u8) -> Vec<u8> {
    let mut body = Vec::with_capacity(DUMP_REQUEST_PREFIX.len() + 1);
    body.extend_from_slice(&DUMP_REQUEST_PREFIX);
    body.push(patch_index & 0x7F);
    body
}

/// Wrap a SysEx body in F0 ... F7 for transports that send complete messages
pub fn frame_sysex(body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(body.len() + 2);
    frame.push(SYSEX_START);
    frame.extend_from_slice(body);
    frame.push(SYSEX_END);
    frame
}

/// Classify an incoming SysEx message
///
/// Accepts the message with or without its F0/F7 delimiters.
pub fn classify_incoming(bytes: &[u8]) -> IncomingFrame {
    let data = strip_delimiters(bytes);

    if data.len() < BULK_COMMAND_INDEX + 1 || !data.starts_with(&BULK_RESPONSE_PREFIX) {
        return IncomingFrame::Unrecognized;
    }

    let length = data[BULK_LENGTH_INDEX] as usize;
    let command = data[BULK_COMMAND_INDEX];

    if length == 0 && command == BULK_ACK_CMD {
        return match data.get(10..12) {
            Some(&[sub_command, patch_index]) if sub_command == ACK_PATCH_DUMP => {
                IncomingFrame::Ack { sub_command, patch_index }
            }
            _ => IncomingFrame::Unrecognized,
        };
    }

    if command == PARAMETER_SEND_CMD && data.len() >= BULK_PAYLOAD_INDEX + length {
        return IncomingFrame::ParameterData {
            section: data[10],
            section_offset: data[11],
            payload: data[BULK_PAYLOAD_INDEX..BULK_PAYLOAD_INDEX + length].to_vec(),
        };
    }

    IncomingFrame::Unrecognized
}

fn strip_delimiters(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(&[SYSEX_START]).unwrap_or(bytes);
    bytes.strip_suffix(&[SYSEX_END]).unwrap_or(bytes)
}

/// Encode a patch name as the 12 ASCII bytes stored at COMMON offset 16
///
/// Non-printable characters become spaces; short names are space padded.
pub fn encode_patch_name(name: &str) -> [u8; PATCH_NAME_LENGTH] {
    let mut out = [b' '; PATCH_NAME_LENGTH];
    for (slot, ch) in out.iter_mut().zip(name.chars()) {
        *slot = if ch.is_ascii_graphic() || ch == ' ' {
            ch as u8
        } else {
            b' '
        };
    }
    out
}

/// Format bytes as hex for logging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk_data(section: u8, payload: &[u8]) -> Vec<u8> {
        let mut frame = vec![SYSEX_START];
        frame.extend_from_slice(&BULK_RESPONSE_PREFIX);
        frame.push(0x00);
        frame.push(payload.len() as u8);
        frame.push(PARAMETER_SEND_CMD);
        frame.push(section);
        frame.push(0x00);
        frame.extend_from_slice(payload);
        frame.push(0x00); // checksum, not inspected
        frame.push(SYSEX_END);
        frame
    }

    #[test]
    fn test_build_parameter_write_common() {
        let frame = build_parameter_write(9, &[64]).unwrap();
        let expected_sum = checksum(&[0x20, 0x00, 0x09, 0x40]);
        assert_eq!(
            frame,
            vec![0xF0, 0x43, 0x7D, 0x40, 0x55, 0x42, 0x20, 0x00, 0x09, 0x40, expected_sum, 0xF7]
        );
        assert_eq!(expected_sum, 0x17);
    }

    #[test]
    fn test_build_parameter_write_effect() {
        let frame = build_parameter_write(100, &[64]).unwrap();
        assert_eq!(frame[7], 0x01);
        assert_eq!(frame[8], 68);
        assert_eq!(frame[10], checksum(&[0x20, 0x01, 68, 0x40]));
    }

    #[test]
    fn test_build_parameter_write_masks_values() {
        let frame = build_parameter_write(0, &[0xFF, 0x80]).unwrap();
        assert_eq!(&frame[9..11], &[0x7F, 0x00]);
        assert!(crate::checksum::verify(&frame[6..frame.len() - 1]));
    }

    #[test]
    fn test_build_parameter_write_rejects_out_of_range() {
        assert_eq!(
            build_parameter_write(159, &[0]),
            Err(ProtocolError::OffsetOutOfRange(159))
        );
        // 12 bytes starting at 28 would spill into the effect section
        assert!(build_parameter_write(28, &[0; 12]).is_err());
        assert!(build_parameter_write(16, &[0; 12]).is_ok());
    }

    #[test]
    fn test_build_section_write_override() {
        let by_section = build_section_write(Section::Effect, 68, &[64]).unwrap();
        let by_global = build_parameter_write(100, &[64]).unwrap();
        assert_eq!(by_section, by_global);
        assert!(build_section_write(Section::Common, 40, &[1]).is_err());
    }

    #[test]
    fn test_build_dump_request() {
        assert_eq!(
            build_dump_request(5),
            vec![0x43, 0x7D, 0x50, 0x55, 0x42, 0x30, 0x01, 0x05]
        );
        assert_eq!(build_dump_request(0x85)[7], 0x05);
        let framed = frame_sysex(&build_dump_request(0));
        assert_eq!(framed.first(), Some(&SYSEX_START));
        assert_eq!(framed.last(), Some(&SYSEX_END));
        assert_eq!(framed.len(), 10);
    }

    #[test]
    fn test_classify_parameter_data() {
        let payload: Vec<u8> = (0..32).collect();
        match classify_incoming(&bulk_data(0, &payload)) {
            IncomingFrame::ParameterData { section, section_offset, payload: p } => {
                assert_eq!(section, 0);
                assert_eq!(section_offset, 0);
                assert_eq!(p, payload);
            }
            other => panic!("Expected ParameterData, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_without_delimiters() {
        let framed = bulk_data(1, &[7; 127]);
        let stripped = &framed[1..framed.len() - 1];
        assert!(matches!(
            classify_incoming(stripped),
            IncomingFrame::ParameterData { section: 1, .. }
        ));
    }

    #[test]
    fn test_classify_ack() {
        let mut frame = BULK_RESPONSE_PREFIX.to_vec();
        frame.extend_from_slice(&[0x00, 0x00, 0x30, 0x11, 0x03]);
        assert_eq!(
            classify_incoming(&frame),
            IncomingFrame::Ack { sub_command: 0x11, patch_index: 3 }
        );

        // Other sub-commands are not acknowledgements
        let mut other = BULK_RESPONSE_PREFIX.to_vec();
        other.extend_from_slice(&[0x00, 0x00, 0x30, 0x12, 0x03]);
        assert_eq!(classify_incoming(&other), IncomingFrame::Unrecognized);
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify_incoming(&[]), IncomingFrame::Unrecognized);
        assert_eq!(classify_incoming(&[0xF0, 0x41, 0x10, 0xF7]), IncomingFrame::Unrecognized);

        // Truncated payload: length says 32 but only three bytes follow
        let mut truncated = bulk_data(0, &[1; 32]);
        truncated.truncate(16);
        assert_eq!(classify_incoming(&truncated), IncomingFrame::Unrecognized);
    }

    #[test]
    fn test_encode_patch_name() {
        assert_eq!(&encode_patch_name("Lead"), b"Lead        ");
        assert_eq!(&encode_patch_name("A very long patch name"), b"A very long ");
        assert_eq!(&encode_patch_name("Tab\there"), b"Tab here    ");
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0xF0, 0x43, 0x7D]), "F0 43 7D");
        assert_eq!(format_hex(&[]), "");
    }
}
