//! MIDI port discovery
//!
//! Uses midir for cross-platform MIDI I/O (ALSA on Linux, CoreMIDI on macOS, WinMM on Windows).
//! Ports are matched case-insensitively on their normalized names, so a
//! configured `port_match` survives ALSA client renumbering.

use midir::{MidiInput, MidiOutput};

use crate::transport::TransportError;

/// Auto-detect patterns in priority order
const DEVICE_PATTERNS: &[&str] = &["magicstomp", "ub9", "yamaha"];

/// Yamaha devices that are never a Magicstomp
const EXCLUDED_PATTERNS: &[&str] = &["ag03"];

/// Strip platform-specific suffixes from a MIDI port name
///
/// Removes the bracketed hardware id (`[hw:3,0,0]`) and a trailing ALSA
/// sequencer `client:port` pair (`20:0`).
pub fn normalize_port_name(name: &str) -> String {
    let mut result = name.trim();

    if let Some(bracket_pos) = result.rfind('[') {
        result = result[..bracket_pos].trim();
    }

    if let Some(last_space) = result.rfind(' ') {
        let suffix = &result[last_space + 1..];
        if let Some((client, port)) = suffix.split_once(':') {
            let is_id = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
            if is_id(client) && is_id(port) {
                result = result[..last_space].trim();
            }
        }
    }

    result.to_string()
}

/// Pick a port from `names`
///
/// With a pattern, returns the first port whose normalized name contains
/// it. Without one, prefers `magicstomp`, then `ub9`, then any `yamaha`
/// port that is not an AG03 mixer, then the first port.
pub fn select_port(names: &[String], port_match: Option<&str>) -> Option<usize> {
    let lowered: Vec<String> = names
        .iter()
        .map(|name| normalize_port_name(name).to_lowercase())
        .collect();

    if let Some(pattern) = port_match {
        let pattern = normalize_port_name(pattern).to_lowercase();
        return lowered.iter().position(|name| name.contains(&pattern));
    }

    DEVICE_PATTERNS
        .iter()
        .find_map(|pattern| {
            lowered.iter().position(|name| {
                name.contains(pattern) && !EXCLUDED_PATTERNS.iter().any(|ex| name.contains(ex))
            })
        })
        .or(if names.is_empty() { None } else { Some(0) })
}

/// List all available MIDI input ports
pub fn list_input_ports() -> Result<Vec<String>, TransportError> {
    let midi_in =
        MidiInput::new("stomp-midi-list").map_err(|e| TransportError::Init(e.to_string()))?;

    Ok(midi_in
        .ports()
        .iter()
        .filter_map(|port| midi_in.port_name(port).ok())
        .collect())
}

/// List all available MIDI output ports
pub fn list_output_ports() -> Result<Vec<String>, TransportError> {
    let midi_out =
        MidiOutput::new("stomp-midi-list").map_err(|e| TransportError::Init(e.to_string()))?;

    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_port_name() {
        assert_eq!(normalize_port_name("UB9 MIDI 1 [hw:3,0,0]"), "UB9 MIDI 1");
        assert_eq!(
            normalize_port_name("Magicstomp:Magicstomp MIDI 1 28:0"),
            "Magicstomp:Magicstomp MIDI 1"
        );
        assert_eq!(normalize_port_name("  Yamaha USB  "), "Yamaha USB");
        assert_eq!(normalize_port_name("Port A:B"), "Port A:B");
    }

    #[test]
    fn test_select_port_with_pattern() {
        let ports = names(&["Midi Through 14:0", "UB9 MIDI 1 [hw:3,0,0]"]);
        assert_eq!(select_port(&ports, Some("ub9")), Some(1));
        assert_eq!(select_port(&ports, Some("UB9 MIDI 1 [hw:4,0,0]")), Some(1));
        assert_eq!(select_port(&ports, Some("launchpad")), None);
    }

    #[test]
    fn test_select_port_auto_detect_priority() {
        let ports = names(&["Yamaha AG03", "Yamaha USB-MIDI", "UB9", "Magicstomp"]);
        assert_eq!(select_port(&ports, None), Some(3));

        let ports = names(&["Yamaha AG03", "Yamaha USB-MIDI", "UB9"]);
        assert_eq!(select_port(&ports, None), Some(2));

        let ports = names(&["Yamaha AG03", "Yamaha USB-MIDI"]);
        assert_eq!(select_port(&ports, None), Some(1));
    }

    #[test]
    fn test_select_port_falls_back_to_first() {
        let ports = names(&["Yamaha AG03", "Midi Through"]);
        assert_eq!(select_port(&ports, None), Some(0));
        assert_eq!(select_port(&[], None), None);
    }

    #[test]
    fn test_list_ports() {
        // Port availability depends on the system; this only checks enumeration doesn't panic
        let _input_ports = list_input_ports();
        let _output_ports = list_output_ports();
    }
}
