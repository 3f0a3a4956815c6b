//! Human-unit to 7-bit value transforms
//!
//! A parameter location may carry a transform so callers can write
//! `delay.time_ms = 300` or `amp.model = "JCM800"` instead of raw bytes.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Caller-supplied value before transformation
#[derive(Debug, Clone, PartialEq)]
pub enum TransformInput {
    Number(f64),
    Name(String),
    Flag(bool),
}

impl From<f64> for TransformInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u8> for TransformInput {
    fn from(value: u8) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for TransformInput {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<&str> for TransformInput {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

/// Mapping from a human value onto 0-127
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueTransform {
    /// Integer 0-127, passed through
    #[default]
    Raw,
    /// `value / scale` clamped to 0..1, scaled to 0-127
    Normalized {
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// Milliseconds on the device's piecewise time scale
    LogTime,
    /// Hertz on a logarithmic 0.1-20 Hz scale
    LogRate,
    /// Named values, matched case-insensitively
    Choice { choices: BTreeMap<String, u8> },
    /// Off/on as 0/1
    Toggle,
}

fn default_scale() -> f64 {
    1.0
}

impl ValueTransform {
    /// Build a choice table from static pairs
    pub fn choice(entries: &[(&str, u8)]) -> Self {
        Self::Choice {
            choices: entries
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }

    /// Map `input` to a parameter value, `None` when it has no 7-bit encoding
    pub fn apply(&self, input: &TransformInput) -> Option<u8> {
        match (self, input) {
            (Self::Raw, TransformInput::Number(v)) => {
                let v = v.round();
                (0.0..=127.0).contains(&v).then_some(v as u8)
            }
            (Self::Normalized { scale }, TransformInput::Number(v)) => {
                if *scale <= 0.0 || v.is_nan() {
                    return None;
                }
                Some(((v / scale).clamp(0.0, 1.0) * 127.0).round() as u8)
            }
            (Self::LogTime, TransformInput::Number(ms)) => log_time(*ms),
            (Self::LogRate, TransformInput::Number(hz)) => Some(log_rate(*hz)),
            (Self::Choice { choices }, TransformInput::Name(name)) => choices
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| *value & 0x7F),
            (Self::Toggle, TransformInput::Flag(on)) => Some(u8::from(*on)),
            (Self::Toggle, TransformInput::Number(v)) => Some(u8::from(*v != 0.0)),
            _ => None,
        }
    }

    /// Like [`apply`](Self::apply), naming the parameter in the error
    pub fn apply_for(&self, label: &str, input: &TransformInput) -> ProtocolResult<u8> {
        self.apply(input).ok_or_else(|| ProtocolError::ValueOutOfRange {
            label: label.to_string(),
        })
    }
}

fn log_time(ms: f64) -> Option<u8> {
    if ms.is_nan() {
        return None;
    }
    if ms <= 0.0 {
        return Some(0);
    }
    let scaled = if ms <= 50.0 {
        ms * 2.54
    } else if ms <= 500.0 {
        127.0 + (ms - 50.0) * 0.28
    } else {
        255.0 + (ms - 500.0) * 0.1
    };
    let value = scaled.round();
    (value <= 127.0).then_some(value as u8)
}

fn log_rate(hz: f64) -> u8 {
    if hz.is_nan() || hz < 0.1 {
        0
    } else if hz > 20.0 {
        127
    } else {
        (127.0 * (hz / 0.1).log10() / 200f64.log10()).round() as u8
    }
}

const AMP_MODELS: &[(&str, u8)] = &[
    ("BRIT_TOP_BOOST", 0x01),
    ("TWEED_BASSMAN", 0x02),
    ("JCM800", 0x03),
    ("AC30", 0x04),
    ("FENDER_TWIN", 0x05),
    ("MESA_BOOGIE", 0x06),
];

const CAB_MODELS: &[(&str, u8)] = &[
    ("2x12_ALNICO", 0x01),
    ("4x10_TWEED", 0x02),
    ("4x12_VINTAGE", 0x03),
    ("4x12_MODERN", 0x04),
    ("1x12_BLACKFACE", 0x05),
    ("2x12_CELESTION", 0x06),
];

const BOOSTER_TYPES: &[(&str, u8)] = &[
    ("TREBLE", 0x01),
    ("TUBE_SCREAMER", 0x02),
    ("CLEAN", 0x03),
    ("DISTORTION", 0x04),
    ("FUZZ", 0x05),
];

const REVERB_TYPES: &[(&str, u8)] = &[
    ("ROOM", 0x01),
    ("PLATE", 0x02),
    ("HALL", 0x03),
    ("SPRING", 0x04),
    ("CHURCH", 0x05),
];

const MOD_TYPES: &[(&str, u8)] = &[
    ("CHORUS", 0x01),
    ("PHASER", 0x02),
    ("TREMOLO", 0x03),
    ("VIBRATO", 0x04),
    ("FLANGER", 0x05),
];

static REGISTRY: OnceLock<HashMap<&'static str, ValueTransform>> = OnceLock::new();

fn registry() -> &'static HashMap<&'static str, ValueTransform> {
    REGISTRY.get_or_init(|| {
        let unit = ValueTransform::Normalized { scale: 1.0 };
        HashMap::from([
            ("amp.model", ValueTransform::choice(AMP_MODELS)),
            ("amp.cab", ValueTransform::choice(CAB_MODELS)),
            ("amp.gain", unit.clone()),
            ("amp.bass", unit.clone()),
            ("amp.mid", unit.clone()),
            ("amp.treble", unit.clone()),
            ("amp.presence", unit.clone()),
            ("amp.master", unit.clone()),
            ("booster.type", ValueTransform::choice(BOOSTER_TYPES)),
            ("booster.level", unit.clone()),
            ("booster.enabled", ValueTransform::Toggle),
            ("delay.enabled", ValueTransform::Toggle),
            ("delay.time_ms", ValueTransform::LogTime),
            ("delay.feedback", unit.clone()),
            ("delay.mix", unit.clone()),
            ("reverb.enabled", ValueTransform::Toggle),
            ("reverb.type", ValueTransform::choice(REVERB_TYPES)),
            // Decay is normalized against a 3 s maximum
            ("reverb.decay_s", ValueTransform::Normalized { scale: 3.0 }),
            ("reverb.mix", unit.clone()),
            ("mod.enabled", ValueTransform::Toggle),
            ("mod.type", ValueTransform::choice(MOD_TYPES)),
            ("mod.rate_hz", ValueTransform::LogRate),
            ("mod.depth", unit.clone()),
            ("mod.mix", unit),
        ])
    })
}

/// Look up the built-in transform for an effect block parameter
///
/// `section` is the block (`amp`, `booster`, `delay`, `reverb`, `mod`) and
/// `key` the parameter within it.
pub fn builtin_transform(section: &str, key: &str) -> Option<&'static ValueTransform> {
    registry().get(format!("{}.{}", section, key).as_str())
}
