//! Protocol error types

use thiserror::Error;

/// Validation errors raised before any I/O takes place
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Global offset (or the end of a multi-byte write) lies outside the patch
    #[error("Parameter offset {0} is out of range (0-158)")]
    OffsetOutOfRange(u16),

    /// Label not present in the parameter inventory
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// Section id other than COMMON (0) or EFFECT (1)
    #[error("Invalid patch section: {0}")]
    InvalidSection(u8),

    /// A value transform could not map the input onto 0-127
    #[error("Value for '{label}' cannot be represented as a 7-bit parameter")]
    ValueOutOfRange { label: String },
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
