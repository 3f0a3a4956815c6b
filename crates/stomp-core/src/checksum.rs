//! Magicstomp 7-bit checksum
//!
//! The device validates each parameter write with the negated byte sum,
//! masked to 7 bits. The sum is accumulated without intermediate reduction.

/// Compute the checksum over `data` (command byte through last value byte)
pub fn checksum(data: &[u8]) -> u8 {
    let sum: i64 = data.iter().map(|&b| i64::from(b)).sum();
    ((-sum) & 0x7F) as u8
}

/// Check a byte run whose last byte is its checksum
///
/// Returns false for an empty slice.
pub fn verify(data_with_checksum: &[u8]) -> bool {
    match data_with_checksum.split_last() {
        Some((&expected, data)) => checksum(data) == expected,
        None => false,
    }
}
