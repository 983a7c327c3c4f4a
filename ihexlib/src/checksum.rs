//! Record checksum: two's complement of the least significant byte of the sum
//! of every byte from the byte count through the end of the payload.

/// Calculate checksum from u8 array.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    (!sum).wrapping_add(1) // two's complement
}
