//! The `error` module defines the [`IntelHexError`] enum that describes the errors that
//! can occur when reading or writing Intel HEX files via [`IntelHex`](crate::IntelHex).
//! It contains the three pieces of information:
//! 1. When the error occurs, e.g., while parsing a record or while writing one.
//! 2. What kind of error was encountered (via [`IntelHexErrorKind`] enum).
//! 3. What is the line index (if applicable), e.g., at which line in a hex file the parsing failed.

use crate::format::HexFormat;
use crate::record::RecordType;
use std::error::Error;
use std::fmt;
use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntelHexError {
    /// Parsing failed at the given 0-based line index of the input
    ParseRecordError(IntelHexErrorKind, usize),
    /// Serialization failed
    WriteRecordError(IntelHexErrorKind),
    /// The underlying stream failed
    Io(io::ErrorKind),
}

impl IntelHexError {
    /// Returns the error kind, if the error is not an I/O error.
    #[must_use]
    pub const fn kind(&self) -> Option<&IntelHexErrorKind> {
        match self {
            Self::ParseRecordError(kind, _) | Self::WriteRecordError(kind) => Some(kind),
            Self::Io(_) => None,
        }
    }
}

impl fmt::Display for IntelHexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseRecordError(base_err, line) => {
                write!(
                    f,
                    "Error encountered during record parsing at line #{} of the hex file:\n{base_err}",
                    line + 1,
                )
            }
            Self::WriteRecordError(base_err) => {
                write!(
                    f,
                    "Error encountered during writing of hex records:\n{base_err}",
                )
            }
            Self::Io(kind) => {
                write!(f, "I/O error: {kind}")
            }
        }
    }
}

impl From<io::Error> for IntelHexError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.kind())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntelHexErrorKind {
    /// Record does not begin with a ':'
    MissingStartCode,
    /// Record contains non-hexadecimal characters
    ContainsInvalidCharacters,
    /// Record is shorter than the smallest valid
    RecordTooShort,
    /// Record length is odd
    RecordNotEvenLength,
    /// Payload (data bytes) size differs from the record's byte count
    RecordInvalidPayloadLength,
    /// Record's payload length does not match the record type
    RecordLengthInvalidForType(RecordType, usize, usize),
    /// Record checksum mismatch (computed, found)
    RecordChecksumMismatch(u8, u8),
    /// Record type outside of the six defined ones
    UnknownRecordType(u8),
    /// Record type is not allowed in the active sub-format
    IllegalRecordType(RecordType, HexFormat),
    /// Encountered second start address record
    DuplicateStartAddress,
    /// Encountered a data record starting at an address that already starts a range
    DuplicateAddress(usize),
    /// Encountered a data record overlapping already stored data
    RecordAddressOverlap(usize),
    /// Encountered a record after the end-of-file record
    TrailingRecordsAfterEof,
    /// Records can only be written in I16 or I32
    InvalidTargetFormat,
    /// Extended address offset cannot be expressed in the target sub-format
    AddressOutOfRange(usize),
    /// Entry point cannot be expressed in the target sub-format
    EntryPointOutOfRange(u32),
    /// Data records cannot have an empty payload
    InvalidPayloadSize,
}

impl IntelHexErrorKind {
    /// Returns `true` for the errors caused by a structurally broken record.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MissingStartCode
                | Self::ContainsInvalidCharacters
                | Self::RecordTooShort
                | Self::RecordNotEvenLength
                | Self::RecordInvalidPayloadLength
                | Self::RecordLengthInvalidForType(..)
        )
    }
}

impl fmt::Display for IntelHexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingStartCode => {
                write!(f, "Missing start code ':'")
            }
            Self::ContainsInvalidCharacters => {
                write!(f, "Record contains invalid character(s)")
            }
            Self::RecordTooShort => {
                write!(f, "Record too short")
            }
            Self::RecordNotEvenLength => {
                write!(f, "Record with uneven length")
            }
            Self::RecordInvalidPayloadLength => {
                write!(f, "Payload (data bytes) size differs from record's length")
            }
            Self::RecordLengthInvalidForType(rtype, expected, actual) => {
                write!(
                    f,
                    "For record type {rtype:?} expected data length is {expected} bytes, found {actual}"
                )
            }
            Self::RecordChecksumMismatch(expected, actual) => {
                write!(
                    f,
                    "Invalid record checksum - expected: 0x{expected:02X}, found: 0x{actual:02X}"
                )
            }
            Self::UnknownRecordType(rtype) => {
                write!(f, "Unknown record type 0x{rtype:02X}")
            }
            Self::IllegalRecordType(rtype, format) => {
                write!(
                    f,
                    "Illegal record type 0x{:02X} for format {format}",
                    *rtype as u8
                )
            }
            Self::DuplicateStartAddress => {
                write!(f, "Encountered second start address record")
            }
            Self::DuplicateAddress(address) => {
                write!(f, "Encountered duplicate start address: 0x{address:X}")
            }
            Self::RecordAddressOverlap(address) => {
                write!(f, "Data overlap found at address: 0x{address:X}")
            }
            Self::TrailingRecordsAfterEof => {
                write!(f, "Encountered record after the end-of-file record")
            }
            Self::InvalidTargetFormat => {
                write!(f, "Target format must be either I16 or I32")
            }
            Self::AddressOutOfRange(offset) => {
                write!(
                    f,
                    "Offset 0x{offset:X} outside of the address space of the target format"
                )
            }
            Self::EntryPointOutOfRange(entry_point) => {
                write!(
                    f,
                    "Entry point 0x{entry_point:X} can't be written in the target format"
                )
            }
            Self::InvalidPayloadSize => {
                write!(f, "Payload size of data records must be at least 1 byte")
            }
        }
    }
}

impl Error for IntelHexError {}
impl Error for IntelHexErrorKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_reports_one_based_line() {
        // Arrange
        let err = IntelHexError::ParseRecordError(IntelHexErrorKind::MissingStartCode, 0);

        // Act
        let msg = err.to_string();

        // Assert
        assert!(msg.contains("line #1"));
        assert!(msg.contains("Missing start code"));
    }

    #[test]
    fn test_is_malformed() {
        assert!(IntelHexErrorKind::MissingStartCode.is_malformed());
        assert!(IntelHexErrorKind::RecordInvalidPayloadLength.is_malformed());
        assert!(
            IntelHexErrorKind::RecordLengthInvalidForType(RecordType::EndOfFile, 0, 1)
                .is_malformed()
        );
        assert!(!IntelHexErrorKind::RecordChecksumMismatch(0x00, 0x01).is_malformed());
        assert!(!IntelHexErrorKind::UnknownRecordType(0x06).is_malformed());
    }

    #[test]
    fn test_io_error_conversion() {
        // Arrange
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended");

        // Act
        let err = IntelHexError::from(io_err);

        // Assert
        assert_eq!(err, IntelHexError::Io(io::ErrorKind::UnexpectedEof));
        assert_eq!(err.kind(), None);
    }
}
