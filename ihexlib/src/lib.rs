//! # `ihexlib`
//!
//! `ihexlib` is a Rust library for reading, validating, and writing Intel HEX files
//! in both of their sub-formats: I16 (extended segment addressing) and I32 (extended
//! linear addressing).
//!
//! The library provides:
//! - Parser for Intel HEX files with sub-format detection (via [`IntelHex::read_hex`]).
//! - Writer producing either sub-format (via [`IntelHex::write_hex`]).
//! - Sparse, merged representation of the image data (via [`RangeMap`]).
//! - Error handling with [`IntelHexError`].
//!
//! ## Example
//!
//! ```
//! use ihexlib::{HexFormat, IntelHex, ParseOptions};
//!
//! let input = ":020000040001F9\n:0100000055AA\n:00000001FF\n";
//! let (ih, format) = IntelHex::read_hex(input.as_bytes(), &ParseOptions::default()).unwrap();
//! assert_eq!(format, HexFormat::I32);
//!
//! // Convert to I16
//! let mut out = Vec::new();
//! ih.write_hex(&mut out, HexFormat::I16, 16).unwrap();
//! assert_eq!(
//!     String::from_utf8(out).unwrap(),
//!     ":020000021000EC\n:0100000055AA\n:00000001FF\n"
//! );
//! ```

mod checksum;
mod error;
mod format;
mod intelhex;
mod parser;
mod ranges;
mod record;

// Public APIs
pub use checksum::checksum;
pub use error::{IntelHexError, IntelHexErrorKind};
pub use format::HexFormat;
pub use intelhex::{DEFAULT_PAYLOAD_SIZE, IntelHex};
pub use parser::{HexParser, ParseOptions, ParseWarning};
pub use ranges::RangeMap;
pub use record::{DataRecords, Record, RecordType, WINDOW_SIZE};
