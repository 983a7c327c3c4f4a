//! The `parser` module provides [`HexParser`], the state machine turning a stream of
//! Intel HEX records into an [`IntelHex`] image.
//!
//! The parser tracks the sub-format (resolving [`HexFormat::Auto`] on the first extended
//! address or start address record), the current extended address offset, the entry point
//! and whether the end-of-file record was seen. Data records are merged into a [`RangeMap`].
//!
//! Non-fatal findings (illegal record types and duplicate start addresses when not in
//! strict mode) are logged with `log::warn!` and collected as [`ParseWarning`]s.

use crate::error::{IntelHexError, IntelHexErrorKind};
use crate::format::HexFormat;
use crate::intelhex::IntelHex;
use crate::ranges::RangeMap;
use crate::record::{Record, RecordType};
use log::{debug, info, warn};
use std::fmt;
use std::io::BufRead;

/// Parse configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Expected sub-format, or [`HexFormat::Auto`] to detect it
    pub format: HexFormat,
    /// Turn illegal record types and duplicate start addresses into errors
    pub strict: bool,
}

impl ParseOptions {
    #[must_use]
    pub const fn new(format: HexFormat, strict: bool) -> Self {
        Self { format, strict }
    }
}

/// Non-fatal finding of a non-strict parse. `line` is the 0-based line index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    IllegalRecordType {
        line: usize,
        rtype: RecordType,
        format: HexFormat,
    },
    DuplicateStartAddress {
        line: usize,
        previous: u32,
        current: u32,
    },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalRecordType {
                line,
                rtype,
                format,
            } => write!(
                f,
                "Illegal record type 0x{:02X} for format {format} at line #{}",
                *rtype as u8,
                line + 1
            ),
            Self::DuplicateStartAddress {
                line,
                previous,
                current,
            } => write!(
                f,
                "File has two start address records, 0x{previous:X} replaced by 0x{current:X} at line #{}",
                line + 1
            ),
        }
    }
}

#[derive(Debug)]
pub struct HexParser {
    strict: bool,
    format: HexFormat,
    offset: usize,
    entry_point: Option<u32>,
    seen_eof: bool,
    data: RangeMap,
    warnings: Vec<ParseWarning>,
}

impl HexParser {
    #[must_use]
    pub const fn new(options: ParseOptions) -> Self {
        Self {
            strict: options.strict,
            format: options.format,
            offset: 0,
            entry_point: None,
            seen_eof: false,
            data: RangeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Parse every line of `reader`.
    ///
    /// # Errors
    /// Returns the first error encountered, either from reading or from parsing a record.
    pub fn parse_reader<R: BufRead>(&mut self, reader: R) -> Result<(), IntelHexError> {
        for (index, line) in reader.split(b'\n').enumerate() {
            let line = line?;
            self.parse_line(index, &line)?;
        }
        Ok(())
    }

    /// Parse a single line. Blank lines are skipped.
    ///
    /// # Errors
    /// Returns an error tagged with `index` if the line is not a valid record or the
    /// record cannot be applied to the image.
    pub fn parse_line(&mut self, index: usize, line: &[u8]) -> Result<(), IntelHexError> {
        if line.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }

        if self.seen_eof {
            return Err(IntelHexError::ParseRecordError(
                IntelHexErrorKind::TrailingRecordsAfterEof,
                index,
            ));
        }

        let record =
            Record::parse(line).map_err(|err| IntelHexError::ParseRecordError(err, index))?;

        self.apply(index, record)
            .map_err(|err| IntelHexError::ParseRecordError(err, index))
    }

    fn apply(&mut self, line: usize, record: Record) -> Result<(), IntelHexErrorKind> {
        if record.rtype.is_address_control() {
            self.check_format(line, record.rtype)?;
        }

        match record.rtype {
            RecordType::Data => {
                let address = self.offset + record.address as usize;
                self.data.insert_or_merge(address, record.data)?;
            }
            RecordType::EndOfFile => {
                self.seen_eof = true;
            }
            RecordType::ExtendedSegmentAddress => {
                self.offset = (record.value() as usize) << 4;
            }
            RecordType::ExtendedLinearAddress => {
                self.offset = (record.value() as usize) << 16;
            }
            RecordType::StartSegmentAddress => {
                // CS:IP pair
                let value = record.value();
                let segment = value >> 16;
                let seg_offset = value & 0xFFFF;
                self.set_entry_point(line, (segment << 4) + seg_offset)?;
            }
            RecordType::StartLinearAddress => {
                self.set_entry_point(line, record.value())?;
            }
        }

        Ok(())
    }

    fn check_format(&mut self, line: usize, rtype: RecordType) -> Result<(), IntelHexErrorKind> {
        if self.format == HexFormat::Auto
            && let Some(detected) = HexFormat::detect(rtype)
        {
            info!("Detected file type {detected}");
            self.format = detected;
        }

        if !self.format.allows(rtype) {
            if self.strict {
                return Err(IntelHexErrorKind::IllegalRecordType(rtype, self.format));
            }
            self.warn(ParseWarning::IllegalRecordType {
                line,
                rtype,
                format: self.format,
            });
        }

        Ok(())
    }

    fn set_entry_point(&mut self, line: usize, entry_point: u32) -> Result<(), IntelHexErrorKind> {
        if let Some(previous) = self.entry_point {
            if self.strict {
                return Err(IntelHexErrorKind::DuplicateStartAddress);
            }
            self.warn(ParseWarning::DuplicateStartAddress {
                line,
                previous,
                current: entry_point,
            });
        }
        self.entry_point = Some(entry_point);
        Ok(())
    }

    fn warn(&mut self, warning: ParseWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Sub-format as resolved so far ([`HexFormat::Auto`] while unresolved).
    #[must_use]
    pub const fn format(&self) -> HexFormat {
        self.format
    }

    #[must_use]
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Whether the end-of-file record has been parsed.
    #[must_use]
    pub const fn seen_eof(&self) -> bool {
        self.seen_eof
    }

    /// Consume the parser and return the image with the resolved sub-format.
    /// A missing end-of-file record is not an error.
    #[must_use]
    pub fn finish(self) -> (IntelHex, HexFormat) {
        if !self.seen_eof {
            debug!("Input ended without an end-of-file record");
        }
        debug!(
            "Parsed {} bytes in {} range(s), format {}",
            self.data.byte_len(),
            self.data.len(),
            self.format
        );
        (IntelHex::new(self.data, self.entry_point), self.format)
    }
}
