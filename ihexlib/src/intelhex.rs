//! The `intelhex` module provides the [`IntelHex`] struct, a high-level API for
//! reading and writing Intel HEX images.
//!
//! An image is a set of contiguous data ranges (see [`RangeMap`]) plus an optional
//! entry point. It can be read from any I16 or I32 file and written back in either
//! sub-format, which makes conversion between the two a read followed by a write.

use crate::error::{IntelHexError, IntelHexErrorKind};
use crate::format::HexFormat;
use crate::parser::{HexParser, ParseOptions};
use crate::ranges::RangeMap;
use crate::record::{DataRecords, Record};
use log::debug;
use std::collections::btree_map;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Default maximum number of data bytes per data record.
pub const DEFAULT_PAYLOAD_SIZE: u8 = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntelHex {
    /// Entry point of the program (from the start address record)
    entry_point: Option<u32>,
    /// Contiguous data ranges keyed by start address
    data: RangeMap,
}

impl<'a> IntoIterator for &'a IntelHex {
    type Item = (&'a usize, &'a Vec<u8>);
    type IntoIter = btree_map::Iter<'a, usize, Vec<u8>>;
    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl IntelHex {
    /// Creates an `IntelHex` from already merged data ranges and an optional entry point.
    ///
    /// # Examples
    /// ```
    /// use ihexlib::{IntelHex, RangeMap};
    ///
    /// let mut data = RangeMap::new();
    /// data.insert_or_merge(0x100, vec![0xDE, 0xAD]).unwrap();
    ///
    /// let ih = IntelHex::new(data, Some(0x100));
    /// assert_eq!(ih.size(), 2);
    /// ```
    #[must_use]
    pub const fn new(data: RangeMap, entry_point: Option<u32>) -> Self {
        Self { entry_point, data }
    }

    /// Parse Intel HEX records from a reader.
    /// Returns the image and the sub-format it was written in ([`HexFormat::Auto`] if
    /// the input holds no record telling I16 from I32).
    ///
    /// # Errors
    /// Returns an error if reading fails or a record is corrupted or conflicts with
    /// the data parsed before it.
    ///
    /// # Example
    /// ```
    /// use ihexlib::{HexFormat, IntelHex, ParseOptions};
    ///
    /// let input = ":0200000400AA50\n:0D00000048656C6C6F2C20776F726C64216A\n:00000001FF\n";
    /// let (ih, format) = IntelHex::read_hex(input.as_bytes(), &ParseOptions::default()).unwrap();
    ///
    /// assert_eq!(format, HexFormat::I32);
    /// assert_eq!(ih.get_min_addr(), Some(0xAA_0000));
    /// ```
    pub fn read_hex<R: BufRead>(
        reader: R,
        options: &ParseOptions,
    ) -> Result<(Self, HexFormat), IntelHexError> {
        let mut parser = HexParser::new(*options);
        parser.parse_reader(reader)?;
        Ok(parser.finish())
    }

    /// Parse the raw contents of a hex file.
    ///
    /// # Errors
    /// Returns an error if a record is corrupted or conflicts with the data parsed before it.
    ///
    /// # Example
    /// ```
    /// use ihexlib::{HexFormat, IntelHex, ParseOptions};
    ///
    /// let raw = b":020000021000EC\n:0100000055AA\n:0400000310000010D9\n:00000001FF\n";
    /// let (ih, format) = IntelHex::parse(raw, &ParseOptions::default()).unwrap();
    ///
    /// assert_eq!(format, HexFormat::I16);
    /// assert_eq!(ih.get_byte(0x1_0000), Some(0x55));
    /// assert_eq!(ih.entry_point(), Some(0x1_0010));
    /// ```
    pub fn parse(
        raw_bytes: &[u8],
        options: &ParseOptions,
    ) -> Result<(Self, HexFormat), IntelHexError> {
        Self::read_hex(raw_bytes, options)
    }

    /// Creates an `IntelHex` instance from the provided hex file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_hex<P: AsRef<Path>>(
        filepath: P,
        options: &ParseOptions,
    ) -> Result<(Self, HexFormat), IntelHexError> {
        let file = File::open(&filepath)?;
        debug!("Reading {}", filepath.as_ref().display());
        Self::read_hex(BufReader::new(file), options)
    }

    /// Write the image as Intel HEX records in the requested sub-format.
    ///
    /// Data ranges are written in ascending address order, split into records of at most
    /// `max_payload_size` bytes, with extended address records wherever a new 64KiB window
    /// is entered. The start address record (if any) and the end-of-file record follow.
    ///
    /// Records are written as they are produced: on error, the records already written
    /// stay in `writer`.
    ///
    /// Windows are always 64KiB-aligned, so I16 output is limited to data below `0x10_0000`.
    /// An I16 file using segments above `0xF000` (reaching up to `0x10_FFEF`) parses fine,
    /// but writing such an image as I16 fails with [`IntelHexErrorKind::AddressOutOfRange`].
    ///
    /// # Errors
    /// - [`IntelHexErrorKind::InvalidTargetFormat`] if `format` is [`HexFormat::Auto`].
    /// - [`IntelHexErrorKind::InvalidPayloadSize`] if `max_payload_size` is 0.
    /// - [`IntelHexErrorKind::AddressOutOfRange`] / [`IntelHexErrorKind::EntryPointOutOfRange`]
    ///   if the image cannot be expressed in `format`.
    /// - [`IntelHexError::Io`] if writing fails.
    ///
    /// # Example
    /// ```
    /// use ihexlib::{HexFormat, IntelHex, RangeMap};
    ///
    /// let mut data = RangeMap::new();
    /// data.insert_or_merge(0x0, vec![0x55]).unwrap();
    /// let ih = IntelHex::new(data, None);
    ///
    /// let mut out = Vec::new();
    /// ih.write_hex(&mut out, HexFormat::I32, 16).unwrap();
    ///
    /// assert_eq!(String::from_utf8(out).unwrap(), ":0100000055AA\n:00000001FF\n");
    /// ```
    pub fn write_hex<W: Write>(
        &self,
        mut writer: W,
        format: HexFormat,
        max_payload_size: u8,
    ) -> Result<(), IntelHexError> {
        if format == HexFormat::Auto {
            return Err(IntelHexError::WriteRecordError(
                IntelHexErrorKind::InvalidTargetFormat,
            ));
        }
        if max_payload_size == 0 {
            return Err(IntelHexError::WriteRecordError(
                IntelHexErrorKind::InvalidPayloadSize,
            ));
        }

        // Window base set by the most recent extended address record
        let mut offset = 0;

        for (start, data) in &self.data {
            let records = DataRecords::new(*start, data, offset, format, max_payload_size)
                .map_err(IntelHexError::WriteRecordError)?;
            for res in records {
                let (record, applied_offset) = res.map_err(IntelHexError::WriteRecordError)?;
                writeln!(writer, "{record}")?;
                offset = applied_offset;
            }
        }

        // Write start address record
        if let Some(entry_point) = self.entry_point {
            let record =
                Record::entry_point(entry_point, format).map_err(IntelHexError::WriteRecordError)?;
            writeln!(writer, "{record}")?;
        }

        // Write EOF record
        writeln!(writer, "{}", Record::end_of_file())?;

        debug!(
            "Wrote {} bytes in {} range(s) as {format}",
            self.size(),
            self.data.len()
        );
        Ok(())
    }

    /// Generates an Intel HEX file at the specified path, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or the image cannot be expressed
    /// in `format`.
    pub fn write_hex_file<P: AsRef<Path>>(
        &self,
        filepath: P,
        format: HexFormat,
        max_payload_size: u8,
    ) -> Result<(), IntelHexError> {
        // Ensure the parent directory exists
        if let Some(parent) = filepath.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&filepath)?;

        // Wrap in BufWriter for efficient line-by-line writing
        let mut writer = BufWriter::new(file);
        self.write_hex(&mut writer, format, max_payload_size)?;
        writer.flush()?;

        Ok(())
    }

    #[must_use]
    pub const fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    /// Get the contiguous data ranges.
    #[must_use]
    pub const fn ranges(&self) -> &RangeMap {
        &self.data
    }

    /// Get an iterator over (start address, bytes) ranges in ascending address order.
    pub fn iter(&self) -> btree_map::Iter<'_, usize, Vec<u8>> {
        self.into_iter()
    }

    /// Total number of data bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.byte_len()
    }

    /// Get the smallest address holding data.
    #[must_use]
    pub fn get_min_addr(&self) -> Option<usize> {
        self.data.first().map(|(start, _)| start)
    }

    /// Get the highest address holding data.
    ///
    /// # Example
    /// ```
    /// use ihexlib::{IntelHex, RangeMap};
    ///
    /// let mut data = RangeMap::new();
    /// data.insert_or_merge(0x1000, vec![0; 0x40]).unwrap();
    /// let ih = IntelHex::new(data, None);
    ///
    /// assert_eq!(ih.get_max_addr(), Some(0x103F));
    /// ```
    #[must_use]
    pub fn get_max_addr(&self) -> Option<usize> {
        self.data
            .last()
            .map(|(start, data)| start + data.len().saturating_sub(1))
    }

    /// Get byte at the provided address.
    #[must_use]
    pub fn get_byte(&self, address: usize) -> Option<u8> {
        self.data.get_byte(address)
    }
}
