//! The `record` module defines the [`Record`] and [`RecordType`] which are used for parsing
//! (and generating) Intel HEX records, and [`DataRecords`], the encoder that splits one
//! contiguous range into data records and the extended address records it needs.

use crate::checksum::checksum;
use crate::error::IntelHexErrorKind;
use crate::format::HexFormat;
use std::fmt;

/// Size of the address window a data record can reach without a new extended address record.
pub const WINDOW_SIZE: usize = 0x1_0000;

mod sizes {
    pub const BYTE_CHAR_LEN: usize = 2;
    // len + addr + rtype + checksum
    pub const SMALLEST_RECORD: usize = 1 + 2 + 1 + 1;
    pub const HEADER: usize = 4;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    Data = 0x0,
    EndOfFile = 0x1,
    ExtendedSegmentAddress = 0x2,
    StartSegmentAddress = 0x3,
    ExtendedLinearAddress = 0x4,
    StartLinearAddress = 0x5,
}

impl TryFrom<u8> for RecordType {
    type Error = IntelHexErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Data),
            0x01 => Ok(Self::EndOfFile),
            0x02 => Ok(Self::ExtendedSegmentAddress),
            0x03 => Ok(Self::StartSegmentAddress),
            0x04 => Ok(Self::ExtendedLinearAddress),
            0x05 => Ok(Self::StartLinearAddress),
            _ => Err(IntelHexErrorKind::UnknownRecordType(value)),
        }
    }
}

impl RecordType {
    /// Extended address and start address records, the ones that tell I16 from I32.
    #[must_use]
    pub const fn is_address_control(self) -> bool {
        !matches!(self, Self::Data | Self::EndOfFile)
    }

    /// Fixed payload length of the record type (data records have none).
    const fn payload_len(self) -> Option<usize> {
        match self {
            Self::Data => None,
            Self::EndOfFile => Some(0),
            Self::ExtendedSegmentAddress | Self::ExtendedLinearAddress => Some(2),
            Self::StartSegmentAddress | Self::StartLinearAddress => Some(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub length: u8,
    pub address: u16,
    pub rtype: RecordType,
    pub data: Vec<u8>,
    pub checksum: u8,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            ":{:02X}{:04X}{:02X}",
            self.length, self.address, self.rtype as u8
        )?;
        for byte in &self.data {
            write!(f, "{byte:02X}")?;
        }
        write!(f, "{:02X}", self.checksum)
    }
}

impl Record {
    /// Create a record from address, type and data, stamping the checksum.
    ///
    /// # Errors
    /// Returns an error if the payload does not fit the one-byte length field.
    pub fn new(address: u16, rtype: RecordType, data: Vec<u8>) -> Result<Self, IntelHexErrorKind> {
        let length =
            u8::try_from(data.len()).map_err(|_| IntelHexErrorKind::RecordInvalidPayloadLength)?;

        let [addr_high, addr_low] = address.to_be_bytes();
        let mut bytes = Vec::with_capacity(data.len() + sizes::HEADER);
        bytes.extend_from_slice(&[length, addr_high, addr_low, rtype as u8]);
        bytes.extend_from_slice(&data);

        Ok(Self {
            length,
            address,
            rtype,
            data,
            checksum: checksum(&bytes),
        })
    }

    /// The end-of-file record, `:00000001FF`.
    #[must_use]
    pub const fn end_of_file() -> Self {
        Self {
            length: 0,
            address: 0,
            rtype: RecordType::EndOfFile,
            data: Vec::new(),
            checksum: 0xFF,
        }
    }

    /// Create the extended address record moving the window base to `abs_offset`:
    /// type `04` carrying `abs_offset >> 16` for I32, type `02` carrying `abs_offset >> 4` for I16.
    ///
    /// # Errors
    /// - [`IntelHexErrorKind::InvalidTargetFormat`] for [`HexFormat::Auto`].
    /// - [`IntelHexErrorKind::AddressOutOfRange`] if the shifted offset does not fit 16 bits.
    pub fn extended_address(
        abs_offset: usize,
        format: HexFormat,
    ) -> Result<Self, IntelHexErrorKind> {
        let (rtype, shift) = match format {
            HexFormat::I16 => (RecordType::ExtendedSegmentAddress, 4),
            HexFormat::I32 => (RecordType::ExtendedLinearAddress, 16),
            HexFormat::Auto => return Err(IntelHexErrorKind::InvalidTargetFormat),
        };

        let base = u16::try_from(abs_offset >> shift)
            .map_err(|_| IntelHexErrorKind::AddressOutOfRange(abs_offset))?;

        Self::new(0, rtype, base.to_be_bytes().to_vec())
    }

    /// Create the start address record for `entry_point`.
    ///
    /// I32 stores the entry point as is (type `05`). I16 stores it as a `CS:IP` pair
    /// (type `03`), so only entry points below `0x10_0000` can be written.
    ///
    /// # Errors
    /// - [`IntelHexErrorKind::InvalidTargetFormat`] for [`HexFormat::Auto`].
    /// - [`IntelHexErrorKind::EntryPointOutOfRange`] if the segment does not fit I16.
    pub fn entry_point(entry_point: u32, format: HexFormat) -> Result<Self, IntelHexErrorKind> {
        match format {
            HexFormat::I32 => Self::new(
                0,
                RecordType::StartLinearAddress,
                entry_point.to_be_bytes().to_vec(),
            ),
            HexFormat::I16 => {
                let segment = entry_point >> 16;
                if segment > 0xF {
                    return Err(IntelHexErrorKind::EntryPointOutOfRange(entry_point));
                }
                let word = ((segment << 12) << 16) | (entry_point & 0xFFFF);
                Self::new(0, RecordType::StartSegmentAddress, word.to_be_bytes().to_vec())
            }
            HexFormat::Auto => Err(IntelHexErrorKind::InvalidTargetFormat),
        }
    }

    /// Payload read as one big-endian number (for address and start address records).
    #[must_use]
    pub fn value(&self) -> u32 {
        self.data
            .iter()
            .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
    }

    /// Parse one line into a Record. Whitespace anywhere in the line is ignored.
    ///
    /// # Errors
    /// Returns an error if the record is malformed, its checksum does not match, or
    /// its type is unknown.
    pub fn parse(line: &[u8]) -> Result<Self, IntelHexErrorKind> {
        let mut chars = line.iter().copied().filter(|b| !b.is_ascii_whitespace());

        // Check for start code
        if chars.next() != Some(b':') {
            return Err(IntelHexErrorKind::MissingStartCode);
        }

        let hexdigit_part: Vec<u8> = chars.collect();

        // Validate all characters are hexadecimal
        if !hexdigit_part.iter().all(u8::is_ascii_hexdigit) {
            return Err(IntelHexErrorKind::ContainsInvalidCharacters);
        }

        // Validate record's size
        if hexdigit_part.len() < sizes::SMALLEST_RECORD * sizes::BYTE_CHAR_LEN {
            return Err(IntelHexErrorKind::RecordTooShort);
        } else if hexdigit_part.len() % sizes::BYTE_CHAR_LEN != 0 {
            return Err(IntelHexErrorKind::RecordNotEvenLength);
        }

        let raw: Vec<u8> = hexdigit_part
            .chunks_exact(sizes::BYTE_CHAR_LEN)
            .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
            .collect();

        // Check the payload matches the byte count
        let length = raw[0];
        let checksum_pos = sizes::HEADER + length as usize;
        if raw.len() != checksum_pos + 1 {
            return Err(IntelHexErrorKind::RecordInvalidPayloadLength);
        }

        // Validate checksum
        let found = raw[checksum_pos];
        let expected = checksum(&raw[..checksum_pos]);
        if expected != found {
            return Err(IntelHexErrorKind::RecordChecksumMismatch(expected, found));
        }

        let rtype = RecordType::try_from(raw[3])?;
        if let Some(expected_len) = rtype.payload_len()
            && expected_len != length as usize
        {
            return Err(IntelHexErrorKind::RecordLengthInvalidForType(
                rtype,
                expected_len,
                length as usize,
            ));
        }

        Ok(Self {
            length,
            address: u16::from_be_bytes([raw[1], raw[2]]),
            rtype,
            data: raw[sizes::HEADER..checksum_pos].to_vec(),
            checksum: found,
        })
    }
}

/// Value of an ASCII hex digit. Callers check `is_ascii_hexdigit` first.
const fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

/// Encoder of one contiguous range into records.
///
/// Yields every data record together with the window base (absolute offset of the
/// most recent extended address record) in effect after it. Extended address records
/// are synthesized when the range starts outside the current window and whenever a
/// chunk reaches the end of a window while data remains. Chunks never cross a window
/// boundary.
///
/// The window base the encoder finishes on is available through [`DataRecords::offset`]
/// and is meant to be fed into the encoder of the next range.
#[derive(Debug)]
pub struct DataRecords<'a> {
    start: usize,
    data: &'a [u8],
    index: usize,
    offset: usize,
    format: HexFormat,
    max_payload_size: usize,
    pending_offset: Option<usize>,
    done: bool,
}

impl<'a> DataRecords<'a> {
    /// # Errors
    /// - [`IntelHexErrorKind::InvalidTargetFormat`] for [`HexFormat::Auto`].
    /// - [`IntelHexErrorKind::InvalidPayloadSize`] if `max_payload_size` is 0.
    pub fn new(
        start: usize,
        data: &'a [u8],
        offset: usize,
        format: HexFormat,
        max_payload_size: u8,
    ) -> Result<Self, IntelHexErrorKind> {
        if format == HexFormat::Auto {
            return Err(IntelHexErrorKind::InvalidTargetFormat);
        }
        if max_payload_size == 0 {
            return Err(IntelHexErrorKind::InvalidPayloadSize);
        }

        // Start address outside of the current window -> jump to the window containing it
        let pending_offset = (!data.is_empty()
            && (start < offset || start - offset >= WINDOW_SIZE))
            .then_some(start & !(WINDOW_SIZE - 1));

        Ok(Self {
            start,
            data,
            index: 0,
            offset,
            format,
            max_payload_size: max_payload_size as usize,
            pending_offset,
            done: false,
        })
    }

    /// Window base in effect after the records yielded so far.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for DataRecords<'_> {
    type Item = Result<(Record, usize), IntelHexErrorKind>;

    #[allow(clippy::cast_possible_truncation)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(offset) = self.pending_offset.take() {
            return Some(match Record::extended_address(offset, self.format) {
                Ok(record) => {
                    self.offset = offset;
                    Ok((record, offset))
                }
                Err(err) => {
                    self.done = true;
                    Err(err)
                }
            });
        }

        if self.index >= self.data.len() {
            self.done = true;
            return None;
        }

        // Address relative to the window base, always < WINDOW_SIZE here
        let rel_addr = self.start + self.index - self.offset;
        let length = (self.data.len() - self.index)
            .min(self.max_payload_size)
            .min(WINDOW_SIZE - rel_addr);

        let chunk = &self.data[self.index..self.index + length];
        self.index += length;

        if rel_addr + length == WINDOW_SIZE && self.index < self.data.len() {
            self.pending_offset = Some(self.offset + WINDOW_SIZE);
        }

        let record = Record::new(rel_addr as u16, RecordType::Data, chunk.to_vec());
        if record.is_err() {
            self.done = true;
        }
        Some(record.map(|record| (record, self.offset)))
    }
}
