//! The `format` module defines [`HexFormat`], the Intel HEX sub-format selector.
//!
//! The two sub-formats share data (`00`) and end-of-file (`01`) records and differ in
//! which extended address / start address record pair they allow:
//! - `I16` uses extended segment address (`02`) and start segment address (`03`),
//! - `I32` uses extended linear address (`04`) and start linear address (`05`).

use crate::error::IntelHexErrorKind;
use crate::record::RecordType;
use std::fmt;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum HexFormat {
    /// Not (yet) resolved. Valid only when reading.
    #[default]
    Auto,
    I16,
    I32,
}

impl HexFormat {
    /// Record types that must not appear in a file of this format.
    #[must_use]
    pub const fn illegal_record_types(self) -> &'static [RecordType] {
        match self {
            Self::Auto => &[],
            Self::I16 => &[
                RecordType::ExtendedLinearAddress,
                RecordType::StartLinearAddress,
            ],
            Self::I32 => &[
                RecordType::ExtendedSegmentAddress,
                RecordType::StartSegmentAddress,
            ],
        }
    }

    /// Returns `true` if `rtype` may appear in a file of this format.
    #[must_use]
    pub fn allows(self, rtype: RecordType) -> bool {
        !self.illegal_record_types().contains(&rtype)
    }

    /// Resolves the format implied by an address / start address record.
    /// Data and end-of-file records imply nothing.
    #[must_use]
    pub fn detect(rtype: RecordType) -> Option<Self> {
        if !rtype.is_address_control() {
            return None;
        }
        [Self::I16, Self::I32]
            .into_iter()
            .find(|format| format.allows(rtype))
    }
}

impl fmt::Display for HexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::I16 => write!(f, "I16"),
            Self::I32 => write!(f, "I32"),
        }
    }
}

impl FromStr for HexFormat {
    type Err = IntelHexErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("auto") => Ok(Self::Auto),
            s if s.eq_ignore_ascii_case("I16") => Ok(Self::I16),
            s if s.eq_ignore_ascii_case("I32") => Ok(Self::I32),
            _ => Err(IntelHexErrorKind::InvalidTargetFormat),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("I16".parse(), Ok(HexFormat::I16));
        assert_eq!("i32".parse(), Ok(HexFormat::I32));
        assert_eq!("Auto".parse(), Ok(HexFormat::Auto));
        assert_eq!(
            "I8".parse::<HexFormat>(),
            Err(IntelHexErrorKind::InvalidTargetFormat)
        );
    }

    #[test]
    fn test_detect() {
        assert_eq!(HexFormat::detect(RecordType::Data), None);
        assert_eq!(HexFormat::detect(RecordType::EndOfFile), None);
        assert_eq!(
            HexFormat::detect(RecordType::ExtendedSegmentAddress),
            Some(HexFormat::I16)
        );
        assert_eq!(
            HexFormat::detect(RecordType::StartSegmentAddress),
            Some(HexFormat::I16)
        );
        assert_eq!(
            HexFormat::detect(RecordType::ExtendedLinearAddress),
            Some(HexFormat::I32)
        );
        assert_eq!(
            HexFormat::detect(RecordType::StartLinearAddress),
            Some(HexFormat::I32)
        );
    }

    #[test]
    fn test_allows() {
        assert!(HexFormat::I16.allows(RecordType::Data));
        assert!(!HexFormat::I16.allows(RecordType::StartLinearAddress));
        assert!(!HexFormat::I32.allows(RecordType::ExtendedSegmentAddress));
        assert!(HexFormat::Auto.allows(RecordType::ExtendedSegmentAddress));
    }
}
