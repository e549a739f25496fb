//! Provides `Guid`, a platform-independent GUID/CLSID/IID value.
//!
//! # Examples
//! ```
//! use comscope::guid::Guid;
//!
//! // CLSID_StdComponentCategoriesMgr
//! let clsid = Guid::from_fields(0x0002E005, 0x0000, 0x0000, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);
//! assert_eq!(clsid.to_string(), "{0002E005-0000-0000-C000-000000000046}");
//! assert_eq!("0002e005-0000-0000-c000-000000000046".parse::<Guid>().unwrap(), clsid);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Represents a 128-bit globally unique identifier.
///
/// The integer layout matches `windows::core::GUID::from_u128`: `data1` in
/// the top 32 bits, `data4` in the low 64 bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid(pub u128);

impl Guid {
    /// The all-zero GUID (`GUID_NULL`).
    pub const NULL: Guid = Guid(0);

    /// Builds a GUID from the fields of a C `DEFINE_GUID`.
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self(
            ((data1 as u128) << 96)
                | ((data2 as u128) << 80)
                | ((data3 as u128) << 64)
                | (u64::from_be_bytes(data4) as u128),
        )
    }

    /// Builds a GUID from its integer form.
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    /// Returns the integer form.
    pub const fn to_u128(self) -> u128 {
        self.0
    }

    pub const fn data1(self) -> u32 {
        (self.0 >> 96) as u32
    }

    pub const fn data2(self) -> u16 {
        (self.0 >> 80) as u16
    }

    pub const fn data3(self) -> u16 {
        (self.0 >> 64) as u16
    }

    pub const fn data4(self) -> [u8; 8] {
        (self.0 as u64).to_be_bytes()
    }

    /// Returns `true` for `GUID_NULL`.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d4 = self.data4();
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1(),
            self.data2(),
            self.data3(),
            d4[0],
            d4[1],
            d4[2],
            d4[3],
            d4[4],
            d4[5],
            d4[6],
            d4[7]
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

/// Error returned when a string is not a GUID in registry form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid GUID string: {0:?}")]
pub struct ParseGuidError(pub String);

impl FromStr for Guid {
    type Err = ParseGuidError;

    /// Parses `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}` with or without braces,
    /// in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseGuidError(s.to_string());
        let trimmed = s.trim();
        let body = match (trimmed.strip_prefix('{'), trimmed.strip_suffix('}')) {
            (Some(_), Some(_)) => &trimmed[1..trimmed.len() - 1],
            (None, None) => trimmed,
            _ => return Err(invalid()),
        };

        let groups: Vec<&str> = body.split('-').collect();
        let lengths = [8, 4, 4, 4, 12];
        if groups.len() != lengths.len()
            || groups
                .iter()
                .zip(lengths)
                .any(|(g, len)| g.len() != len || !g.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            return Err(invalid());
        }

        let hex: String = groups.concat();
        u128::from_str_radix(&hex, 16).map(Guid).map_err(|_| invalid())
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Guid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(windows)]
impl From<windows::core::GUID> for Guid {
    fn from(guid: windows::core::GUID) -> Self {
        Self(guid.to_u128())
    }
}

#[cfg(windows)]
impl From<Guid> for windows::core::GUID {
    fn from(guid: Guid) -> Self {
        windows::core::GUID::from_u128(guid.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IID_ISTREAM: Guid =
        Guid::from_fields(0x0000000C, 0x0000, 0x0000, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);

    #[test]
    fn test_fields_round_trip() {
        let guid = Guid::from_fields(0xFBF23B40, 0xE3F0, 0x101B, [0x84, 0x88, 0x00, 0xAA, 0x00, 0x3E, 0x56, 0xF8]);
        assert_eq!(guid.data1(), 0xFBF23B40);
        assert_eq!(guid.data2(), 0xE3F0);
        assert_eq!(guid.data3(), 0x101B);
        assert_eq!(guid.data4(), [0x84, 0x88, 0x00, 0xAA, 0x00, 0x3E, 0x56, 0xF8]);
        assert_eq!(guid.to_u128(), 0xFBF23B40_E3F0_101B_8488_00AA003E56F8);
    }

    #[test]
    fn test_display() {
        assert_eq!(IID_ISTREAM.to_string(), "{0000000C-0000-0000-C000-000000000046}");
        assert_eq!(Guid::NULL.to_string(), "{00000000-0000-0000-0000-000000000000}");
    }

    #[test]
    fn test_parse_forms() {
        for text in [
            "{0000000C-0000-0000-C000-000000000046}",
            "0000000c-0000-0000-c000-000000000046",
            "  {0000000c-0000-0000-C000-000000000046} ",
        ] {
            assert_eq!(text.parse::<Guid>(), Ok(IID_ISTREAM), "{text}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "{0000000C-0000-0000-C000-000000000046",
            "0000000C-0000-0000-C000-00000000004",
            "0000000C00000000C000000000000046",
            "0000000G-0000-0000-C000-000000000046",
            "+000000C-0000-0000-C000-000000000046",
        ] {
            assert!(text.parse::<Guid>().is_err(), "{text:?} should not parse");
        }
    }

    #[test]
    fn test_serde_string_form() {
        let json = serde_json::to_string(&IID_ISTREAM).unwrap();
        assert_eq!(json, "\"{0000000C-0000-0000-C000-000000000046}\"");
        let back: Guid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, IID_ISTREAM);
    }
}
