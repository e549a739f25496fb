//! Provides `ClipboardFormat` and `MediumType`, the two tags a `FORMATETC`
//! carries.
//!
//! Standard formats have fixed ids below 18; registered formats live in
//! `0xC000..=0xFFFF` and have a name only the running system knows.
//!
//! # Examples
//! ```
//! use comscope::clipformat::{ClipboardFormat, MediumType};
//!
//! assert_eq!(ClipboardFormat::UNICODE_TEXT.to_string(), "CF_UNICODETEXT");
//! assert!(ClipboardFormat(0xC123).is_registered());
//! assert_eq!(ClipboardFormat(0xC123).to_string(), "#49443");
//!
//! let media = MediumType::HGLOBAL | MediumType::ISTREAM;
//! assert!(media.contains(MediumType::ISTREAM));
//! assert_eq!(media.to_string(), "HGLOBAL|ISTREAM");
//! ```

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Represents a clipboard format id (`CLIPFORMAT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClipboardFormat(pub u16);

impl ClipboardFormat {
    pub const TEXT: ClipboardFormat = ClipboardFormat(1);
    pub const BITMAP: ClipboardFormat = ClipboardFormat(2);
    pub const METAFILE_PICT: ClipboardFormat = ClipboardFormat(3);
    pub const SYLK: ClipboardFormat = ClipboardFormat(4);
    pub const DIF: ClipboardFormat = ClipboardFormat(5);
    pub const TIFF: ClipboardFormat = ClipboardFormat(6);
    pub const OEM_TEXT: ClipboardFormat = ClipboardFormat(7);
    pub const DIB: ClipboardFormat = ClipboardFormat(8);
    pub const PALETTE: ClipboardFormat = ClipboardFormat(9);
    pub const PEN_DATA: ClipboardFormat = ClipboardFormat(10);
    pub const RIFF: ClipboardFormat = ClipboardFormat(11);
    pub const WAVE: ClipboardFormat = ClipboardFormat(12);
    pub const UNICODE_TEXT: ClipboardFormat = ClipboardFormat(13);
    pub const ENH_METAFILE: ClipboardFormat = ClipboardFormat(14);
    pub const HDROP: ClipboardFormat = ClipboardFormat(15);
    pub const LOCALE: ClipboardFormat = ClipboardFormat(16);
    pub const DIBV5: ClipboardFormat = ClipboardFormat(17);
    pub const OWNER_DISPLAY: ClipboardFormat = ClipboardFormat(0x0080);
    pub const DSP_TEXT: ClipboardFormat = ClipboardFormat(0x0081);
    pub const DSP_BITMAP: ClipboardFormat = ClipboardFormat(0x0082);
    pub const DSP_METAFILE_PICT: ClipboardFormat = ClipboardFormat(0x0083);
    pub const DSP_ENH_METAFILE: ClipboardFormat = ClipboardFormat(0x008E);

    /// Predefined formats, `CF_TEXT` up to `CF_MAX`.
    pub const fn is_standard(self) -> bool {
        self.0 >= 1 && self.0 < 18
    }

    /// `CF_PRIVATEFIRST..=CF_PRIVATELAST`.
    pub const fn is_private(self) -> bool {
        self.0 >= 0x0200 && self.0 <= 0x02FF
    }

    /// `CF_GDIOBJFIRST..=CF_GDIOBJLAST`; the handle is a GDI object.
    pub const fn is_gdi_object(self) -> bool {
        self.0 >= 0x0300 && self.0 <= 0x03FF
    }

    /// Formats created by `RegisterClipboardFormat`.
    pub const fn is_registered(self) -> bool {
        self.0 >= 0xC000
    }

    /// Returns the `CF_*` name of a predefined format.
    pub fn standard_name(self) -> Option<&'static str> {
        Some(match self {
            Self::TEXT => "CF_TEXT",
            Self::BITMAP => "CF_BITMAP",
            Self::METAFILE_PICT => "CF_METAFILEPICT",
            Self::SYLK => "CF_SYLK",
            Self::DIF => "CF_DIF",
            Self::TIFF => "CF_TIFF",
            Self::OEM_TEXT => "CF_OEMTEXT",
            Self::DIB => "CF_DIB",
            Self::PALETTE => "CF_PALETTE",
            Self::PEN_DATA => "CF_PENDATA",
            Self::RIFF => "CF_RIFF",
            Self::WAVE => "CF_WAVE",
            Self::UNICODE_TEXT => "CF_UNICODETEXT",
            Self::ENH_METAFILE => "CF_ENHMETAFILE",
            Self::HDROP => "CF_HDROP",
            Self::LOCALE => "CF_LOCALE",
            Self::DIBV5 => "CF_DIBV5",
            Self::OWNER_DISPLAY => "CF_OWNERDISPLAY",
            Self::DSP_TEXT => "CF_DSPTEXT",
            Self::DSP_BITMAP => "CF_DSPBITMAP",
            Self::DSP_METAFILE_PICT => "CF_DSPMETAFILEPICT",
            Self::DSP_ENH_METAFILE => "CF_DSPENHMETAFILE",
            _ => return None,
        })
    }
}

/// Formats as the `CF_*` name, or `#id` for anything else. Registered
/// names need the system; see `ClipboardFormat::name` on Windows.
impl fmt::Display for ClipboardFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.standard_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "#{}", self.0),
        }
    }
}

impl From<u16> for ClipboardFormat {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// Represents the `TYMED` bits: which storage a medium uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediumType(pub u32);

impl MediumType {
    pub const NULL: MediumType = MediumType(0);
    pub const HGLOBAL: MediumType = MediumType(1);
    pub const FILE: MediumType = MediumType(2);
    pub const ISTREAM: MediumType = MediumType(4);
    pub const ISTORAGE: MediumType = MediumType(8);
    pub const GDI: MediumType = MediumType(16);
    pub const MFPICT: MediumType = MediumType(32);
    pub const ENHMF: MediumType = MediumType(64);

    const NAMES: [(MediumType, &'static str); 7] = [
        (Self::HGLOBAL, "HGLOBAL"),
        (Self::FILE, "FILE"),
        (Self::ISTREAM, "ISTREAM"),
        (Self::ISTORAGE, "ISTORAGE"),
        (Self::GDI, "GDI"),
        (Self::MFPICT, "MFPICT"),
        (Self::ENHMF, "ENHMF"),
    ];

    /// `true` when every bit of `other` is set.
    pub const fn contains(self, other: MediumType) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for MediumType {
    type Output = MediumType;

    fn bitor(self, rhs: Self) -> Self {
        MediumType(self.0 | rhs.0)
    }
}

impl fmt::Display for MediumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("NULL");
        }
        let mut rest = self.0;
        let mut first = true;
        for (bit, name) in Self::NAMES {
            if self.contains(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                rest &= !bit.0;
                first = false;
            }
        }
        if rest != 0 {
            if !first {
                f.write_str("|")?;
            }
            write!(f, "{rest:#x}")?;
        }
        Ok(())
    }
}

/// `DVASPECT_CONTENT`, the rendering most callers ask for.
pub const ASPECT_CONTENT: u32 = 1;

/// Describes one rendering of a data object's content (`FORMATETC`).
///
/// The target-device pointer is not carried; requests go out with none and
/// received ones have theirs freed on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatEtc {
    pub format: ClipboardFormat,
    /// `DVASPECT` value.
    pub aspect: u32,
    /// Page or piece index; `-1` means all of the data.
    pub index: i32,
    pub media: MediumType,
}

impl FormatEtc {
    /// Content aspect, all of the data, in global memory.
    pub const fn simple(format: ClipboardFormat) -> Self {
        Self {
            format,
            aspect: ASPECT_CONTENT,
            index: -1,
            media: MediumType::HGLOBAL,
        }
    }

    /// Replaces the accepted media.
    pub const fn with_media(self, media: MediumType) -> Self {
        Self { media, ..self }
    }
}

#[cfg(windows)]
mod system {
    use windows::core::HSTRING;
    use windows::Win32::Foundation::GetLastError;
    use windows::Win32::System::DataExchange::{GetClipboardFormatNameW, RegisterClipboardFormatW};

    use super::ClipboardFormat;
    use crate::com::result::{ComError, ComResult};
    use crate::com::status::{HResult, E_FAIL, E_INVALIDARG};

    impl ClipboardFormat {
        /// Registers `name` (or looks it up if already registered) and
        /// returns its id.
        pub fn register_hr(name: &str) -> ComResult<Self> {
            let id = unsafe { RegisterClipboardFormatW(&HSTRING::from(name)) };
            match u16::try_from(id) {
                Ok(0) => ComResult::failed(last_error()),
                Ok(id) => ComResult::ok(Self(id)),
                Err(_) => ComResult::failed(E_INVALIDARG),
            }
        }

        /// # Errors
        /// Returns the last Win32 error of `RegisterClipboardFormatW`.
        pub fn register(name: &str) -> crate::Result<Self> {
            Self::register_hr(name).value()
        }

        /// Looks up the name of a registered format. Predefined formats
        /// have no registered name and fail.
        pub fn name_hr(self) -> ComResult<String> {
            // Format names are atoms, which stop at 255 characters.
            let mut buf = [0u16; 256];
            let copied = unsafe { GetClipboardFormatNameW(u32::from(self.0), &mut buf) };
            match usize::try_from(copied) {
                Ok(len) if len > 0 => ComResult::ok(String::from_utf16_lossy(&buf[..len.min(buf.len())])),
                _ => ComResult::failed(last_error()),
            }
        }

        /// # Errors
        /// Returns the last Win32 error of `GetClipboardFormatNameW`.
        pub fn name(self) -> crate::Result<String> {
            self.name_hr().value()
        }

        /// Returns the `CF_*` name, the registered name, or `#id`.
        pub fn describe(self) -> String {
            match self.standard_name() {
                Some(name) => name.to_owned(),
                None => self.name().unwrap_or_else(|_: ComError| self.to_string()),
            }
        }
    }

    fn last_error() -> HResult {
        HResult::from_win32(unsafe { GetLastError() }.0).failure_or(E_FAIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_names() {
        assert_eq!(ClipboardFormat::TEXT.standard_name(), Some("CF_TEXT"));
        assert_eq!(ClipboardFormat::DIF.to_string(), "CF_DIF");
        assert_eq!(ClipboardFormat::DIB.to_string(), "CF_DIB");
        assert_eq!(ClipboardFormat::DSP_ENH_METAFILE.to_string(), "CF_DSPENHMETAFILE");
        assert_eq!(ClipboardFormat(18).standard_name(), None);
        assert_eq!(ClipboardFormat(18).to_string(), "#18");
    }

    #[test]
    fn test_ranges() {
        assert!(ClipboardFormat::UNICODE_TEXT.is_standard());
        assert!(!ClipboardFormat(0).is_standard());
        assert!(!ClipboardFormat::OWNER_DISPLAY.is_standard());
        assert!(ClipboardFormat(0x0250).is_private());
        assert!(ClipboardFormat(0x03FF).is_gdi_object());
        assert!(!ClipboardFormat(0x0400).is_gdi_object());
        assert!(ClipboardFormat(0xC000).is_registered());
        assert!(!ClipboardFormat(0xBFFF).is_registered());
    }

    #[test]
    fn test_medium_type_display() {
        assert_eq!(MediumType::NULL.to_string(), "NULL");
        assert_eq!(MediumType::HGLOBAL.to_string(), "HGLOBAL");
        assert_eq!((MediumType::GDI | MediumType(0x100)).to_string(), "GDI|0x100");
        assert!(!MediumType::HGLOBAL.contains(MediumType::ISTREAM));
    }

    #[test]
    fn test_simple_format_etc() {
        let fmt = FormatEtc::simple(ClipboardFormat::UNICODE_TEXT);
        assert_eq!((fmt.aspect, fmt.index, fmt.media), (ASPECT_CONTENT, -1, MediumType::HGLOBAL));
        let stream = fmt.with_media(MediumType::ISTREAM);
        assert_eq!(stream.format, ClipboardFormat::UNICODE_TEXT);
        assert_eq!(stream.media, MediumType::ISTREAM);
    }

    #[test]
    fn test_serde_is_transparent() {
        assert_eq!(serde_json::to_string(&ClipboardFormat::HDROP).unwrap(), "15");
        let media: MediumType = serde_json::from_str("5").unwrap();
        assert_eq!(media, MediumType::HGLOBAL | MediumType::ISTREAM);
    }
}
