//! Provides `FileTime`, the Windows timestamp (100 ns ticks since
//! 1601-01-01 UTC), and its conversion to and from `SystemTime`.
//!
//! # Examples
//! ```
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! use comscope::filetime::FileTime;
//!
//! let ft = FileTime::from_system_time(UNIX_EPOCH + Duration::from_secs(1)).unwrap();
//! assert_eq!(ft.ticks(), 116_444_736_010_000_000);
//! assert_eq!(ft.to_system_time(), Some(UNIX_EPOCH + Duration::from_secs(1)));
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;
const TICKS_PER_SECOND: u64 = 10_000_000;
const NANOS_PER_TICK: u32 = 100;

/// Represents a `FILETIME` as a single 64-bit tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTime(pub u64);

impl FileTime {
    /// Builds a value from the `dwLowDateTime`/`dwHighDateTime` pair.
    pub const fn from_parts(low: u32, high: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    /// Returns the raw tick count.
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns `dwLowDateTime`.
    pub const fn low(self) -> u32 {
        self.0 as u32
    }

    /// Returns `dwHighDateTime`.
    pub const fn high(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Converts to `SystemTime`, truncating nothing (ticks are 100 ns).
    ///
    /// Returns `None` when the instant is outside the platform's
    /// `SystemTime` range. On Windows that is any tick count above
    /// `i64::MAX`.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let epoch_1601 = UNIX_EPOCH.checked_sub(Duration::from_secs(UNIX_EPOCH_TICKS / TICKS_PER_SECOND))?;
        epoch_1601.checked_add(Duration::new(
            self.0 / TICKS_PER_SECOND,
            (self.0 % TICKS_PER_SECOND) as u32 * NANOS_PER_TICK,
        ))
    }

    /// Converts from `SystemTime`, truncating to 100 ns.
    ///
    /// Returns `None` for instants before 1601 or beyond the tick range.
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => {
                let ticks = duration_to_ticks(after)?;
                UNIX_EPOCH_TICKS.checked_add(ticks).map(Self)
            }
            Err(before) => {
                let ticks = duration_to_ticks(before.duration())?;
                UNIX_EPOCH_TICKS.checked_sub(ticks).map(Self)
            }
        }
    }

    /// Returns the current time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now()).unwrap_or_default()
    }
}

fn duration_to_ticks(d: Duration) -> Option<u64> {
    d.as_secs()
        .checked_mul(TICKS_PER_SECOND)?
        .checked_add(u64::from(d.subsec_nanos() / NANOS_PER_TICK))
}

#[cfg(windows)]
impl From<windows::Win32::Foundation::FILETIME> for FileTime {
    fn from(ft: windows::Win32::Foundation::FILETIME) -> Self {
        Self::from_parts(ft.dwLowDateTime, ft.dwHighDateTime)
    }
}

#[cfg(windows)]
impl From<FileTime> for windows::Win32::Foundation::FILETIME {
    fn from(ft: FileTime) -> Self {
        windows::Win32::Foundation::FILETIME {
            dwLowDateTime: ft.low(),
            dwHighDateTime: ft.high(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let ft = FileTime::from_parts(0xD53E_8000, 0x019D_B1DE);
        assert_eq!(ft.ticks(), UNIX_EPOCH_TICKS);
        assert_eq!(ft.low(), 0xD53E_8000);
        assert_eq!(ft.high(), 0x019D_B1DE);
    }

    #[test]
    fn test_unix_epoch() {
        assert_eq!(FileTime::from_system_time(UNIX_EPOCH), Some(FileTime(UNIX_EPOCH_TICKS)));
        assert_eq!(FileTime(UNIX_EPOCH_TICKS).to_system_time(), Some(UNIX_EPOCH));
    }

    #[test]
    fn test_sub_second_precision() {
        let time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_700);
        let ft = FileTime::from_system_time(time).unwrap();
        assert_eq!(ft.ticks() % TICKS_PER_SECOND, 1_234_567);
        assert_eq!(ft.to_system_time(), Some(time));
    }

    #[test]
    fn test_before_unix_epoch() {
        let time = UNIX_EPOCH - Duration::from_secs(86_400);
        let ft = FileTime::from_system_time(time).unwrap();
        assert_eq!(ft.ticks(), UNIX_EPOCH_TICKS - 86_400 * TICKS_PER_SECOND);
        assert_eq!(ft.to_system_time(), Some(time));
    }

    #[test]
    fn test_before_1601_is_none() {
        let time = UNIX_EPOCH - Duration::from_secs(UNIX_EPOCH_TICKS / TICKS_PER_SECOND + 1);
        assert_eq!(FileTime::from_system_time(time), None);
        let start = FileTime(0).to_system_time().unwrap();
        assert_eq!(FileTime::from_system_time(start), Some(FileTime(0)));
    }

    #[test]
    fn test_max_ticks_do_not_panic() {
        let far = FileTime(u64::MAX).to_system_time();
        if let Some(time) = far {
            assert_eq!(FileTime::from_system_time(time), Some(FileTime(u64::MAX)));
        }
        #[cfg(windows)]
        assert_eq!(far, None, "SystemTime on Windows stops at i64::MAX ticks");
    }
}
