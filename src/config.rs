//! Provides COM apartment configuration and, on Windows, the per-thread
//! apartment guard.
//!
//! # Examples
//! ```
//! use comscope::config::{ApartmentConfig, Threading};
//!
//! let config = ApartmentConfig::default();
//! assert_eq!(config.threading, Threading::Apartment);
//! assert_eq!(config.coinit_flags(), 0x2 | 0x4);
//! ```

use serde::{Deserialize, Serialize};

/// Selects the threading model a thread joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Threading {
    /// Single-threaded apartment (`COINIT_APARTMENTTHREADED`).
    #[default]
    Apartment,
    /// Multithreaded apartment (`COINIT_MULTITHREADED`).
    Multi,
}

/// Describes how a thread initializes COM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApartmentConfig {
    pub threading: Threading,
    /// Sets `COINIT_DISABLE_OLE1DDE`.
    pub disable_ole1dde: bool,
    /// Sets `COINIT_SPEED_OVER_MEMORY`.
    pub speed_over_memory: bool,
}

impl Default for ApartmentConfig {
    fn default() -> Self {
        Self {
            threading: Threading::Apartment,
            disable_ole1dde: true,
            speed_over_memory: false,
        }
    }
}

impl ApartmentConfig {
    /// A multithreaded configuration with the remaining defaults.
    pub fn multithreaded() -> Self {
        Self {
            threading: Threading::Multi,
            ..Self::default()
        }
    }

    /// Returns the `COINIT` bit set for `CoInitializeEx`.
    pub fn coinit_flags(&self) -> u32 {
        let mut flags = match self.threading {
            Threading::Apartment => 0x2,
            Threading::Multi => 0x0,
        };
        if self.disable_ole1dde {
            flags |= 0x4;
        }
        if self.speed_over_memory {
            flags |= 0x8;
        }
        flags
    }
}

#[cfg(windows)]
pub use apartment::ComApartment;

#[cfg(windows)]
mod apartment {
    use std::marker::PhantomData;

    use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT};
    use windows::Win32::System::Ole::{OleInitialize, OleUninitialize};

    use super::ApartmentConfig;
    use crate::com::result::ComError;
    use crate::com::status::{HResult, RPC_E_CHANGED_MODE};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Uninit {
        Nothing,
        Com,
        Ole,
    }

    /// Keeps the calling thread inside a COM apartment.
    ///
    /// Every successful `CoInitializeEx` (including `S_FALSE`, "already
    /// initialized") is balanced by one `CoUninitialize` on drop. When the
    /// thread already belongs to the other threading model the guard is inert.
    pub struct ComApartment {
        uninit: Uninit,
        // Apartment membership is per thread.
        _not_send: PhantomData<*mut ()>,
    }

    impl ComApartment {
        /// Joins an apartment with `config`.
        ///
        /// # Errors
        /// Returns the failure code of `CoInitializeEx`, except
        /// `RPC_E_CHANGED_MODE`.
        pub fn initialize(config: ApartmentConfig) -> Result<Self, ComError> {
            let hr: HResult = unsafe { CoInitializeEx(None, COINIT(config.coinit_flags() as i32)) }.into();
            if hr == RPC_E_CHANGED_MODE {
                tracing::debug!(?config, "thread already in another apartment");
                return Ok(Self {
                    uninit: Uninit::Nothing,
                    _not_send: PhantomData,
                });
            }
            hr.check()?;
            tracing::debug!(?config, %hr, "COM apartment initialized");
            Ok(Self {
                uninit: Uninit::Com,
                _not_send: PhantomData,
            })
        }

        /// Joins a single-threaded apartment through `OleInitialize`, which
        /// the OLE clipboard and drag and drop need on top of plain COM.
        ///
        /// # Errors
        /// Returns the failure code of `OleInitialize`, including
        /// `RPC_E_CHANGED_MODE` on a multithreaded thread.
        pub fn ole() -> Result<Self, ComError> {
            unsafe { OleInitialize(None) }.map_err(ComError::from)?;
            tracing::debug!("OLE apartment initialized");
            Ok(Self {
                uninit: Uninit::Ole,
                _not_send: PhantomData,
            })
        }

        /// Joins a single-threaded apartment with the default flags.
        ///
        /// # Errors
        /// See [`ComApartment::initialize`].
        pub fn single_threaded() -> Result<Self, ComError> {
            Self::initialize(ApartmentConfig::default())
        }
    }

    impl Drop for ComApartment {
        fn drop(&mut self) {
            match self.uninit {
                Uninit::Nothing => {}
                Uninit::Com => unsafe { CoUninitialize() },
                Uninit::Ole => unsafe { OleUninitialize() },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        assert_eq!(ApartmentConfig::default().coinit_flags(), 0x6);
        assert_eq!(ApartmentConfig::multithreaded().coinit_flags(), 0x4);
        let config = ApartmentConfig {
            threading: Threading::Multi,
            disable_ole1dde: false,
            speed_over_memory: true,
        };
        assert_eq!(config.coinit_flags(), 0x8);
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ApartmentConfig::multithreaded()).unwrap();
        assert_eq!(
            json,
            r#"{"threading":"Multi","disable_ole1dde":true,"speed_over_memory":false}"#
        );
    }
}
