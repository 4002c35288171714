// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Hopping SoapySDR receiver as a sweep transfer source.
//!
//! The device code needs the SoapySDR system library and is only built with
//! the `soapysdr-sys` feature. Everything it derives from a sweep config
//! lives in [`settings`] and builds everywhere.

pub mod settings;

#[cfg(feature = "soapysdr-sys")]
pub mod device;

#[cfg(feature = "soapysdr-sys")]
pub use device::SoapySdrSource;
pub use settings::{DeviceSettings, GainElement};

/// Whether this build can open SoapySDR devices.
pub const fn hardware_supported() -> bool {
    cfg!(feature = "soapysdr-sys")
}
