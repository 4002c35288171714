// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Session configuration and the buffer geometry derived from it.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SweepError, SweepResult};
use crate::plan::{FrequencyRange, SweepPlan};
use crate::transfer::{BLOCKS_PER_TRANSFER, SAMPLES_PER_BLOCK};

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 20_000_000;
pub const MIN_SAMPLE_RATE_HZ: u32 = 2_000_000;
pub const MAX_SAMPLE_RATE_HZ: u32 = 20_000_000;
pub const DEFAULT_BIN_WIDTH_HZ: u32 = 1_000_000;
pub const MIN_FFT_SIZE: usize = 4;
pub const MAX_FFT_SIZE: usize = 8180;
pub const MAX_LNA_GAIN_DB: u32 = 40;
pub const MAX_VGA_GAIN_DB: u32 = 62;

/// Recognised sweep options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Ranges swept in order, in MHz
    pub ranges: Vec<FrequencyRange>,
    /// Requested FFT bin width in Hz
    pub bin_width_hz: u32,
    /// Samples captured per hop (0 selects 8192); a multiple of 8192
    pub samples_per_block: u32,
    /// RX LNA (IF) gain in dB, 0-40 in 8 dB steps
    pub lna_gain: u32,
    /// RX VGA (baseband) gain in dB, 0-62 in 2 dB steps
    pub vga_gain: u32,
    /// Antenna port power
    pub antenna_power: bool,
    /// RX RF amplifier
    pub amp: bool,
    /// Receiver sample rate in Hz; also the tune step
    pub sample_rate_hz: u32,
    /// Blocks handed over per transfer
    pub blocks_per_transfer: usize,
    /// Deliver pending points as a partial frame after every transfer
    pub flush_each_transfer: bool,
    /// Deliver the (empty) frame for the first boundary of a session
    pub announce_first_boundary: bool,
    /// Stop after this many completed sweeps
    pub max_sweeps: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            ranges: vec![FrequencyRange::new(0, 6000)],
            bin_width_hz: DEFAULT_BIN_WIDTH_HZ,
            samples_per_block: 0,
            lna_gain: 16,
            vga_gain: 20,
            antenna_power: false,
            amp: false,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            blocks_per_transfer: BLOCKS_PER_TRANSFER,
            flush_each_transfer: true,
            announce_first_boundary: false,
            max_sweeps: None,
        }
    }
}

/// Sizes fixed at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGeometry {
    pub plan: SweepPlan,
    pub sample_rate_hz: u32,
    pub fft_size: usize,
    /// Effective bin width: `sample_rate / fft_size`.
    pub bin_width_hz: f64,
    /// Points in one extracted run (`fft_size / 4`).
    pub points_per_run: usize,
    pub blocks_per_transfer: usize,
    pub blocks_per_hop: usize,
    /// Sweep buffer capacity: `(fft_size / 4) * 2 * blocks_per_transfer`.
    pub capacity: usize,
}

impl SweepConfig {
    /// A config covering `ranges` with every other option at its default.
    pub fn with_ranges(ranges: Vec<FrequencyRange>) -> Self {
        Self {
            ranges,
            ..Self::default()
        }
    }

    /// Validate every option and derive the session geometry.
    pub fn validate(&self) -> SweepResult<SweepGeometry> {
        let plan = SweepPlan::new(self.ranges.clone())?;

        if !(MIN_SAMPLE_RATE_HZ..=MAX_SAMPLE_RATE_HZ).contains(&self.sample_rate_hz) {
            return Err(SweepError::config(format!(
                "sample_rate_hz must be within {}-{} (got {})",
                MIN_SAMPLE_RATE_HZ, MAX_SAMPLE_RATE_HZ, self.sample_rate_hz
            )));
        }
        if self.bin_width_hz == 0 {
            return Err(SweepError::config("bin_width_hz must be > 0"));
        }
        let fft_size = fft_size_for(self.sample_rate_hz, self.bin_width_hz)?;

        let samples_per_block = match self.samples_per_block {
            0 => SAMPLES_PER_BLOCK,
            n => n as usize,
        };
        if samples_per_block % SAMPLES_PER_BLOCK != 0 {
            return Err(SweepError::config(format!(
                "samples_per_block must be a multiple of {} (got {})",
                SAMPLES_PER_BLOCK, samples_per_block
            )));
        }

        validate_gains(self.lna_gain, self.vga_gain)?;

        if self.blocks_per_transfer == 0 {
            return Err(SweepError::config("blocks_per_transfer must be > 0"));
        }
        if self.max_sweeps == Some(0) {
            return Err(SweepError::config("max_sweeps must be > 0 when set"));
        }

        let points_per_run = fft_size / 4;
        Ok(SweepGeometry {
            plan,
            sample_rate_hz: self.sample_rate_hz,
            fft_size,
            bin_width_hz: f64::from(self.sample_rate_hz) / fft_size as f64,
            points_per_run,
            blocks_per_transfer: self.blocks_per_transfer,
            blocks_per_hop: samples_per_block / SAMPLES_PER_BLOCK,
            capacity: points_per_run * 2 * self.blocks_per_transfer,
        })
    }
}

/// FFT size for a requested bin width, padded to an odd multiple of four so
/// the interleaved bin selection lines up.
pub fn fft_size_for(sample_rate_hz: u32, bin_width_hz: u32) -> SweepResult<usize> {
    let mut fft_size = (sample_rate_hz / bin_width_hz.max(1)) as usize;
    if fft_size < MIN_FFT_SIZE {
        return Err(SweepError::config(format!(
            "FFT bin width must be no more than {} Hz (got {})",
            sample_rate_hz as usize / MIN_FFT_SIZE,
            bin_width_hz
        )));
    }
    if fft_size > MAX_FFT_SIZE {
        return Err(SweepError::config(format!(
            "FFT bin width must be no less than {} Hz (got {})",
            (sample_rate_hz as usize).div_ceil(MAX_FFT_SIZE),
            bin_width_hz
        )));
    }
    while (fft_size + 4) % 8 != 0 {
        fft_size += 1;
    }
    Ok(fft_size)
}

fn validate_gains(lna_gain: u32, vga_gain: u32) -> SweepResult<()> {
    if lna_gain > MAX_LNA_GAIN_DB {
        return Err(SweepError::config(format!(
            "lna_gain must be <= {} dB (got {})",
            MAX_LNA_GAIN_DB, lna_gain
        )));
    }
    if vga_gain > MAX_VGA_GAIN_DB {
        return Err(SweepError::config(format!(
            "vga_gain must be <= {} dB (got {})",
            MAX_VGA_GAIN_DB, vga_gain
        )));
    }
    if lna_gain % 8 != 0 {
        warn!("lna_gain must be a multiple of 8 (got {})", lna_gain);
    }
    if vga_gain % 2 != 0 {
        warn!("vga_gain must be a multiple of 2 (got {})", vga_gain);
    }
    Ok(())
}
