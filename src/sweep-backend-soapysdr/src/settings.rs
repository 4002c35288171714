// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Device settings derived from a sweep config.

use sweep_core::plan::{tuned_center_hz, HopSchedule};
use sweep_core::{SweepConfig, SweepResult};

/// Gain added by the HackRF RF amplifier when enabled.
pub const AMP_GAIN_DB: f64 = 14.0;

/// Default device arguments.
pub const DEFAULT_ARGS: &str = "driver=hackrf";

/// A named gain stage and the value to program into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainElement {
    pub name: &'static str,
    pub gain_db: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSettings {
    pub args: String,
    pub sample_rate_hz: u32,
    pub lna_gain_db: u32,
    pub vga_gain_db: u32,
    pub amp: bool,
    pub antenna_power: bool,
    pub blocks_per_hop: usize,
    /// Reported hop frequencies of one pass.
    pub hops: Vec<u64>,
}

impl DeviceSettings {
    pub fn from_config(args: &str, config: &SweepConfig) -> SweepResult<Self> {
        let geometry = config.validate()?;
        let args = match args.trim() {
            "" => DEFAULT_ARGS.to_string(),
            other => other.to_string(),
        };
        Ok(Self {
            args,
            sample_rate_hz: geometry.sample_rate_hz,
            lna_gain_db: config.lna_gain,
            vga_gain_db: config.vga_gain,
            amp: config.amp,
            antenna_power: config.antenna_power,
            blocks_per_hop: geometry.blocks_per_hop,
            hops: geometry.plan.hop_frequencies(geometry.sample_rate_hz),
        })
    }

    /// Gain stages in programming order: IF (`LNA`), baseband (`VGA`), RF
    /// amplifier (`AMP`).
    pub fn gain_elements(&self) -> [GainElement; 3] {
        [
            GainElement {
                name: "LNA",
                gain_db: f64::from(self.lna_gain_db),
            },
            GainElement {
                name: "VGA",
                gain_db: f64::from(self.vga_gain_db),
            },
            GainElement {
                name: "AMP",
                gain_db: if self.amp { AMP_GAIN_DB } else { 0.0 },
            },
        ]
    }

    /// Device setting key and value for antenna port power.
    pub fn bias_setting(&self) -> (&'static str, &'static str) {
        ("bias_tx", if self.antenna_power { "true" } else { "false" })
    }

    /// Frequency to program into the tuner for a reported hop.
    pub fn center_for(&self, hop_hz: u64) -> u64 {
        tuned_center_hz(hop_hz, self.sample_rate_hz)
    }

    pub fn schedule(&self) -> HopSchedule {
        HopSchedule::new(self.hops.clone(), self.blocks_per_hop)
    }
}
