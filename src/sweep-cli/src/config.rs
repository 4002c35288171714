// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Configuration for sweep-rs.
//!
//! Read from the `[sweep-cli]` section of `sweep-rs.toml`; command line
//! flags override what the file sets.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use sweep_app::ConfigFile;
use sweep_core::{FrequencyRange, SweepConfig, SyntheticTone};

/// Top-level configuration structure for sweep-rs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub general: GeneralConfig,
    /// Sweep plan, FFT and gain settings
    pub sweep: SweepConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Simulated hopping receiver
    #[default]
    Synthetic,
    /// Replay of recorded transfers
    File,
    /// SoapySDR device
    Soapysdr,
}

/// Where transfers come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Recording to replay (kind = "file")
    pub path: Option<PathBuf>,
    /// SoapySDR device arguments (kind = "soapysdr")
    pub args: String,
    /// Pace the synthetic source at the sample rate
    pub realtime: bool,
    /// Peak noise amplitude of the synthetic source, in sample counts
    pub noise: f32,
    /// Carriers rendered by the synthetic source
    pub tones: Vec<SyntheticTone>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Synthetic,
            path: None,
            args: "driver=hackrf".to_string(),
            realtime: true,
            noise: 2.0,
            tones: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One CSV line per segment
    #[default]
    Text,
    /// Length-prefixed little-endian records
    Binary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Output file; unset or "-" writes to stdout
    pub path: Option<PathBuf>,
}

impl OutputConfig {
    /// The output file, or `None` for stdout.
    pub fn file(&self) -> Option<&PathBuf> {
        self.path.as_ref().filter(|p| p.as_os_str() != "-")
    }
}

impl CliConfig {
    pub fn validate(&self) -> Result<(), String> {
        validate_log_level(self.general.log_level.as_deref())?;

        self.sweep
            .validate()
            .map_err(|e| format!("[sweep] {}", e))?;

        match self.source.kind {
            SourceKind::File if self.source.path.is_none() => {
                return Err("[source].path must be set when [source].kind = \"file\"".to_string());
            }
            SourceKind::Soapysdr if !sweep_backend_soapysdr::hardware_supported() => {
                return Err(
                    "[source].kind = \"soapysdr\" requires a build with the soapysdr feature"
                        .to_string(),
                );
            }
            _ => {}
        }
        if !(0.0..=127.0).contains(&self.source.noise) {
            return Err("[source].noise must be within 0-127".to_string());
        }
        for tone in &self.source.tones {
            if !(0.0..=127.0).contains(&tone.amplitude) {
                return Err(format!(
                    "[source].tones amplitude {} at {} Hz must be within 0-127",
                    tone.amplitude, tone.frequency_hz
                ));
            }
        }
        Ok(())
    }

    /// Example `sweep-rs.toml`, as printed by `--print-config`.
    pub fn example_combined_toml() -> String {
        #[derive(serde::Serialize)]
        struct Wrapper {
            #[serde(rename = "sweep-cli")]
            inner: CliConfig,
        }
        let example = CliConfig {
            general: GeneralConfig {
                log_level: Some("info".to_string()),
            },
            sweep: SweepConfig {
                ranges: vec![FrequencyRange::new(2400, 2500)],
                bin_width_hz: 500_000,
                ..SweepConfig::default()
            },
            source: SourceConfig {
                tones: vec![SyntheticTone {
                    frequency_hz: 2_437_000_000,
                    amplitude: 80.0,
                }],
                ..SourceConfig::default()
            },
            output: OutputConfig {
                format: OutputFormat::Text,
                path: Some(PathBuf::from("-")),
            },
        };
        toml::to_string_pretty(&Wrapper { inner: example }).unwrap_or_default()
    }
}

fn validate_log_level(level: Option<&str>) -> Result<(), String> {
    if let Some(level) = level {
        sweep_app::parse_level(level).map_err(|_| {
            format!(
                "[general].log_level '{}' is invalid (expected one of: trace, debug, info, warn, error)",
                level
            )
        })?;
    }
    Ok(())
}

impl ConfigFile for CliConfig {
    fn section_key() -> &'static str {
        "sweep-cli"
    }
}
