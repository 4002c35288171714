// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! SoapySDR device driven through the sweep hop sequence.

use num_complex::Complex;
use soapysdr::{Device, Direction, RxStream};

use sweep_core::plan::HopSchedule;
use sweep_core::transfer::{encode_block, BYTES_PER_BLOCK, HEADER_LEN};
use sweep_core::TransferSource;

use crate::settings::DeviceSettings;

const READ_TIMEOUT_US: i64 = 1_000_000;

/// Retunes a SoapySDR receiver through the hop sequence and packs the CS8
/// samples of each dwell into transfer blocks.
pub struct SoapySdrSource {
    device: Device,
    stream: RxStream<Complex<i8>>,
    settings: DeviceSettings,
    schedule: HopSchedule,
    samples: Vec<Complex<i8>>,
    tuned_hop_hz: Option<u64>,
}

impl SoapySdrSource {
    pub fn open(settings: DeviceSettings) -> Result<Self, String> {
        tracing::info!("Opening SoapySDR device with args: {}", settings.args);
        let device = Device::new(settings.args.as_str())
            .map_err(|e| format!("Failed to open SoapySDR device (args={}): {}", settings.args, e))?;

        let rate = f64::from(settings.sample_rate_hz);
        device
            .set_sample_rate(Direction::Rx, 0, rate)
            .map_err(|e| format!("Failed to set sample rate: {}", e))?;
        let actual_rate = device.sample_rate(Direction::Rx, 0).unwrap_or(rate);
        tracing::info!("Sample rate {} Hz (actual: {} Hz)", rate, actual_rate);

        for element in settings.gain_elements() {
            if let Err(e) = device.set_gain_element(Direction::Rx, 0, element.name, element.gain_db) {
                tracing::warn!("Failed to set {} gain to {} dB: {}", element.name, element.gain_db, e);
            } else {
                tracing::debug!("{} gain {} dB", element.name, element.gain_db);
            }
        }

        let (key, value) = settings.bias_setting();
        if let Err(e) = device.write_setting(key, value) {
            tracing::warn!("Failed to set {}={}: {}", key, value, e);
        }

        let mut stream = device
            .rx_stream::<Complex<i8>>(&[0])
            .map_err(|e| format!("Failed to open CS8 RX stream: {}", e))?;
        stream
            .activate(None)
            .map_err(|e| format!("Failed to activate RX stream: {}", e))?;

        let samples_per_block = (BYTES_PER_BLOCK - HEADER_LEN) / 2;
        tracing::info!("SoapySDR sweep source ready ({} hops per pass)", settings.hops.len());

        Ok(Self {
            schedule: settings.schedule(),
            device,
            stream,
            settings,
            samples: vec![Complex::new(0, 0); samples_per_block],
            tuned_hop_hz: None,
        })
    }

    fn retune(&mut self, hop_hz: u64) -> Result<(), String> {
        let center = self.settings.center_for(hop_hz) as f64;
        self.device
            .set_frequency(Direction::Rx, 0, center, ())
            .map_err(|e| format!("Failed to tune to {} Hz: {}", center, e))?;
        self.tuned_hop_hz = Some(hop_hz);
        Ok(())
    }

    fn read_samples(&mut self) -> Result<(), String> {
        let mut filled = 0;
        while filled < self.samples.len() {
            let n = self
                .stream
                .read(&mut [&mut self.samples[filled..]], READ_TIMEOUT_US)
                .map_err(|e| format!("RX stream read failed: {}", e))?;
            filled += n;
        }
        Ok(())
    }
}

impl TransferSource for SoapySdrSource {
    fn read_transfer(&mut self, buf: &mut [u8]) -> Result<usize, String> {
        let block_count = buf.len() / BYTES_PER_BLOCK;
        for block in buf.chunks_exact_mut(BYTES_PER_BLOCK) {
            let hop_hz = self.schedule.next_block();
            if self.tuned_hop_hz != Some(hop_hz) {
                self.retune(hop_hz)?;
            }
            self.read_samples()?;
            for (pair, sample) in block[HEADER_LEN..].chunks_exact_mut(2).zip(&self.samples) {
                pair[0] = sample.re as u8;
                pair[1] = sample.im as u8;
            }
            encode_block(block, hop_hz, &[])?;
        }
        Ok(block_count * BYTES_PER_BLOCK)
    }
}

impl Drop for SoapySdrSource {
    fn drop(&mut self) {
        if let Err(e) = self.stream.deactivate(None) {
            tracing::warn!("Failed to deactivate RX stream: {}", e);
        }
    }
}
