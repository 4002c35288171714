// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! File writers for assembled sweeps.
//!
//! Every frame is split into runs of `fft_size / 4` points, one record per
//! run, as hackrf_sweep prints them.

use std::io::{self, Write};

use chrono::{Local, NaiveDateTime};
use tracing::error;

use sweep_core::{SweepFrame, SweepSink};

use crate::config::OutputFormat;

pub struct SweepWriter<W: Write + Send> {
    out: W,
    format: OutputFormat,
    failed: bool,
    records: u64,
}

impl<W: Write + Send> SweepWriter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            failed: false,
            records: 0,
        }
    }

    #[cfg(test)]
    fn records_written(&self) -> u64 {
        self.records
    }

    #[cfg(test)]
    fn into_inner(mut self) -> W {
        let _ = self.out.flush();
        self.out
    }

    pub fn write_frame_at(
        &mut self,
        frame: &SweepFrame<'_>,
        timestamp: NaiveDateTime,
    ) -> io::Result<()> {
        let run_len = (frame.fft_size / 4).max(1);
        let bin_width = f64::from(frame.bin_width_hz);
        for (freqs, powers) in frame
            .frequencies
            .chunks(run_len)
            .zip(frame.powers.chunks(run_len))
        {
            let hz_low = freqs[0] as u64;
            let hz_high = (freqs[0] + freqs.len() as f64 * bin_width) as u64;
            match self.format {
                OutputFormat::Text => write_text_record(
                    &mut self.out,
                    timestamp,
                    hz_low,
                    hz_high,
                    frame.bin_width_hz,
                    frame.fft_size,
                    powers,
                )?,
                OutputFormat::Binary => write_binary_record(&mut self.out, hz_low, hz_high, powers)?,
            }
            self.records += 1;
        }
        if frame.is_full_sweep {
            self.out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Send> SweepSink for SweepWriter<W> {
    fn on_sweep(&mut self, frame: &SweepFrame<'_>) {
        if self.failed {
            return;
        }
        if let Err(e) = self.write_frame_at(frame, Local::now().naive_local()) {
            error!(
                "sweep output failed after {} records, dropping further output: {}",
                self.records, e
            );
            self.failed = true;
        }
    }
}

fn write_text_record(
    out: &mut impl Write,
    timestamp: NaiveDateTime,
    hz_low: u64,
    hz_high: u64,
    bin_width_hz: f32,
    fft_size: usize,
    powers: &[f32],
) -> io::Result<()> {
    write!(
        out,
        "{}, {}, {}, {:.2}, {}",
        timestamp.format("%Y-%m-%d, %H:%M:%S%.6f"),
        hz_low,
        hz_high,
        bin_width_hz,
        fft_size
    )?;
    for power in powers {
        write!(out, ", {:.2}", power)?;
    }
    writeln!(out)
}

fn write_binary_record(
    out: &mut impl Write,
    hz_low: u64,
    hz_high: u64,
    powers: &[f32],
) -> io::Result<()> {
    let record_length =
        (2 * std::mem::size_of::<u64>() + powers.len() * std::mem::size_of::<f32>()) as u32;
    out.write_all(&record_length.to_le_bytes())?;
    out.write_all(&hz_low.to_le_bytes())?;
    out.write_all(&hz_high.to_le_bytes())?;
    for power in powers {
        out.write_all(&power.to_le_bytes())?;
    }
    Ok(())
}
