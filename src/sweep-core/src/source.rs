// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Ingest collaborators that hand transfers to a session.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::SweepConfig;
use crate::error::SweepResult;
use crate::plan::{tuned_center_hz, HopSchedule};
use crate::transfer::{encode_block, BYTES_PER_BLOCK, HEADER_LEN, SAMPLES_PER_BLOCK};

/// Producer of raw transfers in the on-wire block format.
pub trait TransferSource: Send + 'static {
    /// Fill `buf` with whole blocks. Returns the number of bytes written;
    /// `0` signals end of stream.
    fn read_transfer(&mut self, buf: &mut [u8]) -> Result<usize, String>;
}

// ---------------------------------------------------------------------------
// Synthetic hopping radio
// ---------------------------------------------------------------------------

/// A continuous carrier rendered by [`SyntheticSource`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticTone {
    /// Absolute frequency in Hz.
    pub frequency_hz: u64,
    /// Peak amplitude in 8-bit sample counts (0-127).
    pub amplitude: f32,
}

/// Simulated receiver that hops through a plan's frequencies.
///
/// Each hop dwells for `samples_per_block / 8192` blocks. Tones within the
/// instantaneous bandwidth of a hop are rendered at their offset from the
/// tuned centre.
pub struct SyntheticSource {
    schedule: HopSchedule,
    sample_rate_hz: u32,
    tones: Vec<SyntheticTone>,
    noise: f32,
    rng_state: u32,
    realtime: bool,
    transfer_limit: Option<u64>,
    transfers: u64,
}

impl SyntheticSource {
    pub fn new(config: &SweepConfig) -> SweepResult<Self> {
        let geometry = config.validate()?;
        Ok(Self {
            schedule: HopSchedule::new(
                geometry.plan.hop_frequencies(geometry.sample_rate_hz),
                geometry.blocks_per_hop,
            ),
            sample_rate_hz: geometry.sample_rate_hz,
            tones: Vec::new(),
            noise: 0.0,
            rng_state: 0x2545_f491,
            realtime: false,
            transfer_limit: None,
            transfers: 0,
        })
    }

    pub fn with_tones(mut self, tones: Vec<SyntheticTone>) -> Self {
        self.tones = tones;
        self
    }

    /// Uniform noise with the given peak amplitude in sample counts.
    pub fn with_noise(mut self, amplitude: f32) -> Self {
        self.noise = amplitude.max(0.0);
        self
    }

    /// Sleep for the air time of each transfer.
    pub fn realtime(mut self, enabled: bool) -> Self {
        self.realtime = enabled;
        self
    }

    /// End the stream after `limit` transfers.
    pub fn with_transfer_limit(mut self, limit: u64) -> Self {
        self.transfer_limit = Some(limit);
        self
    }

    /// Hop frequencies visited per pass.
    pub fn hops(&self) -> &[u64] {
        self.schedule.hops()
    }

    fn next_noise(&mut self) -> f32 {
        // xorshift32
        let mut x = self.rng_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng_state = x;
        (x as f32 / u32::MAX as f32 * 2.0 - 1.0) * self.noise
    }

    fn render_block(&mut self, block: &mut [u8], frequency_hz: u64) -> Result<(), String> {
        let center = tuned_center_hz(frequency_hz, self.sample_rate_hz) as f64;
        let half_band = f64::from(self.sample_rate_hz) / 2.0;
        let sample_rate = f64::from(self.sample_rate_hz);
        let first_sample = HEADER_LEN / 2;

        for (n, pair) in block[HEADER_LEN..].chunks_exact_mut(2).enumerate() {
            let t = (first_sample + n) as f64 / sample_rate;
            let mut re = 0.0f32;
            let mut im = 0.0f32;
            for tone in &self.tones {
                let offset = tone.frequency_hz as f64 - center;
                if offset.abs() >= half_band {
                    continue;
                }
                let phase = 2.0 * PI * offset * t;
                re += tone.amplitude * phase.cos() as f32;
                im += tone.amplitude * phase.sin() as f32;
            }
            if self.noise > 0.0 {
                re += self.next_noise();
                im += self.next_noise();
            }
            pair[0] = re.round().clamp(-128.0, 127.0) as i8 as u8;
            pair[1] = im.round().clamp(-128.0, 127.0) as i8 as u8;
        }
        encode_block(block, frequency_hz, &[])
    }
}

impl TransferSource for SyntheticSource {
    fn read_transfer(&mut self, buf: &mut [u8]) -> Result<usize, String> {
        if self.transfer_limit.is_some_and(|limit| self.transfers >= limit) {
            return Ok(0);
        }
        let block_count = buf.len() / BYTES_PER_BLOCK;
        if block_count == 0 {
            return Err(format!(
                "transfer buffer of {} bytes holds no {}-byte block",
                buf.len(),
                BYTES_PER_BLOCK
            ));
        }

        for block in buf.chunks_exact_mut(BYTES_PER_BLOCK) {
            let freq = self.schedule.next_block();
            self.render_block(block, freq)?;
        }
        self.transfers += 1;

        if self.realtime {
            let air_time = (block_count * SAMPLES_PER_BLOCK) as f64 / f64::from(self.sample_rate_hz);
            std::thread::sleep(Duration::from_secs_f64(air_time));
        }
        Ok(block_count * BYTES_PER_BLOCK)
    }
}

// ---------------------------------------------------------------------------
// Recorded transfers
// ---------------------------------------------------------------------------

/// Replays transfers recorded in the on-wire format from any reader.
pub struct FileSource<R> {
    reader: R,
}

impl<R: Read + Send + 'static> FileSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl FileSource<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: Read + Send + 'static> TransferSource for FileSource<R> {
    fn read_transfer(&mut self, buf: &mut [u8]) -> Result<usize, String> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(format!("read failed after {} bytes: {}", filled, e)),
            }
        }
        Ok(filled)
    }
}
