// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Selection of the two alias-free quarter bands of a spectrum.
//!
//! The eighths of the spectrum next to DC and next to the band edge are
//! discarded. What remains are two quarter-width runs: the lower run sits at
//! the reported hop frequency, the upper run half a sample rate above it.

use crate::analyzer::PowerSpectrum;

/// A single (absolute start frequency, power) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPoint {
    pub frequency_hz: f64,
    pub power_db: f32,
}

/// A contiguous run of bins with the frequency of its first bin.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRun<'a> {
    pub origin_hz: f64,
    pub bin_width_hz: f64,
    pub powers: &'a [f32],
}

impl<'a> SegmentRun<'a> {
    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    pub fn frequency_at(&self, offset: usize) -> f64 {
        self.origin_hz + offset as f64 * self.bin_width_hz
    }

    pub fn points(&self) -> impl Iterator<Item = SpectrumPoint> + 'a {
        let origin_hz = self.origin_hz;
        let bin_width_hz = self.bin_width_hz;
        let powers = self.powers;
        powers
            .iter()
            .enumerate()
            .map(move |(i, &power_db)| SpectrumPoint {
                frequency_hz: origin_hz + i as f64 * bin_width_hz,
                power_db,
            })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentExtractor {
    fft_size: usize,
    sample_rate_hz: f64,
}

impl SegmentExtractor {
    pub fn new(fft_size: usize, sample_rate_hz: u32) -> Self {
        Self {
            fft_size,
            sample_rate_hz: f64::from(sample_rate_hz),
        }
    }

    pub fn points_per_run(&self) -> usize {
        self.fft_size / 4
    }

    /// First bin of the lower run: `1 + 5N/8`.
    pub fn lower_start(&self) -> usize {
        1 + (self.fft_size * 5) / 8
    }

    /// First bin of the upper run: `1 + N/8`.
    pub fn upper_start(&self) -> usize {
        1 + self.fft_size / 8
    }

    /// Lower run followed by upper run, in that order.
    pub fn runs<'a>(&self, spectrum: &PowerSpectrum<'a>) -> [SegmentRun<'a>; 2] {
        let len = self.points_per_run();
        let origin = spectrum.frequency_hz as f64;
        [
            SegmentRun {
                origin_hz: origin,
                bin_width_hz: spectrum.bin_width_hz,
                powers: bin_slice(spectrum.bins, self.lower_start(), len),
            },
            SegmentRun {
                origin_hz: origin + self.sample_rate_hz / 2.0,
                bin_width_hz: spectrum.bin_width_hz,
                powers: bin_slice(spectrum.bins, self.upper_start(), len),
            },
        ]
    }
}

// Clamped so a short spectrum yields a short run instead of a panic.
fn bin_slice(bins: &[f32], start: usize, len: usize) -> &[f32] {
    let start = start.min(bins.len());
    let end = (start + len).min(bins.len());
    &bins[start..end]
}
