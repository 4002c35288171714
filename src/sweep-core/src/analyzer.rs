// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::f32::consts::PI;
use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

/// Keeps an exact-zero bin finite after the log.
pub const POWER_EPSILON: f32 = 1e-20;

/// Power spectrum of one block. Borrows the analyzer's output buffer.
#[derive(Debug, Clone, Copy)]
pub struct PowerSpectrum<'a> {
    /// Log power per FFT bin, in natural FFT order.
    pub bins: &'a [f32],
    pub bin_width_hz: f64,
    /// Tuned frequency reported for the source block.
    pub frequency_hz: u64,
}

/// Windowed forward FFT producing log power per bin.
///
/// All buffers are allocated in [`SpectralAnalyzer::new`]; `analyze` only
/// writes into them.
pub struct SpectralAnalyzer {
    fft_size: usize,
    bin_width_hz: f64,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex32>,
    scratch: Vec<Complex32>,
    power: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(fft_size: usize, bin_width_hz: f64) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();

        Self {
            fft_size,
            bin_width_hz,
            window: hann_window(fft_size),
            fft,
            buffer: vec![Complex32::new(0.0, 0.0); fft_size],
            scratch: vec![Complex32::new(0.0, 0.0); scratch_len],
            power: vec![0.0; fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Analyse `iq`, which must hold exactly `fft_size` interleaved signed
    /// 8-bit I/Q pairs. Returns `None` for any other length.
    pub fn analyze(&mut self, frequency_hz: u64, iq: &[u8]) -> Option<PowerSpectrum<'_>> {
        if iq.len() != self.fft_size * 2 {
            return None;
        }

        for ((slot, pair), w) in self
            .buffer
            .iter_mut()
            .zip(iq.chunks_exact(2))
            .zip(&self.window)
        {
            let re = f32::from(pair[0] as i8) / 128.0;
            let im = f32::from(pair[1] as i8) / 128.0;
            *slot = Complex32::new(re * w, im * w);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        for (p, value) in self.power.iter_mut().zip(&self.buffer) {
            *p = log_power(*value, scale);
        }

        Some(PowerSpectrum {
            bins: &self.power,
            bin_width_hz: self.bin_width_hz,
            frequency_hz,
        })
    }
}

/// `10·log10((re·scale)² + (im·scale)² + ε)`
pub fn log_power(value: Complex32, scale: f32) -> f32 {
    let re = value.re * scale;
    let im = value.im * scale;
    10.0 * (re * re + im * im + POWER_EPSILON).log10()
}

/// Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    if n < 2 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (n - 1) as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(fft_size: usize, bin: usize, amplitude: f32) -> Vec<u8> {
        let mut iq = Vec::with_capacity(fft_size * 2);
        for n in 0..fft_size {
            let phase = 2.0 * PI * bin as f32 * n as f32 / fft_size as f32;
            iq.push((amplitude * phase.cos()).round() as i8 as u8);
            iq.push((amplitude * phase.sin()).round() as i8 as u8);
        }
        iq
    }

    fn peak_bin(bins: &[f32]) -> usize {
        bins.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_hann_window_shape() {
        let w = hann_window(20);
        assert_eq!(w.len(), 20);
        assert!(w[0].abs() < 1e-6);
        assert!(w[19].abs() < 1e-6);
        assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_eq!(hann_window(1), vec![1.0]);
    }

    #[test]
    fn test_tone_peaks_at_expected_bin() {
        for (fft_size, bin) in [(20usize, 3usize), (44, 30), (1020, 200), (1020, 900)] {
            let mut analyzer = SpectralAnalyzer::new(fft_size, 20e6 / fft_size as f64);
            let iq = tone(fft_size, bin, 100.0);
            let spectrum = analyzer.analyze(0, &iq).unwrap();
            let peak = peak_bin(spectrum.bins);
            assert!(
                peak.abs_diff(bin) <= 1,
                "fft_size {}: expected peak near bin {}, got {}",
                fft_size,
                bin,
                peak
            );
        }
    }

    #[test]
    fn test_silence_is_finite() {
        let mut analyzer = SpectralAnalyzer::new(20, 1e6);
        let iq = vec![0u8; 40];
        let spectrum = analyzer.analyze(7, &iq).unwrap();
        assert_eq!(spectrum.frequency_hz, 7);
        assert_eq!(spectrum.bins.len(), 20);
        for &p in spectrum.bins {
            assert!(p.is_finite());
            assert!((p - 10.0 * POWER_EPSILON.log10()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let mut analyzer = SpectralAnalyzer::new(20, 1e6);
        assert!(analyzer.analyze(0, &[0u8; 38]).is_none());
        assert!(analyzer.analyze(0, &[0u8; 42]).is_none());
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let mut analyzer = SpectralAnalyzer::new(44, 1e6);
        let iq = tone(44, 7, 60.0);
        let first: Vec<f32> = analyzer.analyze(0, &iq).unwrap().bins.to_vec();
        let _ = analyzer.analyze(0, &tone(44, 20, 90.0)).unwrap();
        let again: Vec<f32> = analyzer.analyze(0, &iq).unwrap().bins.to_vec();
        assert_eq!(first, again);
    }

    #[test]
    fn test_log_power_scaling() {
        let p = log_power(Complex32::new(20.0, 0.0), 1.0 / 20.0);
        assert!(p.abs() < 1e-4, "unit magnitude should be 0 dB, got {}", p);
        let p = log_power(Complex32::new(2.0, 0.0), 1.0 / 20.0);
        assert!((p + 20.0).abs() < 1e-3, "expected -20 dB, got {}", p);
    }
}
