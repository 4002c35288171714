// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use tracing::warn;

use crate::error::{SweepError, SweepResult};
use crate::extractor::SegmentRun;

/// Fixed-capacity ordered buffer of spectrum points for the pass in
/// progress.
///
/// Frequencies and powers are kept in parallel vectors so a publish can hand
/// both out as plain slices. Neither vector grows past the capacity
/// reserved in [`SweepBuffer::with_capacity`].
#[derive(Debug)]
pub struct SweepBuffer {
    frequencies: Vec<f64>,
    powers: Vec<f32>,
    capacity: usize,
    overflowed: bool,
    overflow_events: u64,
}

impl SweepBuffer {
    pub fn with_capacity(capacity: usize) -> SweepResult<Self> {
        let mut frequencies = Vec::new();
        let mut powers = Vec::new();
        frequencies.try_reserve_exact(capacity).map_err(|e| {
            SweepError::resource(format!("cannot allocate {} sweep frequencies: {}", capacity, e))
        })?;
        powers.try_reserve_exact(capacity).map_err(|e| {
            SweepError::resource(format!("cannot allocate {} sweep powers: {}", capacity, e))
        })?;
        Ok(Self {
            frequencies,
            powers,
            capacity,
            overflowed: false,
            overflow_events: 0,
        })
    }

    /// Append as much of `run` as fits. Returns the number of points stored.
    ///
    /// When the run does not fit, the remainder is dropped and the buffer is
    /// flagged as overflowed until the next [`reset`](Self::reset).
    pub fn append(&mut self, run: &SegmentRun<'_>) -> usize {
        let room = self.capacity - self.frequencies.len();
        let take = run.len().min(room);

        for (offset, &power) in run.powers[..take].iter().enumerate() {
            self.frequencies.push(run.frequency_at(offset));
            self.powers.push(power);
        }

        if take < run.len() {
            if !self.overflowed {
                warn!(
                    "sweep buffer overflow: {} points > capacity {}, dropping the rest of this pass",
                    self.frequencies.len() + run.len() - take,
                    self.capacity
                );
                self.overflow_events += 1;
            }
            self.overflowed = true;
        }
        take
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn powers(&self) -> &[f32] {
        &self.powers
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Number of passes that hit the capacity ceiling.
    pub fn overflow_events(&self) -> u64 {
        self.overflow_events
    }

    /// Empty the buffer and clear the overflow flag. Keeps the allocation.
    pub fn reset(&mut self) {
        self.frequencies.clear();
        self.powers.clear();
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(origin_hz: f64, powers: &[f32]) -> SegmentRun<'_> {
        SegmentRun {
            origin_hz,
            bin_width_hz: 10.0,
            powers,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let mut buf = SweepBuffer::with_capacity(10).unwrap();
        assert_eq!(buf.append(&run(100.0, &[1.0, 2.0, 3.0])), 3);
        assert_eq!(buf.append(&run(50.0, &[4.0, 5.0])), 2);
        assert_eq!(buf.frequencies(), &[100.0, 110.0, 120.0, 50.0, 60.0]);
        assert_eq!(buf.powers(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(!buf.overflowed());
    }

    #[test]
    fn test_overflow_truncates_and_flags() {
        let mut buf = SweepBuffer::with_capacity(4).unwrap();
        let reserved = buf.frequencies.capacity();
        assert_eq!(buf.append(&run(0.0, &[1.0, 2.0, 3.0])), 3);
        assert_eq!(buf.append(&run(100.0, &[4.0, 5.0, 6.0])), 1);
        assert!(buf.overflowed());
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.powers(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.frequencies()[3], 100.0);

        // Further points for the same pass are dropped without growing.
        assert_eq!(buf.append(&run(200.0, &[7.0])), 0);
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.frequencies.capacity(), reserved);
        assert_eq!(buf.overflow_events(), 1);
    }

    #[test]
    fn test_reset_clears_overflow() {
        let mut buf = SweepBuffer::with_capacity(2).unwrap();
        buf.append(&run(0.0, &[1.0, 2.0, 3.0]));
        assert!(buf.overflowed());
        buf.reset();
        assert!(buf.is_empty());
        assert!(!buf.overflowed());
        assert_eq!(buf.append(&run(0.0, &[1.0, 2.0])), 2);
        assert!(!buf.overflowed());

        buf.append(&run(0.0, &[9.0]));
        assert_eq!(buf.overflow_events(), 2);
    }

    #[test]
    fn test_allocation_failure_is_resource_error() {
        let err = SweepBuffer::with_capacity(usize::MAX).unwrap_err();
        assert!(matches!(err, SweepError::Resource(_)));
    }
}
