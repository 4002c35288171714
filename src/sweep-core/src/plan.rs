// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Frequency plan the receiver steps through once per sweep.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SweepError, SweepResult};

pub const FREQ_ONE_MHZ: u64 = 1_000_000;

/// Absolute ceiling for any range maximum (MHz).
pub const FREQ_MAX_MHZ: u32 = 7250;

/// Maximum number of ranges in one plan.
pub const MAX_SWEEP_RANGES: usize = 10;

/// One `[min, max)` span in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRange {
    pub min_mhz: u32,
    pub max_mhz: u32,
}

impl FrequencyRange {
    #[must_use]
    pub fn new(min_mhz: u32, max_mhz: u32) -> Self {
        Self { min_mhz, max_mhz }
    }

    pub fn min_hz(&self) -> u64 {
        u64::from(self.min_mhz) * FREQ_ONE_MHZ
    }

    pub fn max_hz(&self) -> u64 {
        u64::from(self.max_mhz) * FREQ_ONE_MHZ
    }

    pub fn validate(&self) -> SweepResult<()> {
        if self.min_mhz >= self.max_mhz {
            return Err(SweepError::config(format!(
                "freq_max must be greater than freq_min (got {})",
                self
            )));
        }
        if self.max_mhz > FREQ_MAX_MHZ {
            return Err(SweepError::config(format!(
                "freq_max may not be higher than {} MHz (got {})",
                FREQ_MAX_MHZ, self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.min_mhz, self.max_mhz)
    }
}

impl FromStr for FrequencyRange {
    type Err = String;

    /// Parse `"<min>:<max>"` in MHz.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once(':')
            .ok_or_else(|| format!("frequency range '{}' must be '<min>:<max>' in MHz", s))?;
        let min_mhz = min
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid freq_min '{}': {}", min.trim(), e))?;
        let max_mhz = max
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid freq_max '{}': {}", max.trim(), e))?;
        Ok(Self { min_mhz, max_mhz })
    }
}

/// Validated, ordered list of ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    ranges: Vec<FrequencyRange>,
}

impl SweepPlan {
    pub fn new(ranges: Vec<FrequencyRange>) -> SweepResult<Self> {
        if ranges.is_empty() {
            return Err(SweepError::config("sweep plan must contain at least one range"));
        }
        if ranges.len() > MAX_SWEEP_RANGES {
            return Err(SweepError::config(format!(
                "specify a maximum of {} frequency ranges (got {})",
                MAX_SWEEP_RANGES,
                ranges.len()
            )));
        }
        for range in &ranges {
            range.validate()?;
        }
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[FrequencyRange] {
        &self.ranges
    }

    /// Reference frequency for boundary detection: the first range's minimum.
    pub fn start_hz(&self) -> u64 {
        self.ranges[0].min_hz()
    }

    /// Ranges in Hz with each maximum rounded up to a whole number of tune
    /// steps.
    pub fn aligned(&self, tune_step_hz: u64) -> Vec<(u64, u64)> {
        let step = tune_step_hz.max(1);
        self.ranges
            .iter()
            .map(|range| {
                let min = range.min_hz();
                let steps = step_count(min, range.max_hz(), step);
                (min, min + steps * step)
            })
            .collect()
    }

    /// Reported tuning frequencies visited during one pass, in order.
    ///
    /// Every tune step is covered by an interleaved pair of hops, the second
    /// a quarter of the sample rate above the first.
    pub fn hop_frequencies(&self, sample_rate_hz: u32) -> Vec<u64> {
        let step = u64::from(sample_rate_hz).max(1);
        let mut hops = Vec::new();
        for (min, max) in self.aligned(step) {
            let mut freq = min;
            while freq < max {
                hops.push(freq);
                hops.push(freq + step / 4);
                freq += step;
            }
        }
        hops
    }
}

/// Endless walk through the hops of a pass, dwelling `blocks_per_hop`
/// consecutive blocks on each.
#[derive(Debug, Clone)]
pub struct HopSchedule {
    hops: Vec<u64>,
    blocks_per_hop: usize,
    index: usize,
    dwell: usize,
}

impl HopSchedule {
    pub fn new(hops: Vec<u64>, blocks_per_hop: usize) -> Self {
        Self {
            hops,
            blocks_per_hop: blocks_per_hop.max(1),
            index: 0,
            dwell: 0,
        }
    }

    pub fn hops(&self) -> &[u64] {
        &self.hops
    }

    /// Whether the next block starts a new hop.
    pub fn at_hop_start(&self) -> bool {
        self.dwell == 0
    }

    /// Reported frequency for the next block.
    pub fn next_block(&mut self) -> u64 {
        let Some(&freq) = self.hops.get(self.index) else {
            return 0;
        };
        self.dwell += 1;
        if self.dwell >= self.blocks_per_hop {
            self.dwell = 0;
            self.index = (self.index + 1) % self.hops.len();
        }
        freq
    }
}

/// Frequency the receiver is actually tuned to for a reported hop: three
/// eighths of the sample rate above it, so the lower usable quarter band
/// starts at the hop frequency.
pub fn tuned_center_hz(hop_hz: u64, sample_rate_hz: u32) -> u64 {
    hop_hz + u64::from(sample_rate_hz) * 3 / 8
}

fn step_count(min_hz: u64, max_hz: u64, step_hz: u64) -> u64 {
    1 + (max_hz.saturating_sub(min_hz).saturating_sub(1)) / step_hz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let range: FrequencyRange = "2400:2500".parse().unwrap();
        assert_eq!(range, FrequencyRange::new(2400, 2500));
        assert_eq!(range.to_string(), "2400:2500");

        let spaced: FrequencyRange = " 88 : 108 ".parse().unwrap();
        assert_eq!(spaced, FrequencyRange::new(88, 108));
    }

    #[test]
    fn test_parse_range_rejects_garbage() {
        assert!("2400".parse::<FrequencyRange>().is_err());
        assert!("a:b".parse::<FrequencyRange>().is_err());
        assert!("-5:10".parse::<FrequencyRange>().is_err());
    }

    #[test]
    fn test_plan_rejects_inverted_range() {
        let err = SweepPlan::new(vec![FrequencyRange::new(100, 100)]).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
        assert!(SweepPlan::new(vec![FrequencyRange::new(200, 100)]).is_err());
    }

    #[test]
    fn test_plan_rejects_above_ceiling() {
        assert!(SweepPlan::new(vec![FrequencyRange::new(7000, FREQ_MAX_MHZ)]).is_ok());
        assert!(SweepPlan::new(vec![FrequencyRange::new(7000, FREQ_MAX_MHZ + 1)]).is_err());
    }

    #[test]
    fn test_plan_range_count_limit() {
        let ranges: Vec<_> = (0..MAX_SWEEP_RANGES as u32)
            .map(|i| FrequencyRange::new(i * 100, i * 100 + 50))
            .collect();
        assert!(SweepPlan::new(ranges.clone()).is_ok());

        let mut too_many = ranges;
        too_many.push(FrequencyRange::new(5000, 5050));
        assert!(SweepPlan::new(too_many).is_err());
        assert!(SweepPlan::new(Vec::new()).is_err());
    }

    #[test]
    fn test_start_hz_is_first_range_min() {
        let plan = SweepPlan::new(vec![
            FrequencyRange::new(400, 500),
            FrequencyRange::new(100, 200),
        ])
        .unwrap();
        assert_eq!(plan.start_hz(), 400 * FREQ_ONE_MHZ);
    }

    #[test]
    fn test_aligned_rounds_to_tune_step() {
        let plan = SweepPlan::new(vec![
            FrequencyRange::new(0, 10),
            FrequencyRange::new(100, 140),
            FrequencyRange::new(200, 241),
        ])
        .unwrap();
        let aligned = plan.aligned(20 * FREQ_ONE_MHZ);
        assert_eq!(
            aligned,
            vec![
                (0, 20 * FREQ_ONE_MHZ),
                (100 * FREQ_ONE_MHZ, 140 * FREQ_ONE_MHZ),
                (200 * FREQ_ONE_MHZ, 260 * FREQ_ONE_MHZ),
            ]
        );
    }

    #[test]
    fn test_hop_frequencies_interleave() {
        let plan = SweepPlan::new(vec![FrequencyRange::new(0, 10)]).unwrap();
        assert_eq!(plan.hop_frequencies(20_000_000), vec![0, 5_000_000]);

        let plan = SweepPlan::new(vec![
            FrequencyRange::new(100, 140),
            FrequencyRange::new(2400, 2410),
        ])
        .unwrap();
        assert_eq!(
            plan.hop_frequencies(20_000_000),
            vec![
                100_000_000,
                105_000_000,
                120_000_000,
                125_000_000,
                2_400_000_000,
                2_405_000_000,
            ]
        );
    }

    #[test]
    fn test_plan_visits_start_once_per_pass() {
        let plan = SweepPlan::new(vec![FrequencyRange::new(0, 6000)]).unwrap();
        let hops = plan.hop_frequencies(20_000_000);
        assert_eq!(hops.len(), 600);
        assert_eq!(hops.iter().filter(|&&f| f == plan.start_hz()).count(), 1);
    }

    #[test]
    fn test_tuned_center_offset() {
        assert_eq!(tuned_center_hz(2_400_000_000, 20_000_000), 2_407_500_000);
        assert_eq!(tuned_center_hz(0, 8_000_000), 3_000_000);
    }

    #[test]
    fn test_hop_schedule_dwell_and_wrap() {
        let mut schedule = HopSchedule::new(vec![10, 20, 30], 2);
        assert!(schedule.at_hop_start());
        let seq: Vec<u64> = (0..8).map(|_| schedule.next_block()).collect();
        assert_eq!(seq, vec![10, 10, 20, 20, 30, 30, 10, 10]);

        let mut single = HopSchedule::new(vec![7, 8], 0);
        assert_eq!(single.next_block(), 7);
        assert!(single.at_hop_start());
        assert_eq!(single.next_block(), 8);
    }
}
