// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Sweep boundary detection from the sequence of reported tuning
//! frequencies.
//!
//! A pass is complete when the receiver reports the plan's start frequency
//! again. The comparison is exact: the hop driver revisits that value once
//! per pass.

/// Classification of one incoming block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopEvent {
    /// No boundary has been seen yet; the block belongs to no complete pass.
    Unsynced,
    /// The block continues the pass in progress.
    InPass,
    /// The block starts a new pass. `first` is set for the session's first
    /// boundary, which closes no pass.
    Boundary { first: bool },
}

#[derive(Debug, Clone)]
pub struct HopBoundaryDetector {
    start_hz: u64,
    started: bool,
    passes: u64,
}

impl HopBoundaryDetector {
    pub fn new(start_hz: u64) -> Self {
        Self {
            start_hz,
            started: false,
            passes: 0,
        }
    }

    pub fn start_hz(&self) -> u64 {
        self.start_hz
    }

    /// Whether the first boundary has been observed.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Number of passes closed by a boundary so far.
    pub fn completed_passes(&self) -> u64 {
        self.passes
    }

    pub fn observe(&mut self, frequency_hz: u64) -> HopEvent {
        if frequency_hz == self.start_hz {
            let first = !self.started;
            if !first {
                self.passes += 1;
            }
            self.started = true;
            return HopEvent::Boundary { first };
        }
        if self.started {
            HopEvent::InPass
        } else {
            HopEvent::Unsynced
        }
    }
}
