// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The per-block sweep pipeline.
//!
//! decode -> boundary -> analyze -> extract -> accumulate -> publish, run
//! strictly in sequence by whoever owns the engine. Nothing here allocates
//! after [`SweepEngine::new`].

use serde::Serialize;
use tracing::{debug, info};

use crate::accumulator::SweepBuffer;
use crate::analyzer::SpectralAnalyzer;
use crate::boundary::{HopBoundaryDetector, HopEvent};
use crate::config::{SweepConfig, SweepGeometry};
use crate::error::SweepResult;
use crate::extractor::SegmentExtractor;
use crate::plan::{FREQ_MAX_MHZ, FREQ_ONE_MHZ};
use crate::publisher::{SweepPublisher, SweepSink};
use crate::session::StopSignal;
use crate::transfer::{self, SampleBlock};

/// Answer to the ingest collaborator after each block or transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    Continue,
    /// Deliver nothing further.
    Abort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub blocks_processed: u64,
    pub blocks_skipped: u64,
    pub sweeps_completed: u64,
    pub frames_published: u64,
    pub points_published: u64,
    pub overflow_events: u64,
}

pub struct SweepEngine {
    geometry: SweepGeometry,
    stop: StopSignal,
    analyzer: SpectralAnalyzer,
    extractor: SegmentExtractor,
    buffer: SweepBuffer,
    boundary: HopBoundaryDetector,
    publisher: SweepPublisher,
    flush_each_transfer: bool,
    announce_first_boundary: bool,
    max_sweeps: Option<u64>,
    blocks_processed: u64,
    blocks_skipped: u64,
    finished: bool,
}

impl SweepEngine {
    /// Validate `config` and preallocate every buffer the pipeline needs.
    pub fn new(
        config: &SweepConfig,
        sink: Box<dyn SweepSink>,
        stop: StopSignal,
    ) -> SweepResult<Self> {
        let geometry = config.validate()?;
        let buffer = SweepBuffer::with_capacity(geometry.capacity)?;

        debug!(
            "sweep geometry: fft_size={} bin_width={:.1} Hz points_per_run={} capacity={} start={} Hz",
            geometry.fft_size,
            geometry.bin_width_hz,
            geometry.points_per_run,
            geometry.capacity,
            geometry.plan.start_hz()
        );

        Ok(Self {
            analyzer: SpectralAnalyzer::new(geometry.fft_size, geometry.bin_width_hz),
            extractor: SegmentExtractor::new(geometry.fft_size, geometry.sample_rate_hz),
            boundary: HopBoundaryDetector::new(geometry.plan.start_hz()),
            publisher: SweepPublisher::new(sink, geometry.fft_size, geometry.bin_width_hz),
            buffer,
            geometry,
            stop,
            flush_each_transfer: config.flush_each_transfer,
            announce_first_boundary: config.announce_first_boundary,
            max_sweeps: config.max_sweeps,
            blocks_processed: 0,
            blocks_skipped: 0,
            finished: false,
        })
    }

    pub fn geometry(&self) -> &SweepGeometry {
        &self.geometry
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            blocks_processed: self.blocks_processed,
            blocks_skipped: self.blocks_skipped,
            sweeps_completed: self.boundary.completed_passes(),
            frames_published: self.publisher.frames_published(),
            points_published: self.publisher.points_published(),
            overflow_events: self.buffer.overflow_events(),
        }
    }

    /// Feed one block. Blocks longer than `fft_size` samples are analysed on
    /// their trailing `fft_size` samples; shorter ones are skipped.
    pub fn process_block(&mut self, block: SampleBlock<'_>) -> IngestStatus {
        if self.finished {
            return IngestStatus::Abort;
        }
        if self.stop.is_stopped() {
            self.finish();
            return IngestStatus::Abort;
        }
        if block.frequency_hz > u64::from(FREQ_MAX_MHZ) * FREQ_ONE_MHZ {
            self.blocks_skipped += 1;
            return IngestStatus::Continue;
        }

        match self.boundary.observe(block.frequency_hz) {
            HopEvent::Unsynced => {
                self.blocks_skipped += 1;
                return IngestStatus::Continue;
            }
            HopEvent::InPass => {}
            HopEvent::Boundary { first } => {
                if !first || self.announce_first_boundary {
                    self.publisher.publish(&mut self.buffer, true);
                }
                if let Some(max) = self.max_sweeps {
                    if self.boundary.completed_passes() >= max {
                        info!("completed {} sweeps, stopping", max);
                        self.stop.stop();
                        self.finish();
                        return IngestStatus::Abort;
                    }
                }
            }
        }

        let tail = block.iq.len().saturating_sub(self.geometry.fft_size * 2);
        let Some(spectrum) = self.analyzer.analyze(block.frequency_hz, &block.iq[tail..]) else {
            self.blocks_skipped += 1;
            return IngestStatus::Continue;
        };
        for run in self.extractor.runs(&spectrum) {
            self.buffer.append(&run);
        }
        self.blocks_processed += 1;
        IngestStatus::Continue
    }

    /// Feed one transfer of whole blocks in the on-wire format.
    ///
    /// With `flush_each_transfer` set, points still pending once the last
    /// block is handled are delivered as a partial frame.
    pub fn process_transfer(&mut self, transfer: &[u8]) -> IngestStatus {
        if self.finished {
            return IngestStatus::Abort;
        }
        for raw in transfer::blocks(transfer) {
            let status = match transfer::decode_block(raw, self.geometry.fft_size) {
                Some(block) => self.process_block(block),
                None => {
                    self.blocks_skipped += 1;
                    IngestStatus::Continue
                }
            };
            if status == IngestStatus::Abort {
                return IngestStatus::Abort;
            }
        }
        if self.flush_each_transfer && !self.buffer.is_empty() {
            self.publisher.publish(&mut self.buffer, false);
        }
        IngestStatus::Continue
    }

    /// Final flush. Delivers pending points once; later calls do nothing.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if !self.buffer.is_empty() {
            debug!("final flush of {} pending points", self.buffer.len());
            self.publisher.publish(&mut self.buffer, false);
        }
    }
}
