// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Session lifecycle.
//!
//! A [`SweepSession`] owns one ingest thread. That thread owns the engine,
//! the transfer source and the sink; the only state shared with the caller
//! is the [`StopSignal`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{SweepConfig, SweepGeometry};
use crate::engine::{EngineStats, IngestStatus, SweepEngine};
use crate::error::{SweepError, SweepResult};
use crate::publisher::SweepSink;
use crate::source::TransferSource;
use crate::transfer::BYTES_PER_BLOCK;

/// How often [`SweepSession::wait`] checks for the ingest thread to exit.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cross-thread request to stop ingesting.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns `true` if this call raised it.
    pub fn stop(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Ingest has ended, or never began.
    Idle,
    /// Collaborators are being collected by a [`SweepSessionBuilder`].
    Configuring,
    Running,
    Stopping,
}

/// Summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub stats: EngineStats,
    pub elapsed: Duration,
    pub bytes_read: u64,
}

impl SweepReport {
    pub fn sweep_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.sweeps_completed as f64 / secs
        } else {
            0.0
        }
    }

    fn log(&self) {
        info!(
            "total sweeps: {} in {:.5} seconds ({:.2} sweeps/second)",
            self.stats.sweeps_completed,
            self.elapsed.as_secs_f64(),
            self.sweep_rate()
        );
        debug!(
            "blocks processed={} skipped={} frames={} points={} overflows={} bytes={}",
            self.stats.blocks_processed,
            self.stats.blocks_skipped,
            self.stats.frames_published,
            self.stats.points_published,
            self.stats.overflow_events,
            self.bytes_read
        );
    }
}

pub struct SweepSession {
    state: SessionState,
    stop: StopSignal,
    geometry: SweepGeometry,
    handle: Option<JoinHandle<SweepResult<SweepReport>>>,
    outcome: Option<SweepResult<SweepReport>>,
}

impl SweepSession {
    /// Validate `config`, preallocate all buffers and start ingesting.
    ///
    /// On any error nothing is left running and `source` is dropped unread.
    pub fn start(
        config: SweepConfig,
        source: Box<dyn TransferSource>,
        sink: Box<dyn SweepSink>,
    ) -> SweepResult<Self> {
        debug!("sweep session {:?}", SessionState::Configuring);
        let stop = StopSignal::new();
        let engine = SweepEngine::new(&config, sink, stop.clone())?;
        let geometry = engine.geometry().clone();

        let transfer_len = geometry.blocks_per_transfer * BYTES_PER_BLOCK;
        let mut transfer = Vec::new();
        transfer.try_reserve_exact(transfer_len).map_err(|e| {
            SweepError::resource(format!("cannot allocate {}-byte transfer buffer: {}", transfer_len, e))
        })?;
        transfer.resize(transfer_len, 0);

        let thread_stop = stop.clone();
        let handle = std::thread::Builder::new()
            .name("sweep-ingest".to_string())
            .spawn(move || ingest_loop(engine, source, transfer, thread_stop))
            .map_err(|e| SweepError::resource(format!("cannot spawn ingest thread: {}", e)))?;

        info!(
            "sweeping {} ({} Hz bins, fft_size {})",
            geometry
                .plan
                .ranges()
                .iter()
                .map(|r| format!("{} MHz", r))
                .collect::<Vec<_>>()
                .join(", "),
            geometry.bin_width_hz,
            geometry.fft_size
        );

        Ok(Self {
            state: SessionState::Running,
            stop,
            geometry,
            handle: Some(handle),
            outcome: None,
        })
    }

    pub fn builder(config: SweepConfig) -> SweepSessionBuilder {
        SweepSessionBuilder {
            config,
            source: None,
            sink: None,
        }
    }

    pub fn geometry(&self) -> &SweepGeometry {
        &self.geometry
    }

    pub fn state(&self) -> SessionState {
        if self.state == SessionState::Running && self.stop.is_stopped() {
            SessionState::Stopping
        } else {
            self.state
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// A clone of the session's stop signal, e.g. for a signal handler.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Ask the ingest thread to stop after its current block. Does not wait;
    /// a no-op unless the session is running.
    pub fn stop(&mut self) {
        if self.state != SessionState::Running {
            return;
        }
        if self.stop.stop() {
            debug!("sweep session stop requested");
        }
        self.state = SessionState::Stopping;
    }

    /// Whether the ingest thread has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Block until the ingest thread exits and return its report.
    ///
    /// Polls every [`POLL_INTERVAL`]. Calling it again returns the same
    /// outcome.
    pub fn wait(&mut self) -> SweepResult<SweepReport> {
        while !self.is_finished() {
            std::thread::sleep(POLL_INTERVAL);
        }
        self.join()
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`, returning
    /// `None` while the session is still running.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<SweepResult<SweepReport>> {
        let deadline = Instant::now() + timeout;
        while !self.is_finished() {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
        Some(self.join())
    }

    fn join(&mut self) -> SweepResult<SweepReport> {
        if let Some(handle) = self.handle.take() {
            let outcome = handle
                .join()
                .unwrap_or_else(|_| Err(SweepError::Ingest("ingest thread panicked".to_string())));
            self.outcome = Some(outcome);
            self.state = SessionState::Idle;
        }
        self.outcome
            .clone()
            .unwrap_or_else(|| Err(SweepError::Ingest("session has no ingest thread".to_string())))
    }
}

impl Drop for SweepSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop.stop();
            let _ = self.join();
        }
    }
}

/// Collects the session collaborators before [`start`](Self::start).
pub struct SweepSessionBuilder {
    config: SweepConfig,
    source: Option<Box<dyn TransferSource>>,
    sink: Option<Box<dyn SweepSink>>,
}

impl SweepSessionBuilder {
    pub fn state(&self) -> SessionState {
        SessionState::Configuring
    }

    pub fn source<S: TransferSource>(mut self, source: S) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn boxed_source(mut self, source: Box<dyn TransferSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn sink<S: SweepSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn boxed_sink(mut self, sink: Box<dyn SweepSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn start(self) -> SweepResult<SweepSession> {
        let sink = self
            .sink
            .ok_or_else(|| SweepError::config("no sweep sink registered"))?;
        let source = self
            .source
            .ok_or_else(|| SweepError::config("no transfer source registered"))?;
        SweepSession::start(self.config, source, sink)
    }
}

fn ingest_loop(
    mut engine: SweepEngine,
    mut source: Box<dyn TransferSource>,
    mut transfer: Vec<u8>,
    stop: StopSignal,
) -> SweepResult<SweepReport> {
    let started = Instant::now();
    let mut bytes_read = 0u64;
    let mut fault = None;

    while !stop.is_stopped() {
        let mut n = match source.read_transfer(&mut transfer) {
            Ok(0) => {
                debug!("transfer source reached end of stream");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                error!("transfer source failed: {}", e);
                fault = Some(e);
                break;
            }
        };
        if n > transfer.len() {
            warn!(
                "transfer source reported {} bytes for a {}-byte buffer",
                n,
                transfer.len()
            );
            n = transfer.len();
        }
        bytes_read += n as u64;

        if engine.process_transfer(&transfer[..n]) == IngestStatus::Abort {
            break;
        }
    }

    engine.finish();
    stop.stop();

    let report = SweepReport {
        stats: engine.stats(),
        elapsed: started.elapsed(),
        bytes_read,
    };
    report.log();
    match fault {
        Some(e) => Err(SweepError::Ingest(e)),
        None => Ok(report),
    }
}
