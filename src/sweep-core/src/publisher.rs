// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Sweep delivery.
//!
//! The engine hands every completed pass, and every partial flush, to a
//! [`SweepSink`] on the ingest thread. A sink must return promptly: while it
//! runs, no samples are analysed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::accumulator::SweepBuffer;

/// One delivery. The slices are only valid for the duration of
/// [`SweepSink::on_sweep`]; copy what you need to keep.
#[derive(Debug, Clone, Copy)]
pub struct SweepFrame<'a> {
    /// Set for a pass closed by a boundary, cleared for a partial flush.
    pub is_full_sweep: bool,
    pub frequencies: &'a [f64],
    pub powers: &'a [f32],
    pub bin_width_hz: f32,
    pub fft_size: usize,
    /// Points were dropped from this pass because the buffer was full.
    pub truncated: bool,
}

impl SweepFrame<'_> {
    pub fn point_count(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Consumer of assembled sweeps.
pub trait SweepSink: Send {
    fn on_sweep(&mut self, frame: &SweepFrame<'_>);
}

impl<F> SweepSink for F
where
    F: FnMut(&SweepFrame<'_>) + Send,
{
    fn on_sweep(&mut self, frame: &SweepFrame<'_>) {
        self(frame)
    }
}

/// Box a closure as a sink.
pub fn sink_fn<F>(f: F) -> Box<dyn SweepSink>
where
    F: FnMut(&SweepFrame<'_>) + Send + 'static,
{
    Box::new(f)
}

/// Owned copy of a [`SweepFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSnapshot {
    pub is_full_sweep: bool,
    pub bin_width_hz: f32,
    pub fft_size: usize,
    pub truncated: bool,
    pub frequencies: Vec<f64>,
    pub powers: Vec<f32>,
}

impl SweepSnapshot {
    pub fn from_frame(frame: &SweepFrame<'_>) -> Self {
        Self {
            is_full_sweep: frame.is_full_sweep,
            bin_width_hz: frame.bin_width_hz,
            fft_size: frame.fft_size,
            truncated: frame.truncated,
            frequencies: frame.frequencies.to_vec(),
            powers: frame.powers.to_vec(),
        }
    }

    pub fn point_count(&self) -> usize {
        self.frequencies.len()
    }

    /// Borrow the snapshot as a frame, e.g. to replay it into another sink.
    pub fn as_frame(&self) -> SweepFrame<'_> {
        SweepFrame {
            is_full_sweep: self.is_full_sweep,
            frequencies: &self.frequencies,
            powers: &self.powers,
            bin_width_hz: self.bin_width_hz,
            fft_size: self.fft_size,
            truncated: self.truncated,
        }
    }
}

/// Queue publisher: copies each frame and broadcasts it to any number of
/// async subscribers.
///
/// Sending never blocks. Slow receivers observe `RecvError::Lagged`; with no
/// receivers the frame is dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<Arc<SweepSnapshot>>,
    full_sweeps_only: bool,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<Arc<SweepSnapshot>>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (
            Self {
                tx,
                full_sweeps_only: false,
            },
            rx,
        )
    }

    pub fn from_sender(tx: broadcast::Sender<Arc<SweepSnapshot>>) -> Self {
        Self {
            tx,
            full_sweeps_only: false,
        }
    }

    /// Skip partial flushes.
    pub fn full_sweeps_only(mut self, enabled: bool) -> Self {
        self.full_sweeps_only = enabled;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SweepSnapshot>> {
        self.tx.subscribe()
    }
}

impl SweepSink for BroadcastSink {
    fn on_sweep(&mut self, frame: &SweepFrame<'_>) {
        if self.full_sweeps_only && !frame.is_full_sweep {
            return;
        }
        if self.tx.receiver_count() == 0 {
            return;
        }
        let _ = self.tx.send(Arc::new(SweepSnapshot::from_frame(frame)));
    }
}

/// Drains a [`SweepBuffer`] into the sink and keeps delivery counters.
pub struct SweepPublisher {
    sink: Box<dyn SweepSink>,
    fft_size: usize,
    bin_width_hz: f32,
    frames_published: u64,
    points_published: u64,
}

impl SweepPublisher {
    pub fn new(sink: Box<dyn SweepSink>, fft_size: usize, bin_width_hz: f64) -> Self {
        Self {
            sink,
            fft_size,
            bin_width_hz: bin_width_hz as f32,
            frames_published: 0,
            points_published: 0,
        }
    }

    /// Deliver the buffer contents, then reset the buffer.
    pub fn publish(&mut self, buffer: &mut SweepBuffer, is_full_sweep: bool) {
        let frame = SweepFrame {
            is_full_sweep,
            frequencies: buffer.frequencies(),
            powers: buffer.powers(),
            bin_width_hz: self.bin_width_hz,
            fft_size: self.fft_size,
            truncated: buffer.overflowed(),
        };
        self.sink.on_sweep(&frame);
        self.frames_published += 1;
        self.points_published += frame.point_count() as u64;
        buffer.reset();
    }

    pub fn frames_published(&self) -> u64 {
        self.frames_published
    }

    pub fn points_published(&self) -> u64 {
        self.points_published
    }
}

/// Sink that records every delivery, for tests across the crate.
#[cfg(test)]
pub(crate) fn recorder() -> (Box<dyn SweepSink>, Arc<std::sync::Mutex<Vec<SweepSnapshot>>>) {
    let frames = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_frames = Arc::clone(&frames);
    let sink = sink_fn(move |frame| {
        sink_frames
            .lock()
            .unwrap()
            .push(SweepSnapshot::from_frame(frame));
    });
    (sink, frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::SegmentRun;

    fn filled_buffer(capacity: usize, powers: &[f32]) -> SweepBuffer {
        let mut buffer = SweepBuffer::with_capacity(capacity).unwrap();
        buffer.append(&SegmentRun {
            origin_hz: 1000.0,
            bin_width_hz: 10.0,
            powers,
        });
        buffer
    }

    #[test]
    fn test_publish_delivers_and_resets() {
        let (sink, frames) = recorder();
        let mut publisher = SweepPublisher::new(sink, 20, 1_000_000.0);
        let mut buffer = filled_buffer(8, &[-10.0, -20.0, -30.0]);

        publisher.publish(&mut buffer, true);
        assert!(buffer.is_empty());
        assert_eq!(publisher.frames_published(), 1);
        assert_eq!(publisher.points_published(), 3);

        let frames = frames.lock().unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert!(frame.is_full_sweep);
        assert!(!frame.truncated);
        assert_eq!(frame.fft_size, 20);
        assert_eq!(frame.bin_width_hz, 1_000_000.0);
        assert_eq!(frame.frequencies, vec![1000.0, 1010.0, 1020.0]);
        assert_eq!(frame.powers, vec![-10.0, -20.0, -30.0]);
    }

    #[test]
    fn test_truncated_flag_follows_overflow() {
        let (sink, frames) = recorder();
        let mut publisher = SweepPublisher::new(sink, 20, 1.0);
        let mut buffer = filled_buffer(2, &[1.0, 2.0, 3.0]);
        publisher.publish(&mut buffer, false);
        publisher.publish(&mut buffer, false);

        let frames = frames.lock().unwrap();
        assert!(frames[0].truncated);
        assert_eq!(frames[0].point_count(), 2);
        assert!(!frames[1].truncated);
        assert_eq!(frames[1].point_count(), 0);
    }

    #[test]
    fn test_broadcast_sink_fans_out() {
        let (mut sink, mut rx) = BroadcastSink::new(4);
        let mut rx2 = sink.subscribe();
        let snapshot = SweepSnapshot {
            is_full_sweep: true,
            bin_width_hz: 5.0,
            fft_size: 20,
            truncated: false,
            frequencies: vec![1.0, 2.0],
            powers: vec![-1.0, -2.0],
        };
        sink.on_sweep(&snapshot.as_frame());

        let got = rx.try_recv().unwrap();
        assert_eq!(*got, snapshot);
        let got = rx2.try_recv().unwrap();
        assert_eq!(got.point_count(), 2);
    }

    #[test]
    fn test_broadcast_sink_can_skip_partials() {
        let (sink, mut rx) = BroadcastSink::new(4);
        let mut sink = sink.full_sweeps_only(true);
        let partial = SweepSnapshot {
            is_full_sweep: false,
            bin_width_hz: 5.0,
            fft_size: 4,
            truncated: false,
            frequencies: vec![1.0],
            powers: vec![-1.0],
        };
        sink.on_sweep(&partial.as_frame());
        assert!(rx.try_recv().is_err());

        let full = SweepSnapshot {
            is_full_sweep: true,
            ..partial
        };
        sink.on_sweep(&full.as_frame());
        assert!(rx.try_recv().unwrap().is_full_sweep);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = SweepSnapshot {
            is_full_sweep: true,
            bin_width_hz: 1_000_000.0,
            fft_size: 20,
            truncated: false,
            frequencies: vec![0.0, 1_000_000.0],
            powers: vec![-70.5, -71.0],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"is_full_sweep\":true"));
        let back: SweepSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
