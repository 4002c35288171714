// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Streaming sweep-assembly engine.
//!
//! Raw transfers from a hopping receiver go in; ordered frequency → power
//! sweeps come out through a [`SweepSink`]. The pipeline runs on a single
//! ingest thread owned by a [`SweepSession`].

pub mod accumulator;
pub mod analyzer;
pub mod boundary;
pub mod config;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod plan;
pub mod publisher;
pub mod session;
pub mod source;
pub mod transfer;

pub type DynResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub use config::{SweepConfig, SweepGeometry};
pub use engine::{EngineStats, IngestStatus, SweepEngine};
pub use error::{SweepError, SweepResult};
pub use plan::{FrequencyRange, HopSchedule, SweepPlan};
pub use publisher::{sink_fn, BroadcastSink, SweepFrame, SweepSink, SweepSnapshot};
pub use session::{SessionState, StopSignal, SweepReport, SweepSession, SweepSessionBuilder};
pub use source::{FileSource, SyntheticSource, SyntheticTone, TransferSource};
pub use transfer::SampleBlock;
