// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

/// Errors surfaced by session setup and teardown.
///
/// Buffer overflow during a pass is not an error: it is flagged on the
/// delivered frame and counted in the engine statistics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    /// Invalid frequency plan, FFT geometry, gains or a missing collaborator.
    #[error("configuration error: {0}")]
    Config(String),

    /// Preallocation or thread spawn failed at start.
    #[error("resource exhausted: {0}")]
    Resource(String),

    /// The ingest collaborator reported a stream fault.
    #[error("ingest fault: {0}")]
    Ingest(String),
}

impl SweepError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }
}

pub type SweepResult<T> = Result<T, SweepError>;
