//! Scheduler error types.

use std::ops::Range;

use thiserror::Error;

/// Errors that can occur while building or running a [`Scheduler`](super::Scheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration cannot be resolved into a valid run.
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    /// No block encoder was supplied.
    #[error("No block encoder configured")]
    MissingEncoder,

    /// No input buffer was supplied.
    #[error("No input buffer configured")]
    MissingInput,

    /// No output buffer was supplied.
    #[error("No output buffer configured")]
    MissingOutput,

    /// Output buffer cannot hold every compressed block.
    #[error("Output buffer too small: need {required} bytes, got {actual}")]
    OutputTooSmall { required: usize, actual: usize },

    /// Not a single worker thread could be spawned.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// One or more workers panicked while encoding.
    ///
    /// Each panicking worker loses the block range it had claimed; every
    /// other block was still compressed.
    #[error("Worker slots {slots:?} panicked; {lost_blocks} blocks were not compressed")]
    WorkerPanicked {
        slots: Vec<usize>,
        lost_ranges: Vec<Range<usize>>,
        lost_blocks: usize,
    },

    /// The run was cancelled before every block was claimed.
    #[error("Compression cancelled after {completed_blocks} of {total_blocks} blocks")]
    Cancelled {
        completed_blocks: usize,
        total_blocks: usize,
    },
}
