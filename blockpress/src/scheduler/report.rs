//! Summary of a finished scheduler run.

use std::time::Duration;

use serde::Serialize;

use super::ResolvedConfig;

/// One block range claimed by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PullRecord {
    /// Worker slot that claimed the range.
    pub slot: usize,
    /// First block of the range.
    pub offset: usize,
    /// Number of blocks in the range.
    pub block_count: usize,
}

impl PullRecord {
    /// Block indices covered by this pull.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.block_count
    }
}

/// Result of a successful [`Scheduler::run`](super::Scheduler::run).
///
/// `pulls` lists every claim in the order the shared cursor handed them
/// out, so offsets are strictly increasing.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Blocks in the input buffer.
    pub total_blocks: usize,
    /// Clamped scheduler settings used for the run.
    pub config: ResolvedConfig,
    /// Workers that were actually spawned.
    pub workers_spawned: usize,
    /// Every pull, in claim order.
    pub pulls: Vec<PullRecord>,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl RunReport {
    /// Number of pulls made across all workers.
    pub fn pull_count(&self) -> usize {
        self.pulls.len()
    }

    /// Sum of all pulled block counts.
    pub fn blocks_claimed(&self) -> usize {
        self.pulls.iter().map(|p| p.block_count).sum()
    }

    /// Blocks processed by each worker slot.
    pub fn blocks_per_worker(&self) -> Vec<usize> {
        let mut per_worker = vec![0; self.workers_spawned];
        for pull in &self.pulls {
            per_worker[pull.slot] += pull.block_count;
        }
        per_worker
    }

    /// Encoded blocks per second, or 0 for an instantaneous run.
    pub fn blocks_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_blocks as f64 / secs
        } else {
            0.0
        }
    }
}
