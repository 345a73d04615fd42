//! Block-parallel compression scheduler.
//!
//! The scheduler spreads the 4×4 blocks of one image across a bounded pool
//! of worker threads. Work is not partitioned ahead of time; instead every
//! worker repeatedly *pulls* the next `job_size` blocks from a shared cursor,
//! which balances load when some blocks are much more expensive to encode
//! than others.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!  run() ───────► │ BlockQueue (mutex + condvar) │
//!   │             │  next_block, unclaimed tail  │
//!   │             └──────┬──────────┬────────────┘
//!   │                pull│      pull│   ... (O(1) under the lock)
//!   │                    ▼          ▼
//!   │              ┌─────────┐ ┌─────────┐
//!   │              │worker 0 │ │worker 1 │  encode outside the lock
//!   │              └────┬────┘ └────┬────┘
//!   │                   └─exit──────┴──► active_workers -= 1, notify
//!   └── wait until active_workers == 0, then join every handle
//! ```
//!
//! Ranges are claimed in strictly ascending order and never overlap. Each
//! claim carries its own `&mut` slice of the output, split off the unclaimed
//! tail, so the absence of overlapping writes is checked by the compiler.
//!
//! # Example
//!
//! ```
//! use blockpress::codec::BlockEncoder;
//! use blockpress::scheduler::{Scheduler, SchedulerConfig};
//!
//! /// Stores the first pixel of every block.
//! struct FirstPixel;
//!
//! impl BlockEncoder for FirstPixel {
//!     fn block_bytes(&self) -> usize {
//!         4
//!     }
//!
//!     fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
//!         for (block, out) in src.chunks_exact(64).zip(dst.chunks_exact_mut(4)) {
//!             out.copy_from_slice(&block[..4]);
//!         }
//!     }
//! }
//!
//! let input = vec![7u8; 64 * 10];
//! let mut output = vec![0u8; 4 * 10];
//!
//! let report = Scheduler::builder(SchedulerConfig::new(3).with_job_size(2))
//!     .input(&input)
//!     .encoder(&FirstPixel)
//!     .output(&mut output)
//!     .build()
//!     .unwrap()
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(report.pull_count(), 5);
//! assert!(output.iter().all(|&b| b == 7));
//! ```

mod config;
mod error;
mod queue;
mod report;
mod worker;

pub use config::{
    available_threads, ResolvedConfig, SchedulerConfig, DEFAULT_JOB_SIZE,
    DEFAULT_MAX_WORKER_THREADS,
};
pub use error::SchedulerError;
pub use report::{PullRecord, RunReport};

use std::ops::Range;
use std::thread;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::BlockEncoder;
use crate::format::UNCOMPRESSED_BLOCK_BYTES;

use queue::BlockQueue;
use worker::Worker;

/// A validated, single-use compression run.
///
/// Built with [`Scheduler::builder`]. The scheduler borrows its input,
/// output and encoder for its whole lifetime; [`run`](Self::run) consumes
/// it, so a scheduler can only run once.
pub struct Scheduler<'a> {
    config: ResolvedConfig,
    input: &'a [u8],
    output: &'a mut [u8],
    encoder: &'a dyn BlockEncoder,
    total_blocks: usize,
    cancel: Option<CancellationToken>,
}

impl<'a> Scheduler<'a> {
    /// Start building a scheduler with the given settings.
    pub fn builder(config: SchedulerConfig) -> SchedulerBuilder<'a> {
        SchedulerBuilder {
            config,
            input: None,
            output: None,
            encoder: None,
            cancel: None,
        }
    }

    /// Clamped settings this scheduler will run with.
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Number of whole 4×4 blocks in the input.
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    /// Compress every block and wait for all workers to exit.
    ///
    /// Spawns `config().threads` workers, blocks until each one has exited,
    /// joins them, and only then returns. On success every block of the
    /// output prefix has been written.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Spawn`] if no worker could be started.
    /// - [`SchedulerError::WorkerPanicked`] listing every slot whose encoder
    ///   panicked and the block ranges those slots lost.
    /// - [`SchedulerError::Cancelled`] if the cancellation token fired before
    ///   every block was claimed.
    pub fn run(self) -> Result<RunReport, SchedulerError> {
        let started = Instant::now();
        let Scheduler {
            config,
            input,
            output,
            encoder,
            total_blocks,
            cancel,
        } = self;

        let queue = BlockQueue::new(
            output,
            total_blocks,
            config.job_size,
            encoder.block_bytes(),
            config.threads,
            cancel,
        );

        debug!(
            total_blocks,
            threads = config.threads,
            job_size = config.job_size,
            encoder = encoder.name(),
            "Starting compression run"
        );

        let (workers_spawned, spawn_error, panicked) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(config.threads);
            let mut spawn_error = None;

            for slot in 0..config.threads {
                queue.register_worker();
                let worker = Worker::new(slot, &queue, input, encoder);
                let spawned = thread::Builder::new()
                    .name(format!("blockpress-worker-{}", slot))
                    .spawn_scoped(scope, move || worker.run());

                match spawned {
                    Ok(handle) => handles.push((slot, handle)),
                    Err(e) => {
                        queue.unregister_worker();
                        warn!(slot, error = %e, "Failed to spawn worker thread");
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            queue.wait_for_workers();

            let workers_spawned = handles.len();
            let panicked: Vec<usize> = handles
                .into_iter()
                .filter_map(|(slot, handle)| match handle.join() {
                    Ok(encoded) => {
                        trace!(slot, encoded, "Worker finished");
                        None
                    }
                    Err(_) => {
                        warn!(slot, "Worker panicked while encoding");
                        Some(slot)
                    }
                })
                .collect();

            (workers_spawned, spawn_error, panicked)
        });

        let cancelled = queue.is_cancelled();
        let state = queue.into_state();

        if let (0, Some(err)) = (workers_spawned, spawn_error) {
            return Err(SchedulerError::Spawn(err));
        }

        if !panicked.is_empty() {
            let lost_ranges: Vec<Range<usize>> = panicked
                .iter()
                .filter_map(|&slot| state.slots[slot])
                .map(|a| a.offset..a.offset + a.block_count)
                .collect();
            let lost_blocks = lost_ranges.iter().map(|r| r.len()).sum();
            return Err(SchedulerError::WorkerPanicked {
                slots: panicked,
                lost_ranges,
                lost_blocks,
            });
        }

        if state.next_block < total_blocks {
            debug_assert!(cancelled, "blocks left unclaimed without cancellation");
            return Err(SchedulerError::Cancelled {
                completed_blocks: state.next_block,
                total_blocks,
            });
        }

        let report = RunReport {
            total_blocks,
            config,
            workers_spawned,
            pulls: state.pulls,
            elapsed: started.elapsed(),
        };

        info!(
            total_blocks,
            pulls = report.pull_count(),
            workers = workers_spawned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Compression run complete"
        );

        Ok(report)
    }
}

/// Builder for [`Scheduler`]; validates the whole configuration before any
/// thread exists.
pub struct SchedulerBuilder<'a> {
    config: SchedulerConfig,
    input: Option<&'a [u8]>,
    output: Option<&'a mut [u8]>,
    encoder: Option<&'a dyn BlockEncoder>,
    cancel: Option<CancellationToken>,
}

impl<'a> SchedulerBuilder<'a> {
    /// Block-linear RGBA8 input (64 bytes per block).
    pub fn input(mut self, input: &'a [u8]) -> Self {
        self.input = Some(input);
        self
    }

    /// Destination for the compressed blocks.
    pub fn output(mut self, output: &'a mut [u8]) -> Self {
        self.output = Some(output);
        self
    }

    /// Encoder applied to every claimed block range.
    pub fn encoder(mut self, encoder: &'a dyn BlockEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Token checked at every pull; once cancelled, workers stop claiming.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Validate the configuration.
    ///
    /// An input length that is not a multiple of 64 bytes is tolerated with a
    /// warning; the trailing partial block is ignored.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::InvalidConfig`] for an unusable configuration
    /// - [`SchedulerError::MissingEncoder`], [`SchedulerError::MissingInput`],
    ///   [`SchedulerError::MissingOutput`] for missing dependencies
    /// - [`SchedulerError::OutputTooSmall`] if the output cannot hold every block
    pub fn build(self) -> Result<Scheduler<'a>, SchedulerError> {
        let config = self.config.resolve()?;
        let encoder = self.encoder.ok_or(SchedulerError::MissingEncoder)?;
        let input = self.input.ok_or(SchedulerError::MissingInput)?;
        let output = self.output.ok_or(SchedulerError::MissingOutput)?;

        let block_bytes = encoder.block_bytes();
        if block_bytes == 0 {
            return Err(SchedulerError::InvalidConfig(format!(
                "encoder '{}' reports a zero block size",
                encoder.name()
            )));
        }

        if input.len() % UNCOMPRESSED_BLOCK_BYTES != 0 {
            warn!(
                input_len = input.len(),
                "Input length is not a multiple of 64 bytes; trailing bytes are ignored. \
                 Are the image dimensions correct?"
            );
        }
        let total_blocks = input.len() / UNCOMPRESSED_BLOCK_BYTES;

        let required = total_blocks * block_bytes;
        if output.len() < required {
            return Err(SchedulerError::OutputTooSmall {
                required,
                actual: output.len(),
            });
        }
        let (output, _) = output.split_at_mut(required);

        Ok(Scheduler {
            config,
            input,
            output,
            encoder,
            total_blocks,
            cancel: self.cancel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pure per-block encoder: byte sum followed by the first pixel.
    struct ChecksumEncoder;

    impl BlockEncoder for ChecksumEncoder {
        fn block_bytes(&self) -> usize {
            8
        }

        fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
            for (block, out) in src.chunks_exact(64).zip(dst.chunks_exact_mut(8)) {
                let sum: u32 = block.iter().map(|&b| b as u32).sum();
                out[..4].copy_from_slice(&sum.to_le_bytes());
                out[4..].copy_from_slice(&block[..4]);
            }
        }

        fn name(&self) -> &str {
            "checksum"
        }
    }

    /// Panics on any block whose first byte is 0xEE.
    struct PoisonEncoder;

    impl BlockEncoder for PoisonEncoder {
        fn block_bytes(&self) -> usize {
            8
        }

        fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
            for (block, out) in src.chunks_exact(64).zip(dst.chunks_exact_mut(8)) {
                assert_ne!(block[0], 0xEE, "poisoned block");
                out.fill(1);
            }
        }
    }

    /// Cancels the token as soon as it encodes anything.
    struct CancellingEncoder(CancellationToken);

    impl BlockEncoder for CancellingEncoder {
        fn block_bytes(&self) -> usize {
            4
        }

        fn encode_blocks(&self, _src: &[u8], dst: &mut [u8]) {
            self.0.cancel();
            dst.fill(9);
        }
    }

    fn block_input(blocks: usize) -> Vec<u8> {
        (0..blocks * 64).map(|i| (i / 64) as u8).collect()
    }

    fn run_checksum(input: &[u8], threads: usize, job_size: usize) -> (Vec<u8>, RunReport) {
        let mut output = vec![0u8; input.len() / 64 * 8];
        let report = Scheduler::builder(SchedulerConfig::new(threads).with_job_size(job_size))
            .input(input)
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build()
            .unwrap()
            .run()
            .unwrap();
        (output, report)
    }

    // =========================================================================
    // Builder validation
    // =========================================================================

    #[test]
    fn test_build_missing_encoder() {
        let input = block_input(1);
        let mut output = vec![0u8; 8];
        let result = Scheduler::builder(SchedulerConfig::new(1))
            .input(&input)
            .output(&mut output)
            .build();
        assert!(matches!(result, Err(SchedulerError::MissingEncoder)));
    }

    #[test]
    fn test_build_missing_input() {
        let mut output = vec![0u8; 8];
        let result = Scheduler::builder(SchedulerConfig::new(1))
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build();
        assert!(matches!(result, Err(SchedulerError::MissingInput)));
    }

    #[test]
    fn test_build_missing_output() {
        let input = block_input(1);
        let result = Scheduler::builder(SchedulerConfig::new(1))
            .input(&input)
            .encoder(&ChecksumEncoder)
            .build();
        assert!(matches!(result, Err(SchedulerError::MissingOutput)));
    }

    #[test]
    fn test_build_output_too_small() {
        let input = block_input(4);
        let mut output = vec![0u8; 31];
        let result = Scheduler::builder(SchedulerConfig::new(1))
            .input(&input)
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build();
        assert!(matches!(
            result,
            Err(SchedulerError::OutputTooSmall {
                required: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_build_clamps_threads() {
        let input = block_input(1);
        let mut output = vec![0u8; 8];
        let scheduler = Scheduler::builder(SchedulerConfig::new(0))
            .input(&input)
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build()
            .unwrap();
        assert_eq!(scheduler.config().threads, 1);
        assert!(scheduler.config().threads_clamped());
    }

    #[test]
    fn test_build_ignores_partial_trailing_block() {
        let mut input = block_input(3);
        input.extend_from_slice(&[0u8; 10]);
        let mut output = vec![0u8; 24];
        let scheduler = Scheduler::builder(SchedulerConfig::new(2))
            .input(&input)
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build()
            .unwrap();
        assert_eq!(scheduler.total_blocks(), 3);
    }

    // =========================================================================
    // Runs
    // =========================================================================

    #[test]
    fn test_run_64x64_four_threads_job_size_8() {
        // 64×64 RGBA image => 256 blocks, 32 pulls of 8
        let input = block_input(256);
        let (output, report) = run_checksum(&input, 4, 8);

        assert_eq!(output.len(), 64 * 64 * 4 / 8);
        assert_eq!(report.total_blocks, 256);
        assert_eq!(report.pull_count(), 32);
        assert_eq!(report.workers_spawned, 4);
        assert!(report.pulls.iter().all(|p| p.block_count == 8));
        assert!(report.pulls.iter().all(|p| p.slot < 4));
        assert_eq!(report.blocks_per_worker().iter().sum::<usize>(), 256);
    }

    #[test]
    fn test_run_pulls_ascending_and_contiguous() {
        let input = block_input(100);
        let (_, report) = run_checksum(&input, 3, 7);

        let mut expected_offset = 0;
        for pull in &report.pulls {
            assert_eq!(pull.offset, expected_offset);
            expected_offset += pull.block_count;
        }
        assert_eq!(expected_offset, 100);
        // Last pull is clipped to the remainder
        assert_eq!(report.pulls.last().unwrap().block_count, 100 % 7);
    }

    #[test]
    fn test_run_output_matches_single_threaded() {
        let input = block_input(77);
        let (expected, _) = run_checksum(&input, 1, 77);

        for (threads, job_size) in [(2, 1), (4, 3), (DEFAULT_MAX_WORKER_THREADS, 1), (8, 64)] {
            let (output, _) = run_checksum(&input, threads, job_size);
            assert_eq!(
                output, expected,
                "threads={} job_size={} changed the output",
                threads, job_size
            );
        }
    }

    #[test]
    fn test_run_empty_input() {
        let input: Vec<u8> = Vec::new();
        let mut output: Vec<u8> = Vec::new();
        let report = Scheduler::builder(SchedulerConfig::new(4))
            .input(&input)
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build()
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(report.total_blocks, 0);
        assert_eq!(report.pull_count(), 0);
        assert_eq!(report.workers_spawned, 4);
        assert!(output.is_empty());
    }

    #[test]
    fn test_run_leaves_bytes_past_prefix_untouched() {
        let input = block_input(2);
        let mut output = vec![0xAAu8; 20];
        Scheduler::builder(SchedulerConfig::new(2).with_job_size(1))
            .input(&input)
            .encoder(&ChecksumEncoder)
            .output(&mut output)
            .build()
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(&output[16..], &[0xAA; 4]);
    }

    #[test]
    fn test_run_reports_panicking_worker() {
        let mut input = vec![0u8; 64 * 16];
        input[5 * 64] = 0xEE;
        let mut output = vec![0u8; 16 * 8];

        let result = Scheduler::builder(SchedulerConfig::new(2).with_job_size(4))
            .input(&input)
            .encoder(&PoisonEncoder)
            .output(&mut output)
            .build()
            .unwrap()
            .run();

        match result {
            Err(SchedulerError::WorkerPanicked {
                slots,
                lost_ranges,
                lost_blocks,
            }) => {
                assert_eq!(slots.len(), 1);
                assert_eq!(lost_ranges, vec![4..8]);
                assert_eq!(lost_blocks, 4);
            }
            other => panic!("Expected WorkerPanicked, got {:?}", other),
        }

        // The surviving worker finished every other range
        for block in (0..16).filter(|b| !(4..8).contains(b)) {
            assert_eq!(&output[block * 8..block * 8 + 8], &[1u8; 8]);
        }
    }

    #[test]
    fn test_run_cancelled() {
        let token = CancellationToken::new();
        let encoder = CancellingEncoder(token.clone());
        let input = block_input(10);
        let mut output = vec![0u8; 40];

        let result = Scheduler::builder(SchedulerConfig::new(1).with_job_size(1))
            .input(&input)
            .encoder(&encoder)
            .output(&mut output)
            .cancellation(token)
            .build()
            .unwrap()
            .run();

        assert!(matches!(
            result,
            Err(SchedulerError::Cancelled {
                completed_blocks: 1,
                total_blocks: 10
            })
        ));
        assert_eq!(&output[..4], &[9u8; 4]);
        assert_eq!(&output[4..], &[0u8; 36]);
    }

    #[test]
    fn test_scheduler_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Scheduler<'static>>();
    }
}
