//! Integration tests for the block-parallel scheduler.
//!
//! These tests drive `Scheduler` through its public API only:
//! - pull ranges partition the block range for any thread count/job size
//! - output is byte-identical regardless of how the work was split
//! - the built-in encoders give the same result single- and multi-threaded
//!
//! Run with: `cargo test --test scheduler_integration`

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use blockpress::codec::{encoder_for, BlockEncoder, EncodeOptions};
use blockpress::layout::to_blocks;
use blockpress::scheduler::{RunReport, Scheduler, SchedulerConfig, DEFAULT_MAX_WORKER_THREADS};
use blockpress::CompressionFormat;

// ============================================================================
// Helper Functions
// ============================================================================

/// Deterministic encoder: per-block byte sum plus a rolling xor.
struct DigestEncoder;

impl BlockEncoder for DigestEncoder {
    fn block_bytes(&self) -> usize {
        8
    }

    fn encode_blocks(&self, src: &[u8], dst: &mut [u8]) {
        for (block, out) in src.chunks_exact(64).zip(dst.chunks_exact_mut(8)) {
            let sum: u32 = block.iter().map(|&b| b as u32).sum();
            let xor = block
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &b)| acc ^ ((b as u32) << (i % 24)));
            out[..4].copy_from_slice(&sum.to_le_bytes());
            out[4..].copy_from_slice(&xor.to_le_bytes());
        }
    }

    fn name(&self) -> &str {
        "digest"
    }
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

fn run(
    input: &[u8],
    encoder: &dyn BlockEncoder,
    threads: usize,
    job_size: usize,
) -> (Vec<u8>, RunReport) {
    let mut output = vec![0u8; input.len() / 64 * encoder.block_bytes()];
    let report = Scheduler::builder(SchedulerConfig::new(threads).with_job_size(job_size))
        .input(input)
        .encoder(encoder)
        .output(&mut output)
        .build()
        .expect("valid scheduler configuration")
        .run()
        .expect("run succeeds");
    (output, report)
}

// ============================================================================
// Partition properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_pulls_partition_all_blocks(
        total_blocks in 0usize..300,
        threads in 1usize..=DEFAULT_MAX_WORKER_THREADS,
        job_size in 1usize..64,
    ) {
        let input = vec![0u8; total_blocks * 64];
        let (_, report) = run(&input, &DigestEncoder, threads, job_size);

        // Claimed in ascending order, back to back, covering [0, total)
        let mut next = 0;
        for pull in &report.pulls {
            prop_assert_eq!(pull.offset, next);
            prop_assert!(pull.block_count >= 1 && pull.block_count <= job_size);
            prop_assert!(pull.slot < threads);
            next += pull.block_count;
        }
        prop_assert_eq!(next, total_blocks);
        prop_assert_eq!(report.blocks_claimed(), total_blocks);
        prop_assert_eq!(report.pull_count(), total_blocks.div_ceil(job_size));
    }

    #[test]
    fn test_output_independent_of_split(
        total_blocks in 1usize..200,
        threads in 1usize..=8,
        job_size in 1usize..40,
        seed in any::<u64>(),
    ) {
        let input = random_bytes(total_blocks * 64, seed);
        let (expected, _) = run(&input, &DigestEncoder, 1, total_blocks);
        let (output, _) = run(&input, &DigestEncoder, threads, job_size);
        prop_assert_eq!(output, expected);
    }
}

// ============================================================================
// Determinism with the built-in encoders
// ============================================================================

#[test]
fn test_builtin_encoders_deterministic_across_thread_counts() {
    let (width, height) = (64u32, 32u32);
    let pixels = random_bytes((width * height * 4) as usize, 0xB10C);
    let options = EncodeOptions::default();

    for format in CompressionFormat::ALL {
        let blocks = to_blocks(&pixels, width, height, format.block_order()).unwrap();
        let encoder = encoder_for(format, &options);
        let total_blocks = blocks.len() / 64;

        let (reference, _) = run(&blocks, &*encoder, 1, total_blocks);
        for (threads, job_size) in [(2, 1), (DEFAULT_MAX_WORKER_THREADS, 1), (4, total_blocks)] {
            let (output, _) = run(&blocks, &*encoder, threads, job_size);
            assert!(
                output == reference,
                "{} output changed with threads={} job_size={}",
                format,
                threads,
                job_size
            );
        }
    }
}

#[test]
fn test_scenario_64x64_dxt1() {
    let pixels = random_bytes(64 * 64 * 4, 7);
    let blocks = to_blocks(&pixels, 64, 64, CompressionFormat::Dxt1.block_order()).unwrap();
    let encoder = encoder_for(CompressionFormat::Dxt1, &EncodeOptions::default());

    let (output, report) = run(&blocks, &*encoder, 4, 8);

    assert_eq!(report.total_blocks, 256);
    assert_eq!(report.pull_count(), 32);
    assert_eq!(output.len(), 64 * 64 * 4 / 8);
    assert_eq!(report.blocks_per_worker().iter().sum::<usize>(), 256);
}

#[test]
fn test_thread_count_above_max_is_clamped() {
    let input = vec![1u8; 64 * 40];
    let (_, report) = run(&input, &DigestEncoder, 1000, 1);

    assert_eq!(report.config.threads, DEFAULT_MAX_WORKER_THREADS);
    assert_eq!(report.config.requested_threads, 1000);
    assert!(report.config.threads_clamped());
    assert!(report.workers_spawned <= DEFAULT_MAX_WORKER_THREADS);
}
