//! Scheduler configuration and clamping.

use serde::Serialize;
use tracing::warn;

use super::SchedulerError;

/// Default upper bound on worker threads per run.
pub const DEFAULT_MAX_WORKER_THREADS: usize = 16;

/// Default number of blocks a worker claims per pull.
pub const DEFAULT_JOB_SIZE: usize = 32;

/// Requested scheduler settings, before clamping.
///
/// # Example
///
/// ```
/// use blockpress::scheduler::SchedulerConfig;
///
/// let config = SchedulerConfig::new(64).with_job_size(0);
/// let resolved = config.resolve().unwrap();
///
/// assert_eq!(resolved.threads, 16);
/// assert_eq!(resolved.job_size, 1);
/// assert!(resolved.threads_clamped());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Worker threads to spawn. Clamped into `[1, max_threads]`.
    pub threads: usize,

    /// Blocks claimed per pull. Clamped to at least 1.
    pub job_size: usize,

    /// Upper bound for `threads`. Must be non-zero.
    pub max_threads: usize,
}

/// One thread per CPU, capped at `max_threads` (and at least 1).
pub fn available_threads(max_threads: usize) -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(max_threads)
        .max(1)
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: available_threads(DEFAULT_MAX_WORKER_THREADS),
            job_size: DEFAULT_JOB_SIZE,
            max_threads: DEFAULT_MAX_WORKER_THREADS,
        }
    }
}

impl SchedulerConfig {
    /// Create a config with the given thread count and default job size.
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            ..Default::default()
        }
    }

    /// Set the number of blocks claimed per pull.
    pub fn with_job_size(mut self, job_size: usize) -> Self {
        self.job_size = job_size;
        self
    }

    /// Set the upper bound on worker threads.
    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Clamp the requested values into their valid ranges.
    ///
    /// Clamping is not an error; it is logged and recorded on the returned
    /// [`ResolvedConfig`]. A zero `max_threads` cannot be clamped into
    /// anything meaningful and is rejected.
    pub fn resolve(&self) -> Result<ResolvedConfig, SchedulerError> {
        if self.max_threads == 0 {
            return Err(SchedulerError::InvalidConfig(
                "max_threads must be at least 1".to_string(),
            ));
        }

        let resolved = ResolvedConfig {
            threads: self.threads.clamp(1, self.max_threads),
            job_size: self.job_size.max(1),
            requested_threads: self.threads,
            requested_job_size: self.job_size,
        };

        if resolved.threads_clamped() {
            warn!(
                requested = self.threads,
                threads = resolved.threads,
                max_threads = self.max_threads,
                "Worker thread count clamped"
            );
        }
        if resolved.job_size_clamped() {
            warn!(
                requested = self.job_size,
                job_size = resolved.job_size,
                "Job size clamped"
            );
        }

        Ok(resolved)
    }
}

/// Scheduler settings after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    /// Worker threads that will be spawned.
    pub threads: usize,
    /// Blocks claimed per pull.
    pub job_size: usize,
    /// Thread count as requested.
    pub requested_threads: usize,
    /// Job size as requested.
    pub requested_job_size: usize,
}

impl ResolvedConfig {
    /// Whether the thread count differs from the request.
    pub fn threads_clamped(&self) -> bool {
        self.threads != self.requested_threads
    }

    /// Whether the job size differs from the request.
    pub fn job_size_clamped(&self) -> bool {
        self.job_size != self.requested_job_size
    }
}
