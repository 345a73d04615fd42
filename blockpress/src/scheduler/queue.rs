//! Shared block cursor and the pull protocol.
//!
//! All mutable scheduler state lives behind one mutex:
//!
//! ```text
//! ┌──────────────────────── QueueState ────────────────────────┐
//! │ next_block ──► 0 ─────────── 96 ───────────────────── 256  │
//! │                 [ claimed ]   [ unclaimed output tail    ] │
//! │ active_workers, slot assignments, pull log                 │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! A pull advances `next_block` and splits exactly the claimed range off the
//! front of the unclaimed output tail. The worker receives that slice by
//! value, so two workers can never hold overlapping mutable views of the
//! output buffer. Encoding happens outside the lock.

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::report::PullRecord;

/// Result of a pull.
pub(crate) enum Pull<'a> {
    /// Encode the assigned range.
    Work(Assignment<'a>),
    /// No more work for this worker.
    Quit,
}

/// A contiguous block range claimed by one worker.
pub(crate) struct Assignment<'a> {
    /// First block of the range.
    pub offset: usize,
    /// Blocks in the range.
    pub block_count: usize,
    /// Destination bytes for exactly these blocks.
    pub dst: &'a mut [u8],
}

/// Last range claimed by a worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SlotAssignment {
    pub offset: usize,
    pub block_count: usize,
}

/// State guarded by the queue mutex.
pub(crate) struct QueueState<'a> {
    /// Next unclaimed block.
    pub next_block: usize,
    /// Output bytes not yet handed to any worker.
    unclaimed: &'a mut [u8],
    /// Workers that have not exited yet.
    pub active_workers: usize,
    /// Most recent assignment per slot.
    pub slots: Vec<Option<SlotAssignment>>,
    /// Every assignment, in claim order.
    pub pulls: Vec<PullRecord>,
}

/// Work queue shared by all workers of one run.
pub(crate) struct BlockQueue<'a> {
    state: Mutex<QueueState<'a>>,
    finished: Condvar,
    total_blocks: usize,
    job_size: usize,
    block_bytes: usize,
    worker_slots: usize,
    cancel: Option<CancellationToken>,
}

impl<'a> BlockQueue<'a> {
    /// Creates a queue over `output`, which must hold exactly
    /// `total_blocks * block_bytes` bytes.
    pub fn new(
        output: &'a mut [u8],
        total_blocks: usize,
        job_size: usize,
        block_bytes: usize,
        worker_slots: usize,
        cancel: Option<CancellationToken>,
    ) -> Self {
        debug_assert_eq!(output.len(), total_blocks * block_bytes);

        Self {
            state: Mutex::new(QueueState {
                next_block: 0,
                unclaimed: output,
                active_workers: 0,
                slots: vec![None; worker_slots],
                pulls: Vec::new(),
            }),
            finished: Condvar::new(),
            total_blocks,
            job_size,
            block_bytes,
            worker_slots,
            cancel,
        }
    }

    /// Counts a worker as active. Called before it is spawned.
    pub fn register_worker(&self) {
        self.state.lock().active_workers += 1;
    }

    /// Reverts [`register_worker`](Self::register_worker) for a worker
    /// that failed to spawn.
    pub fn unregister_worker(&self) {
        self.worker_finished();
    }

    /// Claims the next range for `slot`.
    ///
    /// Ranges are handed out in strictly ascending order and never overlap.
    pub fn pull(&self, slot: usize) -> Pull<'a> {
        let mut state = self.state.lock();

        if slot >= self.worker_slots {
            warn!(slot, worker_slots = self.worker_slots, "Pull from unknown worker slot");
            return Pull::Quit;
        }

        if self.cancel.as_ref().is_some_and(|token| token.is_cancelled()) {
            return Pull::Quit;
        }

        if state.next_block >= self.total_blocks {
            return Pull::Quit;
        }

        let offset = state.next_block;
        let block_count = self.job_size.min(self.total_blocks - offset);

        let tail = std::mem::take(&mut state.unclaimed);
        let (dst, rest) = tail.split_at_mut(block_count * self.block_bytes);
        state.unclaimed = rest;

        state.next_block += block_count;
        state.slots[slot] = Some(SlotAssignment {
            offset,
            block_count,
        });
        state.pulls.push(PullRecord {
            slot,
            offset,
            block_count,
        });

        Pull::Work(Assignment {
            offset,
            block_count,
            dst,
        })
    }

    /// Marks one worker as exited and wakes the waiting owner.
    pub fn worker_finished(&self) {
        {
            let mut state = self.state.lock();
            state.active_workers -= 1;
        }
        self.finished.notify_one();
    }

    /// Blocks until every registered worker has exited.
    pub fn wait_for_workers(&self) {
        let mut state = self.state.lock();
        while state.active_workers > 0 {
            self.finished.wait(&mut state);
        }
    }

    /// Whether the run's cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }

    /// Consumes the queue, returning the final state.
    pub fn into_state(self) -> QueueState<'a> {
        self.state.into_inner()
    }
}

/// Drop guard that reports a worker's exit, including exits by panic.
pub(crate) struct WorkerExit<'q, 'a> {
    queue: &'q BlockQueue<'a>,
}

impl<'q, 'a> WorkerExit<'q, 'a> {
    pub fn new(queue: &'q BlockQueue<'a>) -> Self {
        Self { queue }
    }
}

impl Drop for WorkerExit<'_, '_> {
    fn drop(&mut self) {
        self.queue.worker_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_work(pull: Pull<'_>) -> (usize, usize, usize) {
        match pull {
            Pull::Work(a) => (a.offset, a.block_count, a.dst.len()),
            Pull::Quit => panic!("Expected work, got quit"),
        }
    }

    #[test]
    fn test_pull_ascending_and_clipped() {
        let mut output = vec![0u8; 10 * 8];
        let queue = BlockQueue::new(&mut output, 10, 4, 8, 2, None);

        assert_eq!(expect_work(queue.pull(0)), (0, 4, 32));
        assert_eq!(expect_work(queue.pull(1)), (4, 4, 32));
        // Only 2 blocks left
        assert_eq!(expect_work(queue.pull(0)), (8, 2, 16));
        assert!(matches!(queue.pull(1), Pull::Quit));
        assert!(matches!(queue.pull(0), Pull::Quit));

        let state = queue.into_state();
        assert_eq!(state.next_block, 10);
        assert_eq!(state.pulls.len(), 3);
        assert_eq!(
            state.slots[0],
            Some(SlotAssignment {
                offset: 8,
                block_count: 2
            })
        );
    }

    #[test]
    fn test_pull_slices_cover_output_in_order() {
        let mut output = vec![0u8; 6 * 4];
        let queue = BlockQueue::new(&mut output, 6, 4, 4, 1, None);

        if let Pull::Work(a) = queue.pull(0) {
            a.dst.fill(1);
        }
        if let Pull::Work(a) = queue.pull(0) {
            a.dst.fill(2);
        }
        drop(queue);

        assert_eq!(&output[..16], &[1u8; 16]);
        assert_eq!(&output[16..], &[2u8; 8]);
    }

    #[test]
    fn test_pull_empty_queue_quits() {
        let mut output: Vec<u8> = Vec::new();
        let queue = BlockQueue::new(&mut output, 0, 4, 16, 1, None);
        assert!(matches!(queue.pull(0), Pull::Quit));
    }

    #[test]
    fn test_pull_unknown_slot_quits() {
        let mut output = vec![0u8; 16];
        let queue = BlockQueue::new(&mut output, 1, 1, 16, 2, None);
        assert!(matches!(queue.pull(2), Pull::Quit));
        // The block is still available to a valid slot
        assert_eq!(expect_work(queue.pull(1)), (0, 1, 16));
    }

    #[test]
    fn test_pull_after_cancel_quits() {
        let token = CancellationToken::new();
        let mut output = vec![0u8; 64];
        let queue = BlockQueue::new(&mut output, 4, 1, 16, 1, Some(token.clone()));

        assert_eq!(expect_work(queue.pull(0)), (0, 1, 16));
        token.cancel();
        assert!(queue.is_cancelled());
        assert!(matches!(queue.pull(0), Pull::Quit));
        assert_eq!(queue.into_state().next_block, 1);
    }

    #[test]
    fn test_worker_exit_guard_decrements() {
        let mut output: Vec<u8> = Vec::new();
        let queue = BlockQueue::new(&mut output, 0, 1, 8, 2, None);
        queue.register_worker();
        queue.register_worker();
        {
            let _a = WorkerExit::new(&queue);
            let _b = WorkerExit::new(&queue);
        }
        // Returns immediately because both guards have dropped
        queue.wait_for_workers();
        assert_eq!(queue.into_state().active_workers, 0);
    }
}
