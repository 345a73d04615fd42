//! Worker loop run by every scheduler thread.

use tracing::trace;

use super::queue::{BlockQueue, Pull, WorkerExit};
use crate::codec::BlockEncoder;
use crate::format::UNCOMPRESSED_BLOCK_BYTES;

/// One worker slot of a scheduler run.
pub(crate) struct Worker<'q, 'a> {
    slot: usize,
    queue: &'q BlockQueue<'a>,
    input: &'a [u8],
    encoder: &'a dyn BlockEncoder,
}

impl<'q, 'a> Worker<'q, 'a> {
    pub fn new(
        slot: usize,
        queue: &'q BlockQueue<'a>,
        input: &'a [u8],
        encoder: &'a dyn BlockEncoder,
    ) -> Self {
        Self {
            slot,
            queue,
            input,
            encoder,
        }
    }

    /// Pulls and encodes ranges until the queue says quit.
    ///
    /// Returns the number of blocks this worker encoded. The queue is told
    /// about the exit even if the encoder panics.
    pub fn run(self) -> usize {
        let _exit = WorkerExit::new(self.queue);
        let mut encoded = 0;

        loop {
            let assignment = match self.queue.pull(self.slot) {
                Pull::Work(assignment) => assignment,
                Pull::Quit => break,
            };

            let start = assignment.offset * UNCOMPRESSED_BLOCK_BYTES;
            let end = start + assignment.block_count * UNCOMPRESSED_BLOCK_BYTES;

            trace!(
                slot = self.slot,
                offset = assignment.offset,
                blocks = assignment.block_count,
                "Encoding block range"
            );
            self.encoder
                .encode_blocks(&self.input[start..end], assignment.dst);
            encoded += assignment.block_count;
        }

        encoded
    }
}
