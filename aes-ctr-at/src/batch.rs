//! Greedy batching of whole keystream blocks.

use crate::{backends::KeystreamBackend, counter::CounterBase, Block};
use inout::InOutBuf;

/// Batch widths understood by the backends, widest first.
pub const BATCH_WIDTHS: [usize; 4] = [8, 4, 2, 1];

/// Sequence of batch widths used to process a run of whole blocks.
///
/// The widest width supported by the backend is repeated while enough
/// blocks remain; the remainder is then covered by strictly decreasing
/// widths, each used at most once.
///
/// ```
/// use aes_ctr_at::batch_plan;
///
/// assert!(batch_plan(27, 8).eq([8, 8, 8, 2, 1]));
/// assert!(batch_plan(3, 1).eq([1, 1, 1]));
/// ```
#[derive(Clone, Debug)]
pub struct BatchPlan {
    remaining: usize,
    widest: usize,
}

/// Plan batches for `blocks` whole blocks on a backend handling up to
/// `max_width` blocks per call.
#[must_use]
pub fn batch_plan(blocks: usize, max_width: usize) -> BatchPlan {
    let widest = BATCH_WIDTHS
        .iter()
        .copied()
        .find(|&w| w <= max_width)
        .unwrap_or(1);
    BatchPlan {
        remaining: blocks,
        widest,
    }
}

impl Iterator for BatchPlan {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let width = if self.remaining >= self.widest {
            self.widest
        } else {
            // remainder is below `widest`, so every smaller width fires at most once
            BATCH_WIDTHS.iter().copied().find(|&w| w <= self.remaining)?
        };
        self.remaining -= width;
        Some(width)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let full = self.remaining / self.widest;
        let rem = self.remaining % self.widest;
        let partial = BATCH_WIDTHS.iter().filter(|&&w| rem & w != 0).count();
        (full + partial, Some(full + partial))
    }
}

impl ExactSizeIterator for BatchPlan {}

/// Encrypt the counter blocks for a run of whole blocks starting at
/// `block_index` and XOR them into `blocks`.
pub(crate) fn dispatch<B: KeystreamBackend>(
    backend: &B,
    ctr: &CounterBase,
    mut block_index: u64,
    mut blocks: InOutBuf<'_, '_, Block>,
) {
    for width in batch_plan(blocks.len(), B::MAX_BATCH) {
        let (batch, rest) = blocks.split_at(width);
        backend.apply_batch(ctr, block_index, batch);
        block_index = block_index.wrapping_add(width as u64);
        blocks = rest;
    }
}
