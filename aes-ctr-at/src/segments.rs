//! Splitting of a keystream byte range into block-aligned segments, and the
//! XOR driver walking those segments.

use crate::{backends::KeystreamBackend, batch, counter::CounterBase, BLOCK_SIZE};
use cipher::consts::U16;
use inout::InOutBuf;

/// Decomposition of the keystream range `[offset, offset + len)`.
///
/// The range splits into a leading partial block (`head` bytes), a run of
/// `blocks` whole blocks and a trailing partial block (`tail` bytes), with
/// `head + 16 * blocks + tail == len`. Storage layers can use it to align
/// reads to cipher blocks.
///
/// ```
/// use aes_ctr_at::Segments;
///
/// let seg = Segments::new(20, 50);
/// assert_eq!(seg.first_block, 1);
/// assert_eq!(seg.skip, 4);
/// assert_eq!((seg.head, seg.blocks, seg.tail), (12, 2, 6));
/// assert_eq!(seg.len(), 50);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Segments {
    /// Index of the block containing `offset`.
    pub first_block: u64,
    /// Position of `offset` inside its block.
    pub skip: usize,
    /// Bytes taken from the end of the first, partially covered block.
    pub head: usize,
    /// Number of whole blocks after the head.
    pub blocks: usize,
    /// Bytes taken from the start of the last, partially covered block.
    pub tail: usize,
}

impl Segments {
    /// Split `len` bytes starting at keystream position `offset`.
    #[must_use]
    pub fn new(offset: u64, len: usize) -> Self {
        let bs = BLOCK_SIZE as u64;
        #[allow(clippy::cast_possible_truncation, reason = "remainder is below 16")]
        let skip = (offset % bs) as usize;
        let head = ((BLOCK_SIZE - skip) % BLOCK_SIZE).min(len);
        let rest = len - head;

        Self {
            first_block: offset / bs,
            skip,
            head,
            blocks: rest / BLOCK_SIZE,
            tail: rest % BLOCK_SIZE,
        }
    }

    /// Total number of bytes covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.head + self.blocks * BLOCK_SIZE + self.tail
    }

    /// Returns `true` if the range covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// XOR `keystream` into `buf`, stopping at the shorter of the two.
#[inline]
pub(crate) fn xor_keystream(mut buf: InOutBuf<'_, '_, u8>, keystream: &[u8]) {
    let n = buf.len().min(keystream.len());
    for (i, k) in keystream[..n].iter().enumerate() {
        let mut byte = buf.get(i);
        let val = *byte.get_in() ^ k;
        *byte.get_out() = val;
    }
}

/// Apply the keystream starting at byte position `offset` to `buf`.
///
/// Walks the head, the batched whole blocks and the tail in order. Every
/// keystream block is derived from its own index, so the result does not
/// depend on how a range is split across calls.
pub(crate) fn xor_keystream_at<B: KeystreamBackend>(
    backend: &B,
    ctr: &CounterBase,
    offset: u64,
    buf: InOutBuf<'_, '_, u8>,
) {
    let seg = Segments::new(offset, buf.len());
    let mut block_index = seg.first_block;

    let (head, rest) = buf.split_at(seg.head);
    if seg.head != 0 {
        let keystream = backend.keystream_block(ctr, block_index);
        xor_keystream(head, &keystream[seg.skip..]);
        block_index = block_index.wrapping_add(1);
    }

    let (blocks, tail) = rest.into_chunks::<U16>();
    debug_assert_eq!(blocks.len(), seg.blocks);
    batch::dispatch(backend, ctr, block_index, blocks);
    block_index = block_index.wrapping_add(seg.blocks as u64);

    if seg.tail != 0 {
        let keystream = backend.keystream_block(ctr, block_index);
        xor_keystream(tail, &keystream);
    }
}
