//! Counter block arithmetic.
//!
//! The counter block for block index `i` is the IV read as a 128-bit big
//! endian integer plus `i`. It is computed from two 64-bit halves so that
//! any block index can be addressed directly, with the carry out of the low
//! half added to the high half.

use crate::{Iv, IV_SIZE};

/// IV split into its big endian 64-bit halves.
///
/// Loaded once per call and shared by every segment and batch lane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct CounterBase {
    high: u64,
    low: u64,
}

impl CounterBase {
    #[inline]
    pub(crate) fn new(iv: &Iv) -> Self {
        let (high, low) = iv.split_at(IV_SIZE / 2);
        Self {
            high: u64::from_be_bytes(to_half(high)),
            low: u64::from_be_bytes(to_half(low)),
        }
    }

    /// Counter block for the given block index.
    #[inline(always)]
    pub(crate) fn block(&self, block_index: u64) -> Iv {
        let low = self.low.wrapping_add(block_index);
        let high = if low < self.low {
            // carry into the high half; wraps past 2^128 like a u128 counter
            self.high.wrapping_add(1)
        } else {
            self.high
        };

        let mut block = [0u8; IV_SIZE];
        block[..8].copy_from_slice(&high.to_be_bytes());
        block[8..].copy_from_slice(&low.to_be_bytes());
        block
    }
}

#[inline(always)]
fn to_half(bytes: &[u8]) -> [u8; 8] {
    let mut half = [0u8; 8];
    half.copy_from_slice(bytes);
    half
}

/// Compute the counter block fed to AES for `block_index` under `iv`.
///
/// This is `iv + block_index` with both sides read as 128-bit big endian
/// integers. Overflow of the low 64 bits carries into the high 64 bits; an
/// overflow of the full 128-bit value wraps around to zero.
///
/// ```
/// use aes_ctr_at::counter_block;
/// use hex_literal::hex;
///
/// let iv = hex!("00000000000000 01 FFFFFFFFFFFFFFFF");
/// assert_eq!(counter_block(&iv, 1), hex!("0000000000000002 0000000000000000"));
/// ```
#[must_use]
pub fn counter_block(iv: &Iv, block_index: u64) -> Iv {
    CounterBase::new(iv).block(block_index)
}
