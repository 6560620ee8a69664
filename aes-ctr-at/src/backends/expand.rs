//! AES key expansion (FIPS-197 §5.2) for the accelerated backends.
//!
//! Round keys are kept in the byte order of the AES state, which is the
//! layout both AES-NI and the ARMv8 Crypto Extensions load directly.
//! SubWord is supplied by the backend so that it runs on the AES unit
//! rather than through a lookup table indexed by key bytes.

use crate::{KeySize, BLOCK_SIZE};

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// Round count of AES-256, the largest schedule.
pub(crate) const MAX_ROUNDS: usize = 14;

const RCON: [u8; 10] = [0x01, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x80, 0x1b, 0x36];

/// Expanded encryption key schedule.
#[derive(Clone)]
pub(crate) struct RoundKeys {
    keys: [[u8; BLOCK_SIZE]; MAX_ROUNDS + 1],
    rounds: usize,
}

impl RoundKeys {
    /// Expand `key`, whose length must match `size`.
    ///
    /// Key words are little endian `u32`s of the key bytes; `sub_word`
    /// applies the S-box to each byte of such a word.
    pub(crate) fn new(key: &[u8], size: KeySize, sub_word: impl Fn(u32) -> u32) -> Self {
        debug_assert_eq!(key.len(), size.key_len());
        let nk = size.key_len() / 4;
        let rounds = size.rounds();
        let total = 4 * (rounds + 1);

        let mut w = [0u32; 4 * (MAX_ROUNDS + 1)];
        for (word, chunk) in w.iter_mut().zip(key.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        for i in nk..total {
            let mut temp = w[i - 1];
            if i % nk == 0 {
                temp = sub_word(temp.rotate_right(8)) ^ u32::from(RCON[i / nk - 1]);
            } else if nk > 6 && i % nk == 4 {
                temp = sub_word(temp);
            }
            w[i] = w[i - nk] ^ temp;
        }

        let mut keys = [[0u8; BLOCK_SIZE]; MAX_ROUNDS + 1];
        for (key, words) in keys.iter_mut().zip(w[..total].chunks_exact(4)) {
            for (dst, word) in key.chunks_exact_mut(4).zip(words) {
                dst.copy_from_slice(&word.to_le_bytes());
            }
        }

        #[cfg(feature = "zeroize")]
        w.zeroize();

        Self { keys, rounds }
    }

    #[inline(always)]
    pub(crate) fn rounds(&self) -> usize {
        self.rounds
    }

    /// Round keys `0..=rounds`.
    #[inline(always)]
    pub(crate) fn as_slice(&self) -> &[[u8; BLOCK_SIZE]] {
        &self.keys[..=self.rounds]
    }
}

#[cfg(feature = "zeroize")]
impl Drop for RoundKeys {
    fn drop(&mut self) {
        self.keys.zeroize();
    }
}
