//! AES-NI backend for x86 and x86-64.
//!
//! Encrypts up to 8 counter blocks per call. Each round key is loaded once
//! and applied to every lane before moving on, so the `aesenc` latency of
//! one lane is hidden behind the others.

use super::{expand::RoundKeys, KeystreamBackend};
use crate::{counter::CounterBase, Block, KeySize};
use inout::InOutBuf;

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

cpufeatures::new!(aes_intrinsics, "aes", "sse2");

/// Whether this CPU supports the instructions used by [`Backend`].
pub(crate) fn is_available() -> bool {
    aes_intrinsics::get()
}

#[derive(Clone)]
pub(crate) struct Backend {
    keys: RoundKeys,
    token: aes_intrinsics::InitToken,
}

impl Backend {
    /// Returns `None` if the CPU lacks AES-NI.
    pub(crate) fn new(key: &[u8], size: KeySize) -> Option<Self> {
        let (token, present) = aes_intrinsics::init_get();
        if !present {
            return None;
        }
        let keys = RoundKeys::new(key, size, |w| {
            // SAFETY: `aes_intrinsics` reported support for `aes` and `sse2`.
            unsafe { sub_word(w) }
        });
        Some(Self { keys, token })
    }
}

impl KeystreamBackend for Backend {
    const MAX_BATCH: usize = 8;

    #[inline]
    fn encrypt_block(&self, block: &mut Block) {
        debug_assert!(self.token.get());
        // SAFETY: `Backend` is only constructed after `aes_intrinsics`
        // reported support for the `aes` and `sse2` target features.
        unsafe {
            let state = _mm_loadu_si128(block.as_ptr().cast());
            let state = encrypt1(&self.keys, state);
            _mm_storeu_si128(block.as_mut_ptr().cast(), state);
        }
    }

    #[inline]
    fn apply_batch(
        &self,
        ctr: &CounterBase,
        block_index: u64,
        blocks: InOutBuf<'_, '_, Block>,
    ) {
        debug_assert!(self.token.get());
        // SAFETY: `Backend` is only constructed after `aes_intrinsics`
        // reported support for the `aes` and `sse2` target features.
        unsafe {
            match blocks.len() {
                8 => ctr_blocks::<8>(&self.keys, ctr, block_index, blocks),
                4 => ctr_blocks::<4>(&self.keys, ctr, block_index, blocks),
                2 => ctr_blocks::<2>(&self.keys, ctr, block_index, blocks),
                n => {
                    let mut rest = blocks;
                    for lane in (0u64..).take(n) {
                        let (one, tail) = rest.split_at(1);
                        let index = block_index.wrapping_add(lane);
                        ctr_blocks::<1>(&self.keys, ctr, index, one);
                        rest = tail;
                    }
                }
            }
        }
    }
}

/// S-box applied to each byte of a key word.
///
/// `AESKEYGENASSIST` returns `SubWord` of its second dword in the first one.
#[inline]
#[target_feature(enable = "aes,sse2")]
unsafe fn sub_word(w: u32) -> u32 {
    let v = _mm_set_epi32(0, 0, i32::from_ne_bytes(w.to_ne_bytes()), 0);
    let r = _mm_aeskeygenassist_si128(v, 0x00);
    u32::from_ne_bytes(_mm_cvtsi128_si32(r).to_ne_bytes())
}

#[inline]
#[target_feature(enable = "aes,sse2")]
unsafe fn load_keys(keys: &RoundKeys) -> [__m128i; 15] {
    let mut rk = [_mm_setzero_si128(); 15];
    for (dst, src) in rk.iter_mut().zip(keys.as_slice()) {
        *dst = _mm_loadu_si128(src.as_ptr().cast());
    }
    rk
}

#[inline]
#[target_feature(enable = "aes,sse2")]
unsafe fn encrypt1(keys: &RoundKeys, block: __m128i) -> __m128i {
    let rounds = keys.rounds();
    let rk = load_keys(keys);
    let mut state = _mm_xor_si128(block, rk[0]);
    for k in &rk[1..rounds] {
        state = _mm_aesenc_si128(state, *k);
    }
    _mm_aesenclast_si128(state, rk[rounds])
}

/// Encrypt `N` consecutive counter blocks and XOR them into `blocks`.
#[inline]
#[target_feature(enable = "aes,sse2")]
unsafe fn ctr_blocks<const N: usize>(
    keys: &RoundKeys,
    ctr: &CounterBase,
    block_index: u64,
    mut blocks: InOutBuf<'_, '_, Block>,
) {
    debug_assert_eq!(blocks.len(), N);
    let rounds = keys.rounds();
    let rk = load_keys(keys);

    let mut state = [_mm_setzero_si128(); N];
    for (lane, i) in state.iter_mut().zip(0u64..) {
        let counter = ctr.block(block_index.wrapping_add(i));
        *lane = _mm_xor_si128(_mm_loadu_si128(counter.as_ptr().cast()), rk[0]);
    }

    for k in &rk[1..rounds] {
        for lane in state.iter_mut() {
            *lane = _mm_aesenc_si128(*lane, *k);
        }
    }

    for (i, lane) in state.iter().enumerate() {
        let keystream = _mm_aesenclast_si128(*lane, rk[rounds]);
        let mut block = blocks.get(i);
        let input = _mm_loadu_si128(block.get_in().as_ptr().cast());
        _mm_storeu_si128(
            block.get_out().as_mut_ptr().cast(),
            _mm_xor_si128(input, keystream),
        );
    }
}
