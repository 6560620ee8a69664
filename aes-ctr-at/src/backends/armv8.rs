//! ARMv8 Crypto Extensions backend.
//!
//! `AESE` folds the round key addition into SubBytes/ShiftRows, so the key
//! schedule is consumed one round earlier than with AES-NI and the last
//! round key is applied with a plain XOR.

use super::{expand::RoundKeys, KeystreamBackend};
use crate::{counter::CounterBase, Block, KeySize};
use core::arch::aarch64::*;
use inout::InOutBuf;

cpufeatures::new!(aes_intrinsics, "aes");

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
    /// Returns `None` if the CPU lacks the AES extension.
    pub(crate) fn new(key: &[u8], size: KeySize) -> Option<Self> {
        let (token, present) = aes_intrinsics::init_get();
        if !present {
            return None;
        }
        let keys = RoundKeys::new(key, size, |w| {
            // SAFETY: `aes_intrinsics` reported support for `aes`.
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
        // reported support for the `aes` target feature.
        unsafe {
            let state = vld1q_u8(block.as_ptr());
            vst1q_u8(block.as_mut_ptr(), encrypt1(&self.keys, state));
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
        // reported support for the `aes` target feature.
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
/// With four identical columns ShiftRows is a no-op, and a zero round key
/// leaves `AESE` as plain SubBytes.
#[inline]
#[target_feature(enable = "aes")]
unsafe fn sub_word(w: u32) -> u32 {
    let state = vaeseq_u8(vreinterpretq_u8_u32(vdupq_n_u32(w)), vdupq_n_u8(0));
    vgetq_lane_u32::<0>(vreinterpretq_u32_u8(state))
}

#[inline]
#[target_feature(enable = "aes")]
unsafe fn load_keys(keys: &RoundKeys) -> [uint8x16_t; 15] {
    let mut rk = [vdupq_n_u8(0); 15];
    for (dst, src) in rk.iter_mut().zip(keys.as_slice()) {
        *dst = vld1q_u8(src.as_ptr());
    }
    rk
}

#[inline]
#[target_feature(enable = "aes")]
unsafe fn encrypt1(keys: &RoundKeys, mut state: uint8x16_t) -> uint8x16_t {
    let rounds = keys.rounds();
    let rk = load_keys(keys);
    for k in &rk[..rounds - 1] {
        state = vaesmcq_u8(vaeseq_u8(state, *k));
    }
    veorq_u8(vaeseq_u8(state, rk[rounds - 1]), rk[rounds])
}

/// Encrypt `N` consecutive counter blocks and XOR them into `blocks`.
#[inline]
#[target_feature(enable = "aes")]
unsafe fn ctr_blocks<const N: usize>(
    keys: &RoundKeys,
    ctr: &CounterBase,
    block_index: u64,
    mut blocks: InOutBuf<'_, '_, Block>,
) {
    debug_assert_eq!(blocks.len(), N);
    let rounds = keys.rounds();
    let rk = load_keys(keys);

    let mut state = [vdupq_n_u8(0); N];
    for (lane, i) in state.iter_mut().zip(0u64..) {
        let counter = ctr.block(block_index.wrapping_add(i));
        *lane = vld1q_u8(counter.as_ptr());
    }

    for k in &rk[..rounds - 1] {
        for lane in state.iter_mut() {
            *lane = vaesmcq_u8(vaeseq_u8(*lane, *k));
        }
    }

    for (i, lane) in state.iter().enumerate() {
        let keystream = veorq_u8(vaeseq_u8(*lane, rk[rounds - 1]), rk[rounds]);
        let mut block = blocks.get(i);
        let input = vld1q_u8(block.get_in().as_ptr());
        vst1q_u8(block.get_out().as_mut_ptr(), veorq_u8(input, keystream));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backends::{
            expand,
            tests::{reference_batch, reference_encrypt, run_batch, IVS, KEYS},
        },
        BLOCK_SIZE,
    };

    #[test]
    fn key_schedule_fips197() {
        if !is_available() {
            return;
        }
        expand::tests::check_fips197(|w| {
            // SAFETY: AES extension availability checked above.
            unsafe { sub_word(w) }
        });
    }

    #[test]
    fn sub_word_matches_sbox() {
        if !is_available() {
            return;
        }
        for b in 0..=255u8 {
            let w = u32::from_le_bytes([b, b.wrapping_add(1), b ^ 0x5a, !b]);
            // SAFETY: AES extension availability checked above.
            let hw = unsafe { sub_word(w) };
            assert_eq!(hw, expand::tests::sub_word(w), "w={w:08x}");
        }
    }

    #[test]
    fn every_width_matches_software_aes() {
        let mut input = [0u8; 128];
        for (b, v) in input.iter_mut().zip(0u8..) {
            *b = v ^ 0xC3;
        }

        for key in KEYS {
            let size = KeySize::from_len(key.len()).unwrap();
            let Some(accel) = Backend::new(key, size) else {
                return;
            };
            for iv in IVS {
                for index in [0, 5, u64::MAX - 3] {
                    let expected = reference_batch(key, &iv, index, &input);
                    let run = |n: usize| match n {
                        1 => run_batch::<_, 1>(&accel, &iv, index, &input),
                        2 => run_batch::<_, 2>(&accel, &iv, index, &input),
                        3 => run_batch::<_, 3>(&accel, &iv, index, &input),
                        4 => run_batch::<_, 4>(&accel, &iv, index, &input),
                        _ => run_batch::<_, 8>(&accel, &iv, index, &input),
                    };
                    for n in [1, 2, 3, 4, 8] {
                        let len = n * BLOCK_SIZE;
                        assert_eq!(run(n)[..len], expected[..len], "width={n} index={index}");
                    }

                    let ctr = CounterBase::new(&iv);
                    let block = reference_encrypt(key, &ctr.block(index));
                    assert_eq!(accel.keystream_block(&ctr, index)[..], block[..]);
                }
            }
        }
    }
}
