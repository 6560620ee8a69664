//! Block cipher backends producing CTR keystream.
//!
//! The portable backend is always compiled. Targets with AES instructions
//! also get an accelerated backend, re-exported as `accel`, which is only
//! constructed after runtime CPU feature detection succeeds.

use crate::{counter::CounterBase, Block};
use cfg_if::cfg_if;
use inout::{InOut, InOutBuf};

cfg_if! {
    if #[cfg(aes_ctr_at_backend = "soft")] {
        pub(crate) mod soft;
    } else if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
        pub(crate) mod aesni;
        pub(crate) mod expand;
        pub(crate) mod soft;

        pub(crate) use self::aesni as accel;
    } else if #[cfg(target_arch = "aarch64")] {
        pub(crate) mod armv8;
        pub(crate) mod expand;
        pub(crate) mod soft;

        pub(crate) use self::armv8 as accel;
    } else {
        pub(crate) mod soft;
    }
}

/// AES encryption of counter blocks, one block or one batch at a time.
pub(crate) trait KeystreamBackend {
    /// Widest batch `apply_batch` accepts.
    const MAX_BATCH: usize;

    /// Encrypt a single block in place.
    fn encrypt_block(&self, block: &mut Block);

    /// XOR the keystream for blocks `block_index..block_index + blocks.len()`
    /// into `blocks`. Lane `i` uses counter block `block_index + i`.
    ///
    /// `blocks.len()` is at most `MAX_BATCH`.
    fn apply_batch(&self, ctr: &CounterBase, block_index: u64, blocks: InOutBuf<'_, '_, Block>);

    /// Keystream block for `block_index`.
    #[inline]
    fn keystream_block(&self, ctr: &CounterBase, block_index: u64) -> Block {
        let mut block = Block::from(ctr.block(block_index));
        self.encrypt_block(&mut block);
        block
    }
}

/// XOR one keystream block into `block`.
#[inline(always)]
pub(crate) fn xor_block(mut block: InOut<'_, '_, Block>, keystream: &Block) {
    let mut val = block.clone_in();
    for (a, b) in val.iter_mut().zip(keystream.iter()) {
        *a ^= *b;
    }
    *block.get_out() = val;
}

#[cfg(test)]
pub(crate) mod tests {
    //! Helpers for checking every backend against a plain software AES.
    use super::*;
    use crate::BLOCK_SIZE;

    pub(crate) const KEYS: [&[u8]; 3] = [
        &[0x11; 16],
        &[
            0x8e, 0x73, 0xb0, 0xf7, 0xda, 0x0e, 0x64, 0x52, 0xc8, 0x10, 0xf3, 0x2b, 0x80, 0x90,
            0x79, 0xe5, 0x62, 0xf8, 0xea, 0xd2, 0x52, 0x2c, 0x6b, 0x7b,
        ],
        &[0xA5; 32],
    ];

    pub(crate) const IVS: [[u8; 16]; 3] = [
        [0; 16],
        [0xFF; 16],
        [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xFF, 0xFB,
        ],
    ];

    /// Run one batch of `N` blocks through `backend` and return the output.
    pub(crate) fn run_batch<B: KeystreamBackend, const N: usize>(
        backend: &B,
        iv: &[u8; 16],
        block_index: u64,
        input: &[u8; 128],
    ) -> [u8; 128] {
        let ctr = CounterBase::new(iv);
        let mut out = *input;
        let len = N * BLOCK_SIZE;
        let buf = InOutBuf::from(&mut out[..len]);
        let (blocks, tail) = buf.into_chunks();
        assert!(tail.is_empty());
        backend.apply_batch(&ctr, block_index, blocks);
        out
    }

    /// Expected output of `run_batch::<_, 8>`, computed with [`reference_encrypt`].
    pub(crate) fn reference_batch(
        key: &[u8],
        iv: &[u8; 16],
        block_index: u64,
        input: &[u8; 128],
    ) -> [u8; 128] {
        let ctr = CounterBase::new(iv);
        let mut out = *input;
        for (i, chunk) in (0u64..).zip(out.chunks_exact_mut(BLOCK_SIZE)) {
            let keystream = reference_encrypt(key, &ctr.block(block_index.wrapping_add(i)));
            for (a, b) in chunk.iter_mut().zip(keystream) {
                *a ^= b;
            }
        }
        out
    }

    fn gf_mul(mut a: u8, mut b: u8) -> u8 {
        let mut p = 0;
        while b != 0 {
            if b & 1 != 0 {
                p ^= a;
            }
            let carry = a & 0x80;
            a <<= 1;
            if carry != 0 {
                a ^= 0x1b;
            }
            b >>= 1;
        }
        p
    }

    /// AES S-box, computed from the field inverse on every call.
    pub(crate) fn sbox(x: u8) -> u8 {
        // x^254 is the inverse of x, and maps 0 to 0
        let mut inv = 1;
        let mut base = x;
        let mut e = 254u8;
        while e != 0 {
            if e & 1 != 0 {
                inv = gf_mul(inv, base);
            }
            base = gf_mul(base, base);
            e >>= 1;
        }
        if x == 0 {
            inv = 0;
        }
        let rotated =
            inv.rotate_left(1) ^ inv.rotate_left(2) ^ inv.rotate_left(3) ^ inv.rotate_left(4);
        inv ^ rotated ^ 0x63
    }

    /// Straight FIPS-197 AES encryption of one block, independent of the
    /// `aes` crate and of the hardware.
    pub(crate) fn reference_encrypt(key: &[u8], block: &[u8; 16]) -> [u8; 16] {
        let nk = key.len() / 4;
        let rounds = nk + 6;

        let mut w = [[0u8; 4]; 60];
        for (word, chunk) in w.iter_mut().zip(key.chunks_exact(4)) {
            word.copy_from_slice(chunk);
        }
        let mut rcon = 1u8;
        for i in nk..4 * (rounds + 1) {
            let mut t = w[i - 1];
            if i % nk == 0 {
                t = [sbox(t[1]) ^ rcon, sbox(t[2]), sbox(t[3]), sbox(t[0])];
                rcon = gf_mul(rcon, 2);
            } else if nk > 6 && i % nk == 4 {
                t = t.map(sbox);
            }
            for j in 0..4 {
                w[i][j] = w[i - nk][j] ^ t[j];
            }
        }

        let add_round_key = |s: &mut [u8; 16], round: usize| {
            for c in 0..4 {
                for j in 0..4 {
                    s[4 * c + j] ^= w[4 * round + c][j];
                }
            }
        };

        let mut s = *block;
        add_round_key(&mut s, 0);
        for round in 1..=rounds {
            let old = s.map(sbox);
            for c in 0..4 {
                for row in 0..4 {
                    s[row + 4 * c] = old[row + 4 * ((c + row) % 4)];
                }
            }
            if round != rounds {
                for col in s.chunks_exact_mut(4) {
                    let [a, b, c, d] = [col[0], col[1], col[2], col[3]];
                    col[0] = gf_mul(a, 2) ^ gf_mul(b, 3) ^ c ^ d;
                    col[1] = a ^ gf_mul(b, 2) ^ gf_mul(c, 3) ^ d;
                    col[2] = a ^ b ^ gf_mul(c, 2) ^ gf_mul(d, 3);
                    col[3] = gf_mul(a, 3) ^ b ^ c ^ gf_mul(d, 2);
                }
            }
            add_round_key(&mut s, round);
        }
        s
    }

    #[test]
    fn sbox_spot_checks() {
        assert_eq!(sbox(0x00), 0x63);
        assert_eq!(sbox(0x01), 0x7c);
        assert_eq!(sbox(0x53), 0xed);
        assert_eq!(sbox(0xff), 0x16);
    }

    // FIPS-197 Appendix C
    #[test]
    fn reference_encrypt_fips197() {
        let plaintext = hex_literal::hex!("00112233445566778899aabbccddeeff");
        let key = hex_literal::hex!(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
        );
        assert_eq!(
            reference_encrypt(&key[..16], &plaintext),
            hex_literal::hex!("69c4e0d86a7b0430d8cdb78070b4c55a")
        );
        assert_eq!(
            reference_encrypt(&key[..24], &plaintext),
            hex_literal::hex!("dda97ca4864cdfe06eaf70a0ec0d7191")
        );
        assert_eq!(
            reference_encrypt(&key, &plaintext),
            hex_literal::hex!("8ea2b7ca516745bfeafc49904b496089")
        );
    }
}
