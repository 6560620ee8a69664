//! Portable backend: one counter block per call through the RustCrypto
//! `aes` block ciphers.
//!
//! The `aes` crate does its own runtime detection and uses AES-NI or the
//! ARMv8 AES instructions when present. Build with
//! `RUSTFLAGS='--cfg aes_force_soft'` to run its constant-time software
//! implementation instead.

use super::{xor_block, KeystreamBackend};
use crate::{counter::CounterBase, Block, Error, Result};
use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockEncrypt, KeyInit};
use inout::InOutBuf;

#[derive(Clone)]
pub(crate) enum Backend {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl Backend {
    pub(crate) fn new(key: &[u8]) -> Result<Self> {
        let backend = match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128),
            24 => Aes192::new_from_slice(key).map(Self::Aes192),
            32 => Aes256::new_from_slice(key).map(Self::Aes256),
            _ => return Err(Error::InvalidKeyLength),
        };
        backend.map_err(|_| Error::InvalidKeyLength)
    }
}

impl KeystreamBackend for Backend {
    const MAX_BATCH: usize = 1;

    #[inline]
    fn encrypt_block(&self, block: &mut Block) {
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes192(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    #[inline]
    fn apply_batch(
        &self,
        ctr: &CounterBase,
        block_index: u64,
        mut blocks: InOutBuf<'_, '_, Block>,
    ) {
        for (i, lane) in (0..blocks.len()).zip(0u64..) {
            let keystream = self.keystream_block(ctr, block_index.wrapping_add(lane));
            xor_block(blocks.get(i), &keystream);
        }
    }
}
