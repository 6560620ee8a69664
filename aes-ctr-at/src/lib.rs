//! Random-access [AES-CTR]: apply the keystream of AES-128, AES-192 or
//! AES-256 in counter mode to any byte range, addressed by its absolute
//! position in the stream.
//!
//! There is no stream object to seek. Every call names the IV and the byte
//! offset it starts at, and the result is identical to encrypting the whole
//! stream from the beginning and slicing out that range. A large file can be
//! encrypted in independently processed chunks, in any order and on any
//! number of threads.
//!
//! # ⚠️ Security Warning: Hazmat!
//!
//! This crate does not ensure ciphertexts are authentic! Thus ciphertext integrity
//! is not verified, which can lead to serious vulnerabilities!
//!
//! Reusing an IV under the same key leaks the XOR of the plaintexts.
//!
//! USE AT YOUR OWN RISK!
//!
//! # Example
//! ```
//! use aes_ctr_at::AesCtrAt;
//! use hex_literal::hex;
//!
//! // NIST SP 800-38A, F.5.1
//! let key = hex!("2b7e151628aed2a6abf7158809cf4f3c");
//! let iv = hex!("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
//! let plaintext = hex!(
//!     "6bc1bee22e409f96e93d7e117393172a"
//!     "ae2d8a571e03ac9c9eb76fac45af8e51"
//! );
//! let ciphertext = hex!(
//!     "874d6191b620e3261bef6864990db6ce"
//!     "9806f66b7970fdff8617187bb9fffdff"
//! );
//!
//! let cipher = AesCtrAt::new(&key)?;
//!
//! let mut buf = plaintext;
//! cipher.apply_keystream_at(&iv, 0, &mut buf)?;
//! assert_eq!(buf, ciphertext);
//!
//! // decrypt bytes 20..29 alone
//! let mut part = [0u8; 9];
//! cipher.apply_keystream_at_b2b(&iv, 20, &ciphertext[20..29], &mut part)?;
//! assert_eq!(part, plaintext[20..29]);
//! # Ok::<(), aes_ctr_at::Error>(())
//! ```
//!
//! # Backends
//!
//! On x86/x86-64 the AES-NI backend and on aarch64 the ARMv8 Crypto
//! Extensions backend are selected at runtime when the CPU supports them.
//! Both encrypt up to 8 counter blocks per call. Everywhere else, or when
//! built with `--cfg aes_ctr_at_backend="soft"`, the portable backend built
//! on the [`aes`] crate is used. All backends produce identical output.
//!
//! The portable backend is not necessarily free of AES instructions: the
//! [`aes`] crate does its own runtime detection. To run its fixsliced
//! software implementation instead, build with
//! `RUSTFLAGS='--cfg aes_force_soft'`. Combined with
//! `--cfg aes_ctr_at_backend="soft"` no AES instruction is executed.
//!
//! [AES-CTR]: https://csrc.nist.gov/pubs/sp/800/38/a/final

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg",
    html_favicon_url = "https://raw.githubusercontent.com/RustCrypto/media/8f1a9894/logo.svg"
)]

#[cfg(test)]
extern crate alloc;

pub use cipher;

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::debug!($($arg)*);
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "log")]
        log::trace!($($arg)*);
    };
}

mod backends;
mod batch;
mod counter;
mod errors;
mod overlap;
mod segments;

pub use batch::{batch_plan, BatchPlan, BATCH_WIDTHS};
pub use counter::counter_block;
pub use errors::{Error, Result};
pub use segments::Segments;

use cipher::{consts::U16, generic_array::GenericArray};
use core::{fmt, ops::Range};
use counter::CounterBase;
use inout::InOutBuf;
use overlap::Overlap;

/// Size of an AES block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Size of the IV (the initial counter block) in bytes.
pub const IV_SIZE: usize = 16;

/// AES block.
pub type Block = GenericArray<u8, U16>;

/// Initial counter block.
pub type Iv = [u8; IV_SIZE];

/// AES key size.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeySize {
    /// 16-byte key, 10 rounds.
    Aes128,
    /// 24-byte key, 12 rounds.
    Aes192,
    /// 32-byte key, 14 rounds.
    Aes256,
}

impl KeySize {
    /// Key size for a key of `len` bytes.
    ///
    /// # Errors
    /// [`Error::InvalidKeyLength`] unless `len` is 16, 24 or 32.
    pub fn from_len(len: usize) -> Result<Self> {
        match len {
            16 => Ok(Self::Aes128),
            24 => Ok(Self::Aes192),
            32 => Ok(Self::Aes256),
            _ => Err(Error::InvalidKeyLength),
        }
    }

    /// Key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            Self::Aes128 => 16,
            Self::Aes192 => 24,
            Self::Aes256 => 32,
        }
    }

    /// Number of AES rounds.
    #[must_use]
    pub const fn rounds(self) -> usize {
        match self {
            Self::Aes128 => 10,
            Self::Aes192 => 12,
            Self::Aes256 => 14,
        }
    }
}

/// Block cipher implementation behind an [`AesCtrAt`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// One block at a time through the [`aes`] crate.
    ///
    /// The `aes` crate itself detects AES-NI or ARMv8 AES at runtime and
    /// only falls back to its constant-time software implementation when
    /// they are missing or when built with `--cfg aes_force_soft`.
    Portable,
    /// AES-NI or ARMv8 Crypto Extensions, up to 8 blocks at a time.
    Accelerated,
}

impl BackendKind {
    /// Whether this backend can be used on the current CPU.
    #[must_use]
    pub fn is_available(self) -> bool {
        match self {
            Self::Portable => true,
            Self::Accelerated => accelerated_available(),
        }
    }
}

/// AES-CTR cipher addressed by IV and byte offset.
///
/// Holds only the expanded key. All methods take `&self`, so one instance
/// can serve any number of threads concurrently.
#[derive(Clone)]
pub struct AesCtrAt {
    inner: Inner,
    key_size: KeySize,
}

#[derive(Clone)]
#[allow(
    clippy::large_enum_variant,
    reason = "boxing the accelerated schedule needs an allocator"
)]
enum Inner {
    Portable(backends::soft::Backend),
    #[cfg(all(
        not(aes_ctr_at_backend = "soft"),
        any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
    ))]
    Accelerated(backends::accel::Backend),
}

impl AesCtrAt {
    /// Create a cipher from a 16, 24 or 32 byte key, using the accelerated
    /// backend when the CPU supports it.
    ///
    /// # Errors
    /// [`Error::InvalidKeyLength`] for any other key length.
    pub fn new(key: &[u8]) -> Result<Self> {
        match Self::with_backend(key, BackendKind::Accelerated) {
            Err(Error::BackendUnavailable) => Self::with_backend(key, BackendKind::Portable),
            res => res,
        }
    }

    /// Create a cipher which always uses the portable backend.
    ///
    /// # Errors
    /// [`Error::InvalidKeyLength`] unless the key is 16, 24 or 32 bytes.
    pub fn new_portable(key: &[u8]) -> Result<Self> {
        Self::with_backend(key, BackendKind::Portable)
    }

    /// Create a cipher on an explicitly chosen backend.
    ///
    /// # Errors
    /// [`Error::InvalidKeyLength`] unless the key is 16, 24 or 32 bytes, and
    /// [`Error::BackendUnavailable`] if `kind` is not supported here.
    pub fn with_backend(key: &[u8], kind: BackendKind) -> Result<Self> {
        let key_size = KeySize::from_len(key.len())?;
        let inner = match kind {
            BackendKind::Portable => Inner::Portable(backends::soft::Backend::new(key)?),
            BackendKind::Accelerated => new_accelerated(key, key_size)?,
        };
        debug!("AES-CTR cipher ready: {:?}, {:?} backend", key_size, kind);
        Ok(Self { inner, key_size })
    }

    /// Backend this instance runs on.
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        match self.inner {
            Inner::Portable(_) => BackendKind::Portable,
            #[cfg(all(
                not(aes_ctr_at_backend = "soft"),
                any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
            ))]
            Inner::Accelerated(_) => BackendKind::Accelerated,
        }
    }

    /// Key size this instance was created with.
    #[must_use]
    pub fn key_size(&self) -> KeySize {
        self.key_size
    }

    /// Number of AES rounds: 10, 12 or 14.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.key_size.rounds()
    }

    /// XOR the keystream starting at byte `offset` of the stream for `iv`
    /// into `src`, writing the result to `dst`.
    ///
    /// # Errors
    /// [`Error::InvalidIvLength`] if `iv` is not 16 bytes and
    /// [`Error::LengthMismatch`] if `src` and `dst` differ in length.
    /// Nothing is written on error.
    pub fn apply_keystream_at_b2b(
        &self,
        iv: &[u8],
        offset: u64,
        src: &[u8],
        dst: &mut [u8],
    ) -> Result<()> {
        let iv = parse_iv(iv)?;
        let buf = InOutBuf::new(src, dst).map_err(|_| Error::LengthMismatch)?;
        self.run(iv, offset, buf);
        Ok(())
    }

    /// XOR the keystream starting at byte `offset` into `buf` in place.
    ///
    /// # Errors
    /// [`Error::InvalidIvLength`] if `iv` is not 16 bytes.
    pub fn apply_keystream_at(&self, iv: &[u8], offset: u64, buf: &mut [u8]) -> Result<()> {
        let iv = parse_iv(iv)?;
        self.run(iv, offset, buf.into());
        Ok(())
    }

    /// XOR the keystream starting at byte `offset` into an [`InOutBuf`],
    /// which may be either in-place or buffer-to-buffer.
    ///
    /// # Errors
    /// [`Error::InvalidIvLength`] if `iv` is not 16 bytes.
    pub fn apply_keystream_at_inout(
        &self,
        iv: &[u8],
        offset: u64,
        buf: InOutBuf<'_, '_, u8>,
    ) -> Result<()> {
        let iv = parse_iv(iv)?;
        self.run(iv, offset, buf);
        Ok(())
    }

    /// Like [`apply_keystream_at_b2b`][Self::apply_keystream_at_b2b], with
    /// source and destination given as two windows of the same buffer.
    ///
    /// Identical windows are processed in place and disjoint windows as
    /// separate buffers. Windows sharing some bytes but not starting at the
    /// same position are rejected, since the keystream for the later bytes
    /// would be applied to already overwritten input.
    ///
    /// # Errors
    /// [`Error::InvalidIvLength`] if `iv` is not 16 bytes,
    /// [`Error::LengthMismatch`] if the windows differ in length and
    /// [`Error::InvalidOverlap`] if they partially overlap.
    /// Nothing is written on error.
    ///
    /// # Panics
    /// If either window is out of bounds for `buf` or has its start after
    /// its end.
    pub fn apply_keystream_within(
        &self,
        iv: &[u8],
        offset: u64,
        buf: &mut [u8],
        src: Range<usize>,
        dst: Range<usize>,
    ) -> Result<()> {
        let iv = parse_iv(iv)?;
        assert!(
            src.start <= src.end && src.end <= buf.len(),
            "source window {src:?} out of bounds for buffer of length {}",
            buf.len()
        );
        assert!(
            dst.start <= dst.end && dst.end <= buf.len(),
            "destination window {dst:?} out of bounds for buffer of length {}",
            buf.len()
        );
        let len = src.len();
        if len != dst.len() {
            return Err(Error::LengthMismatch);
        }

        match overlap::classify(&src, &dst) {
            Overlap::Partial => Err(Error::InvalidOverlap),
            Overlap::Identical => {
                self.run(iv, offset, (&mut buf[dst]).into());
                Ok(())
            }
            Overlap::Disjoint if len == 0 => Ok(()),
            Overlap::Disjoint => {
                let (src, dst) = if src.start < dst.start {
                    let (head, rest) = buf.split_at_mut(dst.start);
                    (&head[src], &mut rest[..len])
                } else {
                    let (head, rest) = buf.split_at_mut(src.start);
                    (&rest[..len], &mut head[dst])
                };
                let buf = InOutBuf::new(src, dst).map_err(|_| Error::LengthMismatch)?;
                self.run(iv, offset, buf);
                Ok(())
            }
        }
    }

    /// Write the raw keystream starting at byte `offset` into `out`.
    ///
    /// # Errors
    /// [`Error::InvalidIvLength`] if `iv` is not 16 bytes.
    pub fn keystream_at(&self, iv: &[u8], offset: u64, out: &mut [u8]) -> Result<()> {
        let iv = parse_iv(iv)?;
        out.fill(0);
        self.run(iv, offset, out.into());
        Ok(())
    }

    fn run(&self, iv: &Iv, offset: u64, buf: InOutBuf<'_, '_, u8>) {
        let ctr = CounterBase::new(iv);
        match &self.inner {
            Inner::Portable(backend) => segments::xor_keystream_at(backend, &ctr, offset, buf),
            #[cfg(all(
                not(aes_ctr_at_backend = "soft"),
                any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
            ))]
            Inner::Accelerated(backend) => segments::xor_keystream_at(backend, &ctr, offset, buf),
        }
    }
}

impl fmt::Debug for AesCtrAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesCtrAt")
            .field("key_size", &self.key_size)
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

#[inline]
fn parse_iv(iv: &[u8]) -> Result<&Iv> {
    iv.try_into().map_err(|_| Error::InvalidIvLength)
}

cfg_if::cfg_if! {
    if #[cfg(all(
        not(aes_ctr_at_backend = "soft"),
        any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
    ))] {
        fn accelerated_available() -> bool {
            backends::accel::is_available()
        }

        fn new_accelerated(key: &[u8], key_size: KeySize) -> Result<Inner> {
            match backends::accel::Backend::new(key, key_size) {
                Some(backend) => Ok(Inner::Accelerated(backend)),
                None => {
                    trace!("AES instructions not detected on this CPU");
                    Err(Error::BackendUnavailable)
                }
            }
        }
    } else {
        fn accelerated_available() -> bool {
            false
        }

        fn new_accelerated(_key: &[u8], _key_size: KeySize) -> Result<Inner> {
            trace!("no accelerated AES backend compiled for this target");
            Err(Error::BackendUnavailable)
        }
    }
}
