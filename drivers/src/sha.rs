/*++

Licensed under the Apache-2.0 license.

File Name:

    sha.rs

Abstract:

    File contains the SHA-2 digest engine (SHA-224, SHA-256, SHA-384 and
    SHA-512) built on the raw compression functions.

--*/

use sha2::digest::consts::{U128, U64};
use sha2::digest::generic_array::GenericArray;
use tzcrypto_api::crypto::Algorithm;
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest block size of the supported modes (SHA-384/512)
pub const SHA_MAX_BLOCK_SIZE: usize = 128;

/// Largest digest size of the supported modes (SHA-512)
pub const SHA_MAX_DIGEST_SIZE: usize = 64;

/// SHA-2 Mode
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaMode {
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl ShaMode {
    /// Map a PSA hash algorithm to a mode. Unknown hashes are not supported.
    pub fn from_alg(alg: Algorithm) -> PsaResult<Self> {
        match alg {
            Algorithm::SHA_224 => Ok(Self::Sha224),
            Algorithm::SHA_256 => Ok(Self::Sha256),
            Algorithm::SHA_384 => Ok(Self::Sha384),
            Algorithm::SHA_512 => Ok(Self::Sha512),
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }

    pub fn alg(self) -> Algorithm {
        match self {
            Self::Sha224 => Algorithm::SHA_224,
            Self::Sha256 => Algorithm::SHA_256,
            Self::Sha384 => Algorithm::SHA_384,
            Self::Sha512 => Algorithm::SHA_512,
        }
    }

    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    pub fn block_len(self) -> usize {
        match self {
            Self::Sha224 | Self::Sha256 => 64,
            Self::Sha384 | Self::Sha512 => 128,
        }
    }

    /// Size of the message length field in the final block
    fn length_field_len(self) -> usize {
        match self {
            Self::Sha224 | Self::Sha256 => 8,
            Self::Sha384 | Self::Sha512 => 16,
        }
    }
}

#[cfg_attr(rustfmt, rustfmt_skip)]
const HASH_IV_224: [u32; 8] = [
    0xc1059ed8, 0x367cd507, 0x3070dd17, 0xf70e5939,
    0xffc00b31, 0x68581511, 0x64f98fa7, 0xbefa4fa4,
];

#[cfg_attr(rustfmt, rustfmt_skip)]
const HASH_IV_256: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a,
    0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

#[cfg_attr(rustfmt, rustfmt_skip)]
const HASH_IV_384: [u64; 8] = [
    0xcbbb9d5dc1059ed8, 0x629a292a367cd507, 0x9159015a3070dd17, 0x152fecd8f70e5939,
    0x67332667ffc00b31, 0x8eb44a8768581511, 0xdb0c2e0d64f98fa7, 0x47b5481dbefa4fa4,
];

#[cfg_attr(rustfmt, rustfmt_skip)]
const HASH_IV_512: [u64; 8] = [
    0x6a09e667f3bcc908, 0xbb67ae8584caa73b, 0x3c6ef372fe94f82b, 0xa54ff53a5f1d36f1,
    0x510e527fade682d1, 0x9b05688c2b3e6c1f, 0x1f83d9abfb41bd6b, 0x5be0cd19137e2179,
];

/// Chaining value of the running digest
#[derive(Clone)]
enum ShaState {
    Sha256([u32; 8]),
    Sha512([u64; 8]),
}

impl ShaState {
    fn new(mode: ShaMode) -> Self {
        match mode {
            ShaMode::Sha224 => Self::Sha256(HASH_IV_224),
            ShaMode::Sha256 => Self::Sha256(HASH_IV_256),
            ShaMode::Sha384 => Self::Sha512(HASH_IV_384),
            ShaMode::Sha512 => Self::Sha512(HASH_IV_512),
        }
    }

    /// Compress exactly one block. The caller guarantees the block length
    /// matches the mode.
    fn compress(&mut self, block: &[u8]) {
        match self {
            Self::Sha256(hash) => {
                let block = GenericArray::<u8, U64>::clone_from_slice(block);
                sha2::compress256(hash, &[block]);
            }
            Self::Sha512(hash) => {
                let block = GenericArray::<u8, U128>::clone_from_slice(block);
                sha2::compress512(hash, &[block]);
            }
        }
    }

    fn write_digest(&self, digest: &mut [u8]) {
        match self {
            Self::Sha256(hash) => hash
                .iter()
                .flat_map(|word| word.to_be_bytes())
                .zip(digest.iter_mut())
                .for_each(|(src, dest)| *dest = src),
            Self::Sha512(hash) => hash
                .iter()
                .flat_map(|word| word.to_be_bytes())
                .zip(digest.iter_mut())
                .for_each(|(src, dest)| *dest = src),
        }
    }
}

impl Zeroize for ShaState {
    fn zeroize(&mut self) {
        match self {
            Self::Sha256(hash) => hash.zeroize(),
            Self::Sha512(hash) => hash.zeroize(),
        }
    }
}

/// Finished digest value
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ShaDigest {
    bytes: [u8; SHA_MAX_DIGEST_SIZE],
    len: usize,
}

impl ShaDigest {
    /// `bytes` is at most `SHA_MAX_DIGEST_SIZE` long.
    pub(crate) fn from_slice(bytes: &[u8]) -> Self {
        let mut digest = Self {
            bytes: [0u8; SHA_MAX_DIGEST_SIZE],
            len: bytes.len(),
        };
        digest.bytes[..bytes.len()].copy_from_slice(bytes);
        digest
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Multi step SHA-2 digest operation
#[derive(Clone)]
pub struct ShaDigestOp {
    /// Mode
    mode: ShaMode,

    /// Chaining value
    state: ShaState,

    /// Staging buffer
    buf: [u8; SHA_MAX_BLOCK_SIZE],

    /// Current staging buffer index
    buf_idx: usize,

    /// Data size
    data_size: u128,
}

impl ShaDigestOp {
    pub fn new(mode: ShaMode) -> Self {
        Self {
            mode,
            state: ShaState::new(mode),
            buf: [0u8; SHA_MAX_BLOCK_SIZE],
            buf_idx: 0,
            data_size: 0,
        }
    }

    pub fn mode(&self) -> ShaMode {
        self.mode
    }

    /// Update the digest with data
    ///
    /// # Arguments
    ///
    /// * `data` - Data to used to update the digest
    pub fn update(&mut self, mut data: &[u8]) {
        let block_len = self.mode.block_len();
        self.data_size += data.len() as u128;

        if self.buf_idx > 0 {
            let take = (block_len - self.buf_idx).min(data.len());
            self.buf[self.buf_idx..self.buf_idx + take].copy_from_slice(&data[..take]);
            self.buf_idx += take;
            data = &data[take..];
            if self.buf_idx < block_len {
                return;
            }
            self.state.compress(&self.buf[..block_len]);
            self.buf_idx = 0;
        }

        let mut blocks = data.chunks_exact(block_len);
        for block in &mut blocks {
            self.state.compress(block);
        }
        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.buf_idx = rest.len();
    }

    /// Finalize the digest and reset the operation to its initial state.
    pub fn finalize_digest(&mut self) -> ShaDigest {
        let block_len = self.mode.block_len();
        let len_field = self.mode.length_field_len();
        let bit_len = self.data_size.wrapping_mul(8);

        self.buf[self.buf_idx] = 0x80;
        self.buf_idx += 1;
        if self.buf_idx > block_len - len_field {
            self.buf[self.buf_idx..block_len].fill(0);
            self.state.compress(&self.buf[..block_len]);
            self.buf_idx = 0;
        }
        self.buf[self.buf_idx..block_len - len_field].fill(0);
        if len_field == 8 {
            self.buf[block_len - 8..block_len].copy_from_slice(&(bit_len as u64).to_be_bytes());
        } else {
            self.buf[block_len - 16..block_len].copy_from_slice(&bit_len.to_be_bytes());
        }
        self.state.compress(&self.buf[..block_len]);

        let mut digest = ShaDigest {
            bytes: [0u8; SHA_MAX_DIGEST_SIZE],
            len: self.mode.digest_len(),
        };
        self.state.write_digest(&mut digest.bytes);
        digest.bytes[digest.len..].fill(0);

        self.zeroize();
        self.state = ShaState::new(self.mode);
        digest
    }

    /// Finalize into a caller buffer and return the digest length.
    pub fn finalize(&mut self, digest: &mut [u8]) -> PsaResult<usize> {
        let len = self.mode.digest_len();
        let dest = digest.get_mut(..len).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        let result = self.finalize_digest();
        dest.copy_from_slice(result.as_bytes());
        Ok(len)
    }
}

impl Zeroize for ShaDigestOp {
    fn zeroize(&mut self) {
        self.state.zeroize();
        self.buf.zeroize();
        self.buf_idx = 0;
        self.data_size = 0;
    }
}

impl Drop for ShaDigestOp {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Calculate the digest of the buffer in one step.
pub fn sha_digest(mode: ShaMode, data: &[u8]) -> ShaDigest {
    let mut op = ShaDigestOp::new(mode);
    op.update(data);
    op.finalize_digest()
}
