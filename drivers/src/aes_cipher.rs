/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_cipher.rs

Abstract:

    File contains the unauthenticated AES streaming modes (ECB, CBC, CBC
    with PKCS#7 padding, CTR) over the RustCrypto mode crates.

--*/

use aes::{Aes128, Aes192, Aes256, Block};
use cbc::cipher::block_padding::{Padding, Pkcs7};
use cbc::cipher::consts::U16;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, StreamCipher};
use tzcrypto_api::crypto::Algorithm;
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::{Zeroize, Zeroizing};

pub const AES_BLOCK_SIZE: usize = 16;

/// AES Mode
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AesMode {
    Ecb,
    Cbc,
    CbcPkcs7,
    Ctr,
}

impl AesMode {
    pub fn from_alg(alg: Algorithm) -> PsaResult<Self> {
        match alg {
            Algorithm::ECB_NO_PADDING => Ok(Self::Ecb),
            Algorithm::CBC_NO_PADDING => Ok(Self::Cbc),
            Algorithm::CBC_PKCS7 => Ok(Self::CbcPkcs7),
            Algorithm::CTR => Ok(Self::Ctr),
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }

    pub fn iv_len(self) -> usize {
        match self {
            Self::Ecb => 0,
            Self::Cbc | Self::CbcPkcs7 | Self::Ctr => AES_BLOCK_SIZE,
        }
    }
}

/// AES Operation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AesOperation {
    Encrypt,
    Decrypt,
}

/// Keyed mode state behind one operation.
trait ModeEngine: Send {
    /// `data` is a whole number of blocks for the block modes.
    fn process(&mut self, data: &mut [u8]);
}

struct Encrypt<C>(C);

struct Decrypt<C>(C);

struct Keystream<C>(C);

impl<C: BlockEncryptMut<BlockSize = U16> + Send> ModeEngine for Encrypt<C> {
    fn process(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.0.encrypt_block_mut(Block::from_mut_slice(block));
        }
    }
}

impl<C: BlockDecryptMut<BlockSize = U16> + Send> ModeEngine for Decrypt<C> {
    fn process(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.0.decrypt_block_mut(Block::from_mut_slice(block));
        }
    }
}

impl<C: StreamCipher + Send> ModeEngine for Keystream<C> {
    fn process(&mut self, data: &mut [u8]) {
        self.0.apply_keystream(data);
    }
}

/// Run `$body` with `$cipher` bound to the AES variant for the key length.
macro_rules! with_aes {
    ($key_len:expr, $cipher:ident => $body:expr) => {
        match $key_len {
            16 => {
                type $cipher = Aes128;
                $body
            }
            24 => {
                type $cipher = Aes192;
                $body
            }
            32 => {
                type $cipher = Aes256;
                $body
            }
            _ => Err(PsaError::INVALID_ARGUMENT),
        }
    };
}

fn engine(
    mode: AesMode,
    op: AesOperation,
    key: &[u8],
    iv: &[u8],
) -> PsaResult<Box<dyn ModeEngine>> {
    let bad = |_| PsaError::INVALID_ARGUMENT;
    with_aes!(key.len(), C => {
        let engine: Box<dyn ModeEngine> = match (mode, op) {
            (AesMode::Ecb, AesOperation::Encrypt) => {
                Box::new(Encrypt(ecb::Encryptor::<C>::new_from_slice(key).map_err(bad)?))
            }
            (AesMode::Ecb, AesOperation::Decrypt) => {
                Box::new(Decrypt(ecb::Decryptor::<C>::new_from_slice(key).map_err(bad)?))
            }
            (AesMode::Cbc | AesMode::CbcPkcs7, AesOperation::Encrypt) => {
                Box::new(Encrypt(cbc::Encryptor::<C>::new_from_slices(key, iv).map_err(bad)?))
            }
            (AesMode::Cbc | AesMode::CbcPkcs7, AesOperation::Decrypt) => {
                Box::new(Decrypt(cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(bad)?))
            }
            (AesMode::Ctr, _) => {
                Box::new(Keystream(ctr::Ctr128BE::<C>::new_from_slices(key, iv).map_err(bad)?))
            }
        };
        Ok(engine)
    })
}

/// Multi step AES cipher operation
///
/// Input is staged in a one block buffer. CBC with padding on the decrypt
/// side always holds back the last full block so `finish` can strip the
/// padding. Modes that take an IV are keyed once the IV arrives.
pub struct AesCipherOp {
    mode: AesMode,
    op: AesOperation,

    /// Raw key, kept only until the mode is keyed
    key: Zeroizing<Vec<u8>>,
    engine: Option<Box<dyn ModeEngine>>,

    /// Staging buffer for partial blocks
    buf: [u8; AES_BLOCK_SIZE],
    buf_len: usize,
}

impl AesCipherOp {
    pub fn new(mode: AesMode, op: AesOperation, key: &[u8]) -> PsaResult<Self> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let mut this = Self {
            mode,
            op,
            key: Zeroizing::new(key.to_vec()),
            engine: None,
            buf: [0u8; AES_BLOCK_SIZE],
            buf_len: 0,
        };
        if !this.iv_required() {
            this.engine = Some(engine(mode, op, key, &[])?);
            this.key.zeroize();
        }
        Ok(this)
    }

    pub fn mode(&self) -> AesMode {
        self.mode
    }

    pub fn operation(&self) -> AesOperation {
        self.op
    }

    pub fn iv_required(&self) -> bool {
        self.mode.iv_len() != 0
    }

    pub fn iv_set(&self) -> bool {
        self.iv_required() && self.engine.is_some()
    }

    pub fn set_iv(&mut self, iv: &[u8]) -> PsaResult<()> {
        if !self.iv_required() || self.engine.is_some() {
            return Err(PsaError::BAD_STATE);
        }
        if iv.len() != AES_BLOCK_SIZE {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        self.engine = Some(engine(self.mode, self.op, &self.key, iv)?);
        self.key.zeroize();
        Ok(())
    }

    /// Bytes held back after the input, for block modes.
    fn held_back(&self, total: usize) -> usize {
        let rem = total % AES_BLOCK_SIZE;
        if self.mode == AesMode::CbcPkcs7 && self.op == AesOperation::Decrypt && rem == 0 {
            total.min(AES_BLOCK_SIZE)
        } else {
            rem
        }
    }

    /// Output produced by `update` for an input of `input_len` bytes.
    pub fn update_output_len(&self, input_len: usize) -> usize {
        if self.mode == AesMode::Ctr {
            return input_len;
        }
        let total = self.buf_len + input_len;
        total - self.held_back(total)
    }

    /// Process input and return the number of bytes written to `output`.
    /// Nothing is consumed when `output` is too small.
    pub fn update(&mut self, input: &[u8], output: &mut [u8]) -> PsaResult<usize> {
        if self.engine.is_none() {
            return Err(PsaError::BAD_STATE);
        }
        let out_len = self.update_output_len(input.len());
        let output = output.get_mut(..out_len).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        let engine = self.engine.as_mut().ok_or(PsaError::BAD_STATE)?;

        if self.mode == AesMode::Ctr {
            output.copy_from_slice(input);
            engine.process(output);
            return Ok(out_len);
        }

        let mut input = input;
        let mut written = 0;
        while written < out_len {
            let take = (AES_BLOCK_SIZE - self.buf_len).min(input.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&input[..take]);
            self.buf_len += take;
            input = &input[take..];
            if self.buf_len < AES_BLOCK_SIZE {
                break;
            }
            let dest = &mut output[written..written + AES_BLOCK_SIZE];
            dest.copy_from_slice(&self.buf);
            engine.process(dest);
            written += AES_BLOCK_SIZE;
            self.buf_len = 0;
        }
        self.buf[self.buf_len..self.buf_len + input.len()].copy_from_slice(input);
        self.buf_len += input.len();
        Ok(out_len)
    }

    /// Complete the operation and return the number of trailing bytes.
    pub fn finish(&mut self, output: &mut [u8]) -> PsaResult<usize> {
        let engine = self.engine.as_mut().ok_or(PsaError::BAD_STATE)?;
        let written = match (self.mode, self.op) {
            (AesMode::Ctr, _) => 0,
            (AesMode::Ecb | AesMode::Cbc, _) => {
                if self.buf_len != 0 {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                0
            }
            (AesMode::CbcPkcs7, AesOperation::Encrypt) => {
                let out = output
                    .get_mut(..AES_BLOCK_SIZE)
                    .ok_or(PsaError::BUFFER_TOO_SMALL)?;
                let mut block = self.buf;
                Pkcs7::pad(Block::from_mut_slice(&mut block), self.buf_len);
                engine.process(&mut block);
                out.copy_from_slice(&block);
                AES_BLOCK_SIZE
            }
            (AesMode::CbcPkcs7, AesOperation::Decrypt) => {
                if self.buf_len != AES_BLOCK_SIZE {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                let mut block = self.buf;
                engine.process(&mut block);
                let result = match Pkcs7::unpad(Block::from_slice(&block)) {
                    Ok(plaintext) => output
                        .get_mut(..plaintext.len())
                        .ok_or(PsaError::BUFFER_TOO_SMALL)
                        .map(|out| {
                            out.copy_from_slice(plaintext);
                            plaintext.len()
                        }),
                    Err(_) => Err(PsaError::INVALID_PADDING),
                };
                block.zeroize();
                result?
            }
        };
        self.zeroize();
        Ok(written)
    }
}

impl Zeroize for AesCipherOp {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.engine = None;
        self.buf.zeroize();
        self.buf_len = 0;
    }
}

impl Drop for AesCipherOp {
    fn drop(&mut self) {
        self.zeroize();
    }
}
