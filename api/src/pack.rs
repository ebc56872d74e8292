// Licensed under the Apache-2.0 license

use crate::function_id::FunctionId;
use core::mem::size_of;
use tzcrypto_error::{PsaError, PsaResult};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// Largest AEAD nonce that fits the inline buffer of the pack.
pub const CRYPTO_MAX_NONCE_LENGTH: usize = 16;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct AeadPackInput {
    pub nonce: [u8; CRYPTO_MAX_NONCE_LENGTH],
    pub nonce_length: u32,
}

/// Scalar parameters of a crypto call. Always `in_vec[0]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct CryptoPack {
    pub key_id: u32,
    pub alg: u32,
    pub op_handle: u32,
    pub ad_length: u32,
    pub plaintext_length: u32,
    pub aead_in: AeadPackInput,
    pub function_id: u16,
    pub step: u16,
    pub reserved: u32,
    /// Derivation capacity; doubles as a generic 64-bit value.
    pub capacity: u64,
}

const _: () = assert!(size_of::<AeadPackInput>() == 20);
const _: () = assert!(size_of::<CryptoPack>() == 56);
const _: () = assert!(core::mem::offset_of!(CryptoPack, function_id) == 40);
const _: () = assert!(core::mem::offset_of!(CryptoPack, capacity) == 48);

impl CryptoPack {
    pub fn new(function_id: FunctionId) -> Self {
        let mut pack = Self::new_zeroed();
        pack.function_id = function_id.into();
        pack
    }

    pub fn with_key(mut self, key_id: u32) -> Self {
        self.key_id = key_id;
        self
    }

    pub fn with_alg(mut self, alg: u32) -> Self {
        self.alg = alg;
        self
    }

    pub fn with_handle(mut self, op_handle: u32) -> Self {
        self.op_handle = op_handle;
        self
    }

    /// Copy a nonce into the inline buffer. The length is checked before
    /// anything is copied.
    pub fn with_nonce(mut self, nonce: &[u8]) -> PsaResult<Self> {
        if nonce.len() > CRYPTO_MAX_NONCE_LENGTH {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        self.aead_in.nonce[..nonce.len()].copy_from_slice(nonce);
        self.aead_in.nonce_length = nonce.len() as u32;
        Ok(self)
    }

    pub fn nonce(&self) -> PsaResult<&[u8]> {
        self.aead_in
            .nonce
            .get(..self.aead_in.nonce_length as usize)
            .ok_or(PsaError::INVALID_ARGUMENT)
    }

    /// Decode a pack from the first input vector. The bytes are copied so
    /// later changes to caller memory cannot affect validation.
    pub fn decode(bytes: &[u8]) -> PsaResult<Self> {
        if bytes.len() != size_of::<Self>() {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        Self::read_from_bytes(bytes).map_err(|_| PsaError::PROGRAMMER_ERROR)
    }
}
