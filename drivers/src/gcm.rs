/*++

Licensed under the Apache-2.0 license.

File Name:

    gcm.rs

Abstract:

    File contains AES-GCM one-shot and multi step operations.

--*/

use crate::aes_cipher::AesOperation;
use aes_gcm::aead::consts::{U12, U16};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadCore, AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm as AesGcmCipher};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::{Zeroize, Zeroizing};

pub const GCM_NONCE_SIZE: usize = 12;
pub const GCM_TAG_SIZE: usize = 16;

/// Upper bound on associated data plus payload staged by a multi step
/// operation.
pub const GCM_MAX_BUFFERED: usize = 5120;

type Aes192Gcm = AesGcmCipher<aes::Aes192, U12>;

fn seal_with<C>(key: &[u8], nonce: &[u8], ad: &[u8], buf: &mut [u8]) -> PsaResult<[u8; GCM_TAG_SIZE]>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key).map_err(|_| PsaError::INVALID_ARGUMENT)?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), ad, buf)
        .map_err(|_| PsaError::INVALID_ARGUMENT)?;
    Ok(tag.into())
}

fn open_with<C>(key: &[u8], nonce: &[u8], ad: &[u8], buf: &mut [u8], tag: &[u8]) -> PsaResult<()>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key).map_err(|_| PsaError::INVALID_ARGUMENT)?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            ad,
            buf,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| PsaError::INVALID_SIGNATURE)
}

pub enum AesGcm {}

impl AesGcm {
    fn check_params(key: &[u8], nonce: &[u8]) -> PsaResult<()> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        if nonce.len() != GCM_NONCE_SIZE {
            return Err(PsaError::NOT_SUPPORTED);
        }
        Ok(())
    }

    /// Encrypt `buf` in place and return the tag.
    pub fn seal(key: &[u8], nonce: &[u8], ad: &[u8], buf: &mut [u8]) -> PsaResult<[u8; GCM_TAG_SIZE]> {
        Self::check_params(key, nonce)?;
        match key.len() {
            16 => seal_with::<Aes128Gcm>(key, nonce, ad, buf),
            24 => seal_with::<Aes192Gcm>(key, nonce, ad, buf),
            _ => seal_with::<Aes256Gcm>(key, nonce, ad, buf),
        }
    }

    /// Decrypt `buf` in place. Any tag mismatch, including a tag of the
    /// wrong length, is a signature failure.
    pub fn open(key: &[u8], nonce: &[u8], ad: &[u8], buf: &mut [u8], tag: &[u8]) -> PsaResult<()> {
        Self::check_params(key, nonce)?;
        if tag.len() != GCM_TAG_SIZE {
            return Err(PsaError::INVALID_SIGNATURE);
        }
        let result = match key.len() {
            16 => open_with::<Aes128Gcm>(key, nonce, ad, buf, tag),
            24 => open_with::<Aes192Gcm>(key, nonce, ad, buf, tag),
            _ => open_with::<Aes256Gcm>(key, nonce, ad, buf, tag),
        };
        if result.is_err() {
            buf.zeroize();
        }
        result
    }

    /// One step encryption. `output` receives ciphertext followed by tag.
    pub fn encrypt(key: &[u8], nonce: &[u8], ad: &[u8], plaintext: &[u8], output: &mut [u8]) -> PsaResult<usize> {
        let total = plaintext.len() + GCM_TAG_SIZE;
        let output = output.get_mut(..total).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        let (body, tag_out) = output.split_at_mut(plaintext.len());
        body.copy_from_slice(plaintext);
        let tag = Self::seal(key, nonce, ad, body)?;
        tag_out.copy_from_slice(&tag);
        Ok(total)
    }

    /// One step decryption of ciphertext followed by tag.
    pub fn decrypt(key: &[u8], nonce: &[u8], ad: &[u8], ciphertext: &[u8], output: &mut [u8]) -> PsaResult<usize> {
        let body_len = ciphertext
            .len()
            .checked_sub(GCM_TAG_SIZE)
            .ok_or(PsaError::INVALID_SIGNATURE)?;
        let (body, tag) = ciphertext.split_at(body_len);
        let output = output.get_mut(..body_len).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        output.copy_from_slice(body);
        Self::open(key, nonce, ad, output, tag)?;
        Ok(body_len)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum GcmPhase {
    /// Waiting for the nonce
    Init,
    /// Associated data may still be added
    Ad,
    /// Payload has started
    Payload,
}

/// Multi step AES-GCM operation.
///
/// GCM cannot release plaintext before the tag is checked, so both sides
/// stage associated data and payload and run the cipher once at the end.
/// Updates therefore produce no output.
pub struct AesGcmOp {
    key: Zeroizing<Vec<u8>>,
    op: AesOperation,
    phase: GcmPhase,
    nonce: [u8; GCM_NONCE_SIZE],
    lengths: Option<(usize, usize)>,
    ad: Zeroizing<Vec<u8>>,
    payload: Zeroizing<Vec<u8>>,
}

impl AesGcmOp {
    pub fn new(op: AesOperation, key: &[u8]) -> PsaResult<Self> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
            op,
            phase: GcmPhase::Init,
            nonce: [0u8; GCM_NONCE_SIZE],
            lengths: None,
            ad: Zeroizing::new(Vec::new()),
            payload: Zeroizing::new(Vec::new()),
        })
    }

    pub fn operation(&self) -> AesOperation {
        self.op
    }

    pub fn nonce_set(&self) -> bool {
        self.phase != GcmPhase::Init
    }

    pub fn set_nonce(&mut self, nonce: &[u8]) -> PsaResult<()> {
        if self.phase != GcmPhase::Init {
            return Err(PsaError::BAD_STATE);
        }
        if nonce.len() != GCM_NONCE_SIZE {
            return Err(PsaError::NOT_SUPPORTED);
        }
        self.nonce.copy_from_slice(nonce);
        self.phase = GcmPhase::Ad;
        Ok(())
    }

    /// Declare total lengths up front. Only allowed before any data.
    pub fn set_lengths(&mut self, ad_len: usize, payload_len: usize) -> PsaResult<()> {
        if self.lengths.is_some() || !self.ad.is_empty() || self.phase == GcmPhase::Payload {
            return Err(PsaError::BAD_STATE);
        }
        if ad_len + payload_len > GCM_MAX_BUFFERED {
            return Err(PsaError::INSUFFICIENT_MEMORY);
        }
        self.lengths = Some((ad_len, payload_len));
        Ok(())
    }

    fn reserve(&self, extra: usize) -> PsaResult<()> {
        if self.ad.len() + self.payload.len() + extra > GCM_MAX_BUFFERED {
            return Err(PsaError::INSUFFICIENT_MEMORY);
        }
        Ok(())
    }

    pub fn update_ad(&mut self, data: &[u8]) -> PsaResult<()> {
        if self.phase != GcmPhase::Ad {
            return Err(PsaError::BAD_STATE);
        }
        if let Some((ad_len, _)) = self.lengths {
            if self.ad.len() + data.len() > ad_len {
                return Err(PsaError::INVALID_ARGUMENT);
            }
        }
        self.reserve(data.len())?;
        self.ad.extend_from_slice(data);
        Ok(())
    }

    pub fn update(&mut self, data: &[u8]) -> PsaResult<()> {
        if self.phase == GcmPhase::Init {
            return Err(PsaError::BAD_STATE);
        }
        if let Some((ad_len, payload_len)) = self.lengths {
            if self.ad.len() != ad_len || self.payload.len() + data.len() > payload_len {
                return Err(PsaError::INVALID_ARGUMENT);
            }
        }
        self.reserve(data.len())?;
        self.phase = GcmPhase::Payload;
        self.payload.extend_from_slice(data);
        Ok(())
    }

    fn check_complete(&self) -> PsaResult<()> {
        if self.phase == GcmPhase::Init {
            return Err(PsaError::BAD_STATE);
        }
        if let Some((ad_len, payload_len)) = self.lengths {
            if self.ad.len() != ad_len || self.payload.len() != payload_len {
                return Err(PsaError::INVALID_ARGUMENT);
            }
        }
        Ok(())
    }

    /// Encrypt side: emit the whole ciphertext and the tag.
    pub fn finish(&mut self, ciphertext: &mut [u8], tag: &mut [u8]) -> PsaResult<(usize, usize)> {
        if self.op != AesOperation::Encrypt {
            return Err(PsaError::BAD_STATE);
        }
        self.check_complete()?;
        let len = self.payload.len();
        let ciphertext = ciphertext.get_mut(..len).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        let tag = tag.get_mut(..GCM_TAG_SIZE).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        ciphertext.copy_from_slice(&self.payload);
        let computed = AesGcm::seal(&self.key, &self.nonce, &self.ad, ciphertext)?;
        tag.copy_from_slice(&computed);
        self.zeroize();
        Ok((len, GCM_TAG_SIZE))
    }

    /// Decrypt side: check the tag, then emit the whole plaintext.
    pub fn verify(&mut self, plaintext: &mut [u8], tag: &[u8]) -> PsaResult<usize> {
        if self.op != AesOperation::Decrypt {
            return Err(PsaError::BAD_STATE);
        }
        self.check_complete()?;
        let len = self.payload.len();
        let plaintext = plaintext.get_mut(..len).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        plaintext.copy_from_slice(&self.payload);
        AesGcm::open(&self.key, &self.nonce, &self.ad, plaintext, tag)?;
        self.zeroize();
        Ok(len)
    }
}

impl Zeroize for AesGcmOp {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.nonce.zeroize();
        self.ad.zeroize();
        self.payload.zeroize();
    }
}
