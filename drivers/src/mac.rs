/*++

Licensed under the Apache-2.0 license.

File Name:

    mac.rs

Abstract:

    File contains the message authentication codes: HMAC (RFC 2104) over
    SHA-2 and AES-CMAC (NIST SP 800-38B).

--*/

use crate::sha::{ShaDigest, ShaMode};
use aes::{Aes128, Aes192, Aes256};
use cmac::Cmac;
use hmac::{Hmac, Mac};
use sha2::{Sha224, Sha256, Sha384, Sha512};
use tzcrypto_error::{PsaError, PsaResult};

pub const CMAC_TAG_SIZE: usize = 16;

#[derive(Clone)]
enum HmacState {
    Sha224(Hmac<Sha224>),
    Sha256(Hmac<Sha256>),
    Sha384(Hmac<Sha384>),
    Sha512(Hmac<Sha512>),
}

/// HMAC multi step operation
#[derive(Clone)]
pub struct HmacOp {
    mode: ShaMode,
    state: HmacState,
}

impl HmacOp {
    /// Start an HMAC computation. Keys longer than the block size are
    /// hashed first.
    pub fn new(mode: ShaMode, key: &[u8]) -> PsaResult<Self> {
        let bad = |_| PsaError::INVALID_ARGUMENT;
        let state = match mode {
            ShaMode::Sha224 => HmacState::Sha224(Hmac::new_from_slice(key).map_err(bad)?),
            ShaMode::Sha256 => HmacState::Sha256(Hmac::new_from_slice(key).map_err(bad)?),
            ShaMode::Sha384 => HmacState::Sha384(Hmac::new_from_slice(key).map_err(bad)?),
            ShaMode::Sha512 => HmacState::Sha512(Hmac::new_from_slice(key).map_err(bad)?),
        };
        Ok(Self { mode, state })
    }

    pub fn mode(&self) -> ShaMode {
        self.mode
    }

    pub fn mac_len(&self) -> usize {
        self.mode.digest_len()
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HmacState::Sha224(mac) => mac.update(data),
            HmacState::Sha256(mac) => mac.update(data),
            HmacState::Sha384(mac) => mac.update(data),
            HmacState::Sha512(mac) => mac.update(data),
        }
    }

    pub fn finalize_tag(self) -> ShaDigest {
        match self.state {
            HmacState::Sha224(mac) => ShaDigest::from_slice(&mac.finalize().into_bytes()),
            HmacState::Sha256(mac) => ShaDigest::from_slice(&mac.finalize().into_bytes()),
            HmacState::Sha384(mac) => ShaDigest::from_slice(&mac.finalize().into_bytes()),
            HmacState::Sha512(mac) => ShaDigest::from_slice(&mac.finalize().into_bytes()),
        }
    }

    /// Write the MAC of everything absorbed so far into `tag`.
    pub fn finalize(&mut self, tag: &mut [u8]) -> PsaResult<usize> {
        let len = self.mac_len();
        let dest = tag.get_mut(..len).ok_or(PsaError::BUFFER_TOO_SMALL)?;
        dest.copy_from_slice(self.clone().finalize_tag().as_bytes());
        Ok(len)
    }
}

/// One step HMAC.
pub fn hmac_compute(mode: ShaMode, key: &[u8], data: &[u8]) -> PsaResult<ShaDigest> {
    let mut op = HmacOp::new(mode, key)?;
    op.update(data);
    Ok(op.finalize_tag())
}

#[derive(Clone)]
enum CmacState {
    Aes128(Cmac<Aes128>),
    Aes192(Cmac<Aes192>),
    Aes256(Cmac<Aes256>),
}

/// CMAC multi step operation
#[derive(Clone)]
pub struct CmacOp {
    state: CmacState,
}

impl CmacOp {
    pub fn new(key: &[u8]) -> PsaResult<Self> {
        let bad = |_| PsaError::INVALID_ARGUMENT;
        let state = match key.len() {
            16 => CmacState::Aes128(Cmac::new_from_slice(key).map_err(bad)?),
            24 => CmacState::Aes192(Cmac::new_from_slice(key).map_err(bad)?),
            32 => CmacState::Aes256(Cmac::new_from_slice(key).map_err(bad)?),
            _ => return Err(PsaError::INVALID_ARGUMENT),
        };
        Ok(Self { state })
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            CmacState::Aes128(mac) => mac.update(data),
            CmacState::Aes192(mac) => mac.update(data),
            CmacState::Aes256(mac) => mac.update(data),
        }
    }

    pub fn finalize(&mut self, tag: &mut [u8]) -> PsaResult<usize> {
        let dest = tag
            .get_mut(..CMAC_TAG_SIZE)
            .ok_or(PsaError::BUFFER_TOO_SMALL)?;
        match self.state.clone() {
            CmacState::Aes128(mac) => dest.copy_from_slice(&mac.finalize().into_bytes()),
            CmacState::Aes192(mac) => dest.copy_from_slice(&mac.finalize().into_bytes()),
            CmacState::Aes256(mac) => dest.copy_from_slice(&mac.finalize().into_bytes()),
        }
        Ok(CMAC_TAG_SIZE)
    }
}
