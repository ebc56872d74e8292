/*++

Licensed under the Apache-2.0 license.

File Name:

    kdf.rs

Abstract:

    An HKDF implementation that is compliant with RFC 5869.

--*/

use crate::sha::ShaMode;
use hkdf::Hkdf;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

/// Extracted pseudorandom key, ready to expand
#[derive(Clone)]
enum Prk {
    Sha224(Hkdf<Sha224>),
    Sha256(Hkdf<Sha256>),
    Sha384(Hkdf<Sha384>),
    Sha512(Hkdf<Sha512>),
}

impl Prk {
    /// HKDF-Extract. An empty salt stands for a string of zeros, which the
    /// HMAC key padding produces on its own.
    fn extract(mode: ShaMode, salt: &[u8], ikm: &[u8]) -> Self {
        match mode {
            ShaMode::Sha224 => Self::Sha224(Hkdf::new(Some(salt), ikm)),
            ShaMode::Sha256 => Self::Sha256(Hkdf::new(Some(salt), ikm)),
            ShaMode::Sha384 => Self::Sha384(Hkdf::new(Some(salt), ikm)),
            ShaMode::Sha512 => Self::Sha512(Hkdf::new(Some(salt), ikm)),
        }
    }

    fn expand(&self, info: &[u8], okm: &mut [u8]) -> PsaResult<()> {
        let result = match self {
            Self::Sha224(hkdf) => hkdf.expand(info, okm),
            Self::Sha256(hkdf) => hkdf.expand(info, okm),
            Self::Sha384(hkdf) => hkdf.expand(info, okm),
            Self::Sha512(hkdf) => hkdf.expand(info, okm),
        };
        result.map_err(|_| PsaError::INSUFFICIENT_DATA)
    }
}

/// HKDF-Expand read in pieces.
///
/// Every read expands from the first block again and skips what was
/// already handed out; the output is capped at 255 blocks.
pub struct HkdfExpand {
    mode: ShaMode,
    prk: Prk,
    info: Zeroizing<Vec<u8>>,
    consumed: usize,
}

impl HkdfExpand {
    pub fn new(mode: ShaMode, salt: &[u8], ikm: &[u8], info: &[u8]) -> Self {
        Self {
            mode,
            prk: Prk::extract(mode, salt, ikm),
            info: Zeroizing::new(info.to_vec()),
            consumed: 0,
        }
    }

    /// Largest output HKDF can produce for this hash.
    pub fn max_output(mode: ShaMode) -> usize {
        255 * mode.digest_len()
    }

    /// Read the next `out.len()` bytes of output keying material.
    pub fn read(&mut self, out: &mut [u8]) -> PsaResult<()> {
        let end = self
            .consumed
            .checked_add(out.len())
            .filter(|end| *end <= Self::max_output(self.mode))
            .ok_or(PsaError::INSUFFICIENT_DATA)?;
        let mut okm = Zeroizing::new(vec![0u8; end]);
        self.prk.expand(&self.info, &mut okm)?;
        out.copy_from_slice(&okm[self.consumed..]);
        self.consumed = end;
        Ok(())
    }
}

/// One step HKDF (extract then expand).
pub fn hkdf_derive(
    mode: ShaMode,
    salt: &[u8],
    ikm: &[u8],
    info: &[u8],
    okm: &mut [u8],
) -> PsaResult<()> {
    Prk::extract(mode, salt, ikm).expand(info, okm)
}
