// Licensed under the Apache-2.0 license

//! Closed table of crypto service calls.
//!
//! Each call carries its primitive group, whether it allocates, looks up or
//! ignores an operation slot, and the exact shape of its input and output
//! vectors. The pack in `in_vec[0]` is implicit and not listed.

use crate::crypto::KeyAttributes;
use tzcrypto_error::{PsaError, PsaResult};

/// Size of an operation handle or key id in an iovec.
pub const HANDLE_LEN: usize = 4;
/// Size of a derivation capacity in an iovec.
pub const CAPACITY_LEN: usize = 8;
pub const ATTRIBUTES_LEN: usize = core::mem::size_of::<KeyAttributes>();

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionGroup {
    Random = 1,
    KeyManagement = 2,
    Hash = 3,
    Mac = 4,
    Cipher = 5,
    Aead = 6,
    AsymSign = 7,
    AsymEncrypt = 8,
    KeyDerivation = 9,
}

/// How a call relates to the operation slot pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionType {
    NonMultipart,
    Setup,
    Lookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoLen {
    Fixed(usize),
    Variable,
}

impl IoLen {
    fn accepts(self, len: usize) -> bool {
        match self {
            IoLen::Fixed(n) => n == len,
            IoLen::Variable => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInfo {
    pub group: FunctionGroup,
    pub function_type: FunctionType,
    /// Inputs after the pack.
    pub inputs: &'static [IoLen],
    pub outputs: &'static [IoLen],
}

impl FunctionInfo {
    /// Reject a call whose vectors do not match this function's shape.
    ///
    /// `in_lens` includes the pack; `out_caps` are output capacities.
    pub fn check_shape(&self, in_lens: &[usize], out_caps: &[usize]) -> PsaResult<()> {
        if in_lens.len() != self.inputs.len() + 1 || out_caps.len() != self.outputs.len() {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        let inputs_ok = self
            .inputs
            .iter()
            .zip(&in_lens[1..])
            .all(|(expected, len)| expected.accepts(*len));
        let outputs_ok = self
            .outputs
            .iter()
            .zip(out_caps)
            .all(|(expected, len)| expected.accepts(*len));
        if inputs_ok && outputs_ok {
            Ok(())
        } else {
            Err(PsaError::PROGRAMMER_ERROR)
        }
    }
}

const V: IoLen = IoLen::Variable;
const H: IoLen = IoLen::Fixed(HANDLE_LEN);
const A: IoLen = IoLen::Fixed(ATTRIBUTES_LEN);
const C: IoLen = IoLen::Fixed(CAPACITY_LEN);

macro_rules! function_ids {
    ($(($name:ident, $value:literal, $group:ident, $ty:ident, [$($i:expr),*], [$($o:expr),*])),* $(,)?) => {
        #[repr(u16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum FunctionId {
            $($name = $value,)*
        }

        impl FunctionId {
            pub const fn info(self) -> FunctionInfo {
                match self {
                    $(FunctionId::$name => FunctionInfo {
                        group: FunctionGroup::$group,
                        function_type: FunctionType::$ty,
                        inputs: &[$($i),*],
                        outputs: &[$($o),*],
                    },)*
                }
            }

            #[cfg(test)]
            pub fn all() -> Vec<FunctionId> {
                vec![$(FunctionId::$name,)*]
            }
        }

        impl TryFrom<u16> for FunctionId {
            type Error = PsaError;

            fn try_from(value: u16) -> PsaResult<Self> {
                match value {
                    $($value => Ok(FunctionId::$name),)*
                    _ => Err(PsaError::NOT_SUPPORTED),
                }
            }
        }
    };
}

function_ids![
    (GenerateRandom, 0x0100, Random, NonMultipart, [], [V]),
    (GetKeyAttributes, 0x0200, KeyManagement, NonMultipart, [], [A]),
    (OpenKey, 0x0201, KeyManagement, NonMultipart, [], [H]),
    (CloseKey, 0x0202, KeyManagement, NonMultipart, [], []),
    (ImportKey, 0x0203, KeyManagement, NonMultipart, [A, V], [H]),
    (DestroyKey, 0x0204, KeyManagement, NonMultipart, [], []),
    (ExportKey, 0x0205, KeyManagement, NonMultipart, [], [V]),
    (ExportPublicKey, 0x0206, KeyManagement, NonMultipart, [], [V]),
    (PurgeKey, 0x0207, KeyManagement, NonMultipart, [], []),
    (CopyKey, 0x0208, KeyManagement, NonMultipart, [A], [H]),
    (GenerateKey, 0x0209, KeyManagement, NonMultipart, [A], [H]),
    (HashCompute, 0x0300, Hash, NonMultipart, [V], [V]),
    (HashCompare, 0x0301, Hash, NonMultipart, [V, V], []),
    (HashSetup, 0x0302, Hash, Setup, [], [H]),
    (HashUpdate, 0x0303, Hash, Lookup, [V], [H]),
    (HashClone, 0x0304, Hash, Lookup, [], [H]),
    (HashFinish, 0x0305, Hash, Lookup, [], [H, V]),
    (HashVerify, 0x0306, Hash, Lookup, [V], [H]),
    (HashAbort, 0x0307, Hash, Lookup, [], [H]),
    (MacCompute, 0x0400, Mac, NonMultipart, [V], [V]),
    (MacVerify, 0x0401, Mac, NonMultipart, [V, V], []),
    (MacSignSetup, 0x0402, Mac, Setup, [], [H]),
    (MacVerifySetup, 0x0403, Mac, Setup, [], [H]),
    (MacUpdate, 0x0404, Mac, Lookup, [V], [H]),
    (MacSignFinish, 0x0405, Mac, Lookup, [], [H, V]),
    (MacVerifyFinish, 0x0406, Mac, Lookup, [V], [H]),
    (MacAbort, 0x0407, Mac, Lookup, [], [H]),
    (CipherEncrypt, 0x0500, Cipher, NonMultipart, [V], [V]),
    (CipherDecrypt, 0x0501, Cipher, NonMultipart, [V], [V]),
    (CipherEncryptSetup, 0x0502, Cipher, Setup, [], [H]),
    (CipherDecryptSetup, 0x0503, Cipher, Setup, [], [H]),
    (CipherGenerateIv, 0x0504, Cipher, Lookup, [], [H, V]),
    (CipherSetIv, 0x0505, Cipher, Lookup, [V], [H]),
    (CipherUpdate, 0x0506, Cipher, Lookup, [V], [H, V]),
    (CipherFinish, 0x0507, Cipher, Lookup, [], [H, V]),
    (CipherAbort, 0x0508, Cipher, Lookup, [], [H]),
    (AeadEncrypt, 0x0600, Aead, NonMultipart, [V, V], [V]),
    (AeadDecrypt, 0x0601, Aead, NonMultipart, [V, V], [V]),
    (AeadEncryptSetup, 0x0602, Aead, Setup, [], [H]),
    (AeadDecryptSetup, 0x0603, Aead, Setup, [], [H]),
    (AeadGenerateNonce, 0x0604, Aead, Lookup, [], [H, V]),
    (AeadSetNonce, 0x0605, Aead, Lookup, [], [H]),
    (AeadSetLengths, 0x0606, Aead, Lookup, [], [H]),
    (AeadUpdateAd, 0x0607, Aead, Lookup, [V], [H]),
    (AeadUpdate, 0x0608, Aead, Lookup, [V], [H, V]),
    (AeadFinish, 0x0609, Aead, Lookup, [], [H, V, V]),
    (AeadVerify, 0x060a, Aead, Lookup, [V], [H, V]),
    (AeadAbort, 0x060b, Aead, Lookup, [], [H]),
    (SignMessage, 0x0700, AsymSign, NonMultipart, [V], [V]),
    (VerifyMessage, 0x0701, AsymSign, NonMultipart, [V, V], []),
    (SignHash, 0x0702, AsymSign, NonMultipart, [V], [V]),
    (VerifyHash, 0x0703, AsymSign, NonMultipart, [V, V], []),
    (AsymmetricEncrypt, 0x0800, AsymEncrypt, NonMultipart, [V, V], [V]),
    (AsymmetricDecrypt, 0x0801, AsymEncrypt, NonMultipart, [V, V], [V]),
    (KeyDerivationSetup, 0x0900, KeyDerivation, Setup, [], [H]),
    (KeyDerivationGetCapacity, 0x0901, KeyDerivation, Lookup, [], [H, C]),
    (KeyDerivationSetCapacity, 0x0902, KeyDerivation, Lookup, [], [H]),
    (KeyDerivationInputBytes, 0x0903, KeyDerivation, Lookup, [V], [H]),
    (KeyDerivationInputKey, 0x0904, KeyDerivation, Lookup, [], [H]),
    (KeyDerivationKeyAgreement, 0x0905, KeyDerivation, Lookup, [V], [H]),
    (KeyDerivationOutputBytes, 0x0906, KeyDerivation, Lookup, [], [H, V]),
    (KeyDerivationOutputKey, 0x0907, KeyDerivation, Lookup, [A], [H, H]),
    (KeyDerivationAbort, 0x0908, KeyDerivation, Lookup, [], [H]),
    (RawKeyAgreement, 0x0909, KeyDerivation, NonMultipart, [V], [V]),
];

impl FunctionId {
    /// Abort calls succeed on handles that no longer exist.
    pub const fn is_abort(self) -> bool {
        matches!(
            self,
            FunctionId::HashAbort
                | FunctionId::MacAbort
                | FunctionId::CipherAbort
                | FunctionId::AeadAbort
                | FunctionId::KeyDerivationAbort
        )
    }
}

impl From<FunctionId> for u16 {
    fn from(fid: FunctionId) -> Self {
        fid as u16
    }
}
