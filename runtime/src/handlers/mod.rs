// Licensed under the Apache-2.0 license

//! One handler per primitive group. Each receives calls of its own group
//! only, after the dispatcher validated the vector shape.

mod aead;
mod asym_encrypt;
mod asym_sign;
mod cipher;
mod hash;
mod key_derivation;
mod key_management;
mod mac;
mod random;

pub use aead::{AeadCmd, AeadOperation};
pub use asym_encrypt::AsymEncryptCmd;
pub use asym_sign::AsymSignCmd;
pub use cipher::{CipherCmd, CipherOperation};
pub use hash::{HashCmd, HashOperation};
pub use key_derivation::{KeyDerivationCmd, KeyDerivationOperation};
pub use key_management::KeyManagementCmd;
pub use mac::{MacCmd, MacOperation};
pub use random::RandomCmd;

use crate::Drivers;
use tzcrypto_api::crypto::{Algorithm, KeyId, KeyUsage};
use tzcrypto_api::ClientId;
use tzcrypto_drivers::KeySlot;
use tzcrypto_error::{PsaError, PsaResult};

/// Resolve a key owned by (or builtin for) `caller` and check its policy
/// for `usage` with `alg`.
pub(crate) fn policy_key(
    drivers: &mut Drivers,
    caller: ClientId,
    key_id: KeyId,
    usage: KeyUsage,
    alg: Algorithm,
) -> PsaResult<KeySlot> {
    let key = drivers.key(caller, key_id)?;
    key.check_policy(usage, alg)?;
    Ok(key)
}

/// Map a verification mismatch to INVALID_SIGNATURE. Every byte is visited.
pub(crate) fn verify_equal(computed: &[u8], expected: &[u8]) -> PsaResult<()> {
    if tzcrypto_drivers::ct_eq(computed, expected) {
        Ok(())
    } else {
        Err(PsaError::INVALID_SIGNATURE)
    }
}
