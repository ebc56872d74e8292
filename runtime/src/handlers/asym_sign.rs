// Licensed under the Apache-2.0 license

use crate::call::CryptoCall;
use crate::handlers::policy_key;
use crate::Drivers;
use tzcrypto_api::crypto::{Algorithm, KeyType, KeyUsage};
use tzcrypto_api::FunctionId;
use tzcrypto_drivers::{sha_digest, Ecc384, ShaMode};
use tzcrypto_error::{PsaError, PsaResult};

const SECP_R1_KEY_PAIR: KeyType = KeyType::ecc_key_pair(KeyType::ECC_FAMILY_SECP_R1);
const SECP_R1_PUBLIC_KEY: KeyType = KeyType::ecc_public_key(KeyType::ECC_FAMILY_SECP_R1);

/// ECDSA over secp384r1. Signatures are always deterministic, so the
/// randomized and deterministic algorithm identifiers behave the same.
pub struct AsymSignCmd;

impl AsymSignCmd {
    fn is_message(fid: FunctionId) -> bool {
        matches!(fid, FunctionId::SignMessage | FunctionId::VerifyMessage)
    }

    fn usage(fid: FunctionId) -> KeyUsage {
        match fid {
            FunctionId::SignMessage => KeyUsage::SIGN_MESSAGE,
            FunctionId::VerifyMessage => KeyUsage::VERIFY_MESSAGE,
            FunctionId::SignHash => KeyUsage::SIGN_HASH,
            _ => KeyUsage::VERIFY_HASH,
        }
    }

    /// Hash the message, or check a caller supplied hash has the length of
    /// the algorithm's hash.
    fn digest(fid: FunctionId, alg: Algorithm, data: &[u8]) -> PsaResult<Vec<u8>> {
        let mode = ShaMode::from_alg(alg.hash())?;
        if Self::is_message(fid) {
            return Ok(sha_digest(mode, data).as_bytes().to_vec());
        }
        if data.len() != alg.hash_length() {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        Ok(data.to_vec())
    }

    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let alg = Algorithm(call.pack.alg);
        if !alg.is_ecdsa() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let key = policy_key(
            drivers,
            call.caller,
            call.pack.key_id,
            Self::usage(call.fid),
            alg,
        )?;
        let hash = Self::digest(call.fid, alg, call.input(1))?;

        match call.fid {
            FunctionId::SignMessage | FunctionId::SignHash => {
                if key.key_type() != SECP_R1_KEY_PAIR {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                let signature = Ecc384::sign_hash(key.material(), &hash)?;
                call.write_output(0, &signature)
            }
            FunctionId::VerifyMessage | FunctionId::VerifyHash => {
                let signature = call.input(2);
                match key.key_type() {
                    SECP_R1_KEY_PAIR => {
                        let public = Ecc384::public_key(key.material())?;
                        Ecc384::verify_hash(&public, &hash, signature)
                    }
                    SECP_R1_PUBLIC_KEY => {
                        Ecc384::verify_hash(key.material(), &hash, signature)
                    }
                    _ => Err(PsaError::INVALID_ARGUMENT),
                }
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
