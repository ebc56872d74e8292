// Licensed under the Apache-2.0 license

use crate::call::CryptoCall;
use crate::Drivers;
use tzcrypto_api::FunctionId;
use tzcrypto_error::{PsaError, PsaResult};

/// Asymmetric encryption has no backend. The key is still resolved so a
/// caller probing someone else's key learns nothing beyond the ownership
/// error.
pub struct AsymEncryptCmd;

impl AsymEncryptCmd {
    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        match call.fid {
            FunctionId::AsymmetricEncrypt | FunctionId::AsymmetricDecrypt => {
                drivers.key(call.caller, call.pack.key_id)?;
                log::debug!(
                    "[crypto] asymmetric alg 0x{:08x} not supported",
                    call.pack.alg
                );
                Err(PsaError::NOT_SUPPORTED)
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
