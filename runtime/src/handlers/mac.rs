// Licensed under the Apache-2.0 license

use crate::call::CryptoCall;
use crate::handlers::{policy_key, verify_equal};
use crate::Drivers;
use tzcrypto_api::crypto::{Algorithm, KeyType, KeyUsage};
use tzcrypto_api::{ClientId, FunctionId};
use tzcrypto_drivers::{CmacOp, HmacOp, ShaMode, SHA_MAX_DIGEST_SIZE};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

enum MacEngine {
    Hmac(HmacOp),
    Cmac(CmacOp),
}

pub struct MacOperation {
    engine: MacEngine,
    is_sign: bool,
}

impl MacOperation {
    fn new(
        drivers: &mut Drivers,
        caller: ClientId,
        key_id: u32,
        alg: Algorithm,
        is_sign: bool,
    ) -> PsaResult<Self> {
        if !alg.is_mac() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let usage = if is_sign {
            KeyUsage::SIGN_MESSAGE
        } else {
            KeyUsage::VERIFY_MESSAGE
        };
        let key = policy_key(drivers, caller, key_id, usage, alg)?;
        let engine = if alg.is_hmac() {
            if key.key_type() != KeyType::HMAC {
                return Err(PsaError::INVALID_ARGUMENT);
            }
            MacEngine::Hmac(HmacOp::new(ShaMode::from_alg(alg.hash())?, key.material())?)
        } else if alg == Algorithm::CMAC {
            if key.key_type() != KeyType::AES {
                return Err(PsaError::INVALID_ARGUMENT);
            }
            MacEngine::Cmac(CmacOp::new(key.material())?)
        } else {
            return Err(PsaError::NOT_SUPPORTED);
        };
        Ok(Self { engine, is_sign })
    }

    fn update(&mut self, data: &[u8]) {
        match &mut self.engine {
            MacEngine::Hmac(op) => op.update(data),
            MacEngine::Cmac(op) => op.update(data),
        }
    }

    fn finish(&mut self) -> PsaResult<Zeroizing<Vec<u8>>> {
        let mut tag = Zeroizing::new(vec![0u8; SHA_MAX_DIGEST_SIZE]);
        let len = match &mut self.engine {
            MacEngine::Hmac(op) => op.finalize(&mut tag)?,
            MacEngine::Cmac(op) => op.finalize(&mut tag)?,
        };
        tag.truncate(len);
        Ok(tag)
    }
}

pub struct MacCmd;

impl MacCmd {
    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let alg = Algorithm(call.pack.alg);
        match call.fid {
            FunctionId::MacCompute | FunctionId::MacVerify => {
                let is_sign = call.fid == FunctionId::MacCompute;
                let mut op = MacOperation::new(drivers, call.caller, call.pack.key_id, alg, is_sign)?;
                op.update(call.input(1));
                let tag = op.finish()?;
                if is_sign {
                    call.write_output(0, &tag)
                } else {
                    verify_equal(&tag, call.input(2))
                }
            }
            FunctionId::MacSignSetup | FunctionId::MacVerifySetup => {
                let is_sign = call.fid == FunctionId::MacSignSetup;
                let op = MacOperation::new(drivers, call.caller, call.pack.key_id, alg, is_sign)?;
                call.setup(&mut drivers.operations, op)
            }
            FunctionId::MacUpdate => {
                let op = call.lookup::<MacOperation>(&mut drivers.operations)?;
                op.update(call.input(1));
                Ok(())
            }
            FunctionId::MacSignFinish => {
                let ops = &mut drivers.operations;
                let op = call.lookup::<MacOperation>(ops)?;
                if !op.is_sign {
                    return Err(PsaError::BAD_STATE);
                }
                let tag = op.finish();
                call.release(ops);
                call.write_output(1, &tag?)
            }
            FunctionId::MacVerifyFinish => {
                let ops = &mut drivers.operations;
                let op = call.lookup::<MacOperation>(ops)?;
                if op.is_sign {
                    return Err(PsaError::BAD_STATE);
                }
                let tag = op.finish();
                call.release(ops);
                verify_equal(&tag?, call.input(1))
            }
            FunctionId::MacAbort => {
                call.abort(&mut drivers.operations);
                Ok(())
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
