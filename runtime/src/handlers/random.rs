// Licensed under the Apache-2.0 license

use crate::call::CryptoCall;
use crate::Drivers;
use tzcrypto_api::FunctionId;
use tzcrypto_error::{PsaError, PsaResult};

pub struct RandomCmd;

impl RandomCmd {
    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        match call.fid {
            FunctionId::GenerateRandom => {
                let out = call.output(0)?;
                let len = out.capacity();
                drivers.platform.fill_random(out.buffer())?;
                out.set_len(len)
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
