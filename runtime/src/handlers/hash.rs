/*++

Licensed under the Apache-2.0 license.

File Name:

    hash.rs

Abstract:

    File contains the hash calls: single-shot compute and compare plus the
    multipart setup, update, clone, finish, verify and abort.

--*/

use crate::call::CryptoCall;
use crate::handlers::verify_equal;
use crate::Drivers;
use tzcrypto_api::crypto::Algorithm;
use tzcrypto_api::FunctionId;
use tzcrypto_drivers::{sha_digest, ShaDigestOp, ShaMode};
use tzcrypto_error::{PsaError, PsaResult};

#[derive(Clone)]
pub struct HashOperation {
    op: ShaDigestOp,
}

impl HashOperation {
    pub fn new(mode: ShaMode) -> Self {
        Self {
            op: ShaDigestOp::new(mode),
        }
    }
}

pub struct HashCmd;

impl HashCmd {
    fn mode(alg: u32) -> PsaResult<ShaMode> {
        let alg = Algorithm(alg);
        if !alg.is_hash() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        ShaMode::from_alg(alg)
    }

    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let ops = &mut drivers.operations;
        match call.fid {
            FunctionId::HashCompute => {
                let digest = sha_digest(Self::mode(call.pack.alg)?, call.input(1));
                call.write_output(0, digest.as_bytes())
            }
            FunctionId::HashCompare => {
                let digest = sha_digest(Self::mode(call.pack.alg)?, call.input(1));
                verify_equal(digest.as_bytes(), call.input(2))
            }
            FunctionId::HashSetup => {
                let ctx = HashOperation::new(Self::mode(call.pack.alg)?);
                call.setup(ops, ctx)
            }
            FunctionId::HashUpdate => {
                let ctx = call.lookup::<HashOperation>(ops)?;
                ctx.op.update(call.input(1));
                Ok(())
            }
            FunctionId::HashClone => {
                let source = ops
                    .lookup::<HashOperation>(call.caller, call.pack.op_handle)?
                    .clone();
                call.setup(ops, source)
            }
            FunctionId::HashFinish => {
                let digest = call.lookup::<HashOperation>(ops)?.op.finalize_digest();
                call.release(ops);
                call.write_output(1, digest.as_bytes())
            }
            FunctionId::HashVerify => {
                let digest = call.lookup::<HashOperation>(ops)?.op.finalize_digest();
                call.release(ops);
                verify_equal(digest.as_bytes(), call.input(1))
            }
            FunctionId::HashAbort => {
                call.abort(ops);
                Ok(())
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
