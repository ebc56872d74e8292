/*++

Licensed under the Apache-2.0 license.

File Name:

    cipher.rs

Abstract:

    File contains the unauthenticated AES cipher calls (ECB, CBC, CBC with
    PKCS#7 padding and CTR).

--*/

use crate::call::CryptoCall;
use crate::handlers::policy_key;
use crate::Drivers;
use tzcrypto_api::crypto::{Algorithm, KeyId, KeyType, KeyUsage};
use tzcrypto_api::{ClientId, FunctionId};
use tzcrypto_drivers::{AesCipherOp, AesMode, AesOperation, AES_BLOCK_SIZE};
use tzcrypto_error::{PsaError, PsaResult};

pub struct CipherOperation {
    op: AesCipherOp,
}

impl CipherOperation {
    fn new(
        drivers: &mut Drivers,
        caller: ClientId,
        key_id: KeyId,
        alg: Algorithm,
        direction: AesOperation,
    ) -> PsaResult<Self> {
        if !alg.is_cipher() {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let usage = match direction {
            AesOperation::Encrypt => KeyUsage::ENCRYPT,
            AesOperation::Decrypt => KeyUsage::DECRYPT,
        };
        let key = policy_key(drivers, caller, key_id, usage, alg)?;
        if key.key_type() != KeyType::AES {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let mode = AesMode::from_alg(alg)?;
        Ok(Self {
            op: AesCipherOp::new(mode, direction, key.material())?,
        })
    }
}

pub struct CipherCmd;

impl CipherCmd {
    fn direction(fid: FunctionId) -> AesOperation {
        match fid {
            FunctionId::CipherEncrypt | FunctionId::CipherEncryptSetup => AesOperation::Encrypt,
            _ => AesOperation::Decrypt,
        }
    }

    /// Single-shot encryption. The output is the IV followed by the
    /// ciphertext; the IV is drawn from the platform random source.
    fn encrypt(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let alg = Algorithm(call.pack.alg);
        let mut ctx = CipherOperation::new(
            drivers,
            call.caller,
            call.pack.key_id,
            alg,
            AesOperation::Encrypt,
        )?;
        let iv_len = AesMode::from_alg(alg)?.iv_len();
        let input = call.input(1);
        let out = call.output(0)?;
        let buf = out.buffer();
        if buf.len() < iv_len {
            return Err(PsaError::BUFFER_TOO_SMALL);
        }
        let (iv, body) = buf.split_at_mut(iv_len);
        if iv_len != 0 {
            drivers.platform.fill_random(iv)?;
            ctx.op.set_iv(iv)?;
        }
        let written = ctx.op.update(input, body)?;
        let tail = ctx.op.finish(&mut body[written..])?;
        out.set_len(iv_len + written + tail)
    }

    /// Single-shot decryption of an IV followed by ciphertext.
    fn decrypt(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let alg = Algorithm(call.pack.alg);
        let mut ctx = CipherOperation::new(
            drivers,
            call.caller,
            call.pack.key_id,
            alg,
            AesOperation::Decrypt,
        )?;
        let iv_len = AesMode::from_alg(alg)?.iv_len();
        let input = call.input(1);
        if input.len() < iv_len {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let (iv, body) = input.split_at(iv_len);
        if iv_len != 0 {
            ctx.op.set_iv(iv)?;
        }
        let out = call.output(0)?;
        let buf = out.buffer();
        let written = ctx.op.update(body, buf)?;
        let tail = ctx.op.finish(&mut buf[written..])?;
        out.set_len(written + tail)
    }

    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        match call.fid {
            FunctionId::CipherEncrypt => Self::encrypt(drivers, call),
            FunctionId::CipherDecrypt => Self::decrypt(drivers, call),
            FunctionId::CipherEncryptSetup | FunctionId::CipherDecryptSetup => {
                let ctx = CipherOperation::new(
                    drivers,
                    call.caller,
                    call.pack.key_id,
                    Algorithm(call.pack.alg),
                    Self::direction(call.fid),
                )?;
                call.setup(&mut drivers.operations, ctx)
            }
            FunctionId::CipherGenerateIv => {
                let ctx = call.lookup::<CipherOperation>(&mut drivers.operations)?;
                if ctx.op.operation() != AesOperation::Encrypt
                    || !ctx.op.iv_required()
                    || ctx.op.iv_set()
                {
                    return Err(PsaError::BAD_STATE);
                }
                let mut iv = [0u8; AES_BLOCK_SIZE];
                drivers.platform.fill_random(&mut iv)?;
                ctx.op.set_iv(&iv)?;
                call.write_output(1, &iv)
            }
            FunctionId::CipherSetIv => {
                let ctx = call.lookup::<CipherOperation>(&mut drivers.operations)?;
                ctx.op.set_iv(call.input(1))
            }
            FunctionId::CipherUpdate => {
                let input = call.input(1);
                let ctx = call.lookup::<CipherOperation>(&mut drivers.operations)?;
                // A stream that opens without an IV carries it in the first
                // update.
                if ctx.op.iv_required() && !ctx.op.iv_set() {
                    return ctx.op.set_iv(input);
                }
                let out = call.output(1)?;
                let written = ctx.op.update(input, out.buffer())?;
                out.set_len(written)
            }
            FunctionId::CipherFinish => {
                let ops = &mut drivers.operations;
                let ctx = call.lookup::<CipherOperation>(ops)?;
                let out = call.output(1)?;
                let result = ctx.op.finish(out.buffer()).and_then(|len| out.set_len(len));
                call.release(ops);
                result
            }
            FunctionId::CipherAbort => {
                call.abort(&mut drivers.operations);
                Ok(())
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
