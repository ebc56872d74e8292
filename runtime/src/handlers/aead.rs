/*++

Licensed under the Apache-2.0 license.

File Name:

    aead.rs

Abstract:

    File contains the AEAD calls. AES-GCM with the full 16 byte tag is the
    only supported algorithm.

--*/

use crate::call::CryptoCall;
use crate::handlers::policy_key;
use crate::Drivers;
use tzcrypto_api::crypto::{Algorithm, KeyId, KeyType, KeyUsage};
use tzcrypto_api::{ClientId, FunctionId};
use tzcrypto_drivers::{AesGcm, AesGcmOp, AesOperation, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

/// Resolve an AES key usable with `alg` in `direction`.
fn aead_key(
    drivers: &mut Drivers,
    caller: ClientId,
    key_id: KeyId,
    alg: Algorithm,
    direction: AesOperation,
) -> PsaResult<Zeroizing<Vec<u8>>> {
    if !alg.is_aead() {
        return Err(PsaError::NOT_SUPPORTED);
    }
    if alg.aead_default_tag() != Algorithm::GCM || alg.aead_tag_length() != GCM_TAG_SIZE {
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
    Ok(Zeroizing::new(key.material().to_vec()))
}

pub struct AeadOperation {
    op: AesGcmOp,
}

pub struct AeadCmd;

impl AeadCmd {
    fn direction(fid: FunctionId) -> AesOperation {
        match fid {
            FunctionId::AeadEncrypt | FunctionId::AeadEncryptSetup => AesOperation::Encrypt,
            _ => AesOperation::Decrypt,
        }
    }

    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let alg = Algorithm(call.pack.alg);
        match call.fid {
            FunctionId::AeadEncrypt | FunctionId::AeadDecrypt => {
                let direction = Self::direction(call.fid);
                let key = aead_key(drivers, call.caller, call.pack.key_id, alg, direction)?;
                let pack = call.pack;
                let nonce = pack.nonce()?;
                let (data, ad) = (call.input(1), call.input(2));
                let out = call.output(0)?;
                let len = match direction {
                    AesOperation::Encrypt => AesGcm::encrypt(&key, nonce, ad, data, out.buffer())?,
                    AesOperation::Decrypt => AesGcm::decrypt(&key, nonce, ad, data, out.buffer())?,
                };
                out.set_len(len)
            }
            FunctionId::AeadEncryptSetup | FunctionId::AeadDecryptSetup => {
                let direction = Self::direction(call.fid);
                let key = aead_key(drivers, call.caller, call.pack.key_id, alg, direction)?;
                let ctx = AeadOperation {
                    op: AesGcmOp::new(direction, &key)?,
                };
                call.setup(&mut drivers.operations, ctx)
            }
            FunctionId::AeadGenerateNonce => {
                let ctx = call.lookup::<AeadOperation>(&mut drivers.operations)?;
                if ctx.op.operation() != AesOperation::Encrypt || ctx.op.nonce_set() {
                    return Err(PsaError::BAD_STATE);
                }
                let mut nonce = [0u8; GCM_NONCE_SIZE];
                drivers.platform.fill_random(&mut nonce)?;
                ctx.op.set_nonce(&nonce)?;
                call.write_output(1, &nonce)
            }
            FunctionId::AeadSetNonce => {
                let pack = call.pack;
                let nonce = pack.nonce()?;
                call.lookup::<AeadOperation>(&mut drivers.operations)?
                    .op
                    .set_nonce(nonce)
            }
            FunctionId::AeadSetLengths => {
                let (ad_len, payload_len) = (call.pack.ad_length, call.pack.plaintext_length);
                call.lookup::<AeadOperation>(&mut drivers.operations)?
                    .op
                    .set_lengths(ad_len as usize, payload_len as usize)
            }
            FunctionId::AeadUpdateAd => {
                let data = call.input(1);
                call.lookup::<AeadOperation>(&mut drivers.operations)?
                    .op
                    .update_ad(data)
            }
            FunctionId::AeadUpdate => {
                // Payload is staged until the tag is settled, so nothing is
                // released here.
                let data = call.input(1);
                call.lookup::<AeadOperation>(&mut drivers.operations)?
                    .op
                    .update(data)
            }
            FunctionId::AeadFinish => {
                let ops = &mut drivers.operations;
                let ctx = call.lookup::<AeadOperation>(ops)?;
                let (ciphertext, tag) = call.output_pair(1, 2)?;
                let result = ctx
                    .op
                    .finish(ciphertext.buffer(), tag.buffer())
                    .and_then(|(ct_len, tag_len)| {
                        ciphertext.set_len(ct_len)?;
                        tag.set_len(tag_len)
                    })
                    .inspect_err(|_| {
                        ciphertext.clear();
                        tag.clear();
                    });
                call.release(ops);
                result
            }
            FunctionId::AeadVerify => {
                let ops = &mut drivers.operations;
                let tag = call.input(1);
                let ctx = call.lookup::<AeadOperation>(ops)?;
                let plaintext = call.output(1)?;
                let result = ctx
                    .op
                    .verify(plaintext.buffer(), tag)
                    .and_then(|len| plaintext.set_len(len));
                call.release(ops);
                result
            }
            FunctionId::AeadAbort => {
                call.abort(&mut drivers.operations);
                Ok(())
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
