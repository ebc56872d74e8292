/*++

Licensed under the Apache-2.0 license.

File Name:

    key_derivation.rs

Abstract:

    File contains the key derivation calls: HKDF, the TLS 1.2 PRF, the
    platform HUK derivation and ECDH key agreement.

--*/

use crate::call::CryptoCall;
use crate::handlers::key_management::{attributes, create_owned};
use crate::handlers::policy_key;
use crate::platform::Platform;
use crate::Drivers;
use tzcrypto_api::crypto::{Algorithm, KeyAttributes, KeyDerivationStep, KeyType, KeyUsage};
use tzcrypto_api::{ClientId, FunctionId};
use tzcrypto_drivers::{Ecc384, HkdfExpand, ShaMode, Tls12Prf, ECC384_SHARED_SECRET_SIZE};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

const SECP_R1_KEY_PAIR: KeyType = KeyType::ecc_key_pair(KeyType::ECC_FAMILY_SECP_R1);

/// Capacity of a derivation whose algorithm has no inherent limit.
const UNBOUNDED_CAPACITY: u64 = u32::MAX as u64;

type Secret = Option<Zeroizing<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KdfKind {
    Hkdf(ShaMode),
    Tls12Prf(ShaMode),
    Huk,
}

enum KdfStream {
    Hkdf(HkdfExpand),
    Prf(Tls12Prf),
}

fn bytes(input: &Secret) -> &[u8] {
    input.as_deref().map_or(&[][..], Vec::as_slice)
}

pub struct KeyDerivationOperation {
    alg: Algorithm,
    kind: KdfKind,
    capacity: u64,
    salt: Secret,
    secret: Secret,
    info: Secret,
    seed: Secret,
    label: Secret,
    stream: Option<KdfStream>,

    /// No input step is accepted once output was requested.
    output_started: bool,
}

impl KeyDerivationOperation {
    fn new(alg: Algorithm) -> PsaResult<Self> {
        let (kind, capacity) = if alg.is_hkdf() {
            let mode = ShaMode::from_alg(alg.hash())?;
            (KdfKind::Hkdf(mode), HkdfExpand::max_output(mode) as u64)
        } else if alg.is_tls12_prf() {
            let mode = ShaMode::from_alg(alg.hash())?;
            (KdfKind::Tls12Prf(mode), UNBOUNDED_CAPACITY)
        } else if alg == Algorithm::HUK_DERIVATION {
            (KdfKind::Huk, UNBOUNDED_CAPACITY)
        } else {
            return Err(PsaError::NOT_SUPPORTED);
        };
        Ok(Self {
            alg,
            kind,
            capacity,
            salt: None,
            secret: None,
            info: None,
            seed: None,
            label: None,
            stream: None,
            output_started: false,
        })
    }

    fn slot(&mut self, step: KeyDerivationStep) -> PsaResult<&mut Secret> {
        use KeyDerivationStep as Step;
        match (self.kind, step) {
            (KdfKind::Hkdf(_), Step::Salt) => Ok(&mut self.salt),
            (KdfKind::Hkdf(_) | KdfKind::Tls12Prf(_), Step::Secret) => Ok(&mut self.secret),
            (KdfKind::Hkdf(_), Step::Info) => Ok(&mut self.info),
            (KdfKind::Tls12Prf(_), Step::Seed) => Ok(&mut self.seed),
            (KdfKind::Tls12Prf(_) | KdfKind::Huk, Step::Label) => Ok(&mut self.label),
            _ => Err(PsaError::INVALID_ARGUMENT),
        }
    }

    /// Provide one input step. Each step is accepted once; an HKDF salt
    /// must come before the secret.
    fn input(&mut self, caller: ClientId, step: u16, data: &[u8]) -> PsaResult<()> {
        let step = KeyDerivationStep::try_from(step).map_err(|_| PsaError::INVALID_ARGUMENT)?;
        if self.output_started {
            return Err(PsaError::BAD_STATE);
        }
        if matches!(self.kind, KdfKind::Hkdf(_))
            && step == KeyDerivationStep::Salt
            && self.secret.is_some()
        {
            return Err(PsaError::BAD_STATE);
        }
        let value = match self.kind {
            // The caller's identity is bound into the label so two
            // partitions never derive the same key.
            KdfKind::Huk => {
                let mut label = Zeroizing::new(caller.to_le_bytes().to_vec());
                label.extend_from_slice(data);
                label
            }
            _ => Zeroizing::new(data.to_vec()),
        };
        let slot = self.slot(step)?;
        if slot.is_some() {
            return Err(PsaError::BAD_STATE);
        }
        *slot = Some(value);
        Ok(())
    }

    fn set_capacity(&mut self, capacity: u64) -> PsaResult<()> {
        if capacity > self.capacity {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Charge `len` bytes against the capacity. Asking for more than is
    /// left drains the operation.
    fn take(&mut self, len: usize) -> PsaResult<()> {
        self.output_started = true;
        let len = len as u64;
        if len > self.capacity {
            self.capacity = 0;
            return Err(PsaError::INSUFFICIENT_DATA);
        }
        self.capacity -= len;
        Ok(())
    }

    fn stream(&mut self) -> PsaResult<&mut KdfStream> {
        if self.stream.is_none() {
            let secret = self.secret.as_deref().ok_or(PsaError::BAD_STATE)?;
            let stream = match self.kind {
                KdfKind::Hkdf(mode) => KdfStream::Hkdf(HkdfExpand::new(
                    mode,
                    bytes(&self.salt),
                    secret,
                    bytes(&self.info),
                )),
                KdfKind::Tls12Prf(mode) => {
                    let seed = self.seed.as_deref().ok_or(PsaError::BAD_STATE)?;
                    KdfStream::Prf(Tls12Prf::new(mode, secret, bytes(&self.label), seed)?)
                }
                KdfKind::Huk => return Err(PsaError::NOT_PERMITTED),
            };
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or(PsaError::BAD_STATE)
    }

    fn read(&mut self, out: &mut [u8]) -> PsaResult<()> {
        if self.kind == KdfKind::Huk {
            return Err(PsaError::NOT_PERMITTED);
        }
        self.take(out.len())?;
        match self.stream()? {
            KdfStream::Hkdf(expand) => expand.read(out),
            KdfStream::Prf(prf) => prf.read(out),
        }
    }

    /// Material for a derived key of `attrs`. HUK derivations go through
    /// the platform with the label bound at input time.
    fn key_material(
        &mut self,
        attrs: &KeyAttributes,
        platform: &mut dyn Platform,
    ) -> PsaResult<Zeroizing<Vec<u8>>> {
        let key_type = attrs.key_type();
        if !matches!(
            key_type,
            KeyType::AES | KeyType::HMAC | KeyType::DERIVE | KeyType::RAW_DATA
        ) {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let bits = attrs.bits();
        if bits == 0 || bits % 8 != 0 {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let mut material = Zeroizing::new(vec![0u8; bits / 8]);
        if self.kind == KdfKind::Huk {
            if self.label.is_none() {
                return Err(PsaError::BAD_STATE);
            }
            self.take(material.len())?;
            platform.derive_from_huk(bytes(&self.label), &mut material)?;
        } else {
            self.read(&mut material)?;
        }
        Ok(material)
    }
}

pub struct KeyDerivationCmd;

impl KeyDerivationCmd {
    /// Shared ECDH secret between the caller's key pair and a peer point.
    fn agree(
        drivers: &mut Drivers,
        call: &CryptoCall,
    ) -> PsaResult<Zeroizing<[u8; ECC384_SHARED_SECRET_SIZE]>> {
        let key = policy_key(
            drivers,
            call.caller,
            call.pack.key_id,
            KeyUsage::DERIVE,
            Algorithm::ECDH,
        )?;
        if key.key_type() != SECP_R1_KEY_PAIR {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        Ecc384::ecdh(key.material(), call.input(1))
    }

    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let (caller, step) = (call.caller, call.pack.step);
        match call.fid {
            FunctionId::KeyDerivationSetup => {
                let ctx = KeyDerivationOperation::new(Algorithm(call.pack.alg))?;
                call.setup(&mut drivers.operations, ctx)
            }
            FunctionId::KeyDerivationGetCapacity => {
                let capacity = call
                    .lookup::<KeyDerivationOperation>(&mut drivers.operations)?
                    .capacity;
                call.write_output(1, &capacity.to_le_bytes())
            }
            FunctionId::KeyDerivationSetCapacity => {
                let capacity = call.pack.capacity;
                call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?
                    .set_capacity(capacity)
            }
            FunctionId::KeyDerivationInputBytes => {
                let data = call.input(1);
                call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?
                    .input(caller, step, data)
            }
            FunctionId::KeyDerivationInputKey => {
                let alg = call
                    .lookup::<KeyDerivationOperation>(&mut drivers.operations)?
                    .alg;
                let key = policy_key(drivers, caller, call.pack.key_id, KeyUsage::DERIVE, alg)?;
                if !matches!(key.key_type(), KeyType::DERIVE | KeyType::RAW_DATA) {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?
                    .input(caller, step, key.material())
            }
            FunctionId::KeyDerivationKeyAgreement => {
                call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?;
                let secret = Self::agree(drivers, call)?;
                call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?
                    .input(caller, step, &secret[..])
            }
            FunctionId::KeyDerivationOutputBytes => {
                let ctx = call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?;
                let out = call.output(1)?;
                let len = out.capacity();
                ctx.read(out.buffer())?;
                out.set_len(len)
            }
            FunctionId::KeyDerivationOutputKey => {
                let attrs = attributes(call.input(1))?;
                let ctx = call.lookup::<KeyDerivationOperation>(&mut drivers.operations)?;
                let material = ctx.key_material(&attrs, drivers.platform.as_mut())?;
                let id = create_owned(drivers, caller, &attrs, &material)?;
                call.write_output(1, &id.to_le_bytes())
            }
            FunctionId::KeyDerivationAbort => {
                call.abort(&mut drivers.operations);
                Ok(())
            }
            FunctionId::RawKeyAgreement => {
                if Algorithm(call.pack.alg) != Algorithm::ECDH {
                    return Err(PsaError::NOT_SUPPORTED);
                }
                let secret = Self::agree(drivers, call)?;
                call.write_output(0, &secret[..])
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
