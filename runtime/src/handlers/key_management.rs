/*++

Licensed under the Apache-2.0 license.

File Name:

    key_management.rs

Abstract:

    File contains the key lifecycle calls. Every key created through the
    service is recorded against its creator in the ownership table.

--*/

use crate::call::CryptoCall;
use crate::Drivers;
use tzcrypto_api::crypto::{
    key_id_is_builtin, key_id_is_volatile, Algorithm, KeyAttributes, KeyId, KeyType, KeyUsage,
};
use tzcrypto_api::{ClientId, FunctionId};
use tzcrypto_drivers::{Ecc384, KEY_MATERIAL_MAX};
use tzcrypto_error::{PsaError, PsaResult};
use zerocopy::{FromBytes, IntoBytes};
use zeroize::Zeroizing;

const SECP_R1_KEY_PAIR: KeyType = KeyType::ecc_key_pair(KeyType::ECC_FAMILY_SECP_R1);

/// Decode key attributes from an input vector.
pub(crate) fn attributes(data: &[u8]) -> PsaResult<KeyAttributes> {
    KeyAttributes::read_from_bytes(data).map_err(|_| PsaError::PROGRAMMER_ERROR)
}

/// Create a key and record `caller` as its owner. The key is destroyed
/// again if the ownership table has no room for it.
pub(crate) fn create_owned(
    drivers: &mut Drivers,
    caller: ClientId,
    attrs: &KeyAttributes,
    material: &[u8],
) -> PsaResult<KeyId> {
    if key_id_is_builtin(attrs.id) {
        return Err(PsaError::INVALID_ARGUMENT);
    }
    let id = drivers.key_vault.create(attrs, material, caller)?;
    if let Err(err) = drivers.key_owners.record_owner(id, caller) {
        drivers.key_vault.destroy(id, caller).ok();
        return Err(err);
    }
    log::debug!("[crypto] key 0x{:08x} created for {}", id, caller);
    Ok(id)
}

pub struct KeyManagementCmd;

impl KeyManagementCmd {
    fn generate_material(
        drivers: &mut Drivers,
        attrs: &KeyAttributes,
    ) -> PsaResult<Zeroizing<Vec<u8>>> {
        let bits = attrs.bits();
        let len = match attrs.key_type() {
            KeyType::AES => {
                if !matches!(bits, 128 | 192 | 256) {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                bits / 8
            }
            KeyType::HMAC | KeyType::RAW_DATA | KeyType::DERIVE => {
                if bits == 0 || bits % 8 != 0 {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                if bits / 8 > KEY_MATERIAL_MAX {
                    return Err(PsaError::NOT_SUPPORTED);
                }
                bits / 8
            }
            SECP_R1_KEY_PAIR => {
                if bits != 0 && bits != 384 {
                    return Err(PsaError::NOT_SUPPORTED);
                }
                let platform = &mut drivers.platform;
                let priv_key = Ecc384::gen_private_key(|buf| platform.fill_random(buf))?;
                return Ok(Zeroizing::new(priv_key.to_vec()));
            }
            t if t.is_public_key() => return Err(PsaError::INVALID_ARGUMENT),
            _ => return Err(PsaError::NOT_SUPPORTED),
        };
        let mut material = Zeroizing::new(vec![0u8; len]);
        drivers.platform.fill_random(&mut material)?;
        Ok(material)
    }

    /// Attributes of a copy: type and size must match the source when
    /// given, usage narrows, and the algorithm is inherited when left open.
    fn copy_attributes(source: &KeyAttributes, requested: &KeyAttributes) -> PsaResult<KeyAttributes> {
        if requested.key_type != 0 && requested.key_type != source.key_type {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        if requested.bits != 0 && requested.bits != source.bits {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let alg = match requested.algorithm() {
            Algorithm::NONE => source.algorithm(),
            alg if alg == source.algorithm() => alg,
            _ => return Err(PsaError::INVALID_ARGUMENT),
        };
        Ok(KeyAttributes {
            key_type: source.key_type,
            bits: source.bits,
            lifetime: requested.lifetime,
            id: requested.id,
            usage: (source.usage() & requested.usage()).bits(),
            alg: alg.0,
        })
    }

    pub(crate) fn execute(drivers: &mut Drivers, call: &mut CryptoCall) -> PsaResult<()> {
        let (caller, key_id) = (call.caller, call.pack.key_id);
        match call.fid {
            FunctionId::GetKeyAttributes => {
                let key = drivers.key(caller, key_id)?;
                call.write_output(0, key.attributes().as_bytes())
            }
            FunctionId::ImportKey => {
                let attrs = attributes(call.input(1))?;
                let id = create_owned(drivers, caller, &attrs, call.input(2))?;
                call.write_output(0, &id.to_le_bytes())
            }
            FunctionId::GenerateKey => {
                let attrs = attributes(call.input(1))?;
                let material = Self::generate_material(drivers, &attrs)?;
                let id = create_owned(drivers, caller, &attrs, &material)?;
                call.write_output(0, &id.to_le_bytes())
            }
            FunctionId::CopyKey => {
                let source = drivers.key(caller, key_id)?;
                source.check_policy(KeyUsage::COPY, Algorithm::NONE)?;
                let attrs = Self::copy_attributes(source.attributes(), &attributes(call.input(1))?)?;
                let id = create_owned(drivers, caller, &attrs, source.material())?;
                call.write_output(0, &id.to_le_bytes())
            }
            FunctionId::OpenKey => {
                drivers.key_vault.open(key_id, caller)?;
                drivers.key_owners.record_owner(key_id, caller)?;
                call.write_output(0, &key_id.to_le_bytes())
            }
            FunctionId::CloseKey => {
                if key_id_is_builtin(key_id) {
                    return Ok(());
                }
                drivers.key_owners.check_owner(key_id, caller)?;
                if drivers.key_vault.get(key_id, caller)?.is_persistent() {
                    drivers.key_vault.unload(key_id, caller)?;
                } else {
                    drivers.key_vault.destroy(key_id, caller)?;
                }
                drivers.key_owners.clear_owner(key_id, caller);
                Ok(())
            }
            FunctionId::DestroyKey => {
                if key_id_is_builtin(key_id) {
                    return Err(PsaError::NOT_PERMITTED);
                }
                drivers.key_owners.check_owner(key_id, caller)?;
                drivers.key_vault.destroy(key_id, caller)?;
                drivers.key_owners.clear_owner(key_id, caller);
                log::debug!("[crypto] key 0x{:08x} destroyed", key_id);
                Ok(())
            }
            FunctionId::PurgeKey => {
                // Builtin keys hold no cached copy and volatile keys have
                // nowhere else to live.
                if key_id_is_builtin(key_id) {
                    return Ok(());
                }
                drivers.key_owners.check_owner(key_id, caller)?;
                if key_id_is_volatile(key_id) {
                    return Ok(());
                }
                drivers.key_vault.unload(key_id, caller)?;
                drivers.key_owners.clear_owner(key_id, caller);
                Ok(())
            }
            FunctionId::ExportKey => {
                let key = drivers.key(caller, key_id)?;
                if !key.key_type().is_public_key() {
                    key.check_policy(KeyUsage::EXPORT, Algorithm::NONE)?;
                }
                call.write_output(0, key.material())
            }
            FunctionId::ExportPublicKey => {
                let key = drivers.key(caller, key_id)?;
                match key.key_type() {
                    SECP_R1_KEY_PAIR => call.write_output(0, &Ecc384::public_key(key.material())?),
                    t if t.is_public_key() => call.write_output(0, key.material()),
                    _ => Err(PsaError::INVALID_ARGUMENT),
                }
            }
            _ => Err(PsaError::NOT_SUPPORTED),
        }
    }
}
