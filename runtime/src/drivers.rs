/*++

Licensed under the Apache-2.0 license.

File Name:

    drivers.rs

Abstract:

    File contains the state owned by the crypto service: the key vault, the
    key ownership table, the operation pool and the platform.

--*/

use crate::config::CRYPTO_MAX_KEY_HANDLES;
use crate::key_owner::KeyOwnerTable;
use crate::operation::OperationPool;
use crate::platform::{BuiltinKeySource, Platform};
use tzcrypto_api::crypto::{key_id_is_builtin, KeyId};
use tzcrypto_api::ClientId;
use tzcrypto_drivers::{KeySlot, KeyVault};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

pub struct Drivers {
    pub key_vault: KeyVault,
    pub key_owners: KeyOwnerTable,
    pub operations: OperationPool,
    pub platform: Box<dyn Platform>,
}

impl Drivers {
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self {
            key_vault: KeyVault::new(CRYPTO_MAX_KEY_HANDLES),
            key_owners: KeyOwnerTable::new(),
            operations: OperationPool::new(),
            platform,
        }
    }

    /// Resolve a key for use by `caller`.
    ///
    /// Builtin ids are served from the platform table; every other id must
    /// be owned by the caller. The returned slot is a copy that wipes itself
    /// when dropped.
    pub fn key(&mut self, caller: ClientId, id: KeyId) -> PsaResult<KeySlot> {
        if key_id_is_builtin(id) {
            return self.builtin_key(caller, id);
        }
        self.key_owners.check_owner(id, caller)?;
        self.key_vault.get(id, caller).cloned()
    }

    fn builtin_key(&mut self, caller: ClientId, id: KeyId) -> PsaResult<KeySlot> {
        let desc = self
            .platform
            .builtin_key(id)
            .cloned()
            .ok_or(PsaError::INVALID_HANDLE)?;
        if !desc.allowed_clients.contains(&caller) {
            return Err(PsaError::NOT_PERMITTED);
        }
        let mut attributes = desc.attributes;
        attributes.id = id;
        let material = match &desc.source {
            BuiltinKeySource::Static(bytes) => Zeroizing::new(bytes.to_vec()),
            BuiltinKeySource::Huk(label) => {
                let mut out = Zeroizing::new(vec![0u8; attributes.bits().div_ceil(8)]);
                self.platform.derive_from_huk(label, &mut out)?;
                out
            }
        };
        KeySlot::new(&attributes, &material, caller)
    }
}
