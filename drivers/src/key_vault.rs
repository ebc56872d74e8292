/*++

Licensed under the Apache-2.0 license.

File Name:

    key_vault.rs

Abstract:

    File contains the key vault: loaded key slots with their attributes and
    material, plus the emulated persistent key store.

--*/

use crate::ecc384::{Ecc384, ECC384_PRIV_KEY_SIZE, ECC384_PUB_KEY_SIZE};
use tzcrypto_api::crypto::{
    key_id_is_user, key_id_is_volatile, Algorithm, KeyAttributes, KeyId, KeyType, KeyUsage,
    KEY_ID_NULL, KEY_ID_VOLATILE_MAX, KEY_ID_VOLATILE_MIN, KEY_LIFETIME_PERSISTENT,
    KEY_LIFETIME_VOLATILE,
};
use tzcrypto_api::ClientId;
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest key accepted by the vault
pub const KEY_MATERIAL_MAX: usize = 256;

/// Key bytes, wiped when dropped
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    bytes: [u8; KEY_MATERIAL_MAX],
    len: usize,
}

impl KeyMaterial {
    pub fn new(data: &[u8]) -> PsaResult<Self> {
        if data.len() > KEY_MATERIAL_MAX {
            return Err(PsaError::NOT_SUPPORTED);
        }
        let mut bytes = [0u8; KEY_MATERIAL_MAX];
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self {
            bytes,
            len: data.len(),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A key together with its policy
#[derive(Clone)]
pub struct KeySlot {
    attributes: KeyAttributes,
    material: KeyMaterial,
    /// Creator, kept with persistent keys so a later open can be checked
    creator: ClientId,
}

impl KeySlot {
    /// Validate `material` against `attributes` and build a slot. The
    /// returned attributes have `bits` filled in.
    pub fn new(attributes: &KeyAttributes, material: &[u8], creator: ClientId) -> PsaResult<Self> {
        let mut attributes = *attributes;
        let bits = Self::validate_material(attributes.key_type(), material)?;
        if attributes.bits() != 0 && attributes.bits() != bits {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        attributes.bits = bits as u16;

        // Permission to sign or verify a hash implies the same for a message.
        let mut usage = attributes.usage();
        if usage.contains(KeyUsage::SIGN_HASH) {
            usage |= KeyUsage::SIGN_MESSAGE;
        }
        if usage.contains(KeyUsage::VERIFY_HASH) {
            usage |= KeyUsage::VERIFY_MESSAGE;
        }
        attributes.usage = usage.bits();

        Ok(Self {
            attributes,
            material: KeyMaterial::new(material)?,
            creator,
        })
    }

    /// Returns the key size in bits for a supported key type.
    fn validate_material(key_type: KeyType, material: &[u8]) -> PsaResult<usize> {
        let len = material.len();
        match key_type {
            KeyType::AES => {
                if !matches!(len, 16 | 24 | 32) {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
            }
            KeyType::HMAC | KeyType::RAW_DATA | KeyType::DERIVE => {
                if len == 0 {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                if len > KEY_MATERIAL_MAX {
                    return Err(PsaError::NOT_SUPPORTED);
                }
            }
            t if t.is_ecc() && t.ecc_family() == KeyType::ECC_FAMILY_SECP_R1 => {
                if t.is_key_pair() {
                    if len != ECC384_PRIV_KEY_SIZE {
                        return Err(PsaError::NOT_SUPPORTED);
                    }
                    Ecc384::check_private_key(material)?;
                } else {
                    if len != ECC384_PUB_KEY_SIZE {
                        return Err(PsaError::NOT_SUPPORTED);
                    }
                    Ecc384::check_public_key(material)?;
                }
                return Ok(384);
            }
            _ => return Err(PsaError::NOT_SUPPORTED),
        }
        Ok(len * 8)
    }

    pub fn attributes(&self) -> &KeyAttributes {
        &self.attributes
    }

    pub fn id(&self) -> KeyId {
        self.attributes.id
    }

    pub fn key_type(&self) -> KeyType {
        self.attributes.key_type()
    }

    pub fn bits(&self) -> usize {
        self.attributes.bits()
    }

    pub fn material(&self) -> &[u8] {
        self.material.as_bytes()
    }

    pub fn creator(&self) -> ClientId {
        self.creator
    }

    pub fn is_persistent(&self) -> bool {
        self.attributes.lifetime != KEY_LIFETIME_VOLATILE
    }

    /// Enforce the key policy for a use of the key.
    ///
    /// A missing usage flag or an algorithm other than the permitted one is
    /// refused. `Algorithm::NONE` checks usage only.
    pub fn check_policy(&self, usage: KeyUsage, alg: Algorithm) -> PsaResult<()> {
        if !self.attributes.usage().contains(usage) {
            return Err(PsaError::NOT_PERMITTED);
        }
        if alg != Algorithm::NONE && !Self::alg_permits(self.attributes.algorithm(), alg) {
            return Err(PsaError::NOT_PERMITTED);
        }
        Ok(())
    }

    fn alg_permits(permitted: Algorithm, requested: Algorithm) -> bool {
        if permitted == requested {
            return true;
        }
        // AEAD policies match regardless of the tag length variant.
        permitted.is_aead()
            && requested.is_aead()
            && permitted.aead_default_tag() == requested.aead_default_tag()
    }
}

/// Key Vault
///
/// Keys are addressed by creator and id together. Volatile ids are unique
/// across creators; each creator has its own range of persistent ids.
pub struct KeyVault {
    /// Loaded keys
    slots: Vec<Option<KeySlot>>,

    /// Persistent keys, whether loaded or not
    storage: Vec<KeySlot>,

    next_volatile: KeyId,
}

impl KeyVault {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            storage: Vec::new(),
            next_volatile: KEY_ID_VOLATILE_MIN,
        }
    }

    fn position(&self, id: KeyId, owner: ClientId) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|s| s.id() == id && s.creator == owner)
        })
    }

    fn id_in_use(&self, id: KeyId) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.as_ref().is_some_and(|s| s.id() == id))
    }

    fn stored(&self, id: KeyId, owner: ClientId) -> Option<&KeySlot> {
        self.storage
            .iter()
            .find(|s| s.id() == id && s.creator == owner)
    }

    fn free_slot(&self) -> PsaResult<usize> {
        self.slots
            .iter()
            .position(Option::is_none)
            .ok_or(PsaError::INSUFFICIENT_MEMORY)
    }

    fn allocate_volatile_id(&mut self) -> PsaResult<KeyId> {
        let span = (KEY_ID_VOLATILE_MAX - KEY_ID_VOLATILE_MIN + 1) as usize;
        for _ in 0..span.min(self.slots.len() + 1) {
            let id = self.next_volatile;
            self.next_volatile = if id == KEY_ID_VOLATILE_MAX {
                KEY_ID_VOLATILE_MIN
            } else {
                id + 1
            };
            if !self.id_in_use(id) {
                return Ok(id);
            }
        }
        Err(PsaError::INSUFFICIENT_MEMORY)
    }

    /// Create and load a key. Persistent keys are also written to storage.
    ///
    /// # Returns
    ///
    /// * `KeyId` - identifier of the new key
    pub fn create(
        &mut self,
        attributes: &KeyAttributes,
        material: &[u8],
        creator: ClientId,
    ) -> PsaResult<KeyId> {
        let mut slot = KeySlot::new(attributes, material, creator)?;
        let idx = self.free_slot()?;
        match attributes.lifetime {
            KEY_LIFETIME_VOLATILE => {
                if attributes.id != KEY_ID_NULL {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                slot.attributes.id = self.allocate_volatile_id()?;
            }
            KEY_LIFETIME_PERSISTENT => {
                if !key_id_is_user(attributes.id) {
                    return Err(PsaError::INVALID_ARGUMENT);
                }
                if self.stored(attributes.id, creator).is_some() {
                    return Err(PsaError::ALREADY_EXISTS);
                }
                self.storage.push(slot.clone());
            }
            _ => return Err(PsaError::INVALID_ARGUMENT),
        }
        let id = slot.id();
        self.slots[idx] = Some(slot);
        log::debug!("[vault] created key 0x{:08x} in slot {}", id, idx);
        Ok(id)
    }

    pub fn get(&self, id: KeyId, owner: ClientId) -> PsaResult<&KeySlot> {
        self.position(id, owner)
            .and_then(|idx| self.slots[idx].as_ref())
            .ok_or(PsaError::INVALID_HANDLE)
    }

    pub fn is_loaded(&self, id: KeyId, owner: ClientId) -> bool {
        self.position(id, owner).is_some()
    }

    /// Destroy a loaded key and its stored copy. Material is wiped on drop.
    pub fn destroy(&mut self, id: KeyId, owner: ClientId) -> PsaResult<()> {
        let idx = self.position(id, owner).ok_or(PsaError::INVALID_HANDLE)?;
        self.slots[idx] = None;
        self.storage
            .retain(|s| !(s.id() == id && s.creator == owner));
        Ok(())
    }

    /// Drop the loaded copy of a persistent key and keep it in storage.
    pub fn unload(&mut self, id: KeyId, owner: ClientId) -> PsaResult<()> {
        let idx = self.position(id, owner).ok_or(PsaError::INVALID_HANDLE)?;
        if !self.slots[idx].as_ref().is_some_and(KeySlot::is_persistent) {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        self.slots[idx] = None;
        Ok(())
    }

    /// Load the persistent key `caller` stored under `id`. Keys other
    /// callers stored under the same id are not visible.
    pub fn open(&mut self, id: KeyId, caller: ClientId) -> PsaResult<()> {
        if key_id_is_volatile(id) || !key_id_is_user(id) {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        let stored = self
            .stored(id, caller)
            .ok_or(PsaError::DOES_NOT_EXIST)?
            .clone();
        if self.is_loaded(id, caller) {
            return Ok(());
        }
        let idx = self.free_slot()?;
        self.slots[idx] = Some(stored);
        Ok(())
    }

    /// Number of loaded keys
    pub fn loaded(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}
