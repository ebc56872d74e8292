// Licensed under the Apache-2.0 license

//! Which partition created each live key. Entries pair the key id with
//! its owner, so two partitions may each hold a persistent key with the
//! same id.

use crate::config::CRYPTO_MAX_KEY_HANDLES;
use arrayvec::ArrayVec;
use tzcrypto_api::crypto::KeyId;
use tzcrypto_api::ClientId;
use tzcrypto_error::{PsaError, PsaResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyOwner {
    key_id: KeyId,
    owner: ClientId,
}

#[derive(Debug, Default)]
pub struct KeyOwnerTable {
    entries: ArrayVec<KeyOwner, CRYPTO_MAX_KEY_HANDLES>,
}

impl KeyOwnerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner` as the creator of `key_id`. Recording the same pair
    /// twice is harmless.
    pub fn record_owner(&mut self, key_id: KeyId, owner: ClientId) -> PsaResult<()> {
        let entry = KeyOwner { key_id, owner };
        if self.entries.contains(&entry) {
            return Ok(());
        }
        self.entries
            .try_push(entry)
            .map_err(|_| PsaError::INSUFFICIENT_MEMORY)
    }

    pub fn clear_owner(&mut self, key_id: KeyId, owner: ClientId) {
        self.entries.retain(|e| *e != KeyOwner { key_id, owner });
    }

    /// Check that `caller` owns `key_id`.
    ///
    /// A key only someone else holds is NOT_PERMITTED; an unknown key is
    /// INVALID_HANDLE.
    pub fn check_owner(&self, key_id: KeyId, caller: ClientId) -> PsaResult<()> {
        let mut held = self.entries.iter().filter(|e| e.key_id == key_id).peekable();
        if held.peek().is_none() {
            return Err(PsaError::INVALID_HANDLE);
        }
        if held.any(|e| e.owner == caller) {
            Ok(())
        } else {
            Err(PsaError::NOT_PERMITTED)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
