/*++

Licensed under the Apache-2.0 license.

File Name:

    platform.rs

Abstract:

    File contains the platform services the crypto service consumes: the
    hardware unique key, the builtin key table, the random source and the
    fail-stop hook. Also provides a software platform for hosts.

--*/

use crate::fail_stop::FailStopReason;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tzcrypto_api::crypto::{KeyAttributes, KeyId};
use tzcrypto_api::ClientId;
use tzcrypto_drivers::{hkdf_derive, ShaMode};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

pub const HUK_SIZE: usize = 32;

/// Where the bytes of a builtin key come from.
#[derive(Clone)]
pub enum BuiltinKeySource {
    Static(Zeroizing<Vec<u8>>),
    /// Derived from the hardware unique key with this label.
    Huk(Vec<u8>),
}

/// Read-only descriptor of a key provisioned by the platform.
#[derive(Clone)]
pub struct BuiltinKeyDescriptor {
    pub id: KeyId,
    /// Type, bits, usage and algorithm of the key. `bits` sizes HUK-derived
    /// material.
    pub attributes: KeyAttributes,
    pub allowed_clients: Vec<ClientId>,
    pub source: BuiltinKeySource,
}

pub trait Platform: Send {
    /// Copy the hardware unique key into `out` and return its length.
    fn get_hardware_unique_key(&self, out: &mut [u8]) -> PsaResult<usize>;

    fn builtin_keys(&self) -> &[BuiltinKeyDescriptor];

    fn fill_random(&mut self, buf: &mut [u8]) -> PsaResult<()>;

    /// Derive key material from the hardware unique key.
    ///
    /// `label` is used as given. Derivation calls prefix it with the
    /// caller's partition id; builtin keys pass their descriptor label.
    fn derive_from_huk(&mut self, label: &[u8], out: &mut [u8]) -> PsaResult<()> {
        let mut huk = Zeroizing::new([0u8; HUK_SIZE]);
        let len = self.get_hardware_unique_key(&mut huk[..])?;
        hkdf_derive(ShaMode::Sha256, &[], &huk[..len], label, out)
            .map_err(|_| PsaError::HARDWARE_FAILURE)
    }

    /// Called when a boundary check crosses its violation threshold. The
    /// service stops answering requests after this returns.
    fn fail_stop(&mut self, reason: FailStopReason) {
        log::error!("[platform] fail-stop: {reason:?}");
    }

    fn builtin_key(&self, id: KeyId) -> Option<&BuiltinKeyDescriptor> {
        self.builtin_keys().iter().find(|desc| desc.id == id)
    }
}

/// Platform backed by host randomness and a fixed HUK.
pub struct SoftwarePlatform {
    huk: Zeroizing<[u8; HUK_SIZE]>,
    builtin_keys: Vec<BuiltinKeyDescriptor>,
    rng: StdRng,
    fail_stops: Vec<FailStopReason>,
}

impl SoftwarePlatform {
    pub fn new(huk: [u8; HUK_SIZE]) -> Self {
        Self {
            huk: Zeroizing::new(huk),
            builtin_keys: Vec::new(),
            rng: StdRng::from_entropy(),
            fail_stops: Vec::new(),
        }
    }

    /// Reproducible random stream for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_builtin_key(mut self, desc: BuiltinKeyDescriptor) -> Self {
        self.builtin_keys.push(desc);
        self
    }

    pub fn fail_stops(&self) -> &[FailStopReason] {
        &self.fail_stops
    }
}

impl Platform for SoftwarePlatform {
    fn get_hardware_unique_key(&self, out: &mut [u8]) -> PsaResult<usize> {
        let out = out
            .get_mut(..HUK_SIZE)
            .ok_or(PsaError::BUFFER_TOO_SMALL)?;
        out.copy_from_slice(&self.huk[..]);
        Ok(HUK_SIZE)
    }

    fn builtin_keys(&self) -> &[BuiltinKeyDescriptor] {
        &self.builtin_keys
    }

    fn fill_random(&mut self, buf: &mut [u8]) -> PsaResult<()> {
        self.rng
            .try_fill_bytes(buf)
            .map_err(|_| PsaError::INSUFFICIENT_ENTROPY)
    }

    fn fail_stop(&mut self, reason: FailStopReason) {
        log::error!("[platform] fail-stop: {reason:?}");
        self.fail_stops.push(reason);
    }
}
