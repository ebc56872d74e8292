/*++

Licensed under the Apache-2.0 license.

File Name:

    ecc384.rs

Abstract:

    File contains Elliptic Curve Cryptography on secp384r1: key checks,
    ECDSA over a precomputed hash and ECDH.

--*/

use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use tzcrypto_error::{PsaError, PsaResult};
use zeroize::Zeroizing;

/// Private scalar size in bytes
pub const ECC384_PRIV_KEY_SIZE: usize = 48;

/// Uncompressed SEC1 point size in bytes (0x04 || X || Y)
pub const ECC384_PUB_KEY_SIZE: usize = 97;

/// Raw r || s signature size in bytes
pub const ECC384_SIGNATURE_SIZE: usize = 96;

/// ECDH shared secret (X coordinate) size in bytes
pub const ECC384_SHARED_SECRET_SIZE: usize = 48;

/// Attempts at drawing a valid scalar before giving up
const KEY_GEN_RETRIES: usize = 8;

pub enum Ecc384 {}

impl Ecc384 {
    fn signing_key(priv_key: &[u8]) -> PsaResult<SigningKey> {
        if priv_key.len() != ECC384_PRIV_KEY_SIZE {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        SigningKey::from_slice(priv_key).map_err(|_| PsaError::INVALID_ARGUMENT)
    }

    fn verifying_key(pub_key: &[u8]) -> PsaResult<VerifyingKey> {
        if pub_key.len() != ECC384_PUB_KEY_SIZE {
            return Err(PsaError::INVALID_ARGUMENT);
        }
        VerifyingKey::from_sec1_bytes(pub_key).map_err(|_| PsaError::INVALID_ARGUMENT)
    }

    /// Check that the bytes are a scalar in [1, n - 1].
    pub fn check_private_key(priv_key: &[u8]) -> PsaResult<()> {
        Self::signing_key(priv_key).map(|_| ())
    }

    /// Check that the bytes are an uncompressed point on the curve.
    pub fn check_public_key(pub_key: &[u8]) -> PsaResult<()> {
        Self::verifying_key(pub_key).map(|_| ())
    }

    /// Generate a private key from a random source.
    ///
    /// # Arguments
    ///
    /// * `fill_random` - Fills a buffer with random bytes
    pub fn gen_private_key<F>(mut fill_random: F) -> PsaResult<Zeroizing<[u8; ECC384_PRIV_KEY_SIZE]>>
    where
        F: FnMut(&mut [u8]) -> PsaResult<()>,
    {
        let mut candidate = Zeroizing::new([0u8; ECC384_PRIV_KEY_SIZE]);
        for _ in 0..KEY_GEN_RETRIES {
            fill_random(&mut candidate[..])?;
            if Self::check_private_key(&candidate[..]).is_ok() {
                return Ok(candidate);
            }
        }
        Err(PsaError::INSUFFICIENT_ENTROPY)
    }

    /// Compute the public point for a private key.
    pub fn public_key(priv_key: &[u8]) -> PsaResult<[u8; ECC384_PUB_KEY_SIZE]> {
        let signing_key = Self::signing_key(priv_key)?;
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut pub_key = [0u8; ECC384_PUB_KEY_SIZE];
        pub_key.copy_from_slice(point.as_bytes());
        Ok(pub_key)
    }

    /// Sign a precomputed hash. Nonces are derived per RFC 6979.
    pub fn sign_hash(priv_key: &[u8], hash: &[u8]) -> PsaResult<[u8; ECC384_SIGNATURE_SIZE]> {
        let signing_key = Self::signing_key(priv_key)?;
        let signature: Signature = signing_key
            .sign_prehash(hash)
            .map_err(|_| PsaError::INVALID_ARGUMENT)?;
        let mut out = [0u8; ECC384_SIGNATURE_SIZE];
        out.copy_from_slice(signature.to_bytes().as_slice());
        Ok(out)
    }

    /// Verify a raw r || s signature over a precomputed hash.
    pub fn verify_hash(pub_key: &[u8], hash: &[u8], signature: &[u8]) -> PsaResult<()> {
        let verifying_key = Self::verifying_key(pub_key)?;
        if signature.len() != ECC384_SIGNATURE_SIZE {
            return Err(PsaError::INVALID_SIGNATURE);
        }
        let signature = Signature::from_slice(signature).map_err(|_| PsaError::INVALID_SIGNATURE)?;
        verifying_key
            .verify_prehash(hash, &signature)
            .map_err(|_| PsaError::INVALID_SIGNATURE)
    }

    /// Elliptic curve Diffie-Hellman. Returns the X coordinate of the shared
    /// point.
    pub fn ecdh(
        priv_key: &[u8],
        peer_pub_key: &[u8],
    ) -> PsaResult<Zeroizing<[u8; ECC384_SHARED_SECRET_SIZE]>> {
        let signing_key = Self::signing_key(priv_key)?;
        let peer = Self::verifying_key(peer_pub_key)?;
        let shared = p384::ecdh::diffie_hellman(signing_key.as_nonzero_scalar(), peer.as_affine());
        let mut secret = Zeroizing::new([0u8; ECC384_SHARED_SECRET_SIZE]);
        secret.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(secret)
    }
}
