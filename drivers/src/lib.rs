/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the crypto primitive backend used by the
    secure crypto service.

--*/

mod aes_cipher;
mod ecc384;
mod gcm;
mod kdf;
mod key_vault;
mod mac;
mod sha;
mod tls12_prf;

pub use aes_cipher::{AesCipherOp, AesMode, AesOperation, AES_BLOCK_SIZE};
pub use ecc384::{
    Ecc384, ECC384_PRIV_KEY_SIZE, ECC384_PUB_KEY_SIZE, ECC384_SHARED_SECRET_SIZE,
    ECC384_SIGNATURE_SIZE,
};
pub use gcm::{AesGcm, AesGcmOp, GCM_MAX_BUFFERED, GCM_NONCE_SIZE, GCM_TAG_SIZE};
pub use kdf::{hkdf_derive, HkdfExpand};
pub use key_vault::{KeyMaterial, KeySlot, KeyVault, KEY_MATERIAL_MAX};
pub use mac::{hmac_compute, CmacOp, HmacOp, CMAC_TAG_SIZE};
pub use sha::{sha_digest, ShaDigest, ShaDigestOp, ShaMode, SHA_MAX_BLOCK_SIZE, SHA_MAX_DIGEST_SIZE};
pub use tls12_prf::Tls12Prf;

/// Compare two buffers in time independent of where they differ.
///
/// Lengths are not secret; a length mismatch still visits every byte of the
/// shorter input before failing.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        let n = a.len().min(b.len());
        let _ = constant_time_eq::constant_time_eq(&a[..n], &b[..n]);
        return false;
    }
    constant_time_eq::constant_time_eq(a, b)
}
