// Licensed under the Apache-2.0 license

use crate::common::{aes_attributes, lock_client};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Nonce};
use tzcrypto_api::crypto::{Algorithm, KeyId, KeyUsage};
use tzcrypto_client::{AeadOperation, LockedTransport, PsaCrypto};
use tzcrypto_error::PsaError;
use tzcrypto_runtime::Spm;

const KEY: &[u8; 16] = b"THIS IS MY KEY1\0";
const NONCE: &[u8; 12] = b"unique nonce";
const AD: &[u8] = b"header that is authenticated";
const PLAINTEXT: &[u8] = b"The quick brown fox jumps over the lazy dog";
const TAG_LEN: usize = 16;

fn gcm_key(crypto: &PsaCrypto<LockedTransport<Spm>>) -> KeyId {
    crypto
        .import_key(
            &aes_attributes(KeyUsage::ENCRYPT | KeyUsage::DECRYPT, Algorithm::GCM),
            KEY,
        )
        .unwrap()
}

fn reference_seal(nonce: &[u8], ad: &[u8], plaintext: &[u8]) -> Vec<u8> {
    Aes128Gcm::new_from_slice(KEY)
        .unwrap()
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad: ad })
        .unwrap()
}

#[test]
fn test_gcm_single_shot_against_reference() {
    let crypto = lock_client();
    let key = gcm_key(&crypto);

    let mut sealed = [0u8; 128];
    let len = crypto
        .aead_encrypt(key, Algorithm::GCM, NONCE, AD, PLAINTEXT, &mut sealed)
        .unwrap();
    assert_eq!(len, PLAINTEXT.len() + TAG_LEN);
    assert_eq!(&sealed[..len], reference_seal(NONCE, AD, PLAINTEXT).as_slice());

    let mut opened = [0u8; 128];
    let n = crypto
        .aead_decrypt(key, Algorithm::GCM, NONCE, AD, &sealed[..len], &mut opened)
        .unwrap();
    assert_eq!(&opened[..n], PLAINTEXT);
}

#[test]
fn test_gcm_tampering_is_detected() {
    let crypto = lock_client();
    let key = gcm_key(&crypto);
    let sealed = reference_seal(NONCE, AD, PLAINTEXT);
    let mut opened = [0u8; 128];

    for flip in [0, PLAINTEXT.len() - 1, PLAINTEXT.len(), sealed.len() - 1] {
        let mut bad = sealed.clone();
        bad[flip] ^= 0x01;
        assert_eq!(
            crypto.aead_decrypt(key, Algorithm::GCM, NONCE, AD, &bad, &mut opened),
            Err(PsaError::INVALID_SIGNATURE)
        );
    }
    assert_eq!(
        crypto.aead_decrypt(key, Algorithm::GCM, NONCE, b"other header", &sealed, &mut opened),
        Err(PsaError::INVALID_SIGNATURE)
    );
    // Shorter than a tag.
    assert_eq!(
        crypto.aead_decrypt(key, Algorithm::GCM, NONCE, AD, &sealed[..TAG_LEN - 1], &mut opened),
        Err(PsaError::INVALID_SIGNATURE)
    );
}

#[test]
fn test_gcm_multipart_matches_single_shot() {
    let crypto = lock_client();
    let key = gcm_key(&crypto);

    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_set_nonce(&mut op, NONCE).unwrap();
    crypto
        .aead_set_lengths(&mut op, AD.len(), PLAINTEXT.len())
        .unwrap();
    let (ad_1, ad_2) = AD.split_at(10);
    crypto.aead_update_ad(&mut op, ad_1).unwrap();
    crypto.aead_update_ad(&mut op, ad_2).unwrap();
    let mut scratch = [0u8; 64];
    for chunk in PLAINTEXT.chunks(16) {
        assert_eq!(crypto.aead_update(&mut op, chunk, &mut scratch), Ok(0));
    }
    let mut ciphertext = [0u8; 64];
    let mut tag = [0u8; TAG_LEN];
    let (ct_len, tag_len) = crypto
        .aead_finish(&mut op, &mut ciphertext, &mut tag)
        .unwrap();
    assert_eq!((ct_len, tag_len), (PLAINTEXT.len(), TAG_LEN));
    assert!(!op.is_active());

    let expected = reference_seal(NONCE, AD, PLAINTEXT);
    assert_eq!(&ciphertext[..ct_len], &expected[..ct_len]);
    assert_eq!(&tag[..], &expected[ct_len..]);

    let mut op = AeadOperation::new();
    crypto.aead_decrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_set_nonce(&mut op, NONCE).unwrap();
    crypto.aead_update_ad(&mut op, AD).unwrap();
    crypto
        .aead_update(&mut op, &ciphertext[..ct_len], &mut scratch)
        .unwrap();
    let mut plaintext = [0u8; 64];
    assert_eq!(
        crypto.aead_verify(&mut op, &mut plaintext, &tag),
        Ok(PLAINTEXT.len())
    );
    assert_eq!(&plaintext[..PLAINTEXT.len()], PLAINTEXT);

    tag[0] ^= 0xff;
    let mut op = AeadOperation::new();
    crypto.aead_decrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_set_nonce(&mut op, NONCE).unwrap();
    crypto.aead_update_ad(&mut op, AD).unwrap();
    crypto
        .aead_update(&mut op, &ciphertext[..ct_len], &mut scratch)
        .unwrap();
    assert_eq!(
        crypto.aead_verify(&mut op, &mut plaintext, &tag),
        Err(PsaError::INVALID_SIGNATURE)
    );
    assert!(!op.is_active());
}

#[test]
fn test_gcm_generated_nonce() {
    let crypto = lock_client();
    let key = gcm_key(&crypto);
    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    let mut nonce = [0u8; 12];
    assert_eq!(crypto.aead_generate_nonce(&mut op, &mut nonce), Ok(12));
    assert_eq!(
        crypto.aead_set_nonce(&mut op, NONCE),
        Err(PsaError::BAD_STATE)
    );
    assert!(!op.is_active());

    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_generate_nonce(&mut op, &mut nonce).unwrap();
    let mut scratch = [0u8; 64];
    crypto.aead_update(&mut op, PLAINTEXT, &mut scratch).unwrap();
    let mut ciphertext = [0u8; 64];
    let mut tag = [0u8; TAG_LEN];
    let (ct_len, _) = crypto
        .aead_finish(&mut op, &mut ciphertext, &mut tag)
        .unwrap();
    let expected = reference_seal(&nonce, &[], PLAINTEXT);
    assert_eq!(&ciphertext[..ct_len], &expected[..ct_len]);
    assert_eq!(&tag[..], &expected[ct_len..]);
}

#[test]
fn test_gcm_ordering() {
    let crypto = lock_client();
    let key = gcm_key(&crypto);
    let mut scratch = [0u8; 16];

    // Data before a nonce.
    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    assert_eq!(
        crypto.aead_update(&mut op, b"early", &mut scratch),
        Err(PsaError::BAD_STATE)
    );
    assert!(!op.is_active());

    // Associated data after the payload started.
    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_set_nonce(&mut op, NONCE).unwrap();
    crypto.aead_update(&mut op, b"payload", &mut scratch).unwrap();
    assert_eq!(
        crypto.aead_update_ad(&mut op, b"late"),
        Err(PsaError::BAD_STATE)
    );

    // Declared lengths are enforced at the end.
    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_set_nonce(&mut op, NONCE).unwrap();
    crypto.aead_set_lengths(&mut op, 0, 10).unwrap();
    crypto.aead_update(&mut op, b"short", &mut scratch).unwrap();
    let mut tag = [0u8; TAG_LEN];
    assert_eq!(
        crypto.aead_finish(&mut op, &mut scratch, &mut tag),
        Err(PsaError::INVALID_ARGUMENT)
    );

    // Verify belongs to decryption.
    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_set_nonce(&mut op, NONCE).unwrap();
    assert_eq!(
        crypto.aead_verify(&mut op, &mut scratch, &tag),
        Err(PsaError::BAD_STATE)
    );

    let mut op = AeadOperation::new();
    crypto.aead_encrypt_setup(&mut op, key, Algorithm::GCM).unwrap();
    crypto.aead_abort(&mut op).unwrap();
    crypto.aead_abort(&mut op).unwrap();
}

#[test]
fn test_aead_arguments() {
    let crypto = lock_client();
    let key = gcm_key(&crypto);
    let mut out = [0u8; 64];
    // The pack carries at most 16 nonce bytes.
    assert_eq!(
        crypto.aead_encrypt(key, Algorithm::GCM, &[0u8; 17], &[], b"x", &mut out),
        Err(PsaError::INVALID_ARGUMENT)
    );
    assert_eq!(
        crypto.aead_encrypt(key, Algorithm::CCM, NONCE, &[], b"x", &mut out),
        Err(PsaError::NOT_SUPPORTED)
    );

    let ctr_key = crypto
        .import_key(&aes_attributes(KeyUsage::ENCRYPT, Algorithm::CTR), KEY)
        .unwrap();
    assert_eq!(
        crypto.aead_encrypt(ctr_key, Algorithm::GCM, NONCE, &[], b"x", &mut out),
        Err(PsaError::NOT_PERMITTED)
    );
    let mut op = AeadOperation::new();
    assert_eq!(
        crypto.aead_decrypt_setup(&mut op, ctr_key, Algorithm::GCM),
        Err(PsaError::NOT_PERMITTED)
    );
}
