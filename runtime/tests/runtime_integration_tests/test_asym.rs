// Licensed under the Apache-2.0 license

use crate::common::{lock_client, LockHarness, spm, CLIENT_A, CLIENT_B};
use p384::ecdsa::signature::Verifier;
use p384::ecdsa::{Signature, VerifyingKey};
use sha2::{Digest, Sha384};
use tzcrypto_api::crypto::{Algorithm, KeyAttributes, KeyDerivationStep, KeyType, KeyUsage};
use tzcrypto_client::KeyDerivationOperation;
use tzcrypto_error::PsaError;

const ECDSA_SHA384: Algorithm = Algorithm::ecdsa(Algorithm::SHA_384);
const KEY_PAIR: KeyType = KeyType::ecc_key_pair(KeyType::ECC_FAMILY_SECP_R1);
const PUBLIC_KEY: KeyType = KeyType::ecc_public_key(KeyType::ECC_FAMILY_SECP_R1);

const SCALAR_A: [u8; 48] = [0x11; 48];
const SCALAR_B: [u8; 48] = [0x22; 48];

fn signing_attributes() -> KeyAttributes {
    KeyAttributes::new()
        .with_type(KEY_PAIR)
        .with_bits(384)
        .with_usage(KeyUsage::SIGN_HASH | KeyUsage::VERIFY_HASH)
        .with_algorithm(ECDSA_SHA384)
}

fn ecdh_attributes() -> KeyAttributes {
    KeyAttributes::new()
        .with_type(KEY_PAIR)
        .with_usage(KeyUsage::DERIVE)
        .with_algorithm(Algorithm::ECDH)
}

#[test]
fn test_ecdsa_sign_and_verify() {
    let crypto = lock_client();
    let key = crypto.generate_key(&signing_attributes()).unwrap();
    assert_eq!(crypto.get_key_information(key), Ok((KEY_PAIR, 384)));

    let message = b"message to be signed";
    let mut signature = [0u8; 96];
    assert_eq!(
        crypto.sign_message(key, ECDSA_SHA384, message, &mut signature),
        Ok(96)
    );
    crypto
        .verify_message(key, ECDSA_SHA384, message, &signature)
        .unwrap();

    let digest = Sha384::digest(message);
    crypto
        .verify_hash(key, ECDSA_SHA384, &digest, &signature)
        .unwrap();

    let mut public = [0u8; 97];
    assert_eq!(crypto.export_public_key(key, &mut public), Ok(97));
    let verifying_key = VerifyingKey::from_sec1_bytes(&public).unwrap();
    let reference = Signature::from_slice(&signature).unwrap();
    verifying_key.verify(message, &reference).unwrap();

    signature[10] ^= 0x04;
    assert_eq!(
        crypto.verify_message(key, ECDSA_SHA384, message, &signature),
        Err(PsaError::INVALID_SIGNATURE)
    );
}

#[test]
fn test_ecdsa_hash_length_and_policy() {
    let crypto = lock_client();
    let key = crypto.import_key(&signing_attributes(), &SCALAR_A).unwrap();
    let mut signature = [0u8; 96];
    assert_eq!(
        crypto.sign_hash(key, ECDSA_SHA384, &[0u8; 32], &mut signature),
        Err(PsaError::INVALID_ARGUMENT)
    );
    let other = Algorithm::ecdsa(Algorithm::SHA_256);
    assert_eq!(
        crypto.sign_hash(key, other, &[0u8; 32], &mut signature),
        Err(PsaError::NOT_PERMITTED)
    );
    assert_eq!(
        crypto.sign_message(key, Algorithm::hmac(Algorithm::SHA_384), b"m", &mut signature),
        Err(PsaError::NOT_SUPPORTED)
    );
}

#[test]
fn test_verify_with_public_key_only() {
    let crypto = lock_client();
    let pair = crypto.import_key(&signing_attributes(), &SCALAR_A).unwrap();
    let mut public = [0u8; 97];
    crypto.export_public_key(pair, &mut public).unwrap();

    let public_attrs = KeyAttributes::new()
        .with_type(PUBLIC_KEY)
        .with_usage(KeyUsage::VERIFY_HASH)
        .with_algorithm(ECDSA_SHA384);
    let verifier = crypto.import_key(&public_attrs, &public).unwrap();

    let mut signature = [0u8; 96];
    crypto
        .sign_message(pair, ECDSA_SHA384, b"hello", &mut signature)
        .unwrap();
    crypto
        .verify_message(verifier, ECDSA_SHA384, b"hello", &signature)
        .unwrap();
    assert_eq!(
        crypto.sign_message(verifier, ECDSA_SHA384, b"hello", &mut signature),
        Err(PsaError::NOT_PERMITTED)
    );

    // Public keys export without the export usage.
    let mut exported = [0u8; 97];
    assert_eq!(crypto.export_key(verifier, &mut exported), Ok(97));
    assert_eq!(exported, public);
}

#[test]
fn test_raw_ecdh_agrees() {
    let harness = LockHarness::new(spm());
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);
    let a = alice.import_key(&ecdh_attributes(), &SCALAR_A).unwrap();
    let b = bob.import_key(&ecdh_attributes(), &SCALAR_B).unwrap();

    let mut a_pub = [0u8; 97];
    let mut b_pub = [0u8; 97];
    alice.export_public_key(a, &mut a_pub).unwrap();
    bob.export_public_key(b, &mut b_pub).unwrap();

    let mut ab = [0u8; 48];
    let mut ba = [0u8; 48];
    assert_eq!(alice.raw_key_agreement(Algorithm::ECDH, a, &b_pub, &mut ab), Ok(48));
    assert_eq!(bob.raw_key_agreement(Algorithm::ECDH, b, &a_pub, &mut ba), Ok(48));
    assert_eq!(ab, ba);

    let secret = p384::SecretKey::from_slice(&SCALAR_A).unwrap();
    let peer = p384::PublicKey::from_sec1_bytes(&b_pub).unwrap();
    let expected = p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    assert_eq!(&ab[..], expected.raw_secret_bytes().as_slice());

    // Bob cannot run agreements with Alice's key.
    assert_eq!(
        bob.raw_key_agreement(Algorithm::ECDH, a, &b_pub, &mut ba),
        Err(PsaError::NOT_PERMITTED)
    );
    assert_eq!(
        alice.raw_key_agreement(Algorithm::ECDH, a, &b_pub[..96], &mut ab),
        Err(PsaError::INVALID_ARGUMENT)
    );
}

#[test]
fn test_key_agreement_feeds_derivation() {
    let harness = LockHarness::new(spm());
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);
    let a = alice.import_key(&ecdh_attributes(), &SCALAR_A).unwrap();
    let b = bob.import_key(&ecdh_attributes(), &SCALAR_B).unwrap();
    let mut a_pub = [0u8; 97];
    let mut b_pub = [0u8; 97];
    alice.export_public_key(a, &mut a_pub).unwrap();
    bob.export_public_key(b, &mut b_pub).unwrap();

    let hkdf = Algorithm::hkdf(Algorithm::SHA_256);
    let mut okm = [[0u8; 32]; 2];
    for (i, (crypto, key, peer)) in [(&alice, a, &b_pub), (&bob, b, &a_pub)]
        .into_iter()
        .enumerate()
    {
        let mut op = KeyDerivationOperation::new();
        crypto.key_derivation_setup(&mut op, hkdf).unwrap();
        crypto
            .key_derivation_key_agreement(&mut op, KeyDerivationStep::Secret, key, peer)
            .unwrap();
        crypto
            .key_derivation_input_bytes(&mut op, KeyDerivationStep::Info, b"session")
            .unwrap();
        crypto
            .key_derivation_output_bytes(&mut op, &mut okm[i])
            .unwrap();
        crypto.key_derivation_abort(&mut op).unwrap();
    }
    assert_eq!(okm[0], okm[1]);
}

#[test]
fn test_asymmetric_encryption_not_supported() {
    let crypto = lock_client();
    let key = crypto.import_key(&signing_attributes(), &SCALAR_A).unwrap();
    let mut out = [0u8; 128];
    assert_eq!(
        crypto.asymmetric_encrypt(key, Algorithm::RSA_PKCS1V15_CRYPT, b"data", &[], &mut out),
        Err(PsaError::NOT_SUPPORTED)
    );
    assert_eq!(
        crypto.asymmetric_decrypt(key, Algorithm::RSA_PKCS1V15_CRYPT, b"data", &[], &mut out),
        Err(PsaError::NOT_SUPPORTED)
    );
    // The key is still resolved first.
    assert_eq!(
        crypto.asymmetric_encrypt(key + 100, Algorithm::RSA_PKCS1V15_CRYPT, b"data", &[], &mut out),
        Err(PsaError::INVALID_HANDLE)
    );
}
