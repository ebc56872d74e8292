// Licensed under the Apache-2.0 license

use crate::common::{
    aes_attributes, lock_client, platform, spm_with, LockHarness, CLIENT_A, CLIENT_B,
};
use tzcrypto_api::crypto::{
    key_id_is_volatile, Algorithm, KeyAttributes, KeyType, KeyUsage, KEY_LIFETIME_PERSISTENT,
};
use tzcrypto_error::PsaError;
use tzcrypto_runtime::{BuiltinKeyDescriptor, BuiltinKeySource, InitParams};
use zeroize::Zeroizing;

const KEY: &[u8; 16] = b"THIS IS MY KEY1\0";
const BUILTIN_AES: u32 = 0x7fff_0001;

#[test]
fn test_import_export_destroy() {
    let crypto = lock_client();
    let attrs = aes_attributes(KeyUsage::EXPORT | KeyUsage::ENCRYPT, Algorithm::CBC_NO_PADDING);
    let key = crypto.import_key(&attrs, KEY).unwrap();
    assert!(key_id_is_volatile(key));

    assert_eq!(crypto.get_key_information(key), Ok((KeyType::AES, 128)));
    let fetched = crypto.get_key_attributes(key).unwrap();
    assert_eq!(fetched.algorithm(), Algorithm::CBC_NO_PADDING);
    assert_eq!(fetched.usage(), KeyUsage::EXPORT | KeyUsage::ENCRYPT);

    let mut exported = [0u8; 32];
    assert_eq!(crypto.export_key(key, &mut exported), Ok(16));
    assert_eq!(&exported[..16], KEY);

    crypto.destroy_key(key).unwrap();
    assert_eq!(
        crypto.get_key_information(key).err(),
        Some(PsaError::INVALID_HANDLE)
    );
    assert_eq!(crypto.destroy_key(key), Err(PsaError::INVALID_HANDLE));
}

#[test]
fn test_export_needs_usage() {
    let crypto = lock_client();
    let key = crypto
        .import_key(&aes_attributes(KeyUsage::ENCRYPT, Algorithm::CBC_NO_PADDING), KEY)
        .unwrap();
    let mut exported = [0u8; 16];
    assert_eq!(
        crypto.export_key(key, &mut exported),
        Err(PsaError::NOT_PERMITTED)
    );
    assert_eq!(exported, [0u8; 16]);
}

#[test]
fn test_bad_key_material() {
    let crypto = lock_client();
    let attrs = aes_attributes(KeyUsage::ENCRYPT, Algorithm::CTR);
    assert_eq!(
        crypto.import_key(&attrs, &KEY[..15]),
        Err(PsaError::INVALID_ARGUMENT)
    );
    // 128 declared, 256 given.
    assert_eq!(
        crypto.import_key(&attrs, &[0x11; 32]),
        Err(PsaError::INVALID_ARGUMENT)
    );
}

#[test]
fn test_keys_belong_to_their_creator() {
    let harness = LockHarness::new(spm_with(platform(), InitParams::default()));
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);

    let attrs = aes_attributes(KeyUsage::EXPORT, Algorithm::CTR);
    let key = alice.import_key(&attrs, KEY).unwrap();

    let mut out = [0u8; 16];
    assert_eq!(bob.export_key(key, &mut out), Err(PsaError::NOT_PERMITTED));
    assert_eq!(bob.destroy_key(key), Err(PsaError::NOT_PERMITTED));
    assert_eq!(
        bob.get_key_attributes(key).err(),
        Some(PsaError::NOT_PERMITTED)
    );
    assert_eq!(
        bob.get_key_attributes(key + 1).err(),
        Some(PsaError::INVALID_HANDLE)
    );

    // Untouched by the refused attempts.
    assert_eq!(alice.export_key(key, &mut out), Ok(16));
}

#[test]
fn test_generate_and_copy() {
    let crypto = lock_client();
    let attrs = aes_attributes(
        KeyUsage::EXPORT | KeyUsage::COPY | KeyUsage::ENCRYPT,
        Algorithm::CTR,
    )
    .with_bits(256);
    let key = crypto.generate_key(&attrs).unwrap();
    let mut original = [0u8; 32];
    assert_eq!(crypto.export_key(key, &mut original), Ok(32));
    assert_ne!(original, [0u8; 32]);

    // The copy keeps only the usage both policies grant.
    let narrowed = KeyAttributes::new().with_usage(KeyUsage::EXPORT | KeyUsage::DECRYPT);
    let copy = crypto.copy_key(key, &narrowed).unwrap();
    let copied = crypto.get_key_attributes(copy).unwrap();
    assert_eq!(copied.usage(), KeyUsage::EXPORT);
    assert_eq!((copied.key_type(), copied.bits()), (KeyType::AES, 256));
    assert_eq!(copied.algorithm(), Algorithm::CTR);

    let mut duplicate = [0u8; 32];
    crypto.export_key(copy, &mut duplicate).unwrap();
    assert_eq!(duplicate, original);

    let no_copy = crypto
        .import_key(&aes_attributes(KeyUsage::EXPORT, Algorithm::CTR), KEY)
        .unwrap();
    assert_eq!(
        crypto.copy_key(no_copy, &narrowed),
        Err(PsaError::NOT_PERMITTED)
    );
}

#[test]
fn test_persistent_key_close_and_open() {
    let harness = LockHarness::new(spm_with(platform(), InitParams::default()));
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);

    let attrs = aes_attributes(KeyUsage::EXPORT, Algorithm::CTR).with_id(0x42);
    assert_eq!(attrs.lifetime, KEY_LIFETIME_PERSISTENT);
    assert_eq!(alice.import_key(&attrs, KEY), Ok(0x42));
    assert_eq!(
        alice.import_key(&attrs, KEY),
        Err(PsaError::ALREADY_EXISTS)
    );

    alice.close_key(0x42).unwrap();
    assert_eq!(
        alice.get_key_attributes(0x42).err(),
        Some(PsaError::INVALID_HANDLE)
    );

    // Persistent ids are per partition; bob has nothing stored under 0x42.
    assert_eq!(bob.open_key(0x42), Err(PsaError::DOES_NOT_EXIST));
    assert_eq!(alice.open_key(0x42), Ok(0x42));
    let mut exported = [0u8; 16];
    assert_eq!(alice.export_key(0x42, &mut exported), Ok(16));
    assert_eq!(&exported, KEY);

    alice.purge_key(0x42).unwrap();
    assert_eq!(alice.open_key(0x42), Ok(0x42));
    alice.destroy_key(0x42).unwrap();
    assert_eq!(alice.open_key(0x42), Err(PsaError::DOES_NOT_EXIST));
}

#[test]
fn test_same_persistent_id_in_two_partitions() {
    let harness = LockHarness::new(spm_with(platform(), InitParams::default()));
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);
    let attrs = aes_attributes(KeyUsage::EXPORT, Algorithm::CTR).with_id(1);
    let bob_key = [0x77u8; 16];

    assert_eq!(alice.import_key(&attrs, KEY), Ok(1));
    assert_eq!(bob.import_key(&attrs, &bob_key), Ok(1));

    let mut exported = [0u8; 16];
    alice.export_key(1, &mut exported).unwrap();
    assert_eq!(&exported, KEY);
    bob.export_key(1, &mut exported).unwrap();
    assert_eq!(exported, bob_key);

    // Closing and reopening picks each partition's own copy.
    alice.close_key(1).unwrap();
    bob.close_key(1).unwrap();
    assert_eq!(bob.open_key(1), Ok(1));
    assert_eq!(alice.open_key(1), Ok(1));
    alice.export_key(1, &mut exported).unwrap();
    assert_eq!(&exported, KEY);

    alice.destroy_key(1).unwrap();
    assert_eq!(alice.open_key(1), Err(PsaError::DOES_NOT_EXIST));
    bob.export_key(1, &mut exported).unwrap();
    assert_eq!(exported, bob_key);
}

#[test]
fn test_close_volatile_key_destroys_it() {
    let crypto = lock_client();
    let key = crypto
        .import_key(&aes_attributes(KeyUsage::EXPORT, Algorithm::CTR), KEY)
        .unwrap();
    crypto.close_key(key).unwrap();
    assert_eq!(
        crypto.get_key_attributes(key).err(),
        Some(PsaError::INVALID_HANDLE)
    );
}

#[test]
fn test_builtin_keys() {
    let descriptor = BuiltinKeyDescriptor {
        id: BUILTIN_AES,
        attributes: aes_attributes(KeyUsage::ENCRYPT | KeyUsage::DECRYPT, Algorithm::CBC_PKCS7),
        allowed_clients: vec![CLIENT_A],
        source: BuiltinKeySource::Static(Zeroizing::new(KEY.to_vec())),
    };
    let harness = LockHarness::new(spm_with(
        platform().with_builtin_key(descriptor),
        InitParams::default(),
    ));
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);

    assert_eq!(
        alice.get_key_information(BUILTIN_AES),
        Ok((KeyType::AES, 128))
    );
    let mut ct = [0u8; 48];
    let ct_len = alice
        .cipher_encrypt(BUILTIN_AES, Algorithm::CBC_PKCS7, b"builtin", &mut ct)
        .unwrap();
    let mut pt = [0u8; 32];
    assert_eq!(
        alice.cipher_decrypt(BUILTIN_AES, Algorithm::CBC_PKCS7, &ct[..ct_len], &mut pt),
        Ok(7)
    );
    assert_eq!(&pt[..7], b"builtin");

    assert_eq!(
        bob.cipher_encrypt(BUILTIN_AES, Algorithm::CBC_PKCS7, b"builtin", &mut ct),
        Err(PsaError::NOT_PERMITTED)
    );
    assert_eq!(
        alice.get_key_information(BUILTIN_AES + 1).err(),
        Some(PsaError::INVALID_HANDLE)
    );

    // Platform keys cannot be removed or exported.
    assert_eq!(alice.destroy_key(BUILTIN_AES), Err(PsaError::NOT_PERMITTED));
    let mut exported = [0u8; 16];
    assert_eq!(
        alice.export_key(BUILTIN_AES, &mut exported),
        Err(PsaError::NOT_PERMITTED)
    );
    // Builtin ids are not available for imported keys.
    let squat = aes_attributes(KeyUsage::EXPORT, Algorithm::CTR).with_id(BUILTIN_AES + 5);
    assert_eq!(alice.import_key(&squat, KEY), Err(PsaError::INVALID_ARGUMENT));
}

#[test]
fn test_generate_random() {
    let crypto = lock_client();
    let mut a = [0u8; 64];
    let mut b = [0u8; 64];
    crypto.generate_random(&mut a).unwrap();
    crypto.generate_random(&mut b).unwrap();
    assert_ne!(a, b);
    assert_ne!(a, [0u8; 64]);
}
