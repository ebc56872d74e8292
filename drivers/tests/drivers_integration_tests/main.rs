// Licensed under the Apache-2.0 license

//! Published known-answer vectors run against the public driver surface.

use p384::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use tzcrypto_drivers::{
    hmac_compute, sha_digest, AesCipherOp, AesGcm, AesMode, AesOperation, CmacOp, Ecc384,
    ShaMode,
};

const AES_128_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
const SP800_38A_PLAINTEXT: &str = "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51";

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap()
}

fn run_cipher(mode: AesMode, op: AesOperation, key: &[u8], iv: Option<&[u8]>, input: &[u8]) -> Vec<u8> {
    let mut cipher = AesCipherOp::new(mode, op, key).unwrap();
    if let Some(iv) = iv {
        cipher.set_iv(iv).unwrap();
    }
    let mut out = vec![0u8; input.len() + 32];
    let n = cipher.update(input, &mut out).unwrap();
    let m = cipher.finish(&mut out[n..]).unwrap();
    out.truncate(n + m);
    out
}

#[test]
fn test_sha2_abc() {
    let cases = [
        (ShaMode::Sha224, "23097d223405d8228642a477bda255b32aadbce4bda0b3f7e36c9da7"),
        (
            ShaMode::Sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ),
        (
            ShaMode::Sha384,
            "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed8086072ba1e7cc2358baeca134c825a7",
        ),
        (
            ShaMode::Sha512,
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f",
        ),
    ];
    for (mode, expected) in cases {
        let digest = sha_digest(mode, b"abc");
        assert_eq!(hex::encode(digest.as_bytes()), expected, "{mode:?}");
        assert_eq!(digest.len(), mode.digest_len());
    }
}

// RFC 4231 test case 1
#[test]
fn test_hmac_sha384() {
    let tag = hmac_compute(ShaMode::Sha384, &[0x0b; 20], b"Hi There").unwrap();
    assert_eq!(
        hex::encode(tag.as_bytes()),
        "afd03944d84895626b0825f4ab46907f15f9dadbe4101ec682aa034c7cebc59cfaea9ea9076ede7f4af152e8b2fa9cb6"
    );
}

// RFC 4493 example 2
#[test]
fn test_cmac_one_block() {
    let mut cmac = CmacOp::new(&unhex(AES_128_KEY)).unwrap();
    let message = unhex(SP800_38A_PLAINTEXT);
    cmac.update(&message[..5]);
    cmac.update(&message[5..16]);
    let mut tag = [0u8; 16];
    assert_eq!(cmac.finalize(&mut tag), Ok(16));
    assert_eq!(hex::encode(tag), "070a16b46b4d4144f79bdd9dd04a287c");
}

// SP 800-38A F.2.1
#[test]
fn test_aes_cbc_known_answer() {
    let key = unhex(AES_128_KEY);
    let iv = unhex("000102030405060708090a0b0c0d0e0f");
    let plaintext = unhex(SP800_38A_PLAINTEXT);
    let ciphertext = run_cipher(AesMode::Cbc, AesOperation::Encrypt, &key, Some(&iv), &plaintext);
    assert_eq!(
        hex::encode(&ciphertext),
        "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2"
    );
    let recovered = run_cipher(AesMode::Cbc, AesOperation::Decrypt, &key, Some(&iv), &ciphertext);
    assert_eq!(recovered, plaintext);
}

// SP 800-38A F.5.1
#[test]
fn test_aes_ctr_known_answer() {
    let key = unhex(AES_128_KEY);
    let counter = unhex("f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff");
    let plaintext = unhex(SP800_38A_PLAINTEXT);
    let ciphertext = run_cipher(AesMode::Ctr, AesOperation::Encrypt, &key, Some(&counter), &plaintext);
    assert_eq!(
        hex::encode(ciphertext),
        "874d6191b620e3261bef6864990db6ce9806f66b7970fdff8617187bb9fffdff"
    );
}

// McGrew-Viega GCM test case 2
#[test]
fn test_aes_gcm_known_answer() {
    let key = [0u8; 16];
    let nonce = [0u8; 12];
    let mut sealed = [0u8; 32];
    assert_eq!(AesGcm::encrypt(&key, &nonce, &[], &[0u8; 16], &mut sealed), Ok(32));
    assert_eq!(
        hex::encode(sealed),
        "0388dace60b6a392f328c2b971b2fe78ab6e47d42cec13bdf53a67b21257bddf"
    );
    let mut opened = [0xffu8; 16];
    assert_eq!(AesGcm::decrypt(&key, &nonce, &[], &sealed, &mut opened), Ok(16));
    assert_eq!(opened, [0u8; 16]);
}

#[test]
fn test_ecdsa_matches_reference() {
    let priv_key = [0x42u8; 48];
    let hash = sha_digest(ShaMode::Sha384, b"known answer");
    let signature = Ecc384::sign_hash(&priv_key, hash.as_bytes()).unwrap();

    let reference_key = SigningKey::from_slice(&priv_key).unwrap();
    let reference: Signature = reference_key.sign_prehash(hash.as_bytes()).unwrap();
    assert_eq!(&signature[..], reference.to_bytes().as_slice());

    let pub_key = Ecc384::public_key(&priv_key).unwrap();
    let verifying_key = VerifyingKey::from_sec1_bytes(&pub_key).unwrap();
    verifying_key
        .verify_prehash(hash.as_bytes(), &Signature::from_slice(&signature).unwrap())
        .unwrap();
}
