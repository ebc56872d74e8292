// Licensed under the Apache-2.0 license

use crate::common::{aes_attributes, init_logging, spm, LockHarness, CLIENT_A, CLIENT_B};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tzcrypto_api::crypto::{Algorithm, KeyUsage};
use tzcrypto_client::{NsInterface, PsaCrypto, Transport};
use tzcrypto_error::PsaError;
use tzcrypto_runtime::Spm;

#[test]
fn test_dispatch_needs_init() {
    init_logging();
    let interface: Arc<NsInterface<Spm>> = Arc::new(NsInterface::new());
    let crypto = PsaCrypto::new(interface.transport(CLIENT_A));
    assert_eq!(crypto.crypto_init(), Err(PsaError::NS_DISPATCH_ERROR));
    let mut digest = [0u8; 32];
    assert_eq!(
        crypto.hash_compute(Algorithm::SHA_256, b"abc", &mut digest),
        Err(PsaError::NS_DISPATCH_ERROR)
    );

    interface.init(spm()).unwrap();
    crypto.crypto_init().unwrap();
    assert_eq!(
        crypto.hash_compute(Algorithm::SHA_256, b"abc", &mut digest),
        Ok(32)
    );

    assert!(interface.deinit().unwrap().is_some());
    assert_eq!(
        crypto.transport().framework_version(),
        Err(PsaError::NS_DISPATCH_ERROR)
    );
    assert!(interface.deinit().unwrap().is_none());
}

#[test]
fn test_threads_share_one_framework() {
    let harness = LockHarness::new(spm());
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let crypto = harness.client(-20 - i);
            std::thread::spawn(move || {
                let key = crypto
                    .import_key(
                        &aes_attributes(KeyUsage::ENCRYPT | KeyUsage::DECRYPT, Algorithm::GCM),
                        &[i as u8; 16],
                    )
                    .unwrap();
                for round in 0..8u32 {
                    let message = format!("thread {i} round {round}");
                    let mut digest = [0u8; 32];
                    crypto
                        .hash_compute(Algorithm::SHA_256, message.as_bytes(), &mut digest)
                        .unwrap();
                    assert_eq!(digest.as_slice(), Sha256::digest(message.as_bytes()).as_slice());

                    let mut sealed = [0u8; 64];
                    let len = crypto
                        .aead_encrypt(key, Algorithm::GCM, b"twelve bytes", &[], message.as_bytes(), &mut sealed)
                        .unwrap();
                    let mut opened = [0u8; 64];
                    let n = crypto
                        .aead_decrypt(key, Algorithm::GCM, b"twelve bytes", &[], &sealed[..len], &mut opened)
                        .unwrap();
                    assert_eq!(&opened[..n], message.as_bytes());
                }
                key
            })
        })
        .collect();
    let keys: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    // Keys stay with the thread identity that created them.
    let outsider = harness.client(CLIENT_B);
    for key in keys {
        assert_eq!(outsider.destroy_key(key), Err(PsaError::NOT_PERMITTED));
    }

    let spm = harness.interface.deinit().unwrap().unwrap();
    assert!(!spm.is_halted());
}
