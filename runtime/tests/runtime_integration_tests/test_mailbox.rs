// Licensed under the Apache-2.0 license

use crate::common::{aes_attributes, init_logging, spm, MailboxHarness, CLIENT_A, MAILBOX_SLOTS};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tzcrypto_api::crypto::{Algorithm, KeyUsage};
use tzcrypto_api::mailbox::ClientParams;
use tzcrypto_api::{CRYPTO_SID, CRYPTO_VERSION, PSA_FRAMEWORK_VERSION};
use tzcrypto_client::{HashOperation, Transport};
use tzcrypto_error::PsaError;
use tzcrypto_mailbox::{EmuLink, NsMailbox, NsMemory};
use tzcrypto_runtime::SpeMailbox;

#[test]
fn test_versions_over_mailbox() {
    let harness = MailboxHarness::new(spm());
    let crypto = harness.client(CLIENT_A);
    assert_eq!(
        crypto.transport().framework_version(),
        Ok(PSA_FRAMEWORK_VERSION)
    );
    assert_eq!(crypto.transport().version(CRYPTO_SID), Ok(CRYPTO_VERSION));
    crypto.crypto_init().unwrap();

    let handle = crypto.transport().connect(CRYPTO_SID, CRYPTO_VERSION).unwrap();
    assert!(handle > 0);
    crypto.transport().close(handle).unwrap();
    assert_eq!(
        crypto.transport().connect(0x1234, 1),
        Err(PsaError::CONNECTION_REFUSED)
    );
}

#[test]
fn test_crypto_over_mailbox() {
    let harness = MailboxHarness::new(spm());
    let crypto = harness.client(CLIENT_A);

    let message = b"sent through shared memory";
    let mut digest = [0u8; 32];
    assert_eq!(crypto.hash_compute(Algorithm::SHA_256, message, &mut digest), Ok(32));
    assert_eq!(digest.as_slice(), Sha256::digest(message).as_slice());

    // Operation handles travel back through the output descriptors.
    let mut op = HashOperation::new();
    crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
    assert!(op.is_active());
    crypto.hash_update(&mut op, &message[..4]).unwrap();
    crypto.hash_update(&mut op, &message[4..]).unwrap();
    let mut multi = [0u8; 32];
    crypto.hash_finish(&mut op, &mut multi).unwrap();
    assert_eq!(multi, digest);

    let key = crypto
        .import_key(
            &aes_attributes(KeyUsage::ENCRYPT | KeyUsage::DECRYPT, Algorithm::GCM),
            b"THIS IS MY KEY1\0",
        )
        .unwrap();
    let mut sealed = [0u8; 64];
    let len = crypto
        .aead_encrypt(key, Algorithm::GCM, b"twelve bytes", b"ad", message, &mut sealed)
        .unwrap();
    let mut opened = [0u8; 64];
    let n = crypto
        .aead_decrypt(key, Algorithm::GCM, b"twelve bytes", b"ad", &sealed[..len], &mut opened)
        .unwrap();
    assert_eq!(&opened[..n], message);

    // Nothing is copied back from a refused call.
    let mut exported = [0xaau8; 16];
    assert_eq!(
        crypto.export_key(key, &mut exported),
        Err(PsaError::NOT_PERMITTED)
    );
    assert_eq!(exported, [0xaau8; 16]);
}

#[test]
fn test_concurrent_mailbox_clients() {
    let harness = MailboxHarness::new(spm());
    let workers: Vec<_> = (0..MAILBOX_SLOTS as i32)
        .map(|i| {
            let crypto = harness.client(-10 - i);
            std::thread::spawn(move || {
                for round in 0..16u32 {
                    let message = format!("client {i} round {round}");
                    let mut digest = [0u8; 32];
                    crypto
                        .hash_compute(Algorithm::SHA_256, message.as_bytes(), &mut digest)
                        .unwrap();
                    assert_eq!(digest.as_slice(), Sha256::digest(message.as_bytes()).as_slice());
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(harness.mailbox.empty_slots().count_ones() as usize, MAILBOX_SLOTS);
}

#[test]
fn test_secure_identity_is_refused() {
    let harness = MailboxHarness::new(spm());
    let crypto = harness.client(3);
    assert_eq!(
        crypto.transport().framework_version(),
        Err(PsaError::MAILBOX_INVAL_PARAMS)
    );
    let mut digest = [0u8; 32];
    assert_eq!(
        crypto.hash_compute(Algorithm::SHA_256, b"abc", &mut digest),
        Err(PsaError::MAILBOX_INVAL_PARAMS)
    );
}

#[test]
fn test_queue_full_until_a_reply_is_collected() {
    init_logging();
    let (ns_hal, spe_hal) = EmuLink::pair();
    let mailbox = Arc::new(NsMailbox::new(ns_hal, MAILBOX_SLOTS).unwrap());
    mailbox.connect_irq().unwrap();
    let memory = NsMemory::new(1, 512).unwrap();
    let queue = spe_hal.connect(MAILBOX_SLOTS).unwrap();
    let spe = SpeMailbox::new(spe_hal, queue, memory).unwrap();
    let mut spm = spm();

    let version = ClientParams::Version { sid: CRYPTO_SID };
    let handles: Vec<_> = (0..MAILBOX_SLOTS)
        .map(|_| mailbox.enqueue(&version, CLIENT_A).unwrap())
        .collect();
    assert_eq!(mailbox.empty_slots(), 0);
    assert_eq!(
        mailbox.enqueue(&version, CLIENT_A).err(),
        Some(PsaError::MAILBOX_QUEUE_FULL)
    );

    // A reply alone does not free the slot.
    assert_eq!(spe.handle_pending(&mut spm), MAILBOX_SLOTS);
    assert_eq!(
        mailbox.enqueue(&version, CLIENT_A).err(),
        Some(PsaError::MAILBOX_QUEUE_FULL)
    );

    assert_eq!(
        mailbox.dequeue_reply(handles[2]),
        Ok(CRYPTO_VERSION as i32)
    );
    let again = mailbox.enqueue(&version, CLIENT_A).unwrap();
    assert_eq!(again.index(), handles[2].index());
    assert_eq!(
        mailbox.enqueue(&version, CLIENT_A).err(),
        Some(PsaError::MAILBOX_QUEUE_FULL)
    );

    assert_eq!(spe.handle_pending(&mut spm), 1);
    for handle in [handles[0], handles[1], handles[3], again] {
        assert_eq!(mailbox.dequeue_reply(handle), Ok(CRYPTO_VERSION as i32));
    }
    assert_eq!(spe.handle_pending(&mut spm), 0);
}
