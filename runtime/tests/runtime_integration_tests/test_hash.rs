// Licensed under the Apache-2.0 license

use crate::common::{lock_client, spm, LockHarness, MailboxHarness, CLIENT_A, CLIENT_B};
use sha2::{Digest, Sha256, Sha384};
use tzcrypto_api::crypto::Algorithm;
use tzcrypto_client::HashOperation;
use tzcrypto_error::PsaError;
use tzcrypto_runtime::config::{CRYPTO_CONC_OPER_NUM, CRYPTO_IOVEC_BUFFER_SIZE};

const PART_1: &[u8] = b"This is my test message, ";
const PART_2: &[u8] = b"please generate a hash for this.";

#[test]
fn test_hash_multipart_matches_single_shot() {
    let crypto = lock_client();
    let whole = [PART_1, PART_2].concat();

    let mut single = [0u8; 32];
    assert_eq!(crypto.hash_compute(Algorithm::SHA_256, &whole, &mut single), Ok(32));
    assert_eq!(single.as_slice(), Sha256::digest(&whole).as_slice());

    let mut op = HashOperation::new();
    crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
    assert!(op.is_active());
    crypto.hash_update(&mut op, PART_1).unwrap();
    crypto.hash_update(&mut op, PART_2).unwrap();
    let mut multi = [0u8; 32];
    assert_eq!(crypto.hash_finish(&mut op, &mut multi), Ok(32));
    assert!(!op.is_active());
    assert_eq!(multi, single);

    crypto
        .hash_compare(Algorithm::SHA_256, &whole, &single)
        .unwrap();
    single[0] ^= 1;
    assert_eq!(
        crypto.hash_compare(Algorithm::SHA_256, &whole, &single),
        Err(PsaError::INVALID_SIGNATURE)
    );
}

#[test]
fn test_hash_clone_forks_state() {
    let crypto = lock_client();
    let mut op = HashOperation::new();
    crypto.hash_setup(&mut op, Algorithm::SHA_384).unwrap();
    crypto.hash_update(&mut op, PART_1).unwrap();

    let mut fork = HashOperation::new();
    crypto.hash_clone(&op, &mut fork).unwrap();
    assert!(fork.is_active());
    assert_ne!(fork.handle(), op.handle());

    crypto.hash_update(&mut fork, PART_2).unwrap();
    let mut forked = [0u8; 48];
    crypto.hash_finish(&mut fork, &mut forked).unwrap();
    assert_eq!(
        forked.as_slice(),
        Sha384::digest([PART_1, PART_2].concat()).as_slice()
    );

    // The source still holds only the first part.
    crypto
        .hash_verify(&mut op, Sha384::digest(PART_1).as_slice())
        .unwrap();
    assert!(!op.is_active());
}

#[test]
fn test_hash_verify_mismatch_releases_operation() {
    let crypto = lock_client();
    let mut op = HashOperation::new();
    crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
    crypto.hash_update(&mut op, b"abc").unwrap();
    assert_eq!(
        crypto.hash_verify(&mut op, &[0u8; 32]),
        Err(PsaError::INVALID_SIGNATURE)
    );
    assert!(!op.is_active());
    assert_eq!(
        crypto.hash_update(&mut op, b"more"),
        Err(PsaError::BAD_STATE)
    );

    // Every slot is free again.
    let mut ops: Vec<HashOperation> = (0..tzcrypto_runtime::config::CRYPTO_CONC_OPER_NUM)
        .map(|_| HashOperation::new())
        .collect();
    for op in ops.iter_mut() {
        crypto.hash_setup(op, Algorithm::SHA_256).unwrap();
    }
}

#[test]
fn test_hash_abort_is_idempotent() {
    let crypto = lock_client();
    let mut op = HashOperation::new();
    crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
    crypto.hash_abort(&mut op).unwrap();
    assert!(!op.is_active());
    crypto.hash_abort(&mut op).unwrap();
    assert_eq!(
        crypto.hash_update(&mut op, b"late"),
        Err(PsaError::BAD_STATE)
    );
}

#[test]
fn test_hash_rejects_non_hash_algorithm() {
    let crypto = lock_client();
    let mut op = HashOperation::new();
    assert_eq!(
        crypto.hash_setup(&mut op, Algorithm::CBC_NO_PADDING),
        Err(PsaError::NOT_SUPPORTED)
    );
    assert!(!op.is_active());
    let mut digest = [0u8; 64];
    assert_eq!(
        crypto.hash_compute(Algorithm::hmac(Algorithm::SHA_256), b"abc", &mut digest),
        Err(PsaError::NOT_SUPPORTED)
    );
}

#[test]
fn test_operations_belong_to_their_caller() {
    let harness = LockHarness::new(spm());
    let alice = harness.client(CLIENT_A);
    let bob = harness.client(CLIENT_B);

    let mut op = HashOperation::new();
    alice.hash_setup(&mut op, Algorithm::SHA_256).unwrap();

    let mut digest = [0u8; 32];
    let mut stolen = HashOperation::new();
    bob.hash_clone(&op, &mut stolen).unwrap_err();
    assert!(!stolen.is_active());

    alice.hash_update(&mut op, b"abc").unwrap();
    alice.hash_finish(&mut op, &mut digest).unwrap();
    assert_eq!(digest.as_slice(), Sha256::digest(b"abc").as_slice());
}

#[test]
fn test_operation_pool_exhaustion() {
    let crypto = lock_client();
    let mut ops: Vec<HashOperation> = Vec::new();
    loop {
        let mut op = HashOperation::new();
        match crypto.hash_setup(&mut op, Algorithm::SHA_256) {
            Ok(()) => ops.push(op),
            Err(err) => {
                assert_eq!(err, PsaError::INSUFFICIENT_MEMORY);
                break;
            }
        }
    }
    assert_eq!(ops.len(), CRYPTO_CONC_OPER_NUM);

    // One slot freed is one setup allowed.
    crypto.hash_abort(&mut ops[0]).unwrap();
    let mut op = HashOperation::new();
    crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
}

#[test]
fn test_oversized_update_frees_slot() {
    let harness = LockHarness::new(spm());
    let crypto = harness.client(CLIENT_A);
    let big = vec![0x5au8; CRYPTO_IOVEC_BUFFER_SIZE + 880];

    for _ in 0..=CRYPTO_CONC_OPER_NUM {
        let mut op = HashOperation::new();
        crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
        assert_eq!(
            crypto.hash_update(&mut op, &big),
            Err(PsaError::INSUFFICIENT_MEMORY)
        );
        assert!(!op.is_active());
        crypto.hash_abort(&mut op).unwrap();
    }

    let in_use = harness
        .interface
        .dispatch(|spm| spm.drivers().operations.in_use())
        .unwrap();
    assert_eq!(in_use, 0);
}

#[test]
fn test_oversized_update_over_mailbox() {
    let harness = MailboxHarness::new(spm());
    let crypto = harness.client(CLIENT_A);
    let big = vec![0u8; CRYPTO_IOVEC_BUFFER_SIZE + 1];

    for _ in 0..=CRYPTO_CONC_OPER_NUM {
        let mut op = HashOperation::new();
        crypto.hash_setup(&mut op, Algorithm::SHA_256).unwrap();
        assert_eq!(
            crypto.hash_update(&mut op, &big),
            Err(PsaError::INSUFFICIENT_MEMORY)
        );
        crypto.hash_abort(&mut op).unwrap();
    }
    assert_eq!(harness.shutdown().drivers().operations.in_use(), 0);
}
