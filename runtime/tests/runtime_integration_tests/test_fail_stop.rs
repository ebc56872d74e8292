// Licensed under the Apache-2.0 license

use crate::common::{platform, spm_with, LockHarness, MailboxHarness, CLIENT_A};
use std::sync::{Arc, Mutex};
use tzcrypto_api::crypto::Algorithm;
use tzcrypto_api::mailbox::ClientParams;
use tzcrypto_api::{CRYPTO_HANDLE, CRYPTO_SID, CRYPTO_VERSION, PSA_IPC_CALL, PSA_VERSION_NONE};
use tzcrypto_client::{NsInterface, PsaCrypto, Transport};
use tzcrypto_error::{PsaError, PsaResult};
use tzcrypto_runtime::{
    BuiltinKeyDescriptor, FailStopReason, InitParams, Platform, SoftwarePlatform, Spm,
};

/// Software platform that also shares its fail-stop log with the test.
struct RecordingPlatform {
    inner: SoftwarePlatform,
    stops: Arc<Mutex<Vec<FailStopReason>>>,
}

impl Platform for RecordingPlatform {
    fn get_hardware_unique_key(&self, out: &mut [u8]) -> PsaResult<usize> {
        self.inner.get_hardware_unique_key(out)
    }

    fn builtin_keys(&self) -> &[BuiltinKeyDescriptor] {
        self.inner.builtin_keys()
    }

    fn fill_random(&mut self, buf: &mut [u8]) -> PsaResult<()> {
        self.inner.fill_random(buf)
    }

    fn fail_stop(&mut self, reason: FailStopReason) {
        self.inner.fail_stop(reason);
        self.stops.lock().unwrap().push(reason);
    }
}

fn recording_spm(params: InitParams) -> (Spm, Arc<Mutex<Vec<FailStopReason>>>) {
    let stops = Arc::new(Mutex::new(Vec::new()));
    let platform = RecordingPlatform {
        inner: platform(),
        stops: stops.clone(),
    };
    crate::common::init_logging();
    (Spm::new(Box::new(platform), params), stops)
}

fn bad_call() -> ClientParams {
    ClientParams::Call {
        handle: CRYPTO_HANDLE,
        call_type: PSA_IPC_CALL,
        in_vec: 0xffff_0000,
        in_len: 1,
        out_vec: 0,
        out_len: 0,
    }
}

#[test]
fn test_hidden_service_halts_after_threshold() {
    let (spm, stops) = recording_spm(InitParams {
        ns_access: false,
        ..Default::default()
    });
    let interface = Arc::new(NsInterface::new());
    interface.init(spm).unwrap();
    let crypto = PsaCrypto::new(interface.transport(CLIENT_A));

    // Asking for the version is not an attempt on the service.
    assert_eq!(crypto.transport().version(CRYPTO_SID), Ok(PSA_VERSION_NONE));
    assert_eq!(crypto.crypto_init(), Err(PsaError::CONNECTION_REFUSED));
    assert!(stops.lock().unwrap().is_empty());

    let mut digest = [0u8; 32];
    for _ in 0..2 {
        assert_eq!(
            crypto.hash_compute(Algorithm::SHA_256, b"abc", &mut digest),
            Err(PsaError::CONNECTION_REFUSED)
        );
    }
    assert!(stops.lock().unwrap().is_empty());
    assert_eq!(
        crypto.transport().connect(CRYPTO_SID, CRYPTO_VERSION),
        Err(PsaError::CONNECTION_REFUSED)
    );
    assert_eq!(*stops.lock().unwrap(), [FailStopReason::ServicePermission]);

    // Halted for everyone, secure partitions included.
    let secure = PsaCrypto::new(interface.transport(4));
    assert_eq!(
        secure.hash_compute(Algorithm::SHA_256, b"abc", &mut digest),
        Err(PsaError::SERVICE_FAILURE)
    );
    assert_eq!(secure.transport().version(CRYPTO_SID), Ok(PSA_VERSION_NONE));

    let spm = interface.deinit().unwrap().unwrap();
    assert!(spm.is_halted());
    assert_eq!(spm.violations(FailStopReason::ServicePermission), 3);
    assert_eq!(spm.violations(FailStopReason::MemoryRange), 0);
}

#[test]
fn test_secure_callers_reach_hidden_service() {
    let spm = spm_with(
        platform(),
        InitParams {
            ns_access: false,
            ..Default::default()
        },
    );
    let harness = LockHarness::new(spm);
    let secure = harness.client(9);
    let mut digest = [0u8; 32];
    assert_eq!(
        secure.hash_compute(Algorithm::SHA_256, b"abc", &mut digest),
        Ok(32)
    );
}

#[test]
fn test_bad_descriptors_halt_mailbox_service() {
    let (spm, stops) = recording_spm(InitParams::default());
    let harness = MailboxHarness::new(spm);
    let crypto = harness.client(CLIENT_A);
    let mut digest = [0u8; 32];
    crypto
        .hash_compute(Algorithm::SHA_256, b"before", &mut digest)
        .unwrap();

    for _ in 0..3 {
        assert_eq!(
            harness.mailbox.client_call(&bad_call(), CLIENT_A),
            Ok(PsaError::PROGRAMMER_ERROR.status())
        );
    }
    assert_eq!(*stops.lock().unwrap(), [FailStopReason::MemoryRange]);
    assert_eq!(
        crypto.hash_compute(Algorithm::SHA_256, b"after", &mut digest),
        Err(PsaError::SERVICE_FAILURE)
    );
    assert_eq!(
        crypto.transport().connect(CRYPTO_SID, CRYPTO_VERSION),
        Err(PsaError::SERVICE_FAILURE)
    );

    let spm = harness.shutdown();
    assert!(spm.is_halted());
    assert_eq!(spm.violations(FailStopReason::MemoryRange), 3);
    assert_eq!(spm.violations(FailStopReason::ServicePermission), 0);
}

#[test]
fn test_threshold_of_one() {
    let (spm, stops) = recording_spm(InitParams {
        fail_stop_threshold: 1,
        ..Default::default()
    });
    let harness = MailboxHarness::new(spm);
    assert_eq!(
        harness.mailbox.client_call(&bad_call(), CLIENT_A),
        Ok(PsaError::PROGRAMMER_ERROR.status())
    );
    // Later faults are still counted but the hook runs once.
    assert_eq!(
        harness.mailbox.client_call(&bad_call(), CLIENT_A),
        Ok(PsaError::PROGRAMMER_ERROR.status())
    );
    assert_eq!(stops.lock().unwrap().len(), 1);
    let spm = harness.shutdown();
    assert_eq!(spm.violations(FailStopReason::MemoryRange), 2);
}
