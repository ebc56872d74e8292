// Licensed under the Apache-2.0 license

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::thread::JoinHandle;
use tzcrypto_api::crypto::{Algorithm, KeyAttributes, KeyType, KeyUsage};
use tzcrypto_api::ClientId;
use tzcrypto_client::{LockedTransport, MailboxTransport, NsInterface, PsaCrypto};
use tzcrypto_mailbox::{EmuLink, EmuNsHal, NsMailbox, NsMemory};
use tzcrypto_os_wrapper::thread;
use tzcrypto_runtime::{InitParams, SoftwarePlatform, SpeMailbox, Spm};

pub const TEST_HUK: [u8; 32] = [
    0x0f, 0x1e, 0x2d, 0x3c, 0x4b, 0x5a, 0x69, 0x78, 0x87, 0x96, 0xa5, 0xb4, 0xc3, 0xd2, 0xe1, 0xf0,
    0x01, 0x12, 0x23, 0x34, 0x45, 0x56, 0x67, 0x78, 0x89, 0x9a, 0xab, 0xbc, 0xcd, 0xde, 0xef, 0xf0,
];

pub const CLIENT_A: ClientId = -1;
pub const CLIENT_B: ClientId = -2;

pub const MAILBOX_SLOTS: usize = 4;
const SHARED_WINDOWS: usize = 4;
const WINDOW_SIZE: usize = 8192;

static LOGGER: Once = Once::new();

pub fn init_logging() {
    LOGGER.call_once(|| {
        simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Warn)
            .env()
            .init()
            .ok();
    });
}

pub fn platform() -> SoftwarePlatform {
    SoftwarePlatform::new(TEST_HUK).with_seed(0x5eed)
}

pub fn spm() -> Spm {
    spm_with(platform(), InitParams::default())
}

pub fn spm_with(platform: SoftwarePlatform, params: InitParams) -> Spm {
    init_logging();
    Spm::new(Box::new(platform), params)
}

/// Single-core setup: every client shares one lock in front of the
/// framework.
pub struct LockHarness {
    pub interface: Arc<NsInterface<Spm>>,
}

impl LockHarness {
    pub fn new(spm: Spm) -> Self {
        let interface = Arc::new(NsInterface::new());
        interface.init(spm).unwrap();
        Self { interface }
    }

    pub fn client(&self, client_id: ClientId) -> PsaCrypto<LockedTransport<Spm>> {
        let crypto = PsaCrypto::new(self.interface.transport(client_id));
        crypto.crypto_init().unwrap();
        crypto
    }
}

pub fn lock_client() -> PsaCrypto<LockedTransport<Spm>> {
    LockHarness::new(spm()).client(CLIENT_A)
}

/// Dual-core setup: clients post to the mailbox and a service thread plays
/// the secure core.
pub struct MailboxHarness {
    pub mailbox: Arc<NsMailbox<EmuNsHal>>,
    pub memory: Arc<NsMemory>,
    stop: Arc<AtomicBool>,
    service: Option<JoinHandle<Spm>>,
}

impl MailboxHarness {
    pub fn new(mut spm: Spm) -> Self {
        init_logging();
        let (ns_hal, spe_hal) = EmuLink::pair();
        let mailbox = Arc::new(NsMailbox::new(ns_hal, MAILBOX_SLOTS).unwrap());
        mailbox.connect_irq().unwrap();
        let memory = NsMemory::new(SHARED_WINDOWS, WINDOW_SIZE).unwrap();

        let queue = spe_hal.connect(MAILBOX_SLOTS).unwrap();
        let spe = SpeMailbox::new(spe_hal, queue, memory.clone()).unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let service = {
            let stop = stop.clone();
            thread::spawn("spe-mailbox", move || {
                spe.run(&mut spm, &stop);
                spm
            })
            .unwrap()
        };
        Self {
            mailbox,
            memory,
            stop,
            service: Some(service),
        }
    }

    pub fn client(&self, client_id: ClientId) -> PsaCrypto<MailboxTransport<EmuNsHal>> {
        PsaCrypto::new(MailboxTransport::new(
            self.mailbox.clone(),
            self.memory.clone(),
            client_id,
        ))
    }

    /// Stop the service thread and hand back the framework.
    pub fn shutdown(mut self) -> Spm {
        self.stop.store(true, Ordering::Release);
        self.service.take().unwrap().join().unwrap()
    }
}

impl Drop for MailboxHarness {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(service) = self.service.take() {
            service.join().ok();
        }
    }
}

pub fn aes_attributes(usage: KeyUsage, alg: Algorithm) -> KeyAttributes {
    KeyAttributes::new()
        .with_type(KeyType::AES)
        .with_bits(128)
        .with_usage(usage)
        .with_algorithm(alg)
}

pub fn hmac_attributes(alg: Algorithm) -> KeyAttributes {
    KeyAttributes::new()
        .with_type(KeyType::HMAC)
        .with_usage(KeyUsage::SIGN_MESSAGE | KeyUsage::VERIFY_MESSAGE)
        .with_algorithm(alg)
}
