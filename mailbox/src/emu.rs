// Licensed under the Apache-2.0 license

//! In-process transport connecting a non-secure endpoint to a secure
//! endpoint running on another thread.
//!
//! The doorbell from non-secure to secure is a counter plus condvar. The
//! secure side "raises the interrupt" by running the handler the non-secure
//! side registered, on the secure thread. Both sides share one spin lock as
//! the critical section, which stands in for an inter-core lock.

use crate::hal::MailboxHal;
use crate::queue::MailboxQueue;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tzcrypto_api::mailbox::MailboxInitInfo;
use tzcrypto_error::{PsaError, PsaResult};
use tzcrypto_os_wrapper::Wait;

type IrqHandler = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("mailbox queue has not been published")]
    NotPublished,
    #[error("mailbox queue already published")]
    AlreadyPublished,
    #[error("published queue has {published:?}, expected {expected:?}")]
    ConfigMismatch {
        published: MailboxInitInfo,
        expected: MailboxInitInfo,
    },
    #[error("peer interrupt handler already registered")]
    IrqRegistered,
}

impl From<LinkError> for PsaError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::IrqRegistered => PsaError::MAILBOX_CALLBACK_REG_ERROR,
            _ => PsaError::MAILBOX_INIT_ERROR,
        }
    }
}

#[derive(Default)]
pub struct EmuLink {
    spinlock: spin::Mutex<()>,
    published: Mutex<Option<(MailboxInitInfo, Arc<MailboxQueue>)>>,
    doorbell: Mutex<u32>,
    rung: Condvar,
    ns_irq: Mutex<Option<IrqHandler>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EmuLink {
    /// Create a link and the two HAL halves bound to it.
    pub fn pair() -> (EmuNsHal, EmuSpeHal) {
        let link = Arc::new(EmuLink::default());
        (EmuNsHal { link: link.clone() }, EmuSpeHal { link })
    }

    /// The HAL enters and leaves the critical section in separate calls, so
    /// the guard is forgotten here and the lock released by `unlock_critical`.
    fn lock_critical(&self) {
        core::mem::forget(self.spinlock.lock());
    }

    fn unlock_critical(&self) {
        // SAFETY: only reached from `exit_critical*`, which the HAL pairs
        // with the `enter_critical*` that took the lock.
        unsafe { self.spinlock.force_unlock() };
    }
}

/// Non-secure half of the link.
pub struct EmuNsHal {
    link: Arc<EmuLink>,
}

impl EmuNsHal {
    /// Register the handler run when the secure side signals replies.
    pub fn set_irq_handler<F>(&self, handler: F) -> Result<(), LinkError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut irq = lock(&self.link.ns_irq);
        if irq.is_some() {
            return Err(LinkError::IrqRegistered);
        }
        *irq = Some(Arc::new(handler));
        Ok(())
    }
}

impl MailboxHal for EmuNsHal {
    fn init(&self, queue: Arc<MailboxQueue>) -> PsaResult<()> {
        let mut published = lock(&self.link.published);
        if published.is_some() {
            return Err(LinkError::AlreadyPublished.into());
        }
        let info = queue.init_info();
        log::debug!(
            "[mbox] publishing queue: {} slots of {} bytes",
            info.n_slots,
            info.slot_size
        );
        *published = Some((info, queue));
        Ok(())
    }

    fn notify_peer(&self) {
        *lock(&self.link.doorbell) += 1;
        self.link.rung.notify_one();
    }

    fn enter_critical(&self) {
        self.link.lock_critical();
    }

    fn exit_critical(&self) {
        self.link.unlock_critical();
    }

    fn enter_critical_isr(&self) {
        self.link.lock_critical();
    }

    fn exit_critical_isr(&self) {
        self.link.unlock_critical();
    }
}

/// Secure half of the link.
pub struct EmuSpeHal {
    link: Arc<EmuLink>,
}

impl EmuSpeHal {
    /// Fetch the queue published by the non-secure side after checking it
    /// was built with `expected_slots` slots.
    pub fn connect(&self, expected_slots: usize) -> Result<Arc<MailboxQueue>, LinkError> {
        let published = lock(&self.link.published);
        let (info, queue) = published.as_ref().ok_or(LinkError::NotPublished)?;
        if info.check(expected_slots).is_err() {
            log::error!("[mbox] queue configuration mismatch: {info:?}");
            return Err(LinkError::ConfigMismatch {
                published: *info,
                expected: MailboxInitInfo::new(expected_slots),
            });
        }
        Ok(queue.clone())
    }

    /// Block until the non-secure side rings the doorbell. Returns `false`
    /// when `wait` expires first.
    pub fn wait_doorbell(&self, wait: Wait) -> bool {
        let rings = lock(&self.link.doorbell);
        let mut rings = match wait.timeout() {
            None => self
                .link
                .rung
                .wait_while(rings, |rings| *rings == 0)
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
            Some(timeout) => {
                self.link
                    .rung
                    .wait_timeout_while(rings, timeout, |rings| *rings == 0)
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .0
            }
        };
        let rung = *rings != 0;
        *rings = 0;
        rung
    }
}

impl MailboxHal for EmuSpeHal {
    /// Accept only the queue the non-secure side published.
    fn init(&self, queue: Arc<MailboxQueue>) -> PsaResult<()> {
        let published = lock(&self.link.published);
        match published.as_ref() {
            Some((_, ours)) if Arc::ptr_eq(ours, &queue) => Ok(()),
            Some(_) => Err(PsaError::MAILBOX_INIT_ERROR),
            None => Err(LinkError::NotPublished.into()),
        }
    }

    fn notify_peer(&self) {
        let handler = lock(&self.link.ns_irq).clone();
        match handler {
            Some(handler) => handler(),
            None => log::warn!("[mbox] reply signalled with no handler registered"),
        }
    }

    fn enter_critical(&self) {
        self.link.lock_critical();
    }

    fn exit_critical(&self) {
        self.link.unlock_critical();
    }

    fn enter_critical_isr(&self) {
        self.link.lock_critical();
    }

    fn exit_critical_isr(&self) {
        self.link.unlock_critical();
    }
}
