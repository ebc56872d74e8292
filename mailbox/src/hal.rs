// Licensed under the Apache-2.0 license

use crate::queue::MailboxQueue;
use std::sync::Arc;
use tzcrypto_error::PsaResult;

/// Platform transport behind the mailbox.
///
/// Each platform supplies its own doorbell or interrupt and its own notion
/// of a critical section; the queue protocol above it is fixed.
pub trait MailboxHal: Send + Sync {
    /// Publish the queue and its slot count to the peer.
    fn init(&self, queue: Arc<MailboxQueue>) -> PsaResult<()>;

    /// Signal the peer. There is no failure path; a transport that can fail
    /// here must treat it as fatal.
    fn notify_peer(&self);

    fn enter_critical(&self);

    fn exit_critical(&self);

    fn enter_critical_isr(&self);

    fn exit_critical_isr(&self);
}

/// Critical section held for the lifetime of the guard.
pub struct CriticalSection<'a, H: MailboxHal + ?Sized> {
    hal: &'a H,
    isr: bool,
}

impl<'a, H: MailboxHal + ?Sized> CriticalSection<'a, H> {
    pub fn enter(hal: &'a H) -> Self {
        hal.enter_critical();
        Self { hal, isr: false }
    }

    /// Variant for interrupt context.
    pub fn enter_isr(hal: &'a H) -> Self {
        hal.enter_critical_isr();
        Self { hal, isr: true }
    }
}

impl<H: MailboxHal + ?Sized> Drop for CriticalSection<'_, H> {
    fn drop(&mut self) {
        if self.isr {
            self.hal.exit_critical_isr();
        } else {
            self.hal.exit_critical();
        }
    }
}
