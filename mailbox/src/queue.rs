// Licensed under the Apache-2.0 license

use crate::slot_bit;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tzcrypto_api::mailbox::{
    MailboxInitInfo, MailboxMsg, MailboxQueueStatus, MailboxReply, MailboxSlot, MAILBOX_MAX_SLOTS,
};
use tzcrypto_error::{PsaError, PsaResult};

/// Queue shared by both sides of the boundary.
///
/// Holds only wire-format data: the two status masks and the slot array.
/// Bit `i` of either mask always refers to slot `i`. The masks are atomics
/// so every transition is a single step visible to all contexts; callers
/// still bracket read-modify-write sequences with the HAL critical section.
pub struct MailboxQueue {
    pend_slots: AtomicU32,
    replied_slots: AtomicU32,
    slots: Box<[Mutex<MailboxSlot>]>,
}

impl MailboxQueue {
    pub fn new(n_slots: usize) -> PsaResult<Self> {
        if n_slots == 0 || n_slots > MAILBOX_MAX_SLOTS {
            return Err(PsaError::MAILBOX_INIT_ERROR);
        }
        Ok(Self {
            pend_slots: AtomicU32::new(0),
            replied_slots: AtomicU32::new(0),
            slots: (0..n_slots)
                .map(|_| Mutex::new(MailboxSlot::default()))
                .collect(),
        })
    }

    pub fn n_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn init_info(&self) -> MailboxInitInfo {
        MailboxInitInfo::new(self.n_slots())
    }

    fn slot(&self, idx: usize) -> PsaResult<std::sync::MutexGuard<'_, MailboxSlot>> {
        let slot = self.slots.get(idx).ok_or(PsaError::MAILBOX_INVAL_PARAMS)?;
        // Slots are plain data; a panic while holding one leaves nothing to
        // repair.
        Ok(slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    pub fn write_msg(&self, idx: usize, msg: &MailboxMsg) -> PsaResult<()> {
        let mut slot = self.slot(idx)?;
        slot.msg = *msg;
        slot.reply = MailboxReply::default();
        Ok(())
    }

    /// Copy the message out of shared memory.
    pub fn read_msg(&self, idx: usize) -> PsaResult<MailboxMsg> {
        Ok(self.slot(idx)?.msg)
    }

    pub fn write_reply(&self, idx: usize, reply: MailboxReply) -> PsaResult<()> {
        self.slot(idx)?.reply = reply;
        Ok(())
    }

    pub fn read_reply(&self, idx: usize) -> PsaResult<MailboxReply> {
        Ok(self.slot(idx)?.reply)
    }

    pub fn set_pend(&self, idx: usize) {
        self.pend_slots.fetch_or(slot_bit(idx), Ordering::AcqRel);
    }

    /// Claim every pending slot at once.
    pub fn take_pend(&self) -> MailboxQueueStatus {
        self.pend_slots.swap(0, Ordering::AcqRel)
    }

    pub fn pend(&self) -> MailboxQueueStatus {
        self.pend_slots.load(Ordering::Acquire)
    }

    pub fn set_replied(&self, idx: usize) {
        self.replied_slots.fetch_or(slot_bit(idx), Ordering::AcqRel);
    }

    pub fn clear_replied(&self, idx: usize) {
        self.replied_slots
            .fetch_and(!slot_bit(idx), Ordering::AcqRel);
    }

    pub fn replied(&self) -> MailboxQueueStatus {
        self.replied_slots.load(Ordering::Acquire)
    }
}
