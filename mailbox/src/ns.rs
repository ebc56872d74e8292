/*++

Licensed under the Apache-2.0 license.

File Name:

    ns.rs

Abstract:

    File contains the non-secure mailbox endpoint: slot allocation, message
    submission and reply collection.

--*/

use crate::emu::EmuNsHal;
use crate::hal::{CriticalSection, MailboxHal};
use crate::queue::MailboxQueue;
use crate::slot_bit;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tzcrypto_api::mailbox::{ClientParams, MailboxMsg, MailboxMsgHandle};
use tzcrypto_api::ClientId;
use tzcrypto_error::{PsaError, PsaResult};
use tzcrypto_os_wrapper::thread::{self, ThreadHandle};

/// Endpoint-private per slot state. Never shared with the secure side.
#[derive(Default)]
struct NsSlot {
    owner: Mutex<Option<ThreadHandle>>,
    is_woken: AtomicBool,
}

pub struct NsMailbox<H: MailboxHal> {
    hal: H,
    queue: Arc<MailboxQueue>,

    /// Slots free for a new message. Bit `i` set means slot `i` is empty.
    empty_slots: AtomicU32,

    slots: Box<[NsSlot]>,
}

impl<H: MailboxHal> NsMailbox<H> {
    /// Build the queue and publish it through the HAL.
    pub fn new(hal: H, n_slots: usize) -> PsaResult<Self> {
        let queue = Arc::new(MailboxQueue::new(n_slots)?);
        hal.init(queue.clone())?;
        Ok(Self {
            hal,
            queue,
            empty_slots: AtomicU32::new(u32::MAX >> (32 - n_slots)),
            slots: (0..n_slots).map(|_| NsSlot::default()).collect(),
        })
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn queue(&self) -> &Arc<MailboxQueue> {
        &self.queue
    }

    pub fn empty_slots(&self) -> u32 {
        self.empty_slots.load(Ordering::Acquire)
    }

    fn slot_index(&self, handle: MailboxMsgHandle) -> PsaResult<usize> {
        MailboxMsgHandle::try_from_raw(handle.raw(), self.slots.len())
            .map(MailboxMsgHandle::index)
            .ok_or(PsaError::MAILBOX_INVAL_PARAMS)
    }

    fn set_owner(&self, idx: usize, owner: Option<ThreadHandle>) {
        *self.slots[idx]
            .owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = owner;
    }

    /// Place a message in a free slot and ring the peer.
    ///
    /// Fails fast with `MAILBOX_QUEUE_FULL` when every slot is taken.
    pub fn enqueue(&self, params: &ClientParams, client_id: ClientId) -> PsaResult<MailboxMsgHandle> {
        let idx = {
            let _cs = CriticalSection::enter(&self.hal);
            let empty = self.empty_slots.load(Ordering::Acquire);
            if empty == 0 {
                return Err(PsaError::MAILBOX_QUEUE_FULL);
            }
            let idx = empty.trailing_zeros() as usize;
            self.empty_slots
                .fetch_and(!slot_bit(idx), Ordering::AcqRel);
            idx
        };

        self.queue
            .write_msg(idx, &MailboxMsg::new(params, client_id))?;
        self.slots[idx].is_woken.store(false, Ordering::Release);
        self.set_owner(idx, Some(thread::current()));

        {
            let _cs = CriticalSection::enter(&self.hal);
            self.queue.set_pend(idx);
        }
        self.hal.notify_peer();

        Ok(MailboxMsgHandle::from_index(idx))
    }

    /// Block the calling thread until the reply for `handle` arrives.
    pub fn wait_reply(&self, handle: MailboxMsgHandle) -> PsaResult<()> {
        let idx = self.slot_index(handle)?;
        // Wake flags can be set by an earlier reply; only the slot flag counts.
        while !self.slots[idx].is_woken.load(Ordering::Acquire) {
            thread::wait_flags();
        }
        Ok(())
    }

    /// Collect the reply and return the slot to the empty set.
    pub fn dequeue_reply(&self, handle: MailboxMsgHandle) -> PsaResult<i32> {
        let idx = self.slot_index(handle)?;
        if !self.slots[idx].is_woken.load(Ordering::Acquire) {
            return Err(PsaError::MAILBOX_NO_PEND_EVENT);
        }
        let reply = self.queue.read_reply(idx)?;
        self.set_owner(idx, None);

        {
            let _cs = CriticalSection::enter(&self.hal);
            self.queue.clear_replied(idx);
            self.slots[idx].is_woken.store(false, Ordering::Release);
        }
        // The slot becomes claimable only after its other status is clear.
        {
            let _cs = CriticalSection::enter(&self.hal);
            self.empty_slots
                .fetch_or(slot_bit(idx), Ordering::AcqRel);
        }
        Ok(reply.return_val)
    }

    /// Take the lowest replied slot and mark it woken. Interrupt context.
    pub fn fetch_reply_isr(&self) -> Option<MailboxMsgHandle> {
        let _cs = CriticalSection::enter_isr(&self.hal);
        let replied = self.queue.replied();
        if replied == 0 {
            return None;
        }
        let idx = replied.trailing_zeros() as usize;
        self.queue.clear_replied(idx);
        self.slots[idx].is_woken.store(true, Ordering::Release);
        Some(MailboxMsgHandle::from_index(idx))
    }

    /// Reply interrupt handler: wake the owner of every replied slot.
    pub fn on_reply_isr(&self) {
        while let Some(handle) = self.fetch_reply_isr() {
            let owner = self.slots[handle.index()]
                .owner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            match owner {
                Some(owner) => owner.set_flags(),
                None => log::warn!("[mbox] reply in slot {} has no owner", handle.index()),
            }
        }
    }

    /// Submit one call and block for its result.
    pub fn client_call(&self, params: &ClientParams, client_id: ClientId) -> PsaResult<i32> {
        let handle = self.enqueue(params, client_id)?;
        self.wait_reply(handle)?;
        self.dequeue_reply(handle)
    }
}

impl NsMailbox<EmuNsHal> {
    /// Route the emulated reply interrupt to this mailbox.
    pub fn connect_irq(self: &Arc<Self>) -> PsaResult<()> {
        let mailbox = Arc::downgrade(self);
        self.hal.set_irq_handler(move || {
            if let Some(mailbox) = mailbox.upgrade() {
                mailbox.on_reply_isr();
            }
        })?;
        Ok(())
    }
}
