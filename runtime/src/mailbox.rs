/*++

Licensed under the Apache-2.0 license.

File Name:

    mailbox.rs

Abstract:

    File contains the secure mailbox endpoint. It drains pending slots,
    copies iovecs out of non-secure shared memory after validating every
    range, runs the call through the partition manager and posts replies.

--*/

use crate::fail_stop::FailStopReason;
use crate::spm::Spm;
use arrayvec::ArrayVec;
use core::mem::size_of;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tzcrypto_api::iovec::{PsaInVec, PsaOutVec};
use tzcrypto_api::mailbox::{ClientParams, MailboxReply};
use tzcrypto_api::{ClientId, OutVec, PsaFramework, PsaHandle, PSA_MAX_IOVEC};
use tzcrypto_error::{status_of, PsaError, PsaResult};
use tzcrypto_mailbox::{
    slot_indexes, CriticalSection, EmuSpeHal, MailboxHal, MailboxQueue, NsMemory,
};
use tzcrypto_os_wrapper::Wait;

/// How long the emulated service thread sleeps between stop flag checks.
const DOORBELL_POLL_MS: u32 = 20;

/// Descriptor arrays plus the copied input payloads of one call.
struct CallVectors {
    inputs: ArrayVec<Vec<u8>, PSA_MAX_IOVEC>,
    outputs: ArrayVec<PsaOutVec, PSA_MAX_IOVEC>,
}

pub struct SpeMailbox<H: MailboxHal> {
    hal: H,
    queue: Arc<MailboxQueue>,
    memory: Arc<NsMemory>,
}

impl<H: MailboxHal> SpeMailbox<H> {
    /// Bind to the queue the non-secure side published.
    pub fn new(hal: H, queue: Arc<MailboxQueue>, memory: Arc<NsMemory>) -> PsaResult<Self> {
        hal.init(queue.clone())?;
        log::info!(
            "[mbox] secure endpoint up: {} slots, {} bytes shared",
            queue.n_slots(),
            memory.len()
        );
        Ok(Self { hal, queue, memory })
    }

    pub fn queue(&self) -> &Arc<MailboxQueue> {
        &self.queue
    }

    /// Serve every slot pending at entry and signal the peer once.
    ///
    /// Returns the number of slots replied to.
    pub fn handle_pending(&self, spm: &mut Spm) -> usize {
        let pend = {
            let _cs = CriticalSection::enter(&self.hal);
            self.queue.take_pend()
        };

        let mut replied = 0;
        for idx in slot_indexes(pend) {
            let return_val = self.serve(spm, idx);
            if let Err(err) = self.queue.write_reply(idx, MailboxReply { return_val }) {
                log::error!("[mbox] cannot reply in slot {idx}: {err:?}");
                continue;
            }
            let _cs = CriticalSection::enter(&self.hal);
            self.queue.set_replied(idx);
            replied += 1;
        }
        if replied > 0 {
            self.hal.notify_peer();
        }
        replied
    }

    fn serve(&self, spm: &mut Spm, idx: usize) -> i32 {
        let msg = match self.queue.read_msg(idx) {
            Ok(msg) => msg,
            Err(err) => return err.status(),
        };
        // Only non-secure identities may arrive over the mailbox.
        if msg.client_id >= 0 {
            log::warn!("[mbox] slot {idx} carries secure client id {}", msg.client_id);
            return PsaError::MAILBOX_INVAL_PARAMS.status();
        }
        let params = match msg.client_params() {
            Ok(params) => params,
            Err(err) => {
                log::warn!("[mbox] slot {idx} has call type {}", msg.call_type);
                return err.status();
            }
        };
        let client_id = msg.client_id;

        match params {
            ClientParams::FrameworkVersion => spm.framework_version() as i32,
            ClientParams::Version { sid } => spm.version(client_id, sid) as i32,
            ClientParams::Connect { sid, version } => match spm.connect(client_id, sid, version) {
                Ok(handle) => handle,
                Err(err) => err.status(),
            },
            ClientParams::Call {
                handle,
                call_type,
                in_vec,
                in_len,
                out_vec,
                out_len,
            } => status_of(&self.call(
                spm, client_id, handle, call_type, in_vec, in_len, out_vec, out_len,
            )),
            ClientParams::Close { handle } => {
                spm.close(client_id, handle);
                0
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn call(
        &self,
        spm: &mut Spm,
        client_id: ClientId,
        handle: PsaHandle,
        call_type: i32,
        in_vec: u32,
        in_len: u32,
        out_vec: u32,
        out_len: u32,
    ) -> PsaResult<()> {
        let vectors = match self.load_vectors(in_vec, in_len, out_vec, out_len) {
            Ok(vectors) => vectors,
            Err(err) => {
                log::warn!("[mbox] client {client_id} passed an invalid iovec: {err:?}");
                spm.report_violation(FailStopReason::MemoryRange);
                return Err(PsaError::PROGRAMMER_ERROR);
            }
        };

        let inputs: ArrayVec<&[u8], PSA_MAX_IOVEC> =
            vectors.inputs.iter().map(Vec::as_slice).collect();
        let mut buffers: ArrayVec<Vec<u8>, PSA_MAX_IOVEC> = vectors
            .outputs
            .iter()
            .map(|desc| vec![0u8; desc.len as usize])
            .collect();
        let mut outputs: ArrayVec<OutVec<'_>, PSA_MAX_IOVEC> =
            buffers.iter_mut().map(|buf| OutVec::new(buf)).collect();

        let result = spm.call(client_id, handle, call_type, &inputs, &mut outputs);

        for (i, (desc, out)) in vectors.outputs.iter().zip(&outputs).enumerate() {
            let written = if result.is_ok() { out.written() } else { &[] };
            self.memory.write(desc.base, written)?;
            self.memory.write_pod(
                descriptor_offset(out_vec, i)?,
                &PsaOutVec {
                    base: desc.base,
                    len: written.len() as u32,
                },
            )?;
        }
        result
    }

    /// Read both descriptor arrays and copy the inputs into secure memory.
    /// Inputs are copied once so the caller cannot change them mid call.
    fn load_vectors(
        &self,
        in_vec: u32,
        in_len: u32,
        out_vec: u32,
        out_len: u32,
    ) -> PsaResult<CallVectors> {
        if in_len as usize > PSA_MAX_IOVEC || out_len as usize > PSA_MAX_IOVEC {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        let mut vectors = CallVectors {
            inputs: ArrayVec::new(),
            outputs: ArrayVec::new(),
        };
        for i in 0..in_len as usize {
            let desc: PsaInVec = self.memory.read_pod(descriptor_offset(in_vec, i)?)?;
            vectors.inputs.push(self.memory.read(desc.base, desc.len)?);
        }
        for i in 0..out_len as usize {
            let desc: PsaOutVec = self.memory.read_pod(descriptor_offset(out_vec, i)?)?;
            self.memory.check_range(desc.base, desc.len)?;
            vectors.outputs.push(desc);
        }
        Ok(vectors)
    }
}

fn descriptor_offset(array: u32, i: usize) -> PsaResult<u32> {
    array
        .checked_add((i * size_of::<PsaInVec>()) as u32)
        .ok_or(PsaError::PROGRAMMER_ERROR)
}

impl SpeMailbox<EmuSpeHal> {
    /// Service loop for the emulated link. Returns once `stop` is set.
    pub fn run(&self, spm: &mut Spm, stop: &AtomicBool) {
        while !stop.load(Ordering::Acquire) {
            self.hal.wait_doorbell(Wait::Millis(DOORBELL_POLL_MS));
            self.handle_pending(spm);
        }
        log::info!("[mbox] secure endpoint stopped");
    }
}
