/*++

Licensed under the Apache-2.0 license.

File Name:

    mailbox.rs

Abstract:

    File contains the multi-core transport. Calls are queued in the
    mailbox and their vectors are laid out in a window of non-secure
    shared memory.

--*/

use crate::transport::Transport;
use core::mem::size_of;
use std::sync::Arc;
use tzcrypto_api::iovec::{PsaInVec, PsaOutVec};
use tzcrypto_api::mailbox::ClientParams;
use tzcrypto_api::{ClientId, OutVec, PsaHandle, PSA_MAX_IOVEC};
use tzcrypto_error::{PsaError, PsaResult};
use tzcrypto_mailbox::{MailboxHal, NsMailbox, NsMemory, NsWindow};

const IN_DESC_OFFSET: usize = 0;
const OUT_DESC_OFFSET: usize = PSA_MAX_IOVEC * size_of::<PsaInVec>();
const DATA_OFFSET: usize = OUT_DESC_OFFSET + PSA_MAX_IOVEC * size_of::<PsaOutVec>();

pub struct MailboxTransport<H: MailboxHal> {
    mailbox: Arc<NsMailbox<H>>,
    memory: Arc<NsMemory>,
    client_id: ClientId,
}

impl<H: MailboxHal> MailboxTransport<H> {
    /// `client_id` must be negative; the secure side rejects anything else.
    pub fn new(mailbox: Arc<NsMailbox<H>>, memory: Arc<NsMemory>, client_id: ClientId) -> Self {
        Self {
            mailbox,
            memory,
            client_id,
        }
    }

    fn submit(&self, params: ClientParams) -> PsaResult<i32> {
        self.mailbox.client_call(&params, self.client_id)
    }

    /// Submit a call whose reply is a value when non-negative and a status
    /// otherwise.
    fn submit_value(&self, params: ClientParams) -> PsaResult<i32> {
        let ret = self.submit(params)?;
        if ret < 0 {
            PsaError::result_from_status(ret)?;
        }
        Ok(ret)
    }
}

/// Place the descriptors and payloads of one call in `window`.
///
/// Layout: input descriptors, output descriptors, then input data followed
/// by output buffers. A call that does not fit is MAILBOX_INVAL_PARAMS and
/// never reaches the service.
fn lay_out(window: &NsWindow, in_vec: &[&[u8]], out_vec: &[OutVec<'_>]) -> PsaResult<Vec<PsaOutVec>> {
    let mut cursor = DATA_OFFSET;
    let mut reserve = |len: usize| -> PsaResult<u32> {
        let off = cursor;
        cursor = cursor
            .checked_add(len)
            .filter(|end| *end <= window.size())
            .ok_or(PsaError::MAILBOX_INVAL_PARAMS)?;
        Ok(window.base() + off as u32)
    };

    for (i, data) in in_vec.iter().enumerate() {
        let base = reserve(data.len())?;
        window.memory().write(base, data)?;
        let desc = PsaInVec {
            base,
            len: data.len() as u32,
        };
        window.write_pod(IN_DESC_OFFSET + i * size_of::<PsaInVec>(), &desc)?;
    }

    let mut outs = Vec::with_capacity(out_vec.len());
    for (i, out) in out_vec.iter().enumerate() {
        let desc = PsaOutVec {
            base: reserve(out.capacity())?,
            len: out.capacity() as u32,
        };
        window.write_pod(OUT_DESC_OFFSET + i * size_of::<PsaOutVec>(), &desc)?;
        outs.push(desc);
    }
    Ok(outs)
}

impl<H: MailboxHal> Transport for MailboxTransport<H> {
    fn framework_version(&self) -> PsaResult<u32> {
        Ok(self.submit_value(ClientParams::FrameworkVersion)? as u32)
    }

    fn version(&self, sid: u32) -> PsaResult<u32> {
        Ok(self.submit_value(ClientParams::Version { sid })? as u32)
    }

    fn connect(&self, sid: u32, version: u32) -> PsaResult<PsaHandle> {
        self.submit_value(ClientParams::Connect { sid, version })
    }

    fn call(
        &self,
        handle: PsaHandle,
        call_type: i32,
        in_vec: &[&[u8]],
        out_vec: &mut [OutVec<'_>],
    ) -> PsaResult<()> {
        if in_vec.len() > PSA_MAX_IOVEC || out_vec.len() > PSA_MAX_IOVEC {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        out_vec.iter_mut().for_each(OutVec::clear);

        // Held until the reply is read back.
        let window = self.memory.claim()?;
        let descriptors = lay_out(&window, in_vec, out_vec)?;

        let status = self.submit(ClientParams::Call {
            handle,
            call_type,
            in_vec: window.base() + IN_DESC_OFFSET as u32,
            in_len: in_vec.len() as u32,
            out_vec: window.base() + OUT_DESC_OFFSET as u32,
            out_len: out_vec.len() as u32,
        })?;
        PsaError::result_from_status(status)?;

        for (i, (desc, out)) in descriptors.iter().zip(out_vec.iter_mut()).enumerate() {
            let reply: PsaOutVec = window.read_pod(OUT_DESC_OFFSET + i * size_of::<PsaOutVec>())?;
            if reply.len > desc.len {
                log::error!("[ns] outvec {i} grew to {} past {}", reply.len, desc.len);
                return Err(PsaError::PROGRAMMER_ERROR);
            }
            out.write(&window.memory().read(desc.base, reply.len)?)?;
        }
        Ok(())
    }

    fn close(&self, handle: PsaHandle) -> PsaResult<()> {
        self.submit(ClientParams::Close { handle }).map(|_| ())
    }
}
