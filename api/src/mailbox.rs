// Licensed under the Apache-2.0 license

//! Mailbox wire format shared by the non-secure and secure endpoints.
//!
//! Only fixed-width fields live here. Anything that depends on how the
//! non-secure side is built (thread references, wake flags) is kept in
//! endpoint-private state and never placed in these structs.

use crate::{ClientId, PsaHandle};
use core::mem::size_of;
use tzcrypto_error::{PsaError, PsaResult};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Default number of slots in the queue.
pub const NUM_MAILBOX_QUEUE_SLOT: usize = 4;
/// Upper bound imposed by the 32-bit status masks.
pub const MAILBOX_MAX_SLOTS: usize = 32;

/// Bitmask with one bit per slot.
pub type MailboxQueueStatus = u32;

/// Index of a claimed slot plus one. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxMsgHandle(u32);

impl MailboxMsgHandle {
    pub fn from_index(idx: usize) -> Self {
        Self(idx as u32 + 1)
    }

    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    pub fn try_from_raw(raw: u32, n_slots: usize) -> Option<Self> {
        if raw == 0 || raw as usize > n_slots {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxCallType {
    FrameworkVersion = 1,
    Version = 2,
    Connect = 3,
    Call = 4,
    Close = 5,
}

impl TryFrom<u32> for MailboxCallType {
    type Error = PsaError;

    fn try_from(value: u32) -> PsaResult<Self> {
        match value {
            1 => Ok(Self::FrameworkVersion),
            2 => Ok(Self::Version),
            3 => Ok(Self::Connect),
            4 => Ok(Self::Call),
            5 => Ok(Self::Close),
            _ => Err(PsaError::MAILBOX_INVAL_PARAMS),
        }
    }
}

/// Parameters of one client call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientParams {
    FrameworkVersion,
    Version {
        sid: u32,
    },
    Connect {
        sid: u32,
        version: u32,
    },
    /// `in_vec`/`out_vec` are offsets of descriptor arrays in the
    /// non-secure shared region.
    Call {
        handle: PsaHandle,
        call_type: i32,
        in_vec: u32,
        in_len: u32,
        out_vec: u32,
        out_len: u32,
    },
    Close {
        handle: PsaHandle,
    },
}

impl ClientParams {
    pub fn call_type(&self) -> MailboxCallType {
        match self {
            ClientParams::FrameworkVersion => MailboxCallType::FrameworkVersion,
            ClientParams::Version { .. } => MailboxCallType::Version,
            ClientParams::Connect { .. } => MailboxCallType::Connect,
            ClientParams::Call { .. } => MailboxCallType::Call,
            ClientParams::Close { .. } => MailboxCallType::Close,
        }
    }

    pub fn encode(&self) -> RawClientParams {
        let words = match *self {
            ClientParams::FrameworkVersion => [0; 6],
            ClientParams::Version { sid } => [sid, 0, 0, 0, 0, 0],
            ClientParams::Connect { sid, version } => [sid, version, 0, 0, 0, 0],
            ClientParams::Call {
                handle,
                call_type,
                in_vec,
                in_len,
                out_vec,
                out_len,
            } => [
                handle as u32,
                call_type as u32,
                in_vec,
                in_len,
                out_vec,
                out_len,
            ],
            ClientParams::Close { handle } => [handle as u32, 0, 0, 0, 0, 0],
        };
        RawClientParams { words }
    }

    pub fn decode(call_type: MailboxCallType, raw: &RawClientParams) -> Self {
        let w = raw.words;
        match call_type {
            MailboxCallType::FrameworkVersion => ClientParams::FrameworkVersion,
            MailboxCallType::Version => ClientParams::Version { sid: w[0] },
            MailboxCallType::Connect => ClientParams::Connect {
                sid: w[0],
                version: w[1],
            },
            MailboxCallType::Call => ClientParams::Call {
                handle: w[0] as i32,
                call_type: w[1] as i32,
                in_vec: w[2],
                in_len: w[3],
                out_vec: w[4],
                out_len: w[5],
            },
            MailboxCallType::Close => ClientParams::Close {
                handle: w[0] as i32,
            },
        }
    }
}

/// Storage for the parameter union, sized to the largest variant.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct RawClientParams {
    pub words: [u32; 6],
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct MailboxMsg {
    pub call_type: u32,
    pub params: RawClientParams,
    pub client_id: ClientId,
}

impl MailboxMsg {
    pub fn new(params: &ClientParams, client_id: ClientId) -> Self {
        Self {
            call_type: params.call_type() as u32,
            params: params.encode(),
            client_id,
        }
    }

    pub fn client_params(&self) -> PsaResult<ClientParams> {
        let call_type = MailboxCallType::try_from(self.call_type)?;
        Ok(ClientParams::decode(call_type, &self.params))
    }
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct MailboxReply {
    pub return_val: i32,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct MailboxSlot {
    pub msg: MailboxMsg,
    pub reply: MailboxReply,
}

/// Published by the non-secure side during HAL init so the secure side can
/// reject a queue built with a different configuration.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct MailboxInitInfo {
    pub n_slots: u32,
    pub slot_size: u32,
}

impl MailboxInitInfo {
    pub fn new(n_slots: usize) -> Self {
        Self {
            n_slots: n_slots as u32,
            slot_size: size_of::<MailboxSlot>() as u32,
        }
    }

    pub fn check(&self, expected_slots: usize) -> PsaResult<()> {
        if self.n_slots as usize != expected_slots
            || self.slot_size as usize != size_of::<MailboxSlot>()
        {
            return Err(PsaError::MAILBOX_INIT_ERROR);
        }
        Ok(())
    }
}

const _: () = assert!(size_of::<RawClientParams>() == 24);
const _: () = assert!(size_of::<MailboxMsg>() == 32);
const _: () = assert!(size_of::<MailboxReply>() == 4);
const _: () = assert!(size_of::<MailboxSlot>() == 36);
const _: () = assert!(NUM_MAILBOX_QUEUE_SLOT <= MAILBOX_MAX_SLOTS);
const _: () = assert!(MAILBOX_MAX_SLOTS <= MailboxQueueStatus::BITS as usize);
