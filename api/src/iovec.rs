// Licensed under the Apache-2.0 license

use tzcrypto_error::{PsaError, PsaResult};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Input vector descriptor as laid out in non-secure shared memory.
/// `base` is an offset into the shared region.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct PsaInVec {
    pub base: u32,
    pub len: u32,
}

/// Output vector descriptor. On return `len` holds the bytes written.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable)]
pub struct PsaOutVec {
    pub base: u32,
    pub len: u32,
}

const _: () = assert!(core::mem::size_of::<PsaInVec>() == 8);
const _: () = assert!(core::mem::size_of::<PsaOutVec>() == 8);

/// Caller supplied output buffer together with the length written.
#[derive(Debug)]
pub struct OutVec<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> OutVec<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Replace the contents. Fails without writing if `data` does not fit.
    pub fn write(&mut self, data: &[u8]) -> PsaResult<()> {
        let dest = self
            .buf
            .get_mut(..data.len())
            .ok_or(PsaError::BUFFER_TOO_SMALL)?;
        dest.copy_from_slice(data);
        self.len = data.len();
        Ok(())
    }

    /// Whole buffer for in-place production; follow with `set_len`.
    pub fn buffer(&mut self) -> &mut [u8] {
        self.buf
    }

    pub fn set_len(&mut self, len: usize) -> PsaResult<()> {
        if len > self.buf.len() {
            return Err(PsaError::BUFFER_TOO_SMALL);
        }
        self.len = len;
        Ok(())
    }

    pub fn written(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
