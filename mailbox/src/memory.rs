// Licensed under the Apache-2.0 license

//! Non-secure memory shared with the secure side for iovec payloads.
//!
//! The region is split into equal windows. A caller claims one window for
//! the duration of a call and addresses everything in it by region offset,
//! which is what travels in the mailbox message. The secure side only ever
//! sees offsets and must validate every range before touching it.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tzcrypto_api::mailbox::MAILBOX_MAX_SLOTS;
use tzcrypto_error::{PsaError, PsaResult};
use zerocopy::{FromBytes, Immutable, IntoBytes};

pub struct NsMemory {
    region: Mutex<Box<[u8]>>,
    window_size: usize,
    n_windows: usize,
    free: AtomicU32,
}

impl NsMemory {
    pub fn new(n_windows: usize, window_size: usize) -> PsaResult<Arc<Self>> {
        if n_windows == 0 || n_windows > MAILBOX_MAX_SLOTS || window_size == 0 {
            return Err(PsaError::MAILBOX_INIT_ERROR);
        }
        let len = n_windows
            .checked_mul(window_size)
            .filter(|len| u32::try_from(*len).is_ok())
            .ok_or(PsaError::MAILBOX_INIT_ERROR)?;
        Ok(Arc::new(Self {
            region: Mutex::new(vec![0u8; len].into_boxed_slice()),
            window_size,
            n_windows,
            free: AtomicU32::new(u32::MAX >> (32 - n_windows)),
        }))
    }

    pub fn len(&self) -> usize {
        self.window_size * self.n_windows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    fn region(&self) -> MutexGuard<'_, Box<[u8]>> {
        self.region
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim a free window.
    pub fn claim(self: &Arc<Self>) -> PsaResult<NsWindow> {
        let mut free = self.free.load(Ordering::Acquire);
        loop {
            if free == 0 {
                return Err(PsaError::MAILBOX_QUEUE_FULL);
            }
            let idx = free.trailing_zeros() as usize;
            match self.free.compare_exchange_weak(
                free,
                free & !(1 << idx),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Ok(NsWindow {
                        mem: self.clone(),
                        idx,
                    })
                }
                Err(current) => free = current,
            }
        }
    }

    /// Validate an untrusted `(offset, len)` pair. The range must not wrap and
    /// must lie inside a single window.
    pub fn check_range(&self, offset: u32, len: u32) -> PsaResult<Range<usize>> {
        let start = offset as usize;
        let end = start
            .checked_add(len as usize)
            .ok_or(PsaError::PROGRAMMER_ERROR)?;
        if end > self.len() {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        let window_end = (start / self.window_size + 1) * self.window_size;
        if end > window_end {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        Ok(start..end)
    }

    /// Copy a range out of shared memory.
    pub fn read(&self, offset: u32, len: u32) -> PsaResult<Vec<u8>> {
        let range = self.check_range(offset, len)?;
        Ok(self.region()[range].to_vec())
    }

    pub fn write(&self, offset: u32, data: &[u8]) -> PsaResult<()> {
        let len = u32::try_from(data.len()).map_err(|_| PsaError::PROGRAMMER_ERROR)?;
        let range = self.check_range(offset, len)?;
        self.region()[range].copy_from_slice(data);
        Ok(())
    }

    /// Read a fixed-layout structure such as an iovec descriptor.
    pub fn read_pod<T: FromBytes>(&self, offset: u32) -> PsaResult<T> {
        let bytes = self.read(offset, core::mem::size_of::<T>() as u32)?;
        T::read_from_bytes(&bytes).map_err(|_| PsaError::PROGRAMMER_ERROR)
    }

    pub fn write_pod<T: IntoBytes + Immutable>(&self, offset: u32, value: &T) -> PsaResult<()> {
        self.write(offset, value.as_bytes())
    }
}

/// Window claimed for one call. Released on drop.
pub struct NsWindow {
    mem: Arc<NsMemory>,
    idx: usize,
}

impl NsWindow {
    /// Region offset of the first byte of the window.
    pub fn base(&self) -> u32 {
        (self.idx * self.mem.window_size) as u32
    }

    pub fn size(&self) -> usize {
        self.mem.window_size
    }

    pub fn memory(&self) -> &NsMemory {
        &self.mem
    }

    fn offset(&self, off: usize, len: usize) -> PsaResult<u32> {
        if off.checked_add(len).map_or(true, |end| end > self.size()) {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        Ok(self.base() + off as u32)
    }

    pub fn write(&self, off: usize, data: &[u8]) -> PsaResult<()> {
        let offset = self.offset(off, data.len())?;
        self.mem.write(offset, data)
    }

    pub fn read(&self, off: usize, len: usize) -> PsaResult<Vec<u8>> {
        let offset = self.offset(off, len)?;
        self.mem.read(offset, len as u32)
    }

    pub fn write_pod<T: IntoBytes + Immutable>(&self, off: usize, value: &T) -> PsaResult<()> {
        self.write(off, value.as_bytes())
    }

    pub fn read_pod<T: FromBytes>(&self, off: usize) -> PsaResult<T> {
        let offset = self.offset(off, core::mem::size_of::<T>())?;
        self.mem.read_pod(offset)
    }
}

impl Drop for NsWindow {
    fn drop(&mut self) {
        self.mem.free.fetch_or(1 << self.idx, Ordering::AcqRel);
    }
}
