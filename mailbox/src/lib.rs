/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the non-secure mailbox: the queue shared with
    the secure side, the HAL seam, the non-secure endpoint and the shared
    iovec memory.

--*/

mod emu;
mod hal;
mod memory;
mod ns;
mod queue;

pub use emu::{EmuLink, EmuNsHal, EmuSpeHal, LinkError};
pub use hal::{CriticalSection, MailboxHal};
pub use memory::{NsMemory, NsWindow};
pub use ns::NsMailbox;
pub use queue::MailboxQueue;

/// Iterate the indexes of the set bits of a slot mask, lowest first.
pub fn slot_indexes(mut mask: u32) -> impl Iterator<Item = usize> {
    core::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let idx = mask.trailing_zeros() as usize;
        mask &= mask - 1;
        Some(idx)
    })
}

pub(crate) const fn slot_bit(idx: usize) -> u32 {
    1 << idx
}
