/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Thin OS abstraction used by the non-secure lock and mailbox layers.

--*/

mod mutex;
mod semaphore;
pub mod thread;

pub use mutex::{Mutex, MutexGuard};
pub use semaphore::Semaphore;

use std::time::Duration;

/// How long a blocking primitive may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Forever,
    NoWait,
    Millis(u32),
}

impl Wait {
    pub fn timeout(self) -> Option<Duration> {
        match self {
            Wait::Forever => None,
            Wait::NoWait => Some(Duration::ZERO),
            Wait::Millis(ms) => Some(Duration::from_millis(u64::from(ms))),
        }
    }
}
