// Licensed under the Apache-2.0 license

//! Thread helpers and per-thread wake flags.
//!
//! A waiter blocks in [`wait_flags`] until another context calls
//! [`ThreadHandle::set_flags`]. Wakeups can be spurious, so waiters always
//! re-check their own condition in a loop.

use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;
use tzcrypto_error::{PsaError, PsaResult};

#[derive(Debug, Clone)]
pub struct ThreadHandle(Thread);

impl ThreadHandle {
    /// Wake the thread. Safe to call from notification handlers.
    pub fn set_flags(&self) {
        self.0.unpark();
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name()
    }

    pub fn id(&self) -> thread::ThreadId {
        self.0.id()
    }
}

pub fn spawn<F, T>(name: &str, f: F) -> PsaResult<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|err| {
            log::error!("[os] unable to spawn {name}: {err}");
            PsaError::OS_WRAPPER_ERROR
        })
}

pub fn current() -> ThreadHandle {
    ThreadHandle(thread::current())
}

/// Block until woken through [`ThreadHandle::set_flags`].
pub fn wait_flags() {
    thread::park();
}

/// Like [`wait_flags`] but gives up after `ms`.
pub fn wait_flags_timeout(ms: u32) {
    thread::park_timeout(Duration::from_millis(u64::from(ms)));
}

pub fn yield_now() {
    thread::yield_now();
}
