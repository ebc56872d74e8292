// Licensed under the Apache-2.0 license

use crate::Wait;
use std::sync::TryLockError;
use std::time::Instant;
use tzcrypto_error::{PsaError, PsaResult};

pub type MutexGuard<'a, T> = std::sync::MutexGuard<'a, T>;

/// Mutex with an explicit acquire step that can fail.
///
/// A poisoned lock is reported as an OS wrapper failure instead of being
/// recovered, so callers never run on state left behind by a panic.
pub struct Mutex<T> {
    inner: std::sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: std::sync::Mutex::new(value),
        }
    }

    pub fn acquire(&self, wait: Wait) -> PsaResult<MutexGuard<'_, T>> {
        let Some(timeout) = wait.timeout() else {
            return self.inner.lock().map_err(|_| PsaError::OS_WRAPPER_ERROR);
        };
        let deadline = Instant::now() + timeout;
        loop {
            match self.inner.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::Poisoned(_)) => return Err(PsaError::OS_WRAPPER_ERROR),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(PsaError::OS_WRAPPER_ERROR);
                    }
                    std::thread::yield_now();
                }
            }
        }
    }

    /// Tear down the mutex and hand back the protected value.
    pub fn delete(self) -> PsaResult<T> {
        self.inner
            .into_inner()
            .map_err(|_| PsaError::OS_WRAPPER_ERROR)
    }
}
