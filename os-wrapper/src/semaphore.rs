// Licensed under the Apache-2.0 license

use crate::Wait;
use std::sync::{Condvar, Mutex};
use tzcrypto_error::{PsaError, PsaResult};

/// Counting semaphore.
pub struct Semaphore {
    count: Mutex<u32>,
    max: u32,
    available: Condvar,
}

impl Semaphore {
    pub fn new(max: u32, initial: u32) -> PsaResult<Self> {
        if max == 0 || initial > max {
            return Err(PsaError::OS_WRAPPER_ERROR);
        }
        Ok(Self {
            count: Mutex::new(initial),
            max,
            available: Condvar::new(),
        })
    }

    pub fn acquire(&self, wait: Wait) -> PsaResult<()> {
        let count = self.count.lock().map_err(|_| PsaError::OS_WRAPPER_ERROR)?;
        let mut count = match wait.timeout() {
            None => self
                .available
                .wait_while(count, |c| *c == 0)
                .map_err(|_| PsaError::OS_WRAPPER_ERROR)?,
            Some(timeout) => {
                let (count, result) = self
                    .available
                    .wait_timeout_while(count, timeout, |c| *c == 0)
                    .map_err(|_| PsaError::OS_WRAPPER_ERROR)?;
                if result.timed_out() && *count == 0 {
                    return Err(PsaError::OS_WRAPPER_ERROR);
                }
                count
            }
        };
        *count -= 1;
        Ok(())
    }

    pub fn release(&self) -> PsaResult<()> {
        let mut count = self.count.lock().map_err(|_| PsaError::OS_WRAPPER_ERROR)?;
        if *count >= self.max {
            return Err(PsaError::OS_WRAPPER_ERROR);
        }
        *count += 1;
        self.available.notify_one();
        Ok(())
    }

    pub fn count(&self) -> u32 {
        self.count.lock().map(|c| *c).unwrap_or(0)
    }
}
