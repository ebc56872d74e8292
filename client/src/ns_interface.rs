/*++

Licensed under the Apache-2.0 license.

File Name:

    ns_interface.rs

Abstract:

    File contains the single-core transport: one lock serializes every
    non-secure call into the secure framework.

--*/

use crate::transport::Transport;
use std::sync::Arc;
use tzcrypto_api::{ClientId, OutVec, PsaFramework, PsaHandle};
use tzcrypto_error::{PsaError, PsaResult};
use tzcrypto_os_wrapper::{Mutex, MutexGuard, Wait};

/// Lock protected entry into the secure framework.
///
/// Until [`NsInterface::init`] runs there is nothing behind the lock and
/// every dispatch fails with `NS_DISPATCH_ERROR` without reaching the
/// secure side.
pub struct NsInterface<F> {
    lock: Mutex<Option<F>>,
}

impl<F: PsaFramework> Default for NsInterface<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PsaFramework> NsInterface<F> {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(None),
        }
    }

    pub fn init(&self, framework: F) -> PsaResult<()> {
        *self.acquire()? = Some(framework);
        log::info!("[ns] dispatch lock ready");
        Ok(())
    }

    /// Detach the framework. Later dispatches fail as before `init`.
    pub fn deinit(&self) -> PsaResult<Option<F>> {
        Ok(self.acquire()?.take())
    }

    fn acquire(&self) -> PsaResult<MutexGuard<'_, Option<F>>> {
        self.lock.acquire(Wait::Forever).map_err(|err| {
            log::warn!("[ns] dispatch lock unavailable: {err:?}");
            PsaError::NS_DISPATCH_ERROR
        })
    }

    /// Run `f` against the framework while holding the lock.
    pub fn dispatch<R>(&self, f: impl FnOnce(&mut F) -> R) -> PsaResult<R> {
        let mut guard = self.acquire()?;
        let framework = guard.as_mut().ok_or(PsaError::NS_DISPATCH_ERROR)?;
        Ok(f(framework))
    }

    /// Transport for one non-secure caller.
    pub fn transport(self: &Arc<Self>, client_id: ClientId) -> LockedTransport<F> {
        LockedTransport {
            interface: self.clone(),
            client_id,
        }
    }
}

/// One caller's view of an [`NsInterface`]. The identity is attached to
/// every call the way the non-secure OS would attach the running thread's.
pub struct LockedTransport<F> {
    interface: Arc<NsInterface<F>>,
    client_id: ClientId,
}

impl<F: PsaFramework> Transport for LockedTransport<F> {
    fn framework_version(&self) -> PsaResult<u32> {
        self.interface.dispatch(|fw| fw.framework_version())
    }

    fn version(&self, sid: u32) -> PsaResult<u32> {
        self.interface.dispatch(|fw| fw.version(self.client_id, sid))
    }

    fn connect(&self, sid: u32, version: u32) -> PsaResult<PsaHandle> {
        self.interface
            .dispatch(|fw| fw.connect(self.client_id, sid, version))?
    }

    fn call(
        &self,
        handle: PsaHandle,
        call_type: i32,
        in_vec: &[&[u8]],
        out_vec: &mut [OutVec<'_>],
    ) -> PsaResult<()> {
        self.interface
            .dispatch(|fw| fw.call(self.client_id, handle, call_type, in_vec, out_vec))?
    }

    fn close(&self, handle: PsaHandle) -> PsaResult<()> {
        self.interface.dispatch(|fw| fw.close(self.client_id, handle))
    }
}
