// Licensed under the Apache-2.0 license

use tzcrypto_api::{OutVec, PsaHandle};
use tzcrypto_error::PsaResult;

/// Path a non-secure caller uses to reach the secure framework.
///
/// Implementations attach the caller identity themselves; the client API
/// never chooses it.
pub trait Transport {
    fn framework_version(&self) -> PsaResult<u32>;

    fn version(&self, sid: u32) -> PsaResult<u32>;

    fn connect(&self, sid: u32, version: u32) -> PsaResult<PsaHandle>;

    /// Output lengths are only meaningful when the call succeeds.
    fn call(
        &self,
        handle: PsaHandle,
        call_type: i32,
        in_vec: &[&[u8]],
        out_vec: &mut [OutVec<'_>],
    ) -> PsaResult<()>;

    fn close(&self, handle: PsaHandle) -> PsaResult<()>;
}
