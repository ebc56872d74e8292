// Licensed under the Apache-2.0 license

#![cfg_attr(not(test), no_std)]

pub mod crypto;
pub mod function_id;
pub mod iovec;
pub mod mailbox;
pub mod pack;

pub use tzcrypto_error as error;

pub use function_id::{FunctionGroup, FunctionId, FunctionInfo, FunctionType, IoLen};
pub use iovec::OutVec;
pub use pack::CryptoPack;

use tzcrypto_error::PsaResult;

/// Client or partition identifier. Non-secure clients are negative.
pub type ClientId = i32;

/// Connection or stateless service handle.
pub type PsaHandle = i32;

pub const PSA_FRAMEWORK_VERSION: u32 = 0x0101;
pub const PSA_VERSION_NONE: u32 = 0;
pub const PSA_NULL_HANDLE: PsaHandle = 0;
pub const PSA_IPC_CALL: i32 = 0;
pub const PSA_MAX_IOVEC: usize = 4;

/// Crypto service identifier.
pub const CRYPTO_SID: u32 = 0x0000_0080;
pub const CRYPTO_VERSION: u32 = 1;
/// Handle that reaches the crypto service without a prior connect.
pub const CRYPTO_HANDLE: PsaHandle = 0x4000_0100;

/// Entry points of the PSA client framework as exposed by the secure side.
///
/// Every transport (lock protected direct call or mailbox) ends up in an
/// implementation of this trait; `client_id` is the identity the transport
/// vouches for.
pub trait PsaFramework {
    fn framework_version(&self) -> u32;

    fn version(&mut self, client_id: ClientId, sid: u32) -> u32;

    fn connect(&mut self, client_id: ClientId, sid: u32, version: u32) -> PsaResult<PsaHandle>;

    fn call(
        &mut self,
        client_id: ClientId,
        handle: PsaHandle,
        call_type: i32,
        in_vec: &[&[u8]],
        out_vec: &mut [OutVec<'_>],
    ) -> PsaResult<()>;

    fn close(&mut self, client_id: ClientId, handle: PsaHandle);
}
