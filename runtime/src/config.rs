// Licensed under the Apache-2.0 license

//! Build-time capacities of the service and its runtime knobs.

use tzcrypto_api::ClientId;

/// Concurrent multipart operations across all callers.
pub const CRYPTO_CONC_OPER_NUM: usize = 8;

/// Keys loaded at the same time, and entries in the ownership table.
pub const CRYPTO_MAX_KEY_HANDLES: usize = 32;

/// Secure scratch available for copying the vectors of one call.
pub const CRYPTO_IOVEC_BUFFER_SIZE: usize = 5120;

/// Live connection handles in the framework.
pub const MAX_CONNECTIONS: usize = 8;

/// Identity every non-secure client is mapped to when clients are not
/// identified individually.
pub const NS_CLIENT_ID: ClientId = -1;

/// Default number of boundary violations tolerated before fail-stop.
pub const DEFAULT_FAIL_STOP_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitParams {
    /// Violations of one boundary check that trigger fail-stop.
    pub fail_stop_threshold: u32,

    /// Keep the client identity of each non-secure caller. When false every
    /// non-secure caller is the single partition `NS_CLIENT_ID`.
    pub ns_client_ids: bool,

    /// Whether the crypto service accepts non-secure callers at all.
    pub ns_access: bool,
}

impl Default for InitParams {
    fn default() -> Self {
        Self {
            fail_stop_threshold: DEFAULT_FAIL_STOP_THRESHOLD,
            ns_client_ids: true,
            ns_access: true,
        }
    }
}
