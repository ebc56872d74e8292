/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the PSA status type and macros used by every crate for error handling

--*/
#![cfg_attr(not(feature = "std"), no_std)]
use core::convert::From;
use core::fmt;
use core::num::{NonZeroI32, TryFromIntError};

/// Status value reported for a successful call.
pub const PSA_SUCCESS: i32 = 0;

/// PSA Error Type
///
/// Wraps a non-zero `psa_status_t`. The wrapped value is exactly the value
/// seen on the wire, so conversion in either direction is lossless.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PsaError(pub NonZeroI32);

/// Coarse classification of a status code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    /// Malformed call shape; never retried.
    Programmer,
    NotSupported,
    NotPermitted,
    /// Handle absent, of the wrong type, or used in the wrong state.
    InvalidHandle,
    /// Recoverable capacity error.
    ResourceExhausted,
    Verification,
    Platform,
    /// Transport level failure (mailbox, dispatch lock, OS primitives).
    Communication,
    Other,
}

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: PsaError = PsaError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, i32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl PsaError {
    /// Create an error from a constant status. Zero is success and can never
    /// be an error, so this panics at compile time when misused.
    const fn new_const(val: i32) -> Self {
        match NonZeroI32::new(val) {
            Some(val) => Self(val),
            None => panic!("PsaError cannot be PSA_SUCCESS"),
        }
    }

    define_error_constants![
        (PROGRAMMER_ERROR, -129, "Malformed call: wrong iovec count or size"),
        (CONNECTION_REFUSED, -130, "Service refused the connection"),
        (CONNECTION_BUSY, -131, "Service cannot accept another connection now"),
        (GENERIC_ERROR, -132, "Unspecified failure"),
        (NOT_PERMITTED, -133, "Caller is not allowed to perform the action"),
        (NOT_SUPPORTED, -134, "Algorithm or parameter combination is not implemented"),
        (INVALID_ARGUMENT, -135, "A parameter is invalid"),
        (INVALID_HANDLE, -136, "Key or object handle does not exist"),
        (BAD_STATE, -137, "Operation is not valid in the current state"),
        (BUFFER_TOO_SMALL, -138, "Output buffer cannot hold the result"),
        (ALREADY_EXISTS, -139, "Object with this identifier already exists"),
        (DOES_NOT_EXIST, -140, "Object with this identifier does not exist"),
        (INSUFFICIENT_MEMORY, -141, "No free slot or buffer to complete the call"),
        (INSUFFICIENT_STORAGE, -142, "No space left in the key store"),
        (INSUFFICIENT_DATA, -143, "Derivation capacity exhausted"),
        (SERVICE_FAILURE, -144, "Service is not able to process requests"),
        (COMMUNICATION_FAILURE, -145, "Transport to the service failed"),
        (STORAGE_FAILURE, -146, "Key storage failure"),
        (HARDWARE_FAILURE, -147, "Platform or accelerator failure"),
        (INSUFFICIENT_ENTROPY, -148, "Random source failed"),
        (INVALID_SIGNATURE, -149, "Signature, MAC or tag verification failed"),
        (INVALID_PADDING, -150, "Decrypted padding is malformed"),
        (CORRUPTION_DETECTED, -151, "Internal state corruption detected"),
        (DATA_CORRUPT, -152, "Stored data is corrupt"),
        (DATA_INVALID, -153, "Stored data is invalid"),
        (
            MAILBOX_QUEUE_FULL,
            i32::MIN + 1,
            "Mailbox Error: no empty slot in the queue"
        ),
        (
            MAILBOX_INVAL_PARAMS,
            i32::MIN + 2,
            "Mailbox Error: malformed message"
        ),
        (
            MAILBOX_NO_PERMS,
            i32::MIN + 3,
            "Mailbox Error: caller has no permission"
        ),
        (
            MAILBOX_NO_PEND_EVENT,
            i32::MIN + 4,
            "Mailbox Error: no pending event"
        ),
        (
            MAILBOX_CHAN_BUSY,
            i32::MIN + 5,
            "Mailbox Error: channel busy"
        ),
        (
            MAILBOX_CALLBACK_REG_ERROR,
            i32::MIN + 6,
            "Mailbox Error: unable to register notification handler"
        ),
        (
            MAILBOX_INIT_ERROR,
            i32::MIN + 7,
            "Mailbox Error: queue configuration mismatch"
        ),
        (
            MAILBOX_GENERIC_ERROR,
            i32::MIN + 8,
            "Mailbox Error: unspecified failure"
        ),
        (
            NS_DISPATCH_ERROR,
            0x1f,
            "NS Interface Error: dispatch lock unavailable"
        ),
        (OS_WRAPPER_ERROR, -1, "OS Wrapper Error: primitive failed"),
    ];

    /// Raw status value.
    pub const fn status(self) -> i32 {
        self.0.get()
    }

    /// Convert a raw status into a result.
    pub fn result_from_status(status: i32) -> PsaResult<()> {
        match NonZeroI32::new(status) {
            None => Ok(()),
            Some(val) => Err(PsaError(val)),
        }
    }

    pub fn kind(self) -> ErrorKind {
        let is = |set: &[PsaError]| set.contains(&self);
        if is(&[Self::PROGRAMMER_ERROR, Self::MAILBOX_INVAL_PARAMS]) {
            ErrorKind::Programmer
        } else if is(&[Self::NOT_SUPPORTED]) {
            ErrorKind::NotSupported
        } else if is(&[
            Self::NOT_PERMITTED,
            Self::MAILBOX_NO_PERMS,
            Self::CONNECTION_REFUSED,
        ]) {
            ErrorKind::NotPermitted
        } else if is(&[Self::INVALID_HANDLE, Self::BAD_STATE, Self::DOES_NOT_EXIST]) {
            ErrorKind::InvalidHandle
        } else if is(&[
            Self::INSUFFICIENT_MEMORY,
            Self::INSUFFICIENT_STORAGE,
            Self::MAILBOX_QUEUE_FULL,
            Self::CONNECTION_BUSY,
        ]) {
            ErrorKind::ResourceExhausted
        } else if is(&[Self::INVALID_SIGNATURE]) {
            ErrorKind::Verification
        } else if is(&[
            Self::HARDWARE_FAILURE,
            Self::INSUFFICIENT_ENTROPY,
            Self::STORAGE_FAILURE,
        ]) {
            ErrorKind::Platform
        } else if is(&[
            Self::COMMUNICATION_FAILURE,
            Self::SERVICE_FAILURE,
            Self::MAILBOX_NO_PEND_EVENT,
            Self::MAILBOX_CHAN_BUSY,
            Self::MAILBOX_CALLBACK_REG_ERROR,
            Self::MAILBOX_INIT_ERROR,
            Self::MAILBOX_GENERIC_ERROR,
            Self::NS_DISPATCH_ERROR,
            Self::OS_WRAPPER_ERROR,
        ]) {
            ErrorKind::Communication
        } else {
            ErrorKind::Other
        }
    }
}

impl fmt::Display for PsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "psa status {}", self.0.get())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PsaError {}

impl From<NonZeroI32> for PsaError {
    fn from(val: NonZeroI32) -> Self {
        PsaError(val)
    }
}

impl From<PsaError> for NonZeroI32 {
    fn from(val: PsaError) -> Self {
        val.0
    }
}

impl From<PsaError> for i32 {
    fn from(val: PsaError) -> Self {
        val.status()
    }
}

impl TryFrom<i32> for PsaError {
    type Error = TryFromIntError;
    fn try_from(val: i32) -> Result<Self, TryFromIntError> {
        NonZeroI32::try_from(val).map(PsaError)
    }
}

pub type PsaResult<T> = Result<T, PsaError>;

/// Collapse a result into the status value carried across the boundary.
pub fn status_of<T>(result: &PsaResult<T>) -> i32 {
    match result {
        Ok(_) => PSA_SUCCESS,
        Err(err) => err.status(),
    }
}
