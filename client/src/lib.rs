/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the non-secure side of the crypto service:
    the PSA Crypto client API and the transports that carry its calls.

--*/

mod crypto;
mod mailbox;
mod ns_interface;
mod operation;
mod transport;

pub use crypto::PsaCrypto;
pub use mailbox::MailboxTransport;
pub use ns_interface::{LockedTransport, NsInterface};
pub use operation::{
    AeadOperation, CipherOperation, HashOperation, KeyDerivationOperation, MacOperation,
};
pub use transport::Transport;
