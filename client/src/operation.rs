// Licensed under the Apache-2.0 license

macro_rules! operation_handles {
    ($($(#[$doc:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Default, PartialEq, Eq)]
            pub struct $name {
                pub(crate) handle: u32,
            }

            impl $name {
                pub fn new() -> Self {
                    Self::default()
                }

                /// Service handle, zero when no operation is in progress.
                pub fn handle(&self) -> u32 {
                    self.handle
                }

                pub fn is_active(&self) -> bool {
                    self.handle != 0
                }
            }
        )*
    };
}

operation_handles![
    /// Multipart hash.
    HashOperation,
    /// Multipart MAC sign or verify.
    MacOperation,
    /// Multipart cipher encrypt or decrypt.
    CipherOperation,
    /// Multipart AEAD encrypt or decrypt.
    AeadOperation,
    KeyDerivationOperation,
];
