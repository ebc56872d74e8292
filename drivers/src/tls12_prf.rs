/*++

Licensed under the Apache-2.0 license.

File Name:

    tls12_prf.rs

Abstract:

    File contains the TLS 1.2 pseudo random function (RFC 5246 section 5).

--*/

use crate::mac::HmacOp;
use crate::sha::{ShaMode, SHA_MAX_DIGEST_SIZE};
use tzcrypto_error::PsaResult;
use zeroize::{Zeroize, Zeroizing};

/// Streaming P_hash(secret, label || seed)
pub struct Tls12Prf {
    keyed: HmacOp,
    label_seed: Zeroizing<Vec<u8>>,
    /// A(i)
    a: [u8; SHA_MAX_DIGEST_SIZE],
    block: [u8; SHA_MAX_DIGEST_SIZE],
    block_pos: usize,
}

impl Tls12Prf {
    pub fn new(mode: ShaMode, secret: &[u8], label: &[u8], seed: &[u8]) -> PsaResult<Self> {
        let keyed = HmacOp::new(mode, secret)?;
        let mut label_seed = Zeroizing::new(Vec::with_capacity(label.len() + seed.len()));
        label_seed.extend_from_slice(label);
        label_seed.extend_from_slice(seed);

        // A(1) = HMAC(secret, A(0)), A(0) = label || seed
        let mut op = keyed.clone();
        op.update(&label_seed);
        let a1 = op.finalize_tag();
        let mut a = [0u8; SHA_MAX_DIGEST_SIZE];
        a[..a1.len()].copy_from_slice(a1.as_bytes());

        Ok(Self {
            keyed,
            label_seed,
            a,
            block: [0u8; SHA_MAX_DIGEST_SIZE],
            block_pos: mode.digest_len(),
        })
    }

    pub fn read(&mut self, out: &mut [u8]) -> PsaResult<()> {
        let hash_len = self.keyed.mac_len();
        for byte in out.iter_mut() {
            if self.block_pos == hash_len {
                self.next_block();
            }
            *byte = self.block[self.block_pos];
            self.block_pos += 1;
        }
        Ok(())
    }

    fn next_block(&mut self) {
        let hash_len = self.keyed.mac_len();

        let mut op = self.keyed.clone();
        op.update(&self.a[..hash_len]);
        op.update(&self.label_seed);
        let block = op.finalize_tag();
        self.block[..hash_len].copy_from_slice(block.as_bytes());
        self.block_pos = 0;

        let mut op = self.keyed.clone();
        op.update(&self.a[..hash_len]);
        let next = op.finalize_tag();
        self.a[..hash_len].copy_from_slice(next.as_bytes());
    }
}

impl Drop for Tls12Prf {
    fn drop(&mut self) {
        self.a.zeroize();
        self.block.zeroize();
    }
}
