/*++

Licensed under the Apache-2.0 license.

File Name:

    crypto.rs

Abstract:

    File contains the PSA Crypto client API. Every call packs its scalar
    parameters into a crypto pack, adds its buffers as vectors and goes
    through the transport to the crypto service.

--*/

use crate::operation::{
    AeadOperation, CipherOperation, HashOperation, KeyDerivationOperation, MacOperation,
};
use crate::transport::Transport;
use arrayvec::ArrayVec;
use tzcrypto_api::crypto::{Algorithm, KeyAttributes, KeyDerivationStep, KeyId, KeyType};
use tzcrypto_api::function_id::{ATTRIBUTES_LEN, CAPACITY_LEN, HANDLE_LEN};
use tzcrypto_api::{
    CryptoPack, FunctionId, OutVec, CRYPTO_HANDLE, CRYPTO_SID, PSA_IPC_CALL, PSA_MAX_IOVEC,
    PSA_VERSION_NONE,
};
use tzcrypto_error::{ErrorKind, PsaError, PsaResult};
use zerocopy::IntoBytes;

type Lengths = ArrayVec<usize, PSA_MAX_IOVEC>;

/// False for failures raised before the crypto service saw the call: the
/// dispatch lock, the mailbox and the OS primitives behind them.
fn reached_service(err: PsaError) -> bool {
    err.kind() != ErrorKind::Communication
        && ![
            PsaError::MAILBOX_QUEUE_FULL,
            PsaError::MAILBOX_INVAL_PARAMS,
            PsaError::MAILBOX_NO_PERMS,
        ]
        .contains(&err)
}

pub struct PsaCrypto<T: Transport> {
    transport: T,
}

impl<T: Transport> PsaCrypto<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Check that the crypto service is reachable from this caller.
    pub fn crypto_init(&self) -> PsaResult<()> {
        if self.transport.version(CRYPTO_SID)? == PSA_VERSION_NONE {
            return Err(PsaError::CONNECTION_REFUSED);
        }
        Ok(())
    }

    fn call(&self, pack: CryptoPack, inputs: &[&[u8]], outputs: &mut [OutVec<'_>]) -> PsaResult<()> {
        let mut in_vec: ArrayVec<&[u8], PSA_MAX_IOVEC> = ArrayVec::new();
        in_vec.push(pack.as_bytes());
        in_vec
            .try_extend_from_slice(inputs)
            .map_err(|_| PsaError::PROGRAMMER_ERROR)?;
        self.transport
            .call(CRYPTO_HANDLE, PSA_IPC_CALL, &in_vec, outputs)
    }

    /// Single-shot call with at most one output; returns its length.
    fn single(&self, pack: CryptoPack, inputs: &[&[u8]], out: Option<&mut [u8]>) -> PsaResult<usize> {
        match out {
            Some(out) => {
                let mut out_vec = [OutVec::new(out)];
                self.call(pack, inputs, &mut out_vec)?;
                Ok(out_vec[0].len())
            }
            None => self.call(pack, inputs, &mut []).map(|()| 0),
        }
    }

    fn key_output(&self, pack: CryptoPack, inputs: &[&[u8]]) -> PsaResult<KeyId> {
        let mut id = [0u8; HANDLE_LEN];
        if self.single(pack, inputs, Some(&mut id[..]))? != HANDLE_LEN {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        Ok(KeyId::from_le_bytes(id))
    }

    /// Multipart call. `out_vec[0]` carries the operation handle back and
    /// `buffers` follow it. A failure the service answered leaves the
    /// operation inactive since the service releases the slot of a failed
    /// call. A failure on the way there keeps the handle so the caller can
    /// still abort.
    fn multipart(
        &self,
        op_handle: &mut u32,
        pack: CryptoPack,
        inputs: &[&[u8]],
        buffers: &mut [&mut [u8]],
    ) -> PsaResult<Lengths> {
        let mut handle = [0u8; HANDLE_LEN];
        let result = {
            let mut out_vec: ArrayVec<OutVec<'_>, PSA_MAX_IOVEC> = ArrayVec::new();
            out_vec.push(OutVec::new(&mut handle));
            for buf in buffers.iter_mut() {
                out_vec
                    .try_push(OutVec::new(&mut buf[..]))
                    .map_err(|_| PsaError::PROGRAMMER_ERROR)?;
            }
            self.call(pack.with_handle(*op_handle), inputs, &mut out_vec)
                .map(|()| {
                    let lens: Lengths = out_vec.iter().map(OutVec::len).collect();
                    lens
                })
        };
        match result {
            Ok(mut lens) => {
                *op_handle = match lens.remove(0) {
                    HANDLE_LEN => u32::from_le_bytes(handle),
                    _ => 0,
                };
                Ok(lens)
            }
            Err(err) => {
                if reached_service(err) {
                    *op_handle = 0;
                }
                Err(err)
            }
        }
    }

    pub fn generate_random(&self, out: &mut [u8]) -> PsaResult<()> {
        self.single(CryptoPack::new(FunctionId::GenerateRandom), &[], Some(out))
            .map(|_| ())
    }

    // Key management

    pub fn get_key_attributes(&self, key: KeyId) -> PsaResult<KeyAttributes> {
        let mut attrs = KeyAttributes::default();
        let pack = CryptoPack::new(FunctionId::GetKeyAttributes).with_key(key);
        if self.single(pack, &[], Some(attrs.as_mut_bytes()))? != ATTRIBUTES_LEN {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        Ok(attrs)
    }

    /// Type and size in bits of `key`.
    pub fn get_key_information(&self, key: KeyId) -> PsaResult<(KeyType, usize)> {
        let attrs = self.get_key_attributes(key)?;
        Ok((attrs.key_type(), attrs.bits()))
    }

    pub fn import_key(&self, attributes: &KeyAttributes, data: &[u8]) -> PsaResult<KeyId> {
        self.key_output(
            CryptoPack::new(FunctionId::ImportKey),
            &[attributes.as_bytes(), data],
        )
    }

    pub fn generate_key(&self, attributes: &KeyAttributes) -> PsaResult<KeyId> {
        self.key_output(CryptoPack::new(FunctionId::GenerateKey), &[attributes.as_bytes()])
    }

    pub fn copy_key(&self, source: KeyId, attributes: &KeyAttributes) -> PsaResult<KeyId> {
        self.key_output(
            CryptoPack::new(FunctionId::CopyKey).with_key(source),
            &[attributes.as_bytes()],
        )
    }

    /// Load a persistent key for this caller.
    pub fn open_key(&self, id: KeyId) -> PsaResult<KeyId> {
        self.key_output(CryptoPack::new(FunctionId::OpenKey).with_key(id), &[])
    }

    pub fn close_key(&self, key: KeyId) -> PsaResult<()> {
        self.single(CryptoPack::new(FunctionId::CloseKey).with_key(key), &[], None)
            .map(|_| ())
    }

    pub fn destroy_key(&self, key: KeyId) -> PsaResult<()> {
        self.single(CryptoPack::new(FunctionId::DestroyKey).with_key(key), &[], None)
            .map(|_| ())
    }

    pub fn purge_key(&self, key: KeyId) -> PsaResult<()> {
        self.single(CryptoPack::new(FunctionId::PurgeKey).with_key(key), &[], None)
            .map(|_| ())
    }

    pub fn export_key(&self, key: KeyId, out: &mut [u8]) -> PsaResult<usize> {
        self.single(CryptoPack::new(FunctionId::ExportKey).with_key(key), &[], Some(out))
    }

    pub fn export_public_key(&self, key: KeyId, out: &mut [u8]) -> PsaResult<usize> {
        self.single(
            CryptoPack::new(FunctionId::ExportPublicKey).with_key(key),
            &[],
            Some(out),
        )
    }

    // Hash

    pub fn hash_compute(&self, alg: Algorithm, input: &[u8], hash: &mut [u8]) -> PsaResult<usize> {
        self.single(
            CryptoPack::new(FunctionId::HashCompute).with_alg(alg.0),
            &[input],
            Some(hash),
        )
    }

    pub fn hash_compare(&self, alg: Algorithm, input: &[u8], hash: &[u8]) -> PsaResult<()> {
        self.single(
            CryptoPack::new(FunctionId::HashCompare).with_alg(alg.0),
            &[input, hash],
            None,
        )
        .map(|_| ())
    }

    pub fn hash_setup(&self, op: &mut HashOperation, alg: Algorithm) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::HashSetup).with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn hash_update(&self, op: &mut HashOperation, input: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::HashUpdate);
        self.multipart(&mut op.handle, pack, &[input], &mut []).map(|_| ())
    }

    /// Start `target` from the current state of `source`.
    pub fn hash_clone(&self, source: &HashOperation, target: &mut HashOperation) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::HashClone);
        let mut handle = source.handle;
        self.multipart(&mut handle, pack, &[], &mut [])?;
        target.handle = handle;
        Ok(())
    }

    pub fn hash_finish(&self, op: &mut HashOperation, hash: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::HashFinish);
        let lens = self.multipart(&mut op.handle, pack, &[], &mut [hash])?;
        Ok(lens[0])
    }

    pub fn hash_verify(&self, op: &mut HashOperation, hash: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::HashVerify);
        self.multipart(&mut op.handle, pack, &[hash], &mut []).map(|_| ())
    }

    pub fn hash_abort(&self, op: &mut HashOperation) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::HashAbort);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    // MAC

    pub fn mac_compute(
        &self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        mac: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::MacCompute)
            .with_key(key)
            .with_alg(alg.0);
        self.single(pack, &[input], Some(mac))
    }

    pub fn mac_verify(&self, key: KeyId, alg: Algorithm, input: &[u8], mac: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::MacVerify)
            .with_key(key)
            .with_alg(alg.0);
        self.single(pack, &[input, mac], None).map(|_| ())
    }

    pub fn mac_sign_setup(&self, op: &mut MacOperation, key: KeyId, alg: Algorithm) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::MacSignSetup)
            .with_key(key)
            .with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn mac_verify_setup(&self, op: &mut MacOperation, key: KeyId, alg: Algorithm) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::MacVerifySetup)
            .with_key(key)
            .with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn mac_update(&self, op: &mut MacOperation, input: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::MacUpdate);
        self.multipart(&mut op.handle, pack, &[input], &mut []).map(|_| ())
    }

    pub fn mac_sign_finish(&self, op: &mut MacOperation, mac: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::MacSignFinish);
        let lens = self.multipart(&mut op.handle, pack, &[], &mut [mac])?;
        Ok(lens[0])
    }

    pub fn mac_verify_finish(&self, op: &mut MacOperation, mac: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::MacVerifyFinish);
        self.multipart(&mut op.handle, pack, &[mac], &mut []).map(|_| ())
    }

    pub fn mac_abort(&self, op: &mut MacOperation) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::MacAbort);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    // Cipher

    /// Encrypt with a fresh random IV, returned at the front of `output`.
    pub fn cipher_encrypt(
        &self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::CipherEncrypt)
            .with_key(key)
            .with_alg(alg.0);
        self.single(pack, &[input], Some(output))
    }

    /// `input` starts with the IV when the mode takes one.
    pub fn cipher_decrypt(
        &self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::CipherDecrypt)
            .with_key(key)
            .with_alg(alg.0);
        self.single(pack, &[input], Some(output))
    }

    pub fn cipher_encrypt_setup(
        &self,
        op: &mut CipherOperation,
        key: KeyId,
        alg: Algorithm,
    ) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::CipherEncryptSetup)
            .with_key(key)
            .with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn cipher_decrypt_setup(
        &self,
        op: &mut CipherOperation,
        key: KeyId,
        alg: Algorithm,
    ) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::CipherDecryptSetup)
            .with_key(key)
            .with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn cipher_generate_iv(&self, op: &mut CipherOperation, iv: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::CipherGenerateIv);
        let lens = self.multipart(&mut op.handle, pack, &[], &mut [iv])?;
        Ok(lens[0])
    }

    pub fn cipher_set_iv(&self, op: &mut CipherOperation, iv: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::CipherSetIv);
        self.multipart(&mut op.handle, pack, &[iv], &mut []).map(|_| ())
    }

    pub fn cipher_update(
        &self,
        op: &mut CipherOperation,
        input: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::CipherUpdate);
        let lens = self.multipart(&mut op.handle, pack, &[input], &mut [output])?;
        Ok(lens[0])
    }

    pub fn cipher_finish(&self, op: &mut CipherOperation, output: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::CipherFinish);
        let lens = self.multipart(&mut op.handle, pack, &[], &mut [output])?;
        Ok(lens[0])
    }

    pub fn cipher_abort(&self, op: &mut CipherOperation) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::CipherAbort);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    // AEAD

    /// Ciphertext followed by the tag.
    #[allow(clippy::too_many_arguments)]
    pub fn aead_encrypt(
        &self,
        key: KeyId,
        alg: Algorithm,
        nonce: &[u8],
        additional_data: &[u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AeadEncrypt)
            .with_key(key)
            .with_alg(alg.0)
            .with_nonce(nonce)?;
        self.single(pack, &[plaintext, additional_data], Some(ciphertext))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn aead_decrypt(
        &self,
        key: KeyId,
        alg: Algorithm,
        nonce: &[u8],
        additional_data: &[u8],
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AeadDecrypt)
            .with_key(key)
            .with_alg(alg.0)
            .with_nonce(nonce)?;
        self.single(pack, &[ciphertext, additional_data], Some(plaintext))
    }

    pub fn aead_encrypt_setup(&self, op: &mut AeadOperation, key: KeyId, alg: Algorithm) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::AeadEncryptSetup)
            .with_key(key)
            .with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn aead_decrypt_setup(&self, op: &mut AeadOperation, key: KeyId, alg: Algorithm) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::AeadDecryptSetup)
            .with_key(key)
            .with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn aead_generate_nonce(&self, op: &mut AeadOperation, nonce: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AeadGenerateNonce);
        let lens = self.multipart(&mut op.handle, pack, &[], &mut [nonce])?;
        Ok(lens[0])
    }

    pub fn aead_set_nonce(&self, op: &mut AeadOperation, nonce: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::AeadSetNonce).with_nonce(nonce)?;
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn aead_set_lengths(
        &self,
        op: &mut AeadOperation,
        ad_length: usize,
        plaintext_length: usize,
    ) -> PsaResult<()> {
        let mut pack = CryptoPack::new(FunctionId::AeadSetLengths);
        pack.ad_length = u32::try_from(ad_length).map_err(|_| PsaError::INVALID_ARGUMENT)?;
        pack.plaintext_length =
            u32::try_from(plaintext_length).map_err(|_| PsaError::INVALID_ARGUMENT)?;
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn aead_update_ad(&self, op: &mut AeadOperation, input: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::AeadUpdateAd);
        self.multipart(&mut op.handle, pack, &[input], &mut []).map(|_| ())
    }

    /// The service buffers GCM payload until finish, so this normally
    /// returns zero.
    pub fn aead_update(&self, op: &mut AeadOperation, input: &[u8], output: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AeadUpdate);
        let lens = self.multipart(&mut op.handle, pack, &[input], &mut [output])?;
        Ok(lens[0])
    }

    /// Returns the ciphertext and tag lengths.
    pub fn aead_finish(
        &self,
        op: &mut AeadOperation,
        ciphertext: &mut [u8],
        tag: &mut [u8],
    ) -> PsaResult<(usize, usize)> {
        let pack = CryptoPack::new(FunctionId::AeadFinish);
        let lens = self.multipart(&mut op.handle, pack, &[], &mut [ciphertext, tag])?;
        Ok((lens[0], lens[1]))
    }

    pub fn aead_verify(&self, op: &mut AeadOperation, plaintext: &mut [u8], tag: &[u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AeadVerify);
        let lens = self.multipart(&mut op.handle, pack, &[tag], &mut [plaintext])?;
        Ok(lens[0])
    }

    pub fn aead_abort(&self, op: &mut AeadOperation) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::AeadAbort);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    // Asymmetric signature

    fn sign(&self, fid: FunctionId, key: KeyId, alg: Algorithm, input: &[u8], signature: &mut [u8]) -> PsaResult<usize> {
        let pack = CryptoPack::new(fid).with_key(key).with_alg(alg.0);
        self.single(pack, &[input], Some(signature))
    }

    fn verify(&self, fid: FunctionId, key: KeyId, alg: Algorithm, input: &[u8], signature: &[u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(fid).with_key(key).with_alg(alg.0);
        self.single(pack, &[input, signature], None).map(|_| ())
    }

    pub fn sign_message(&self, key: KeyId, alg: Algorithm, input: &[u8], signature: &mut [u8]) -> PsaResult<usize> {
        self.sign(FunctionId::SignMessage, key, alg, input, signature)
    }

    pub fn verify_message(&self, key: KeyId, alg: Algorithm, input: &[u8], signature: &[u8]) -> PsaResult<()> {
        self.verify(FunctionId::VerifyMessage, key, alg, input, signature)
    }

    pub fn sign_hash(&self, key: KeyId, alg: Algorithm, hash: &[u8], signature: &mut [u8]) -> PsaResult<usize> {
        self.sign(FunctionId::SignHash, key, alg, hash, signature)
    }

    pub fn verify_hash(&self, key: KeyId, alg: Algorithm, hash: &[u8], signature: &[u8]) -> PsaResult<()> {
        self.verify(FunctionId::VerifyHash, key, alg, hash, signature)
    }

    // Asymmetric encryption

    pub fn asymmetric_encrypt(
        &self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        salt: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AsymmetricEncrypt)
            .with_key(key)
            .with_alg(alg.0);
        self.single(pack, &[input, salt], Some(output))
    }

    pub fn asymmetric_decrypt(
        &self,
        key: KeyId,
        alg: Algorithm,
        input: &[u8],
        salt: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::AsymmetricDecrypt)
            .with_key(key)
            .with_alg(alg.0);
        self.single(pack, &[input, salt], Some(output))
    }

    // Key derivation

    pub fn key_derivation_setup(&self, op: &mut KeyDerivationOperation, alg: Algorithm) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::KeyDerivationSetup).with_alg(alg.0);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn key_derivation_get_capacity(&self, op: &mut KeyDerivationOperation) -> PsaResult<u64> {
        let pack = CryptoPack::new(FunctionId::KeyDerivationGetCapacity);
        let mut capacity = [0u8; CAPACITY_LEN];
        self.multipart(&mut op.handle, pack, &[], &mut [&mut capacity[..]])?;
        Ok(u64::from_le_bytes(capacity))
    }

    pub fn key_derivation_set_capacity(&self, op: &mut KeyDerivationOperation, capacity: u64) -> PsaResult<()> {
        let mut pack = CryptoPack::new(FunctionId::KeyDerivationSetCapacity);
        pack.capacity = capacity;
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn key_derivation_input_bytes(
        &self,
        op: &mut KeyDerivationOperation,
        step: KeyDerivationStep,
        data: &[u8],
    ) -> PsaResult<()> {
        let mut pack = CryptoPack::new(FunctionId::KeyDerivationInputBytes);
        pack.step = step as u16;
        self.multipart(&mut op.handle, pack, &[data], &mut []).map(|_| ())
    }

    pub fn key_derivation_input_key(
        &self,
        op: &mut KeyDerivationOperation,
        step: KeyDerivationStep,
        key: KeyId,
    ) -> PsaResult<()> {
        let mut pack = CryptoPack::new(FunctionId::KeyDerivationInputKey).with_key(key);
        pack.step = step as u16;
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    /// Feed the shared secret of `private_key` and `peer_key` as `step`.
    pub fn key_derivation_key_agreement(
        &self,
        op: &mut KeyDerivationOperation,
        step: KeyDerivationStep,
        private_key: KeyId,
        peer_key: &[u8],
    ) -> PsaResult<()> {
        let mut pack = CryptoPack::new(FunctionId::KeyDerivationKeyAgreement).with_key(private_key);
        pack.step = step as u16;
        self.multipart(&mut op.handle, pack, &[peer_key], &mut []).map(|_| ())
    }

    pub fn key_derivation_output_bytes(&self, op: &mut KeyDerivationOperation, output: &mut [u8]) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::KeyDerivationOutputBytes);
        self.multipart(&mut op.handle, pack, &[], &mut [output]).map(|_| ())
    }

    pub fn key_derivation_output_key(
        &self,
        attributes: &KeyAttributes,
        op: &mut KeyDerivationOperation,
    ) -> PsaResult<KeyId> {
        let pack = CryptoPack::new(FunctionId::KeyDerivationOutputKey);
        let mut id = [0u8; HANDLE_LEN];
        self.multipart(&mut op.handle, pack, &[attributes.as_bytes()], &mut [&mut id[..]])?;
        Ok(KeyId::from_le_bytes(id))
    }

    pub fn key_derivation_abort(&self, op: &mut KeyDerivationOperation) -> PsaResult<()> {
        let pack = CryptoPack::new(FunctionId::KeyDerivationAbort);
        self.multipart(&mut op.handle, pack, &[], &mut []).map(|_| ())
    }

    pub fn raw_key_agreement(
        &self,
        alg: Algorithm,
        private_key: KeyId,
        peer_key: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let pack = CryptoPack::new(FunctionId::RawKeyAgreement)
            .with_key(private_key)
            .with_alg(alg.0);
        self.single(pack, &[peer_key], Some(output))
    }
}
