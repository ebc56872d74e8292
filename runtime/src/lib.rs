/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the secure crypto service and the dispatch of
    one crypto call to its handler group.

--*/

mod call;
pub mod config;
mod drivers;
pub mod fail_stop;
mod handlers;
pub mod key_owner;
pub mod mailbox;
pub mod operation;
pub mod platform;
pub mod spm;

use arrayvec::ArrayVec;
use call::CryptoCall;
use config::CRYPTO_IOVEC_BUFFER_SIZE;
use handlers::{
    AeadCmd, AsymEncryptCmd, AsymSignCmd, CipherCmd, HashCmd, KeyDerivationCmd, KeyManagementCmd,
    MacCmd, RandomCmd,
};
use tzcrypto_api::{ClientId, CryptoPack, FunctionGroup, FunctionId, OutVec, PSA_MAX_IOVEC};
use tzcrypto_error::{PsaError, PsaResult};

pub use config::InitParams;
pub use drivers::Drivers;
pub use fail_stop::FailStopReason;
pub use mailbox::SpeMailbox;
pub use platform::{BuiltinKeyDescriptor, BuiltinKeySource, Platform, SoftwarePlatform};
pub use spm::Spm;

/// Whether the primitive group was built into the service.
fn group_enabled(group: FunctionGroup) -> bool {
    match group {
        FunctionGroup::Random | FunctionGroup::KeyManagement => true,
        FunctionGroup::Hash => cfg!(feature = "hash"),
        FunctionGroup::Mac => cfg!(feature = "mac"),
        FunctionGroup::Cipher => cfg!(feature = "cipher"),
        FunctionGroup::Aead => cfg!(feature = "aead"),
        FunctionGroup::AsymSign => cfg!(feature = "asym-sign"),
        FunctionGroup::AsymEncrypt => cfg!(feature = "asym-encrypt"),
        FunctionGroup::KeyDerivation => cfg!(feature = "key-derivation"),
    }
}

/// Handle one call to the crypto service.
///
/// `in_vec[0]` carries the pack naming the function. The vector shape is
/// checked against the function table before any handler runs; a mismatch
/// is a programmer error. Output lengths are reset up front so a failing
/// call never reports stale bytes.
///
/// A call whose vectors overflow the service scratch buffer fails with
/// INSUFFICIENT_MEMORY. Like any other failed multipart call it ends the
/// operation it names.
///
/// # Arguments
///
/// * `drivers` - Service state
/// * `caller` - Partition the framework vouches for
/// * `in_vec` - Input vectors, already copied into secure memory
/// * `out_vec` - Output vectors
pub fn handle_call(
    drivers: &mut Drivers,
    caller: ClientId,
    in_vec: &[&[u8]],
    out_vec: &mut [OutVec<'_>],
) -> PsaResult<()> {
    out_vec.iter_mut().for_each(OutVec::clear);

    if in_vec.len() > PSA_MAX_IOVEC || out_vec.len() > PSA_MAX_IOVEC {
        return Err(PsaError::PROGRAMMER_ERROR);
    }
    let pack = CryptoPack::decode(in_vec.first().ok_or(PsaError::PROGRAMMER_ERROR)?)?;
    let fid = FunctionId::try_from(pack.function_id).inspect_err(|_| {
        log::warn!("[crypto] unknown function 0x{:04x}", pack.function_id);
    })?;

    let info = fid.info();
    let in_lens: ArrayVec<usize, PSA_MAX_IOVEC> = in_vec.iter().map(|v| v.len()).collect();
    let out_caps: ArrayVec<usize, PSA_MAX_IOVEC> = out_vec.iter().map(OutVec::capacity).collect();
    info.check_shape(&in_lens, &out_caps).inspect_err(|_| {
        log::warn!("[crypto] bad vector shape for {fid:?}");
    })?;

    if !group_enabled(info.group) {
        log::warn!("[crypto] {:?} calls are not built in", info.group);
        return Err(PsaError::NOT_SUPPORTED);
    }

    log::debug!("[crypto] fid=0x{:04x} caller={}", u16::from(fid), caller);

    let scratch = in_lens.iter().sum::<usize>() + out_caps.iter().sum::<usize>();
    let mut call = CryptoCall::new(caller, fid, pack, in_vec, out_vec);
    let result = if scratch > CRYPTO_IOVEC_BUFFER_SIZE {
        log::warn!("[crypto] {fid:?} needs {scratch} bytes of scratch");
        call.bind(&drivers.operations);
        Err(PsaError::INSUFFICIENT_MEMORY)
    } else {
        match info.group {
            FunctionGroup::Random => RandomCmd::execute(drivers, &mut call),
            FunctionGroup::KeyManagement => KeyManagementCmd::execute(drivers, &mut call),
            FunctionGroup::Hash => HashCmd::execute(drivers, &mut call),
            FunctionGroup::Mac => MacCmd::execute(drivers, &mut call),
            FunctionGroup::Cipher => CipherCmd::execute(drivers, &mut call),
            FunctionGroup::Aead => AeadCmd::execute(drivers, &mut call),
            FunctionGroup::AsymSign => AsymSignCmd::execute(drivers, &mut call),
            FunctionGroup::AsymEncrypt => AsymEncryptCmd::execute(drivers, &mut call),
            FunctionGroup::KeyDerivation => KeyDerivationCmd::execute(drivers, &mut call),
        }
    };
    if let Err(err) = result {
        log::debug!("[crypto] {fid:?} failed: {err:?}");
    }
    call.complete(&mut drivers.operations, result)
}
