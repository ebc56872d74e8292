/*++

Licensed under the Apache-2.0 license.

File Name:

    operation.rs

Abstract:

    File contains the fixed pool of multipart operation contexts and the
    handles that name them.

--*/

use crate::config::CRYPTO_CONC_OPER_NUM;
use crate::handlers::{
    AeadOperation, CipherOperation, HashOperation, KeyDerivationOperation, MacOperation,
};
use tzcrypto_api::ClientId;
use tzcrypto_error::{PsaError, PsaResult};

/// Never names a slot.
pub const OPERATION_HANDLE_INVALID: u32 = 0;

/// Context of one in-flight multipart operation. The variant is the
/// operation type; a handle only resolves to the type it was created as.
pub enum Operation {
    Hash(HashOperation),
    Mac(MacOperation),
    Cipher(CipherOperation),
    Aead(AeadOperation),
    KeyDerivation(KeyDerivationOperation),
}

/// Implemented by every context type that can live in the pool.
pub trait OperationContext: Sized {
    fn into_operation(self) -> Operation;

    fn from_operation(op: &mut Operation) -> Option<&mut Self>;
}

macro_rules! operation_context {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl OperationContext for $ty {
                fn into_operation(self) -> Operation {
                    Operation::$variant(self)
                }

                fn from_operation(op: &mut Operation) -> Option<&mut Self> {
                    match op {
                        Operation::$variant(ctx) => Some(ctx),
                        _ => None,
                    }
                }
            }
        )*
    };
}

operation_context![
    Hash(HashOperation),
    Mac(MacOperation),
    Cipher(CipherOperation),
    Aead(AeadOperation),
    KeyDerivation(KeyDerivationOperation),
];

struct OperationSlot {
    owner: ClientId,
    op: Operation,
}

pub struct OperationPool {
    slots: [Option<OperationSlot>; CRYPTO_CONC_OPER_NUM],
}

impl Default for OperationPool {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationPool {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    fn index(handle: u32) -> Option<usize> {
        let idx = (handle as usize).checked_sub(1)?;
        (idx < CRYPTO_CONC_OPER_NUM).then_some(idx)
    }

    /// Place `ctx` in a free slot owned by `owner` and return its handle.
    ///
    /// A full pool is INSUFFICIENT_MEMORY; `ctx` is dropped, which wipes it.
    pub fn alloc<T: OperationContext>(&mut self, owner: ClientId, ctx: T) -> PsaResult<u32> {
        let idx = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(PsaError::INSUFFICIENT_MEMORY)?;
        self.slots[idx] = Some(OperationSlot {
            owner,
            op: ctx.into_operation(),
        });
        Ok(idx as u32 + 1)
    }

    /// Resolve a handle to its context.
    ///
    /// Out of range, free, foreign or differently typed slots are all
    /// BAD_STATE.
    pub fn lookup<T: OperationContext>(&mut self, owner: ClientId, handle: u32) -> PsaResult<&mut T> {
        let slot = Self::index(handle)
            .and_then(|idx| self.slots[idx].as_mut())
            .filter(|slot| slot.owner == owner)
            .ok_or(PsaError::BAD_STATE)?;
        T::from_operation(&mut slot.op).ok_or(PsaError::BAD_STATE)
    }

    /// Whether `handle` names a live slot of `owner`, whatever its type.
    pub fn owns(&self, owner: ClientId, handle: u32) -> bool {
        Self::index(handle)
            .and_then(|idx| self.slots[idx].as_ref())
            .is_some_and(|slot| slot.owner == owner)
    }

    /// Free a slot. Unknown or foreign handles are ignored. The context is
    /// dropped here and every context type wipes itself on drop.
    pub fn release(&mut self, owner: ClientId, handle: u32) {
        if let Some(idx) = Self::index(handle) {
            if self.slots[idx].as_ref().is_some_and(|slot| slot.owner == owner) {
                self.slots[idx] = None;
            }
        }
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
