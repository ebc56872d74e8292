// Licensed under the Apache-2.0 license

use crate::operation::{OperationContext, OperationPool, OPERATION_HANDLE_INVALID};
use tzcrypto_api::function_id::{FunctionType, HANDLE_LEN};
use tzcrypto_api::{ClientId, CryptoPack, FunctionId, OutVec};
use tzcrypto_error::{PsaError, PsaResult};

/// One decoded crypto call on its way through a handler.
///
/// Vector indexes are absolute: `input(0)` is the pack and, for multipart
/// calls, `out_vec[0]` is the operation handle which only the dispatcher
/// writes.
pub struct CryptoCall<'a, 'o> {
    pub caller: ClientId,
    pub fid: FunctionId,
    pub pack: CryptoPack,
    inputs: &'a [&'a [u8]],
    outputs: &'a mut [OutVec<'o>],

    /// Handle reported back to the caller.
    handle: u32,

    /// Set once `handle` names a slot this call allocated or resolved.
    bound: bool,
}

impl<'a, 'o> CryptoCall<'a, 'o> {
    pub fn new(
        caller: ClientId,
        fid: FunctionId,
        pack: CryptoPack,
        inputs: &'a [&'a [u8]],
        outputs: &'a mut [OutVec<'o>],
    ) -> Self {
        let handle = match fid.info().function_type {
            FunctionType::Lookup => pack.op_handle,
            _ => OPERATION_HANDLE_INVALID,
        };
        Self {
            caller,
            fid,
            pack,
            inputs,
            outputs,
            handle,
            bound: false,
        }
    }

    pub fn input(&self, idx: usize) -> &'a [u8] {
        self.inputs.get(idx).copied().unwrap_or(&[])
    }

    pub fn output(&mut self, idx: usize) -> PsaResult<&mut OutVec<'o>> {
        self.outputs.get_mut(idx).ok_or(PsaError::PROGRAMMER_ERROR)
    }

    /// Two distinct outputs at once, `first < second`.
    pub fn output_pair(
        &mut self,
        first: usize,
        second: usize,
    ) -> PsaResult<(&mut OutVec<'o>, &mut OutVec<'o>)> {
        if first >= second || second >= self.outputs.len() {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        let (head, tail) = self.outputs.split_at_mut(second);
        Ok((&mut head[first], &mut tail[0]))
    }

    pub fn write_output(&mut self, idx: usize, data: &[u8]) -> PsaResult<()> {
        self.output(idx)?.write(data)
    }

    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Allocate a slot for a new operation and report its handle.
    pub fn setup<T: OperationContext>(&mut self, ops: &mut OperationPool, ctx: T) -> PsaResult<()> {
        self.handle = ops.alloc(self.caller, ctx)?;
        self.bound = true;
        Ok(())
    }

    /// Resolve the handle in the pack. The slot is only bound to this call
    /// once the lookup succeeds, so a bad handle never frees anything.
    pub fn lookup<'p, T: OperationContext>(&mut self, ops: &'p mut OperationPool) -> PsaResult<&'p mut T> {
        let ctx = ops.lookup(self.caller, self.pack.op_handle)?;
        self.bound = true;
        Ok(ctx)
    }

    /// Bind the slot named in the pack without resolving its context, so a
    /// call rejected before its handler runs still ends the operation.
    pub fn bind(&mut self, ops: &OperationPool) {
        if self.fid.info().function_type == FunctionType::Lookup
            && ops.owns(self.caller, self.pack.op_handle)
        {
            self.bound = true;
        }
    }

    /// Return the bound slot to the pool.
    pub fn release(&mut self, ops: &mut OperationPool) {
        if self.bound {
            ops.release(self.caller, self.handle);
            self.handle = OPERATION_HANDLE_INVALID;
            self.bound = false;
        }
    }

    /// Abort the operation named in the pack whether or not it still exists.
    pub fn abort(&mut self, ops: &mut OperationPool) {
        ops.release(self.caller, self.pack.op_handle);
        self.handle = OPERATION_HANDLE_INVALID;
        self.bound = false;
    }

    /// Settle the handle after the handler ran: a failed multipart call
    /// frees the slot it bound, then the handle goes back in `out_vec[0]`.
    /// A call that failed before binding leaves the caller's handle as is.
    /// A failed call of any kind reports no output bytes.
    pub fn complete(mut self, ops: &mut OperationPool, result: PsaResult<()>) -> PsaResult<()> {
        if result.is_err() {
            self.outputs.iter_mut().for_each(OutVec::clear);
        }
        if self.fid.info().function_type == FunctionType::NonMultipart {
            return result;
        }
        if result.is_err() {
            self.release(ops);
        }
        let handle = self.handle;
        let out = self.output(0)?;
        if out.capacity() == HANDLE_LEN {
            out.write(&handle.to_le_bytes())?;
        }
        result
    }
}
