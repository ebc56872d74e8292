/*++

Licensed under the Apache-2.0 license.

File Name:

    spm.rs

Abstract:

    File contains the secure side of the PSA client framework: version and
    connection management in front of the crypto service, caller identity
    mapping and the fail-stop escalation.

--*/

use crate::config::{InitParams, MAX_CONNECTIONS, NS_CLIENT_ID};
use crate::fail_stop::{FailStopCounters, FailStopReason};
use crate::platform::Platform;
use crate::{handle_call, Drivers};
use tzcrypto_api::{
    ClientId, OutVec, PsaFramework, PsaHandle, CRYPTO_HANDLE, CRYPTO_SID, CRYPTO_VERSION,
    PSA_FRAMEWORK_VERSION, PSA_IPC_CALL, PSA_MAX_IOVEC, PSA_VERSION_NONE,
};
use tzcrypto_error::{PsaError, PsaResult};

#[derive(Debug, Clone, Copy)]
struct Connection {
    owner: ClientId,
}

/// Secure partition manager hosting the crypto service.
pub struct Spm {
    drivers: Drivers,
    params: InitParams,
    fail_stop: FailStopCounters,
    connections: [Option<Connection>; MAX_CONNECTIONS],
    halted: bool,
}

impl Spm {
    pub fn new(platform: Box<dyn Platform>, params: InitParams) -> Self {
        log::info!(
            "[spm] crypto service sid=0x{:08x} version={} up",
            CRYPTO_SID,
            CRYPTO_VERSION
        );
        Self {
            drivers: Drivers::new(platform),
            fail_stop: FailStopCounters::new(&params),
            params,
            connections: [None; MAX_CONNECTIONS],
            halted: false,
        }
    }

    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    pub fn drivers_mut(&mut self) -> &mut Drivers {
        &mut self.drivers
    }

    pub fn params(&self) -> &InitParams {
        &self.params
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn violations(&self, reason: FailStopReason) -> u32 {
        self.fail_stop.count(reason)
    }

    /// Count a boundary violation. Crossing the threshold runs the
    /// platform's fail-stop hook and halts the service for good.
    pub fn report_violation(&mut self, reason: FailStopReason) {
        if self.fail_stop.record(reason) && !self.halted {
            self.drivers.platform.fail_stop(reason);
            self.halted = true;
        }
    }

    /// Identity the crypto service sees for `client_id`.
    fn partition(&self, client_id: ClientId) -> ClientId {
        if client_id < 0 && !self.params.ns_client_ids {
            NS_CLIENT_ID
        } else {
            client_id
        }
    }

    fn service_visible(&self, client_id: ClientId) -> bool {
        client_id >= 0 || self.params.ns_access
    }

    /// Check that `client_id` may use the service, counting a violation
    /// when it may not.
    fn check_access(&mut self, client_id: ClientId) -> PsaResult<()> {
        if self.service_visible(client_id) {
            return Ok(());
        }
        log::warn!("[spm] client {client_id} denied the crypto service");
        self.report_violation(FailStopReason::ServicePermission);
        Err(PsaError::CONNECTION_REFUSED)
    }

    fn connection_index(&self, client_id: ClientId, handle: PsaHandle) -> Option<usize> {
        let idx = usize::try_from(handle).ok()?.checked_sub(1)?;
        match self.connections.get(idx)? {
            Some(conn) if conn.owner == client_id => Some(idx),
            _ => None,
        }
    }

    fn check_handle(&mut self, client_id: ClientId, handle: PsaHandle) -> PsaResult<()> {
        if handle == CRYPTO_HANDLE {
            return self.check_access(client_id);
        }
        if self.connection_index(client_id, handle).is_some() {
            return Ok(());
        }
        log::warn!("[spm] client {client_id} used unknown handle 0x{handle:08x}");
        Err(PsaError::PROGRAMMER_ERROR)
    }
}

impl PsaFramework for Spm {
    fn framework_version(&self) -> u32 {
        PSA_FRAMEWORK_VERSION
    }

    fn version(&mut self, client_id: ClientId, sid: u32) -> u32 {
        if self.halted || sid != CRYPTO_SID || !self.service_visible(client_id) {
            return PSA_VERSION_NONE;
        }
        CRYPTO_VERSION
    }

    fn connect(&mut self, client_id: ClientId, sid: u32, version: u32) -> PsaResult<PsaHandle> {
        if self.halted {
            return Err(PsaError::SERVICE_FAILURE);
        }
        if sid != CRYPTO_SID {
            return Err(PsaError::CONNECTION_REFUSED);
        }
        self.check_access(client_id)?;
        if version == PSA_VERSION_NONE || version > CRYPTO_VERSION {
            return Err(PsaError::CONNECTION_REFUSED);
        }
        let idx = self
            .connections
            .iter()
            .position(Option::is_none)
            .ok_or(PsaError::CONNECTION_BUSY)?;
        self.connections[idx] = Some(Connection { owner: client_id });
        log::debug!("[spm] client {client_id} connected as {}", idx + 1);
        Ok(idx as PsaHandle + 1)
    }

    fn call(
        &mut self,
        client_id: ClientId,
        handle: PsaHandle,
        call_type: i32,
        in_vec: &[&[u8]],
        out_vec: &mut [OutVec<'_>],
    ) -> PsaResult<()> {
        if self.halted {
            return Err(PsaError::SERVICE_FAILURE);
        }
        if call_type != PSA_IPC_CALL {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        self.check_handle(client_id, handle)?;
        if in_vec.is_empty() || in_vec.len() > PSA_MAX_IOVEC || out_vec.len() > PSA_MAX_IOVEC {
            return Err(PsaError::PROGRAMMER_ERROR);
        }
        let caller = self.partition(client_id);
        handle_call(&mut self.drivers, caller, in_vec, out_vec)
    }

    fn close(&mut self, client_id: ClientId, handle: PsaHandle) {
        match self.connection_index(client_id, handle) {
            Some(idx) => self.connections[idx] = None,
            None => log::warn!("[spm] client {client_id} closed unknown handle {handle}"),
        }
    }
}
