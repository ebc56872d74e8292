// Licensed under the Apache-2.0 license

//! Invalid-attempt counters on interfaces reachable from the non-secure
//! side.

use crate::config::InitParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailStopReason {
    /// A caller reached for a service it may not use.
    ServicePermission,
    /// A mailbox message referenced memory outside the shared region.
    MemoryRange,
}

#[derive(Debug, Default)]
pub struct FailStopCounters {
    threshold: u32,
    service_permission: u32,
    memory_range: u32,
}

impl FailStopCounters {
    pub fn new(params: &InitParams) -> Self {
        Self {
            threshold: params.fail_stop_threshold.max(1),
            ..Default::default()
        }
    }

    /// Count one violation. Returns true once the threshold is reached.
    pub fn record(&mut self, reason: FailStopReason) -> bool {
        let counter = match reason {
            FailStopReason::ServicePermission => &mut self.service_permission,
            FailStopReason::MemoryRange => &mut self.memory_range,
        };
        *counter = counter.saturating_add(1);
        log::warn!("[spm] {reason:?} violation {}/{}", *counter, self.threshold);
        *counter >= self.threshold
    }

    pub fn count(&self, reason: FailStopReason) -> u32 {
        match reason {
            FailStopReason::ServicePermission => self.service_permission,
            FailStopReason::MemoryRange => self.memory_range,
        }
    }
}
