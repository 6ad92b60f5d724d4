//! Cloud - concurrency-safe VM lifecycle manager.
//!
//! All registry reads and writes go through a single reader/writer lock.
//! `launch` and `stop` move a VM into its intermediate state inside one
//! critical section, then schedule a detached task that advances it to the
//! terminal state once the configured delay has passed. The two steps are
//! independent critical sections; other operations may interleave.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::oneshot;

use crate::error::{CloudError, CloudResult};
use crate::vm::{Vm, VmId, VmState, Vms};

/// Default simulated boot time.
pub const DEFAULT_START_DELAY: Duration = Duration::from_secs(10);

/// Default simulated shutdown time.
pub const DEFAULT_STOP_DELAY: Duration = Duration::from_secs(5);

/// Delays applied before a VM leaves an intermediate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delays {
    /// `Starting -> Running`.
    pub start: Duration,
    /// `Stopping -> Stopped`.
    pub stop: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_DELAY,
            stop: DEFAULT_STOP_DELAY,
        }
    }
}

/// Fires once the delayed follow-up transition has been attempted.
///
/// Completion only means the scheduled attempt ran; it says nothing about
/// whether it succeeded. Dropping the receiver is fine.
pub type Completion = oneshot::Receiver<()>;

/// Concurrency-safe owner of the VM registry.
///
/// Cheap to clone: clones share the same registry.
#[derive(Clone)]
pub struct Cloud {
    vms: Arc<RwLock<Vms>>,
    delays: Delays,
}

impl std::fmt::Debug for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let vms = self.vms.read();
        f.debug_struct("Cloud")
            .field("vms", &vms.iter().map(|(id, _)| id).collect::<Vec<_>>())
            .field("delays", &self.delays)
            .finish()
    }
}

impl Cloud {
    /// Create a manager owning `vms`.
    pub fn new(vms: Vms, delays: Delays) -> Self {
        Self {
            vms: Arc::new(RwLock::new(vms)),
            delays,
        }
    }

    /// Create a manager over the seed set with default delays.
    pub fn seeded() -> Self {
        Self::new(Vms::seed(), Delays::default())
    }

    pub fn delays(&self) -> Delays {
        self.delays
    }

    /// Snapshot of the whole registry.
    ///
    /// The returned value is detached from the live registry.
    pub fn list(&self) -> Vms {
        self.vms.read().clone()
    }

    /// Look up a single VM by id.
    pub fn inspect(&self, id: VmId) -> Option<Vm> {
        self.vms.read().get(id).copied()
    }

    /// Launch a VM: `Stopped -> Starting`, then `Running` after the start delay.
    ///
    /// Must be called from within a tokio runtime.
    pub fn launch(&self, id: VmId) -> CloudResult<Completion> {
        self.set_state(id, VmState::Starting)?;
        Ok(self.delayed_transition(id, VmState::Running, self.delays.start))
    }

    /// Stop a VM: `Running -> Stopping`, then `Stopped` after the stop delay.
    ///
    /// Must be called from within a tokio runtime.
    pub fn stop(&self, id: VmId) -> CloudResult<Completion> {
        self.set_state(id, VmState::Stopping)?;
        Ok(self.delayed_transition(id, VmState::Stopped, self.delays.stop))
    }

    /// Remove a stopped VM from the registry.
    pub fn delete(&self, id: VmId) -> CloudResult<()> {
        let mut vms = self.vms.write();

        let vm = vms.get(id).ok_or(CloudError::DeleteNotFound { id })?;
        if vm.state != VmState::Stopped {
            return Err(CloudError::InvalidStateForDeletion {
                id,
                actual: vm.state,
            });
        }
        vms.remove(id);
        tracing::debug!(vm_id = id, "VM deleted");
        Ok(())
    }

    /// Spawn a task that moves `id` to `target` once `delay` has elapsed.
    ///
    /// The transition is checked against whatever the registry holds when
    /// the timer fires, not against the value seen at scheduling time.
    fn delayed_transition(&self, id: VmId, target: VmState, delay: Duration) -> Completion {
        let (done_tx, done_rx) = oneshot::channel();
        let cloud = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = cloud.set_state(id, target) {
                tracing::warn!(vm_id = id, target = %target, error = %e, "Delayed transition failed");
            }
            // receiver may be gone
            let _ = done_tx.send(());
        });

        done_rx
    }

    /// Locked check-and-set of a VM's state through the transition table.
    fn set_state(&self, id: VmId, target: VmState) -> CloudResult<()> {
        let mut vms = self.vms.write();

        let vm = vms.get(id).ok_or(CloudError::NotFound { id })?;
        let from = vm.state;
        let next = vm.transition(target)?;
        vms.insert(id, next);

        tracing::debug!(vm_id = id, from = %from, to = %target, "VM state changed");
        Ok(())
    }
}
