//! VM entity, lifecycle state machine and the id-indexed registry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, CloudResult};

/// Externally assigned VM identifier.
pub type VmId = u64;

/// Lifecycle state of a simulated VM.
///
/// The states form a single cycle:
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VmState {
    /// Powered off. The only state in which a VM can be deleted.
    #[default]
    Stopped,
    /// Booting; advances to `Running` after the start delay.
    Starting,
    /// Online.
    Running,
    /// Shutting down; advances to `Stopped` after the stop delay.
    Stopping,
}

impl VmState {
    /// Every state, in cycle order starting from `Stopped`.
    pub const ALL: [VmState; 4] = [
        VmState::Stopped,
        VmState::Starting,
        VmState::Running,
        VmState::Stopping,
    ];

    /// The single legal successor of this state.
    #[must_use]
    pub const fn next(self) -> VmState {
        match self {
            VmState::Stopped => VmState::Starting,
            VmState::Starting => VmState::Running,
            VmState::Running => VmState::Stopping,
            VmState::Stopping => VmState::Stopped,
        }
    }

    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            VmState::Stopped => "Stopped",
            VmState::Starting => "Starting",
            VmState::Running => "Running",
            VmState::Stopping => "Stopping",
        }
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// A simulated virtual machine.
///
/// Capacity fields are descriptive only; `state` is the one field the
/// lifecycle logic looks at. Values are never mutated in place: a
/// transition yields a new `Vm`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vm {
    /// Number of processors.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub vcpus: u64,
    /// Frequency of one processor, in MHz.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub clock: f32,
    /// Internal memory, in MB.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub ram: u64,
    /// Persistent storage, in GB.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub storage: u64,
    /// Network device speed, in Gb/s.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub network: u64,
    /// Current lifecycle state.
    #[serde(default)]
    pub state: VmState,
}

impl Vm {
    /// Returns this VM moved to `target`.
    ///
    /// Requesting the current state is a no-op. Any target other than the
    /// current state or its successor fails with
    /// [`CloudError::IllegalTransition`].
    pub fn transition(&self, target: VmState) -> CloudResult<Vm> {
        if target == self.state {
            return Ok(*self);
        }
        if self.state.next() != target {
            return Err(CloudError::IllegalTransition {
                from: self.state,
                to: target,
            });
        }
        Ok(Vm {
            state: target,
            ..*self
        })
    }

    /// Returns a copy of this VM with its state replaced, bypassing the
    /// transition table. Only used to build fixtures and seed data.
    #[must_use]
    pub fn with_state(self, state: VmState) -> Vm {
        Vm { state, ..self }
    }
}

/// Registry of VMs keyed by id.
///
/// Cloning yields an independent snapshot; `Vm` owns no shared data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vms(BTreeMap<VmId, Vm>);

impl Vms {
    /// The seed set used when no persisted registry exists.
    #[must_use]
    pub fn seed() -> Self {
        [
            (
                0,
                Vm {
                    vcpus: 1,
                    clock: 1500.0,
                    ram: 4096,
                    storage: 128,
                    network: 1000,
                    state: VmState::Stopped,
                },
            ),
            (
                1,
                Vm {
                    vcpus: 4,
                    clock: 3600.0,
                    ram: 32768,
                    storage: 512,
                    network: 10000,
                    state: VmState::Stopped,
                },
            ),
            (
                2,
                Vm {
                    vcpus: 2,
                    clock: 2200.0,
                    ram: 8192,
                    storage: 256,
                    network: 1000,
                    state: VmState::Stopped,
                },
            ),
        ]
        .into_iter()
        .collect()
    }

    pub fn get(&self, id: VmId) -> Option<&Vm> {
        self.0.get(&id)
    }

    /// Store `vm` under `id`, replacing any previous value wholesale.
    pub fn insert(&mut self, id: VmId, vm: Vm) -> Option<Vm> {
        self.0.insert(id, vm)
    }

    pub fn remove(&mut self, id: VmId) -> Option<Vm> {
        self.0.remove(&id)
    }

    pub fn contains(&self, id: VmId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(id, vm)` pairs in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (VmId, &Vm)> {
        self.0.iter().map(|(id, vm)| (*id, vm))
    }
}

impl FromIterator<(VmId, Vm)> for Vms {
    fn from_iter<I: IntoIterator<Item = (VmId, Vm)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm_in(state: VmState) -> Vm {
        Vm {
            vcpus: 1,
            clock: 1500.0,
            ram: 4096,
            storage: 128,
            network: 1000,
            state,
        }
    }

    #[test]
    fn test_transition_legal_iff_same_or_successor() {
        for from in VmState::ALL {
            for to in VmState::ALL {
                let result = vm_in(from).transition(to);
                if to == from || from.next() == to {
                    assert_eq!(result.unwrap(), vm_in(to), "{from} -> {to}");
                } else {
                    match result {
                        Err(CloudError::IllegalTransition { from: f, to: t }) => {
                            assert_eq!((f, t), (from, to));
                        }
                        other => panic!("{from} -> {to}: unexpected {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_transition_to_current_state_is_noop() {
        for state in VmState::ALL {
            let vm = vm_in(state);
            assert_eq!(vm.transition(state).unwrap(), vm);
        }
    }

    #[test]
    fn test_transition_does_not_touch_capacity() {
        let vm = vm_in(VmState::Stopped);
        let started = vm.transition(VmState::Starting).unwrap();
        assert_eq!(started.state, VmState::Starting);
        assert_eq!(started.with_state(VmState::Stopped), vm);
        // source value is untouched
        assert_eq!(vm.state, VmState::Stopped);
    }

    #[test]
    fn test_illegal_transition_messages() {
        let cases = [
            (VmState::Stopped, VmState::Running, r#"illegal transition from "Stopped" to "Running""#),
            (VmState::Stopped, VmState::Stopping, r#"illegal transition from "Stopped" to "Stopping""#),
            (VmState::Running, VmState::Stopped, r#"illegal transition from "Running" to "Stopped""#),
            (VmState::Running, VmState::Starting, r#"illegal transition from "Running" to "Starting""#),
            (VmState::Starting, VmState::Stopped, r#"illegal transition from "Starting" to "Stopped""#),
            (VmState::Starting, VmState::Stopping, r#"illegal transition from "Starting" to "Stopping""#),
        ];
        for (from, to, want) in cases {
            let err = vm_in(from).transition(to).unwrap_err();
            assert_eq!(err.to_string(), want);
        }
    }

    #[test]
    fn test_states_form_one_cycle_of_four() {
        let mut state = VmState::Stopped;
        let mut visited = Vec::new();
        loop {
            visited.push(state);
            state = state.next();
            if state == VmState::Stopped {
                break;
            }
        }
        assert_eq!(visited, VmState::ALL.to_vec());
    }

    #[test]
    fn test_vm_json_shape() {
        let json = serde_json::to_value(vm_in(VmState::Running)).unwrap();
        assert_eq!(json["vcpus"], 1);
        assert_eq!(json["ram"], 4096);
        assert_eq!(json["state"], "Running");

        let sparse = serde_json::to_string(&Vm::default()).unwrap();
        assert_eq!(sparse, r#"{"state":"Stopped"}"#);
    }

    #[test]
    fn test_vm_json_missing_fields_default() {
        let vm: Vm = serde_json::from_str(r#"{"vcpus":2,"state":"Stopping"}"#).unwrap();
        assert_eq!(vm.vcpus, 2);
        assert_eq!(vm.ram, 0);
        assert_eq!(vm.state, VmState::Stopping);

        assert!(serde_json::from_str::<Vm>(r#"{"state":"Paused"}"#).is_err());
    }

    #[test]
    fn test_registry_accepts_large_capacities() {
        let vms: Vms =
            serde_json::from_str(r#"{"1":{"ram":5000000000,"storage":9000000000}}"#).unwrap();
        let vm = vms.get(1).unwrap();
        assert_eq!(vm.ram, 5_000_000_000);
        assert_eq!(vm.storage, 9_000_000_000);
        assert_eq!(vm.state, VmState::Stopped);
    }

    #[test]
    fn test_registry_keys_serialize_as_strings() {
        let vms = Vms::seed();
        let json = serde_json::to_value(&vms).unwrap();
        assert_eq!(json["1"]["vcpus"], 4);
        assert_eq!(json["2"]["storage"], 256);

        let back: Vms = serde_json::from_value(json).unwrap();
        assert_eq!(back, vms);
    }

    #[test]
    fn test_registry_clone_is_independent() {
        let mut vms = Vms::seed();
        let snapshot = vms.clone();
        vms.insert(1, vms.get(1).unwrap().with_state(VmState::Running));
        vms.remove(2);

        assert_eq!(snapshot.get(1).unwrap().state, VmState::Stopped);
        assert!(snapshot.contains(2));
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_seed_set() {
        let vms = Vms::seed();
        assert_eq!(vms.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(vms.iter().all(|(_, vm)| vm.state == VmState::Stopped));
        assert_eq!(vms.get(1).unwrap().network, 10000);
    }
}
