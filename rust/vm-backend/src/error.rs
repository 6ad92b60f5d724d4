//! Errors returned by the VM lifecycle operations.

use thiserror::Error;

use crate::vm::{VmId, VmState};

/// Errors surfaced by the state machine, the [`Cloud`](crate::Cloud) manager
/// and the request dispatcher.
///
/// The display text is part of the HTTP contract: it is sent verbatim as the
/// body of failed requests.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Launch/stop on an id missing from the registry.
    #[error("not found VM with id {id}")]
    NotFound { id: VmId },

    /// The requested state is neither the current one nor its successor.
    #[error("illegal transition from \"{from}\" to \"{to}\"")]
    IllegalTransition { from: VmState, to: VmState },

    /// Delete on an id missing from the registry.
    #[error("delete error: not found VM {id}")]
    DeleteNotFound { id: VmId },

    /// Delete on a VM that is not stopped.
    #[error(
        "delete error: VM {id} must be in state {required} for deletion but it is {actual}",
        required = VmState::Stopped
    )]
    InvalidStateForDeletion { id: VmId, actual: VmState },

    /// A path segment that should hold a VM id is not an unsigned decimal.
    #[error("invalid VM id {segment:?}: expected digits only, at most {max}", max = VmId::MAX)]
    MalformedId { segment: String },
}

/// Result type alias for lifecycle operations.
pub type CloudResult<T> = Result<T, CloudError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        assert_eq!(
            CloudError::NotFound { id: 10000 }.to_string(),
            "not found VM with id 10000"
        );
        assert_eq!(
            CloudError::DeleteNotFound { id: 7 }.to_string(),
            "delete error: not found VM 7"
        );
    }

    #[test]
    fn test_invalid_state_for_deletion_message() {
        let err = CloudError::InvalidStateForDeletion {
            id: 1,
            actual: VmState::Running,
        };
        assert_eq!(
            err.to_string(),
            "delete error: VM 1 must be in state Stopped for deletion but it is Running"
        );
    }

    #[test]
    fn test_malformed_id_keeps_segment() {
        let err = CloudError::MalformedId {
            segment: "+1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"invalid VM id "+1": expected digits only, at most 18446744073709551615"#
        );
    }
}
