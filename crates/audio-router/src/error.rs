//! Error types for the audio router

use audio_sources::{GenericSource, SourceError, SourceStatus};
use thiserror::Error;

use crate::state::RouterState;

/// Contract violations detected by the router
///
/// The router makes no attempt to continue after returning one of these.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Source id is `NONE` or outside the range for its kind
    #[error("invalid source {id}")]
    InvalidSource {
        /// Offending source
        id: GenericSource,
    },

    /// A routing operation was called before a policy was configured
    #[error("routing handlers not configured")]
    HandlersNotConfigured,

    /// Configured source count does not fit the source id type
    #[error("{requested} {kind} sources configured, at most {limit} supported")]
    TooManySources {
        /// "audio" or "voice"
        kind: &'static str,
        /// Configured count
        requested: usize,
        /// Largest supported count
        limit: usize,
    },

    /// A policy was already installed on this router
    #[error("routing handlers already configured")]
    HandlersAlreadyConfigured,

    /// A registry returned something other than Ready or Preparing
    #[error("unexpected status {status:?} from {id} in {state}")]
    UnexpectedStatus {
        /// Source that returned the status
        id: GenericSource,
        /// Router state being processed
        state: RouterState,
        /// Status returned by the registry
        status: SourceStatus,
    },

    /// A source kept moving through transient states without settling
    #[error("{id} did not reach a stable state after {attempts} attempts")]
    StableStateNotReached {
        /// Source being driven
        id: GenericSource,
        /// Number of state actions executed
        attempts: usize,
    },

    /// The policy was asked to move a source out of a state that forbids it
    #[error("cannot {action} {id} in {state}")]
    InvalidTransition {
        /// Source being moved
        id: GenericSource,
        /// Current router state
        state: RouterState,
        /// What was attempted
        action: &'static str,
    },

    /// Disconnect parameters could not be acquired for a routed source
    #[error("unable to disconnect {id}")]
    DisconnectFailed {
        /// Source being disconnected
        id: GenericSource,
    },

    /// Registry contract violation
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Handover data was sized for a different store
    #[error("handover data has {received} slots, store has {expected}")]
    HandoverCapacity {
        /// Slots in the local store
        expected: usize,
        /// Slots in the received data
        received: usize,
    },

    /// Handover data could not be encoded or decoded
    #[error("handover data: {0}")]
    Handover(#[from] serde_json::Error),
}
