//! Router lifecycle events
//!
//! The router buffers events as it works; the actor drains and forwards them
//! after every command so observers see a single ordered stream.

use audio_sources::GenericSource;

use crate::state::RouterState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    // -------------------------------------------------------------------------
    // Data store
    // -------------------------------------------------------------------------
    /// A producer asked for a source to be routed
    SourceAdded(GenericSource),

    /// A producer no longer wants a source routed
    SourceRemoved(GenericSource),

    /// A tracked source moved between router states
    StateChanged {
        /// Source whose record changed
        source: GenericSource,
        /// Previous state
        from: RouterState,
        /// New state
        to: RouterState,
    },

    // -------------------------------------------------------------------------
    // Policy actions
    // -------------------------------------------------------------------------
    /// A routed source was paused so another could take the chain
    SourcePaused(GenericSource),

    /// An interrupted source was asked to play again
    SourceResumed(GenericSource),

    /// The DSP chain was connected to or disconnected from a source
    RoutingChanged {
        /// Source being (un)routed
        source: GenericSource,
        /// Whether it now owns the chain
        routed: bool,
    },

    /// The voice admission gate was granted
    VoiceFeatureAcquired,

    /// The voice admission gate was handed back
    VoiceFeatureReleased,

    // -------------------------------------------------------------------------
    // Faults
    // -------------------------------------------------------------------------
    /// The router hit a contract violation and stopped
    ContractViolation {
        /// Error description
        message: String,
    },
}
