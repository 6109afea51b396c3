//! Per-source routing state

use std::fmt;

use audio_sources::{AudioSource, GenericSource};
use serde::{Deserialize, Serialize};

/// Router state of a tracked source
///
/// The declaration order is part of the contract: handover data and logs
/// carry the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum RouterState {
    /// Added but not yet chosen or settled
    #[default]
    NewSource,
    Disconnected,
    Connecting,
    ConnectedPending,
    Connected,
    Disconnecting,
    /// Connect abandoned mid-flight
    DisconnectingNoConnect,
    DisconnectedPending,
    /// Paused, waiting for the chain to be handed over
    ToBeInterrupted,
    Interrupting,
    InterruptedPending,
    /// Paused and parked, not owning the chain
    Interrupted,
    /// Asked to play again, waiting to be reconnected
    ToBeResumed,
    Invalid,
}

impl RouterState {
    /// Whether a source in this state owns (or is acquiring or releasing)
    /// the DSP chain
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting
                | Self::ConnectedPending
                | Self::Connected
                | Self::Disconnecting
                | Self::DisconnectingNoConnect
                | Self::DisconnectedPending
                | Self::ToBeInterrupted
                | Self::Interrupting
                | Self::InterruptedPending
        )
    }

    /// Whether the state machine drives this state onwards on its own
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Connecting
                | Self::ConnectedPending
                | Self::Disconnecting
                | Self::DisconnectingNoConnect
                | Self::DisconnectedPending
                | Self::Interrupting
                | Self::InterruptedPending
        )
    }

    /// Whether `attempt_stable_state` stops in this state
    pub fn is_stable(&self) -> bool {
        matches!(
            self,
            Self::Connected
                | Self::Disconnected
                | Self::Interrupted
                | Self::Invalid
                | Self::ToBeInterrupted
                | Self::ToBeResumed
        )
    }
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One slot of the router data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRecord {
    /// Source tracked by this slot
    pub source: GenericSource,
    /// Routing state
    pub state: RouterState,
    /// Whether the producer currently wants this source routed
    pub present: bool,
}

impl RouterRecord {
    /// A record tracking a freshly added source
    pub fn new(source: GenericSource) -> Self {
        Self {
            source,
            state: RouterState::NewSource,
            present: true,
        }
    }

    /// Whether the slot is in use: wanted by its producer or still holding
    /// the chain
    pub fn is_in_use(&self) -> bool {
        self.present || self.state.is_active()
    }

    /// Whether the source was added but never chosen or settled
    pub fn is_new(&self) -> bool {
        self.present && self.state == RouterState::NewSource
    }

    /// Reset to an unused slot
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Default for RouterRecord {
    fn default() -> Self {
        Self {
            source: GenericSource::Audio(AudioSource::NONE),
            state: RouterState::NewSource,
            present: false,
        }
    }
}
