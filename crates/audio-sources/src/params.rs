//! Parameter and state types shared by the source interfaces

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Routing state the router reports to a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Answer of a source to a state change request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceStatus {
    /// The router may continue
    Ready,
    /// The source confirms later; the router must wait
    Preparing,
    /// The source cannot handle the request
    Error,
}

/// Opaque source-defined parameter blob
///
/// Produced by a source's `get_*_parameters` and handed back to it through
/// the matching `release_*_parameters`, which takes ownership so whatever was
/// allocated is dropped exactly once.
pub struct SourceDefinedParams {
    data: Box<dyn Any + Send>,
}

impl SourceDefinedParams {
    /// Wrap a source-specific value
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            data: Box::new(value),
        }
    }

    /// Borrow the value if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Take the value back if it has type `T`
    pub fn into_inner<T: Any>(self) -> Result<T, Self> {
        match self.data.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(data) => Err(Self { data }),
        }
    }
}

impl fmt::Debug for SourceDefinedParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDefinedParams")
            .field("data", &"<opaque>")
            .finish()
    }
}

/// Range and step count of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeConfig {
    pub min: i32,
    pub max: i32,
    pub steps: u16,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: 127,
            steps: 16,
        }
    }
}

/// A volume value within its configured range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub config: VolumeConfig,
    pub value: i32,
}

impl Volume {
    /// Create a volume, clamped to the range
    pub fn new(config: VolumeConfig, value: i32) -> Self {
        Self {
            config,
            value: value.clamp(config.min, config.max),
        }
    }

    /// Maximum of the default range
    pub fn full_scale() -> Self {
        let config = VolumeConfig::default();
        Self {
            config,
            value: config.max,
        }
    }

    /// Minimum of this volume's range
    pub fn muted(&self) -> Self {
        Self {
            config: self.config,
            value: self.config.min,
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::full_scale()
    }
}

/// Mute state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MuteState {
    #[default]
    Unmute,
    Mute,
}

impl MuteState {
    pub fn is_muted(&self) -> bool {
        *self == Self::Mute
    }
}

/// Where a volume or mute change originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOrigin {
    Local,
    Peer,
    Remote,
}

/// Whether a source became routed or unrouted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingChange {
    Routed,
    Unrouted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShuffleState {
    Off,
    AllTrack,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatState {
    Off,
    SingleTrack,
    AllTrack,
    Group,
}

/// Direction of a call audio transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferDirection {
    ToHandset,
    ToDevice,
    Toggle,
}

/// Opaque identifier of a remote device (handset, dongle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);
