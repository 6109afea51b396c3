//! External services the router depends on
//!
//! None of these are implemented here. The firmware binds them to the focus
//! module, the kymera adapter, the feature manager and device properties; the
//! `audio-sim` crate provides in-process stand-ins.

use audio_sources::{DeviceId, GenericSource, SourceDefinedParams, VoiceSource};

/// Decides which source the rest of the system wants foregrounded
pub trait FocusProvider: Send + Sync {
    /// The focused source, or `None` when nothing should be routed.
    ///
    /// Called on every update; must not have side effects.
    fn focused_source_for_audio_routing(&self) -> Option<GenericSource>;
}

/// Connects and disconnects the physical DSP chain
///
/// Failures are signalled beforehand by the registry declining to hand out
/// parameters; these calls are assumed to succeed.
pub trait AudioAdapter: Send + Sync {
    fn connect(&self, source: GenericSource, params: &SourceDefinedParams);
    fn disconnect(&self, source: GenericSource, params: &SourceDefinedParams);
}

/// Identifies a feature registered with a [`FeatureManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureHandle(pub u32);

/// Features arbitrated by the feature manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Voice,
}

/// State a feature reports to the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureState {
    #[default]
    Idle,
    Running,
}

/// Callbacks a feature exposes to the manager
pub trait FeatureClient: Send + Sync {
    fn state(&self) -> FeatureState;
    fn suspend(&self);
    fn resume(&self);
}

/// Admission control between mutually exclusive system features
pub trait FeatureManager: Send + Sync {
    /// Register a feature and get the handle used for requests
    fn register(&self, feature: Feature, client: std::sync::Arc<dyn FeatureClient>)
        -> FeatureHandle;

    /// Ask to start the feature. `false` means another feature has priority.
    fn start_feature_request(&self, handle: FeatureHandle) -> bool;

    /// Tell the manager the feature has stopped
    fn stop_feature_indication(&self, handle: FeatureHandle);
}

/// Maps a remote device to the sources it provides
pub trait DeviceSourceMap: Send + Sync {
    fn audio_source(&self, device: DeviceId) -> Option<audio_sources::AudioSource>;

    /// Devices are not yet mapped to voice sources
    fn voice_source(&self, _device: DeviceId) -> Option<VoiceSource> {
        None
    }
}
