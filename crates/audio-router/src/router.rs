//! Audio router dispatch
//!
//! The router sits between producers and the active routing policy. It owns
//! the source registries, the data store and the external collaborators, and
//! gives the policy the shared connect/disconnect helpers it builds on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use audio_sources::{
    AudioSource, AudioSources, DeviceId, GenericSource, RoutingChange, SourceContext,
    SourceState, SourceStatus, VoiceSource, VoiceSources, MAX_SOURCE_IDS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::collaborators::{
    AudioAdapter, DeviceSourceMap, Feature, FeatureClient, FeatureHandle, FeatureManager,
    FeatureState, FocusProvider,
};
use crate::data::RouterData;
use crate::error::RouterError;
use crate::events::RouterEvent;
use crate::state::RouterState;

/// Router configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Number of audio source ids, `NONE` included
    pub max_audio_sources: usize,
    /// Number of voice source ids, `NONE` included
    pub max_voice_sources: usize,
    /// Whether LE audio sources can be routed; changes how handover data is
    /// applied
    pub le_audio_routable: bool,
}

impl RouterConfig {
    /// Number of slots in the data store
    pub fn capacity(&self) -> usize {
        self.max_audio_sources + self.max_voice_sources
    }

    /// Check the source counts fit the id type
    pub fn validate(&self) -> Result<(), RouterError> {
        for (kind, requested) in [
            ("audio", self.max_audio_sources),
            ("voice", self.max_voice_sources),
        ] {
            if requested > MAX_SOURCE_IDS {
                return Err(RouterError::TooManySources {
                    kind,
                    requested,
                    limit: MAX_SOURCE_IDS,
                });
            }
        }
        Ok(())
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_audio_sources: AudioSource::COUNT,
            max_voice_sources: VoiceSource::COUNT,
            le_audio_routable: false,
        }
    }
}

/// External services used by the router
#[derive(Clone)]
pub struct Collaborators {
    pub focus: Arc<dyn FocusProvider>,
    pub adapter: Arc<dyn AudioAdapter>,
    pub feature_manager: Arc<dyn FeatureManager>,
    pub devices: Arc<dyn DeviceSourceMap>,
}

/// The router's registration with the feature manager
#[derive(Debug, Default)]
pub struct VoiceFeature {
    running: AtomicBool,
}

impl VoiceFeature {
    fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }
}

impl FeatureClient for VoiceFeature {
    fn state(&self) -> FeatureState {
        if self.running.load(Ordering::SeqCst) {
            FeatureState::Running
        } else {
            FeatureState::Idle
        }
    }

    fn suspend(&self) {
        debug!("VoiceFeature suspend");
    }

    fn resume(&self) {
        debug!("VoiceFeature resume");
    }
}

/// Policy handlers the router dispatches to
///
/// Handlers receive the [`RouterCore`] and use its helpers to change what
/// is routed.
pub trait RoutingPolicy: Send {
    /// A producer wants `source` routed
    fn add_source(&self, core: &mut RouterCore, source: GenericSource) -> Result<(), RouterError>;

    /// A producer no longer wants `source` routed. Returns whether the
    /// request was accepted.
    fn remove_source(
        &self,
        core: &mut RouterCore,
        source: GenericSource,
    ) -> Result<bool, RouterError>;

    /// Whether audio from `device` still holds the chain
    fn is_device_in_use(&self, core: &RouterCore, device: DeviceId) -> bool;

    /// Re-evaluate what should be routed
    fn update(&self, core: &mut RouterCore) -> Result<(), RouterError>;
}

/// Router state shared with the policy
pub struct RouterCore {
    config: RouterConfig,
    audio_sources: AudioSources,
    voice_sources: VoiceSources,
    data: RouterData,
    collaborators: Collaborators,
    voice_feature: Arc<VoiceFeature>,
    voice_feature_handle: FeatureHandle,
    event_buffer: Vec<RouterEvent>,
}

impl RouterCore {
    fn new(
        config: RouterConfig,
        audio_sources: AudioSources,
        voice_sources: VoiceSources,
        collaborators: Collaborators,
    ) -> Self {
        let voice_feature = Arc::new(VoiceFeature::default());
        let voice_feature_handle = collaborators
            .feature_manager
            .register(Feature::Voice, voice_feature.clone());

        Self {
            data: RouterData::with_capacity(config.capacity()),
            config,
            audio_sources,
            voice_sources,
            collaborators,
            voice_feature,
            voice_feature_handle,
            event_buffer: Vec::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn data(&self) -> &RouterData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut RouterData {
        &mut self.data
    }

    pub fn audio_sources(&self) -> &AudioSources {
        &self.audio_sources
    }

    pub fn audio_sources_mut(&mut self) -> &mut AudioSources {
        &mut self.audio_sources
    }

    pub fn voice_sources(&self) -> &VoiceSources {
        &self.voice_sources
    }

    pub fn voice_sources_mut(&mut self) -> &mut VoiceSources {
        &mut self.voice_sources
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// State the router reports to the feature manager for voice
    pub fn voice_feature_state(&self) -> FeatureState {
        self.voice_feature.state()
    }

    /// The source the focus provider currently wants routed
    pub fn focused_source(&self) -> Option<GenericSource> {
        self.collaborators
            .focus
            .focused_source_for_audio_routing()
            .filter(|s| !s.is_none())
    }

    pub(crate) fn push_event(&mut self, event: RouterEvent) {
        self.event_buffer.push(event);
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<RouterEvent> {
        std::mem::take(&mut self.event_buffer)
    }

    /// Set the router state of a tracked source. Returns `false` if the
    /// source is not tracked.
    pub fn set_source_state(&mut self, source: GenericSource, state: RouterState) -> bool {
        match self.data.set_source_state(source, state) {
            Some(from) => {
                info!("RouterCore {} {} -> {}", source, from, state);
                if from != state {
                    self.push_event(RouterEvent::StateChanged {
                        source,
                        from,
                        to: state,
                    });
                }
                true
            }
            None => false,
        }
    }

    /// Provider context of a source
    pub fn source_context(&self, source: GenericSource) -> Result<SourceContext, RouterError> {
        Ok(match source {
            GenericSource::Audio(audio) => {
                SourceContext::Audio(self.audio_sources.source_context(audio)?)
            }
            GenericSource::Voice(voice) => {
                SourceContext::Voice(self.voice_sources.source_context(voice)?)
            }
        })
    }

    /// Check a source id against the registry range for its kind
    pub fn validate_source(&self, source: GenericSource) -> Result<(), RouterError> {
        let max = match source {
            GenericSource::Audio(_) => self.config.max_audio_sources,
            GenericSource::Voice(_) => self.config.max_voice_sources,
        };
        if source.is_none() || usize::from(source.id()) >= max {
            error!("RouterCore invalid source {}", source);
            return Err(RouterError::InvalidSource { id: source });
        }
        Ok(())
    }

    /// Forward a routing state to the source's registry
    pub fn common_set_source_state(
        &self,
        source: GenericSource,
        state: SourceState,
    ) -> Result<SourceStatus, RouterError> {
        Ok(match source {
            GenericSource::Audio(audio) => self.audio_sources.set_state(audio, state)?,
            GenericSource::Voice(voice) => self.voice_sources.set_state(voice, state)?,
        })
    }

    /// Connect the DSP chain to a source.
    ///
    /// Voice sources must first be admitted by the feature manager. Returns
    /// `false` if admission is refused or no connect parameters are
    /// available; nothing is left acquired in that case.
    pub fn common_connect_source(&mut self, source: GenericSource) -> Result<bool, RouterError> {
        debug!("RouterCore common_connect_source {}", source);

        let connected = match source {
            GenericSource::Audio(audio) => self.connect_audio_source(audio)?,
            GenericSource::Voice(voice) => self.connect_voice_source(voice)?,
        };

        if connected {
            self.push_event(RouterEvent::RoutingChanged {
                source,
                routed: true,
            });
        }
        Ok(connected)
    }

    fn connect_audio_source(&mut self, audio: AudioSource) -> Result<bool, RouterError> {
        let Some(params) = self.audio_sources.get_connect_parameters(audio)? else {
            warn!("RouterCore no connect parameters for {}", audio);
            return Ok(false);
        };

        self.collaborators
            .adapter
            .connect(GenericSource::Audio(audio), &params);
        self.audio_sources.release_connect_parameters(audio, params)?;
        self.audio_sources
            .on_audio_routing_change(audio, RoutingChange::Routed)?;
        self.data.last_routed_audio_source = audio;
        Ok(true)
    }

    fn connect_voice_source(&mut self, voice: VoiceSource) -> Result<bool, RouterError> {
        if !self.acquire_voice_feature() {
            warn!("RouterCore voice feature refused for {}", voice);
            return Ok(false);
        }

        let Some(params) = self.voice_sources.get_connect_parameters(voice)? else {
            warn!("RouterCore no connect parameters for {}", voice);
            self.release_voice_feature();
            return Ok(false);
        };

        self.collaborators
            .adapter
            .connect(GenericSource::Voice(voice), &params);
        self.voice_sources.release_connect_parameters(voice, params)?;
        Ok(true)
    }

    /// Disconnect the DSP chain from a source.
    ///
    /// Returns `false` if no disconnect parameters are available.
    pub fn common_disconnect_source(
        &mut self,
        source: GenericSource,
    ) -> Result<bool, RouterError> {
        debug!("RouterCore common_disconnect_source {}", source);

        match source {
            GenericSource::Audio(audio) => {
                let Some(params) = self.audio_sources.get_disconnect_parameters(audio)? else {
                    warn!("RouterCore no disconnect parameters for {}", audio);
                    return Ok(false);
                };
                self.collaborators.adapter.disconnect(source, &params);
                self.audio_sources.release_disconnect_parameters(audio, params)?;
                self.audio_sources
                    .on_audio_routing_change(audio, RoutingChange::Unrouted)?;
            }
            GenericSource::Voice(voice) => {
                let Some(params) = self.voice_sources.get_disconnect_parameters(voice)? else {
                    warn!("RouterCore no disconnect parameters for {}", voice);
                    return Ok(false);
                };
                self.collaborators.adapter.disconnect(source, &params);
                self.voice_sources.release_disconnect_parameters(voice, params)?;
            }
        }

        self.push_event(RouterEvent::RoutingChanged {
            source,
            routed: false,
        });
        if source.is_voice() {
            self.release_voice_feature();
        }
        Ok(true)
    }

    fn acquire_voice_feature(&mut self) -> bool {
        let granted = self
            .collaborators
            .feature_manager
            .start_feature_request(self.voice_feature_handle);
        if granted {
            self.voice_feature.set_running(true);
            self.push_event(RouterEvent::VoiceFeatureAcquired);
        }
        granted
    }

    fn release_voice_feature(&mut self) {
        self.collaborators
            .feature_manager
            .stop_feature_indication(self.voice_feature_handle);
        self.voice_feature.set_running(false);
        self.push_event(RouterEvent::VoiceFeatureReleased);
    }

    /// Pause every audio source, the last routed one last
    pub fn pause_all_sources(&self) -> Result<(), RouterError> {
        self.audio_sources
            .pause_all(self.data.last_routed_audio_source)?;
        Ok(())
    }
}

/// The audio router
///
/// Routing operations fail with [`RouterError::HandlersNotConfigured`]
/// until a policy is configured.
pub struct AudioRouter {
    core: RouterCore,
    handlers: Option<Box<dyn RoutingPolicy>>,
}

impl AudioRouter {
    /// Create a router with its registries and collaborators.
    ///
    /// Registers the voice feature with the feature manager.
    pub fn new(
        config: RouterConfig,
        audio_sources: AudioSources,
        voice_sources: VoiceSources,
        collaborators: Collaborators,
    ) -> Self {
        info!(
            "AudioRouter created: {} audio, {} voice, {} slots",
            config.max_audio_sources,
            config.max_voice_sources,
            config.capacity()
        );
        Self {
            core: RouterCore::new(config, audio_sources, voice_sources, collaborators),
            handlers: None,
        }
    }

    /// Install the routing policy. A router takes one policy for its
    /// lifetime; a second call is refused.
    pub fn configure_handlers(
        &mut self,
        handlers: Box<dyn RoutingPolicy>,
    ) -> Result<(), RouterError> {
        if self.handlers.is_some() {
            error!("AudioRouter routing handlers already configured");
            return Err(RouterError::HandlersAlreadyConfigured);
        }
        info!("AudioRouter routing handlers configured");
        self.handlers = Some(handlers);
        Ok(())
    }

    /// Ask for a source to be routed
    pub fn add_source(&mut self, source: GenericSource) -> Result<(), RouterError> {
        debug!("AudioRouter add_source {}", source);
        self.core.validate_source(source)?;
        let handlers = self.handlers.as_deref().ok_or_else(not_configured)?;
        handlers.add_source(&mut self.core, source)
    }

    /// Withdraw a routing request. Returns whether the policy accepted it.
    pub fn remove_source(&mut self, source: GenericSource) -> Result<bool, RouterError> {
        debug!("AudioRouter remove_source {}", source);
        self.core.validate_source(source)?;
        let handlers = self.handlers.as_deref().ok_or_else(not_configured)?;
        handlers.remove_source(&mut self.core, source)
    }

    /// Re-evaluate routing after a priority or context change
    pub fn update(&mut self) -> Result<(), RouterError> {
        let handlers = self.handlers.as_deref().ok_or_else(not_configured)?;
        handlers.update(&mut self.core)
    }

    /// Whether audio from `device` still holds the chain
    pub fn is_device_in_use(&self, device: DeviceId) -> Result<bool, RouterError> {
        let handlers = self.handlers.as_deref().ok_or_else(not_configured)?;
        Ok(handlers.is_device_in_use(&self.core, device))
    }

    /// Router state of a source, `Invalid` if it is not tracked
    pub fn source_state(&self, source: GenericSource) -> RouterState {
        self.core.data.source_state(source)
    }

    /// Pause every audio source, the last routed one last
    pub fn pause_all_sources(&self) -> Result<(), RouterError> {
        self.core.pause_all_sources()
    }

    pub fn last_routed_audio_source(&self) -> AudioSource {
        self.core.data.last_routed_audio_source
    }

    pub fn core(&self) -> &RouterCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut RouterCore {
        &mut self.core
    }

    pub fn data(&self) -> &RouterData {
        &self.core.data
    }

    /// Drain pending events
    pub fn drain_events(&mut self) -> Vec<RouterEvent> {
        self.core.drain_events()
    }
}

fn not_configured() -> RouterError {
    error!("AudioRouter routing handlers not configured");
    RouterError::HandlersNotConfigured
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use audio_sources::{AudioInterface, SourceDefinedParams};

    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, call: impl Into<String>) {
            self.0.lock().unwrap().push(call.into());
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    struct NoFocus;

    impl FocusProvider for NoFocus {
        fn focused_source_for_audio_routing(&self) -> Option<GenericSource> {
            None
        }
    }

    struct Adapter(Arc<Calls>);

    impl AudioAdapter for Adapter {
        fn connect(&self, source: GenericSource, _params: &SourceDefinedParams) {
            self.0.push(format!("connect {}", source));
        }

        fn disconnect(&self, source: GenericSource, _params: &SourceDefinedParams) {
            self.0.push(format!("disconnect {}", source));
        }
    }

    struct Gate {
        calls: Arc<Calls>,
        grant: bool,
    }

    impl FeatureManager for Gate {
        fn register(&self, _feature: Feature, _client: Arc<dyn FeatureClient>) -> FeatureHandle {
            FeatureHandle(7)
        }

        fn start_feature_request(&self, handle: FeatureHandle) -> bool {
            self.calls.push(format!("start {}", handle.0));
            self.grant
        }

        fn stop_feature_indication(&self, handle: FeatureHandle) {
            self.calls.push(format!("stop {}", handle.0));
        }
    }

    struct NoDevices;

    impl DeviceSourceMap for NoDevices {
        fn audio_source(&self, _device: DeviceId) -> Option<AudioSource> {
            None
        }
    }

    struct Params {
        calls: Arc<Calls>,
        available: bool,
    }

    impl<S: std::fmt::Display> AudioInterface<S> for Params {
        fn get_connect_parameters(&self, source: S) -> Option<SourceDefinedParams> {
            self.calls.push(format!("get_connect {}", source));
            self.available.then(|| SourceDefinedParams::new(()))
        }

        fn release_connect_parameters(&self, source: S, _params: SourceDefinedParams) {
            self.calls.push(format!("release_connect {}", source));
        }

        fn get_disconnect_parameters(&self, source: S) -> Option<SourceDefinedParams> {
            self.available.then(|| SourceDefinedParams::new(()))
        }

        fn set_state(&self, _source: S, _state: SourceState) -> SourceStatus {
            SourceStatus::Ready
        }
    }

    fn router(grant: bool, available: bool) -> (AudioRouter, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let mut audio = AudioSources::new(AudioSource::COUNT);
        let mut voice = VoiceSources::new(VoiceSource::COUNT);
        let params = Arc::new(Params {
            calls: calls.clone(),
            available,
        });
        audio
            .register_audio_interface(AudioSource::A2DP_1, params.clone())
            .unwrap();
        voice
            .register_audio_interface(VoiceSource::HFP_1, params)
            .unwrap();

        let collaborators = Collaborators {
            focus: Arc::new(NoFocus),
            adapter: Arc::new(Adapter(calls.clone())),
            feature_manager: Arc::new(Gate {
                calls: calls.clone(),
                grant,
            }),
            devices: Arc::new(NoDevices),
        };
        (
            AudioRouter::new(RouterConfig::default(), audio, voice, collaborators),
            calls,
        )
    }

    const A1: GenericSource = GenericSource::Audio(AudioSource::A2DP_1);
    const V1: GenericSource = GenericSource::Voice(VoiceSource::HFP_1);

    /// Policy that only reports which instance handled the call
    struct Tagged(&'static str, Arc<Calls>);

    impl RoutingPolicy for Tagged {
        fn add_source(&self, _core: &mut RouterCore, _source: GenericSource) -> Result<(), RouterError> {
            self.1.push(self.0);
            Ok(())
        }

        fn remove_source(
            &self,
            _core: &mut RouterCore,
            _source: GenericSource,
        ) -> Result<bool, RouterError> {
            Ok(false)
        }

        fn is_device_in_use(&self, _core: &RouterCore, _device: DeviceId) -> bool {
            false
        }

        fn update(&self, _core: &mut RouterCore) -> Result<(), RouterError> {
            Ok(())
        }
    }

    #[test]
    fn test_handlers_are_configured_once() {
        let (mut router, calls) = router(true, true);

        router
            .configure_handlers(Box::new(Tagged("first", calls.clone())))
            .unwrap();
        assert!(matches!(
            router.configure_handlers(Box::new(Tagged("second", calls.clone()))),
            Err(RouterError::HandlersAlreadyConfigured)
        ));

        router.add_source(A1).unwrap();
        assert_eq!(calls.take(), vec!["first"]);
    }

    #[test]
    fn test_routing_ops_need_handlers() {
        let (mut router, _) = router(true, true);

        assert!(matches!(
            router.add_source(A1),
            Err(RouterError::HandlersNotConfigured)
        ));
        assert!(matches!(
            router.update(),
            Err(RouterError::HandlersNotConfigured)
        ));
        assert!(matches!(
            router.is_device_in_use(DeviceId(1)),
            Err(RouterError::HandlersNotConfigured)
        ));
    }

    #[test]
    fn test_config_source_counts_fit_ids() {
        assert!(RouterConfig::default().validate().is_ok());

        let config = RouterConfig {
            max_voice_sources: MAX_SOURCE_IDS + 1,
            ..RouterConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RouterError::TooManySources {
                kind: "voice",
                requested: 257,
                limit: 256
            })
        ));
    }

    #[test]
    fn test_validate_source() {
        let (router, _) = router(true, true);
        let core = router.core();

        assert!(core.validate_source(A1).is_ok());
        assert!(core
            .validate_source(GenericSource::Audio(AudioSource::LE_AUDIO_BROADCAST))
            .is_ok());
        assert!(matches!(
            core.validate_source(GenericSource::Audio(AudioSource::NONE)),
            Err(RouterError::InvalidSource { .. })
        ));
        assert!(matches!(
            core.validate_source(GenericSource::Voice(VoiceSource(VoiceSource::COUNT as u8))),
            Err(RouterError::InvalidSource { .. })
        ));
    }

    #[test]
    fn test_audio_connect_sequence() {
        let (mut router, calls) = router(true, true);

        assert!(router.core_mut().common_connect_source(A1).unwrap());
        assert_eq!(
            calls.take(),
            vec!["get_connect a2dp_1(1)", "connect audio:a2dp_1(1)", "release_connect a2dp_1(1)"]
        );
        assert_eq!(router.last_routed_audio_source(), AudioSource::A2DP_1);
        assert_eq!(
            router.drain_events(),
            vec![RouterEvent::RoutingChanged {
                source: A1,
                routed: true
            }]
        );
    }

    #[test]
    fn test_voice_connect_requires_admission() {
        let (mut router, calls) = router(false, true);

        assert!(!router.core_mut().common_connect_source(V1).unwrap());
        assert_eq!(calls.take(), vec!["start 7"]);
        assert!(router.drain_events().is_empty());
    }

    #[test]
    fn test_voice_connect_failure_releases_admission() {
        let (mut router, calls) = router(true, false);

        assert!(!router.core_mut().common_connect_source(V1).unwrap());
        assert_eq!(calls.take(), vec!["start 7", "get_connect hfp_1(1)", "stop 7"]);
        assert_eq!(router.core().voice_feature_state(), FeatureState::Idle);
    }

    #[test]
    fn test_voice_connect_and_disconnect() {
        let (mut router, calls) = router(true, true);

        assert!(router.core_mut().common_connect_source(V1).unwrap());
        assert_eq!(router.core().voice_feature_state(), FeatureState::Running);
        assert_eq!(router.last_routed_audio_source(), AudioSource::NONE);

        assert!(router.core_mut().common_disconnect_source(V1).unwrap());
        assert_eq!(router.core().voice_feature_state(), FeatureState::Idle);
        assert_eq!(calls.take().last().map(String::as_str), Some("stop 7"));
        assert_eq!(
            router.drain_events(),
            vec![
                RouterEvent::VoiceFeatureAcquired,
                RouterEvent::RoutingChanged {
                    source: V1,
                    routed: true
                },
                RouterEvent::RoutingChanged {
                    source: V1,
                    routed: false
                },
                RouterEvent::VoiceFeatureReleased,
            ]
        );
    }

    #[test]
    fn test_disconnect_without_params_reports_failure() {
        let (mut router, calls) = router(true, false);

        assert!(!router.core_mut().common_disconnect_source(A1).unwrap());
        assert!(calls.take().is_empty());
    }
}
