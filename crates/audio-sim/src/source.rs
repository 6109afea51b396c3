//! Simulated producers
//!
//! A [`SimAudioSource`] behaves like an A2DP player and a [`SimVoiceSource`]
//! like an HFP phone link. Both answer the router's state handshake from a
//! script (Ready unless told otherwise) and record every call they receive.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use audio_sources::{
    AudioContext, AudioInterface, AudioSource, AudioSources, DeviceId, MediaControlInterface,
    MuteState, RoutingChange, SourceDefinedParams, SourceError, SourceObserver, SourceState,
    SourceStatus, TelephonyControlInterface, TransferDirection, VoiceContext, VoiceSource,
    VoiceSources, Volume, VolumeInterface,
};
use tracing::debug;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A call received by a simulated source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    SetState(SourceState, SourceStatus),
    GetConnectParameters,
    ReleaseConnectParameters,
    GetDisconnectParameters,
    ReleaseDisconnectParameters,
    Play,
    Pause,
    Stop,
    RoutingChange(RoutingChange),
    AcceptCall,
    RejectCall,
    TerminateCall,
    Dial(String),
}

/// Parameter blob handed out by simulated sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimParams {
    pub sample_rate: u32,
}

/// Handshake behaviour shared by both simulated source kinds
#[derive(Debug)]
struct Handshake {
    statuses: VecDeque<SourceStatus>,
    params_available: bool,
    routed: bool,
    calls: Vec<SimCall>,
}

impl Handshake {
    fn new() -> Self {
        Self {
            statuses: VecDeque::new(),
            params_available: true,
            routed: false,
            calls: Vec::new(),
        }
    }

    fn set_state(&mut self, state: SourceState) -> SourceStatus {
        let status = self.statuses.pop_front().unwrap_or(SourceStatus::Ready);
        if status == SourceStatus::Ready {
            match state {
                SourceState::Connected => self.routed = true,
                SourceState::Disconnected => self.routed = false,
                _ => {}
            }
        }
        self.calls.push(SimCall::SetState(state, status));
        status
    }

    fn params(&mut self, call: SimCall, sample_rate: u32) -> Option<SourceDefinedParams> {
        self.calls.push(call);
        self.params_available
            .then(|| SourceDefinedParams::new(SimParams { sample_rate }))
    }
}

#[derive(Debug)]
struct AudioState {
    handshake: Handshake,
    context: AudioContext,
    device: Option<DeviceId>,
    volume: Volume,
    mute: MuteState,
}

/// Simulated media player
#[derive(Debug)]
pub struct SimAudioSource {
    id: AudioSource,
    state: Mutex<AudioState>,
}

impl SimAudioSource {
    pub fn new(id: AudioSource) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(AudioState {
                handshake: Handshake::new(),
                context: AudioContext::Connected,
                device: None,
                volume: Volume::full_scale(),
                mute: MuteState::Unmute,
            }),
        })
    }

    pub fn id(&self) -> AudioSource {
        self.id
    }

    /// Register every interface this source implements
    pub fn register(self: &Arc<Self>, sources: &mut AudioSources) -> Result<(), SourceError> {
        sources.register_audio_interface(self.id, self.clone())?;
        sources.register_media_control_interface(self.id, self.clone())?;
        sources.register_volume(self.id, self.clone())?;
        sources.register_observer(self.id, self.clone())?;
        Ok(())
    }

    pub fn context(&self) -> AudioContext {
        lock(&self.state).context
    }

    /// Change what the player reports it is doing
    pub fn set_context(&self, context: AudioContext) {
        debug!("SimAudioSource {} context {:?}", self.id, context);
        lock(&self.state).context = context;
    }

    pub fn set_device(&self, device: Option<DeviceId>) {
        lock(&self.state).device = device;
    }

    /// Queue statuses for the next state handshakes; Ready once exhausted
    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = SourceStatus>) {
        lock(&self.state).handshake.statuses.extend(statuses);
    }

    /// Make the source hand out (or decline) connect and disconnect
    /// parameters
    pub fn set_params_available(&self, available: bool) {
        lock(&self.state).handshake.params_available = available;
    }

    /// Whether the last completed handshake left the source connected
    pub fn is_routed(&self) -> bool {
        lock(&self.state).handshake.routed
    }

    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.state).handshake.calls.clone()
    }

    pub fn take_calls(&self) -> Vec<SimCall> {
        std::mem::take(&mut lock(&self.state).handshake.calls)
    }

    fn record(&self, call: SimCall) {
        lock(&self.state).handshake.calls.push(call);
    }
}

impl AudioInterface<AudioSource> for SimAudioSource {
    fn get_connect_parameters(&self, _source: AudioSource) -> Option<SourceDefinedParams> {
        lock(&self.state)
            .handshake
            .params(SimCall::GetConnectParameters, 48_000)
    }

    fn release_connect_parameters(&self, _source: AudioSource, _params: SourceDefinedParams) {
        self.record(SimCall::ReleaseConnectParameters);
    }

    fn get_disconnect_parameters(&self, _source: AudioSource) -> Option<SourceDefinedParams> {
        lock(&self.state)
            .handshake
            .params(SimCall::GetDisconnectParameters, 48_000)
    }

    fn release_disconnect_parameters(&self, _source: AudioSource, _params: SourceDefinedParams) {
        self.record(SimCall::ReleaseDisconnectParameters);
    }

    fn is_audio_routed(&self, _source: AudioSource) -> bool {
        self.is_routed()
    }

    fn set_state(&self, _source: AudioSource, state: SourceState) -> SourceStatus {
        lock(&self.state).handshake.set_state(state)
    }
}

impl MediaControlInterface for SimAudioSource {
    fn play(&self, _source: AudioSource) {
        self.record(SimCall::Play);
        self.set_context(AudioContext::IsPlaying);
    }

    fn pause(&self, _source: AudioSource) {
        self.record(SimCall::Pause);
        self.set_context(AudioContext::IsPaused);
    }

    fn play_pause(&self, source: AudioSource) {
        if self.context() == AudioContext::IsPlaying {
            self.pause(source);
        } else {
            self.play(source);
        }
    }

    fn stop(&self, _source: AudioSource) {
        self.record(SimCall::Stop);
        self.set_context(AudioContext::Connected);
    }

    fn context(&self, _source: AudioSource) -> AudioContext {
        SimAudioSource::context(self)
    }

    fn device(&self, _source: AudioSource) -> Option<DeviceId> {
        lock(&self.state).device
    }
}

impl VolumeInterface<AudioSource> for SimAudioSource {
    fn get_volume(&self, _source: AudioSource) -> Volume {
        lock(&self.state).volume
    }

    fn set_volume(&self, _source: AudioSource, volume: Volume) {
        lock(&self.state).volume = volume;
    }

    fn get_mute_state(&self, _source: AudioSource) -> MuteState {
        lock(&self.state).mute
    }

    fn set_mute_state(&self, _source: AudioSource, state: MuteState) {
        lock(&self.state).mute = state;
    }
}

impl SourceObserver<AudioSource> for SimAudioSource {
    fn on_audio_routing_change(&self, _source: AudioSource, change: RoutingChange) {
        self.record(SimCall::RoutingChange(change));
    }
}

#[derive(Debug)]
struct VoiceState {
    handshake: Handshake,
    context: VoiceContext,
    volume: Volume,
}

/// Simulated phone link
#[derive(Debug)]
pub struct SimVoiceSource {
    id: VoiceSource,
    state: Mutex<VoiceState>,
}

impl SimVoiceSource {
    pub fn new(id: VoiceSource) -> Arc<Self> {
        Arc::new(Self {
            id,
            state: Mutex::new(VoiceState {
                handshake: Handshake::new(),
                context: VoiceContext::Connected,
                volume: Volume::full_scale(),
            }),
        })
    }

    pub fn id(&self) -> VoiceSource {
        self.id
    }

    /// Register every interface this source implements
    pub fn register(self: &Arc<Self>, sources: &mut VoiceSources) -> Result<(), SourceError> {
        sources.register_audio_interface(self.id, self.clone())?;
        sources.register_telephony_control_interface(self.id, self.clone())?;
        sources.register_volume(self.id, self.clone())?;
        Ok(())
    }

    pub fn context(&self) -> VoiceContext {
        lock(&self.state).context
    }

    /// Change the reported call state
    pub fn set_context(&self, context: VoiceContext) {
        debug!("SimVoiceSource {} context {:?}", self.id, context);
        lock(&self.state).context = context;
    }

    pub fn script_statuses(&self, statuses: impl IntoIterator<Item = SourceStatus>) {
        lock(&self.state).handshake.statuses.extend(statuses);
    }

    pub fn set_params_available(&self, available: bool) {
        lock(&self.state).handshake.params_available = available;
    }

    pub fn is_routed(&self) -> bool {
        lock(&self.state).handshake.routed
    }

    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.state).handshake.calls.clone()
    }

    pub fn take_calls(&self) -> Vec<SimCall> {
        std::mem::take(&mut lock(&self.state).handshake.calls)
    }

    fn record(&self, call: SimCall) {
        lock(&self.state).handshake.calls.push(call);
    }
}

impl AudioInterface<VoiceSource> for SimVoiceSource {
    fn get_connect_parameters(&self, _source: VoiceSource) -> Option<SourceDefinedParams> {
        lock(&self.state)
            .handshake
            .params(SimCall::GetConnectParameters, 16_000)
    }

    fn release_connect_parameters(&self, _source: VoiceSource, _params: SourceDefinedParams) {
        self.record(SimCall::ReleaseConnectParameters);
    }

    fn get_disconnect_parameters(&self, _source: VoiceSource) -> Option<SourceDefinedParams> {
        lock(&self.state)
            .handshake
            .params(SimCall::GetDisconnectParameters, 16_000)
    }

    fn release_disconnect_parameters(&self, _source: VoiceSource, _params: SourceDefinedParams) {
        self.record(SimCall::ReleaseDisconnectParameters);
    }

    fn is_audio_routed(&self, _source: VoiceSource) -> bool {
        self.is_routed()
    }

    fn is_voice_channel_available(&self, _source: VoiceSource) -> bool {
        self.context() != VoiceContext::Disconnected
    }

    fn set_state(&self, _source: VoiceSource, state: SourceState) -> SourceStatus {
        lock(&self.state).handshake.set_state(state)
    }
}

impl TelephonyControlInterface for SimVoiceSource {
    fn accept_incoming_call(&self, _source: VoiceSource) {
        self.record(SimCall::AcceptCall);
        self.set_context(VoiceContext::InCall);
    }

    fn reject_incoming_call(&self, _source: VoiceSource) {
        self.record(SimCall::RejectCall);
        self.set_context(VoiceContext::Connected);
    }

    fn terminate_ongoing_call(&self, _source: VoiceSource) {
        self.record(SimCall::TerminateCall);
        self.set_context(VoiceContext::Connected);
    }

    fn transfer_ongoing_call_audio(&self, _source: VoiceSource, direction: TransferDirection) {
        debug!("SimVoiceSource {} transfer {:?}", self.id, direction);
    }

    fn initiate_call_using_number(&self, _source: VoiceSource, number: &str) {
        self.record(SimCall::Dial(number.to_string()));
        self.set_context(VoiceContext::RingingOutgoing);
    }

    fn context(&self, _source: VoiceSource) -> VoiceContext {
        SimVoiceSource::context(self)
    }
}

impl VolumeInterface<VoiceSource> for SimVoiceSource {
    fn get_volume(&self, _source: VoiceSource) -> Volume {
        lock(&self.state).volume
    }

    fn set_volume(&self, _source: VoiceSource, volume: Volume) {
        lock(&self.state).volume = volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status() -> impl Strategy<Value = SourceStatus> {
        prop_oneof![
            Just(SourceStatus::Ready),
            Just(SourceStatus::Preparing),
            Just(SourceStatus::Error),
        ]
    }

    proptest! {
        #[test]
        fn scripted_statuses_are_answered_in_order(script in prop::collection::vec(status(), 0..8)) {
            let source = SimVoiceSource::new(VoiceSource::HFP_1);
            source.script_statuses(script.clone());

            for expected in script.iter().copied().chain([SourceStatus::Ready]) {
                let answer =
                    AudioInterface::set_state(&*source, VoiceSource::HFP_1, SourceState::Connecting);
                prop_assert_eq!(answer, expected);
            }
            prop_assert_eq!(source.calls().len(), script.len() + 1);
        }
    }

    #[test]
    fn test_scripted_statuses_then_ready() {
        let source = SimAudioSource::new(AudioSource::A2DP_1);
        source.script_statuses([SourceStatus::Preparing]);

        assert_eq!(
            AudioInterface::set_state(&*source, AudioSource::A2DP_1, SourceState::Connected),
            SourceStatus::Preparing
        );
        assert!(!source.is_routed());
        assert_eq!(
            AudioInterface::set_state(&*source, AudioSource::A2DP_1, SourceState::Connected),
            SourceStatus::Ready
        );
        assert!(source.is_routed());
    }

    #[test]
    fn test_media_controls_change_context() {
        let source = SimAudioSource::new(AudioSource::A2DP_1);
        let mut sources = AudioSources::new(AudioSource::COUNT);
        source.register(&mut sources).unwrap();

        sources.play(AudioSource::A2DP_1).unwrap();
        assert_eq!(
            sources.source_context(AudioSource::A2DP_1).unwrap(),
            AudioContext::IsPlaying
        );
        sources.play_pause(AudioSource::A2DP_1).unwrap();
        assert_eq!(source.context(), AudioContext::IsPaused);
        assert_eq!(source.take_calls(), vec![SimCall::Play, SimCall::Pause]);
    }

    #[test]
    fn test_declined_parameters() {
        let source = SimVoiceSource::new(VoiceSource::HFP_1);
        let mut sources = VoiceSources::new(VoiceSource::COUNT);
        source.register(&mut sources).unwrap();
        source.set_params_available(false);

        assert!(sources
            .get_connect_parameters(VoiceSource::HFP_1)
            .unwrap()
            .is_none());
        assert_eq!(source.calls(), vec![SimCall::GetConnectParameters]);
    }

    #[test]
    fn test_telephony_controls_change_context() {
        let source = SimVoiceSource::new(VoiceSource::HFP_1);
        let mut sources = VoiceSources::new(VoiceSource::COUNT);
        source.register(&mut sources).unwrap();

        sources
            .initiate_call_using_number(VoiceSource::HFP_1, "0123")
            .unwrap();
        assert_eq!(source.context(), VoiceContext::RingingOutgoing);
        sources.terminate_ongoing_call(VoiceSource::HFP_1).unwrap();
        assert_eq!(source.context(), VoiceContext::Connected);
    }
}
