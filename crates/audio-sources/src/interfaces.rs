//! Pluggable per-source interfaces
//!
//! Producers (A2DP, USB, line-in, HFP) implement whichever of these they
//! support and register them with the [`AudioSources`](crate::AudioSources)
//! or [`VoiceSources`](crate::VoiceSources) registry. Every method except the
//! required audio-transport ones has a default, so an implementation only
//! overrides the callbacks it actually provides.
//!
//! The audio, volume, volume control and observer interfaces are shared by
//! both kinds of source and are generic over the source id type.

use crate::context::{AudioContext, VoiceContext};
use crate::params::{
    DeviceId, EventOrigin, MuteState, RepeatState, RoutingChange, ShuffleState,
    SourceDefinedParams, SourceState, SourceStatus, TransferDirection, Volume,
};
use crate::source::{AudioSource, VoiceSource};

/// Audio transport interface: what the DSP chain needs to (dis)connect
pub trait AudioInterface<S>: Send + Sync {
    /// Acquire connect parameters, or `None` if the source declines
    fn get_connect_parameters(&self, source: S) -> Option<SourceDefinedParams>;

    /// Release parameters acquired by `get_connect_parameters`
    fn release_connect_parameters(&self, source: S, params: SourceDefinedParams) {
        let _ = (source, params);
    }

    /// Acquire disconnect parameters, or `None` if the source declines
    fn get_disconnect_parameters(&self, source: S) -> Option<SourceDefinedParams>;

    /// Release parameters acquired by `get_disconnect_parameters`
    fn release_disconnect_parameters(&self, source: S, params: SourceDefinedParams) {
        let _ = (source, params);
    }

    /// Whether the source's audio is currently available/routed
    fn is_audio_routed(&self, source: S) -> bool {
        let _ = source;
        false
    }

    /// Whether the source has a voice channel available (voice sources only)
    fn is_voice_channel_available(&self, source: S) -> bool {
        let _ = source;
        false
    }

    /// Inform the source of its routing state
    fn set_state(&self, source: S, state: SourceState) -> SourceStatus;
}

/// Media playback control of an audio source
pub trait MediaControlInterface: Send + Sync {
    fn play(&self, _source: AudioSource) {}
    fn pause(&self, _source: AudioSource) {}
    fn play_pause(&self, _source: AudioSource) {}
    fn stop(&self, _source: AudioSource) {}
    fn forward(&self, _source: AudioSource) {}
    fn back(&self, _source: AudioSource) {}
    fn fast_forward(&self, _source: AudioSource, _state: bool) {}
    fn fast_rewind(&self, _source: AudioSource, _state: bool) {}
    fn next_group(&self, _source: AudioSource) {}
    fn previous_group(&self, _source: AudioSource) {}
    fn shuffle(&self, _source: AudioSource, _state: ShuffleState) {}
    fn repeat(&self, _source: AudioSource, _state: RepeatState) {}

    /// Current provider context of the source
    fn context(&self, _source: AudioSource) -> AudioContext {
        AudioContext::Disconnected
    }

    /// Device the source belongs to
    fn device(&self, _source: AudioSource) -> Option<DeviceId> {
        None
    }
}

/// Call control of a voice source
pub trait TelephonyControlInterface: Send + Sync {
    fn accept_incoming_call(&self, _source: VoiceSource) {}
    fn reject_incoming_call(&self, _source: VoiceSource) {}
    fn terminate_ongoing_call(&self, _source: VoiceSource) {}
    fn transfer_ongoing_call_audio(&self, _source: VoiceSource, _direction: TransferDirection) {}
    fn initiate_call_using_number(&self, _source: VoiceSource, _number: &str) {}
    fn initiate_voice_dial(&self, _source: VoiceSource) {}
    fn initiate_call_last_dialled(&self, _source: VoiceSource) {}
    fn toggle_microphone_mute(&self, _source: VoiceSource) {}

    /// Current provider context of the source
    fn context(&self, _source: VoiceSource) -> VoiceContext {
        VoiceContext::Disconnected
    }
}

/// Volume storage of a source whose volume is kept locally
pub trait VolumeInterface<S>: Send + Sync {
    fn get_volume(&self, _source: S) -> Volume {
        Volume::full_scale()
    }
    fn set_volume(&self, _source: S, _volume: Volume) {}
    fn get_mute_state(&self, _source: S) -> MuteState {
        MuteState::Unmute
    }
    fn set_mute_state(&self, _source: S, _state: MuteState) {}
}

/// Volume control of a source whose volume is owned by the remote device
pub trait VolumeControlInterface<S>: Send + Sync {
    fn volume_up(&self, _source: S) {}
    fn volume_down(&self, _source: S) {}
    fn volume_set_absolute(&self, _source: S, _volume: Volume) {}
    fn mute(&self, _source: S, _state: MuteState) {}
}

/// Observer of per-source volume, mute and routing changes
pub trait SourceObserver<S>: Send + Sync {
    fn on_volume_change(&self, _source: S, _origin: EventOrigin, _volume: Volume) {}
    fn on_mute_change(&self, _source: S, _origin: EventOrigin, _muted: bool) {}
    fn on_audio_routing_change(&self, _source: S, _change: RoutingChange) {}
}
