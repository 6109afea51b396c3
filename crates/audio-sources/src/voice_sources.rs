//! Voice source registry
//!
//! The voice counterpart of [`AudioSources`](crate::AudioSources). Media
//! control is replaced by telephony control, which also provides the
//! source's call context.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audio_sources::log_slot_change;
use crate::context::VoiceContext;
use crate::error::SourceError;
use crate::interfaces::{
    AudioInterface, SourceObserver, TelephonyControlInterface, VolumeControlInterface,
    VolumeInterface,
};
use crate::params::{
    EventOrigin, MuteState, SourceDefinedParams, SourceState, SourceStatus, TransferDirection,
    Volume,
};
use crate::registry::{ObserverList, Slot, MAX_OBSERVERS};
use crate::source::{GenericSource, VoiceSource, MAX_SOURCE_IDS};

struct VoiceSourceEntry {
    audio: Slot<dyn AudioInterface<VoiceSource>>,
    telephony_control: Slot<dyn TelephonyControlInterface>,
    volume: Slot<dyn VolumeInterface<VoiceSource>>,
    volume_control: Slot<dyn VolumeControlInterface<VoiceSource>>,
    observers: ObserverList<dyn SourceObserver<VoiceSource>>,
}

impl VoiceSourceEntry {
    fn new() -> Self {
        Self {
            audio: Slot::new(),
            telephony_control: Slot::new(),
            volume: Slot::new(),
            volume_control: Slot::new(),
            observers: ObserverList::new(),
        }
    }
}

/// Registry of voice source interfaces
pub struct VoiceSources {
    entries: Vec<VoiceSourceEntry>,
}

impl VoiceSources {
    /// Create a registry for `max_sources` ids (`NONE` included), capped
    /// at [`MAX_SOURCE_IDS`]
    pub fn new(max_sources: usize) -> Self {
        if max_sources > MAX_SOURCE_IDS {
            warn!(
                "VoiceSources {} ids requested, capped at {}",
                max_sources, MAX_SOURCE_IDS
            );
        }
        Self {
            entries: (0..max_sources.min(MAX_SOURCE_IDS))
                .map(|_| VoiceSourceEntry::new())
                .collect(),
        }
    }

    pub fn max_sources(&self) -> usize {
        self.entries.len()
    }

    /// All source ids except `NONE`
    pub fn sources(&self) -> impl Iterator<Item = VoiceSource> {
        (1..self.entries.len())
            .filter_map(|i| u8::try_from(i).ok())
            .map(VoiceSource)
    }

    fn entry(&self, source: VoiceSource) -> Result<&VoiceSourceEntry, SourceError> {
        self.entries
            .get(source.index())
            .ok_or(SourceError::OutOfRange {
                id: GenericSource::Voice(source),
                max: self.entries.len(),
            })
    }

    fn entry_mut(&mut self, source: VoiceSource) -> Result<&mut VoiceSourceEntry, SourceError> {
        let max = self.entries.len();
        self.entries
            .get_mut(source.index())
            .ok_or(SourceError::OutOfRange {
                id: GenericSource::Voice(source),
                max,
            })
    }

    // Audio interface

    pub fn register_audio_interface(
        &mut self,
        source: VoiceSource,
        iface: Arc<dyn AudioInterface<VoiceSource>>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.audio.register(iface);
        log_slot_change("voice audio", source, change);
        Ok(())
    }

    /// Drop the audio interface of a source (call teardown)
    pub fn deregister_audio_interface(&mut self, source: VoiceSource) -> Result<(), SourceError> {
        if self.entry_mut(source)?.audio.clear() {
            info!("voice audio interface for {} deregistered", source);
        }
        Ok(())
    }

    pub fn get_connect_parameters(
        &self,
        source: VoiceSource,
    ) -> Result<Option<SourceDefinedParams>, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .and_then(|iface| iface.get_connect_parameters(source)))
    }

    pub fn release_connect_parameters(
        &self,
        source: VoiceSource,
        params: SourceDefinedParams,
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.audio.get() {
            iface.release_connect_parameters(source, params);
        }
        Ok(())
    }

    pub fn get_disconnect_parameters(
        &self,
        source: VoiceSource,
    ) -> Result<Option<SourceDefinedParams>, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .and_then(|iface| iface.get_disconnect_parameters(source)))
    }

    pub fn release_disconnect_parameters(
        &self,
        source: VoiceSource,
        params: SourceDefinedParams,
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.audio.get() {
            iface.release_disconnect_parameters(source, params);
        }
        Ok(())
    }

    pub fn is_audio_routed(&self, source: VoiceSource) -> Result<bool, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .is_some_and(|iface| iface.is_audio_routed(source)))
    }

    pub fn is_voice_channel_available(&self, source: VoiceSource) -> Result<bool, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .is_some_and(|iface| iface.is_voice_channel_available(source)))
    }

    pub fn set_state(
        &self,
        source: VoiceSource,
        state: SourceState,
    ) -> Result<SourceStatus, SourceError> {
        let status = match self.entry(source)?.audio.get() {
            Some(iface) => iface.set_state(source, state),
            None => SourceStatus::Ready,
        };
        debug!("VoiceSources set_state {} {:?} -> {:?}", source, state, status);
        Ok(status)
    }

    /// The first source whose audio is routed, or `NONE`
    pub fn routed_source(&self) -> VoiceSource {
        self.sources()
            .find(|s| self.is_audio_routed(*s).unwrap_or(false))
            .unwrap_or(VoiceSource::NONE)
    }

    // Telephony control interface

    pub fn register_telephony_control_interface(
        &mut self,
        source: VoiceSource,
        iface: Arc<dyn TelephonyControlInterface>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.telephony_control.register(iface);
        log_slot_change("telephony control", source, change);
        Ok(())
    }

    pub fn deregister_telephony_control_interface(
        &mut self,
        source: VoiceSource,
    ) -> Result<(), SourceError> {
        if self.entry_mut(source)?.telephony_control.clear() {
            info!("telephony control interface for {} deregistered", source);
        }
        Ok(())
    }

    fn with_telephony(
        &self,
        source: VoiceSource,
        f: impl FnOnce(&dyn TelephonyControlInterface),
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.telephony_control.get() {
            f(iface);
        }
        Ok(())
    }

    /// Call context of the source
    pub fn source_context(&self, source: VoiceSource) -> Result<VoiceContext, SourceError> {
        Ok(self
            .entry(source)?
            .telephony_control
            .get()
            .map(|iface| iface.context(source))
            .unwrap_or_default())
    }

    pub fn accept_incoming_call(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.accept_incoming_call(source))
    }

    pub fn reject_incoming_call(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.reject_incoming_call(source))
    }

    pub fn terminate_ongoing_call(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.terminate_ongoing_call(source))
    }

    pub fn transfer_ongoing_call_audio(
        &self,
        source: VoiceSource,
        direction: TransferDirection,
    ) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.transfer_ongoing_call_audio(source, direction))
    }

    pub fn initiate_call_using_number(
        &self,
        source: VoiceSource,
        number: &str,
    ) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.initiate_call_using_number(source, number))
    }

    pub fn initiate_voice_dial(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.initiate_voice_dial(source))
    }

    pub fn initiate_call_last_dialled(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.initiate_call_last_dialled(source))
    }

    pub fn toggle_microphone_mute(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_telephony(source, |i| i.toggle_microphone_mute(source))
    }

    // Volume interface

    pub fn register_volume(
        &mut self,
        source: VoiceSource,
        iface: Arc<dyn VolumeInterface<VoiceSource>>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.volume.register(iface);
        log_slot_change("voice volume", source, change);
        Ok(())
    }

    pub fn volume(&self, source: VoiceSource) -> Result<Volume, SourceError> {
        Ok(self
            .entry(source)?
            .volume
            .get()
            .map(|iface| iface.get_volume(source))
            .unwrap_or_else(Volume::full_scale))
    }

    pub fn set_volume(&self, source: VoiceSource, volume: Volume) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.volume.get() {
            iface.set_volume(source, volume);
        }
        Ok(())
    }

    pub fn mute_state(&self, source: VoiceSource) -> Result<MuteState, SourceError> {
        Ok(self
            .entry(source)?
            .volume
            .get()
            .map(|iface| iface.get_mute_state(source))
            .unwrap_or_default())
    }

    pub fn set_mute_state(&self, source: VoiceSource, state: MuteState) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.volume.get() {
            iface.set_mute_state(source, state);
        }
        Ok(())
    }

    // Volume control interface

    pub fn register_volume_control(
        &mut self,
        source: VoiceSource,
        iface: Arc<dyn VolumeControlInterface<VoiceSource>>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.volume_control.register(iface);
        log_slot_change("voice volume control", source, change);
        Ok(())
    }

    pub fn is_volume_control_registered(&self, source: VoiceSource) -> Result<bool, SourceError> {
        Ok(self.entry(source)?.volume_control.is_registered())
    }

    fn with_volume_control(
        &self,
        source: VoiceSource,
        f: impl FnOnce(&dyn VolumeControlInterface<VoiceSource>),
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.volume_control.get() {
            f(iface);
        }
        Ok(())
    }

    pub fn volume_up(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.volume_up(source))
    }

    pub fn volume_down(&self, source: VoiceSource) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.volume_down(source))
    }

    pub fn volume_set_absolute(&self, source: VoiceSource, volume: Volume) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.volume_set_absolute(source, volume))
    }

    pub fn mute(&self, source: VoiceSource, state: MuteState) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.mute(source, state))
    }

    // Observer interface

    pub fn register_observer(
        &mut self,
        source: VoiceSource,
        observer: Arc<dyn SourceObserver<VoiceSource>>,
    ) -> Result<(), SourceError> {
        let observers = &mut self.entry_mut(source)?.observers;
        match observers.register(observer) {
            Ok(true) => debug!(
                "VoiceSources observer registered for {} ({} total)",
                source,
                observers.len()
            ),
            Ok(false) => debug!("VoiceSources observer already registered for {}", source),
            Err(()) => {
                warn!("VoiceSources observer limit reached for {}", source);
                return Err(SourceError::ObserverLimit {
                    id: GenericSource::Voice(source),
                    limit: MAX_OBSERVERS,
                });
            }
        }
        Ok(())
    }

    pub fn deregister_observer(
        &mut self,
        source: VoiceSource,
        observer: &Arc<dyn SourceObserver<VoiceSource>>,
    ) -> Result<bool, SourceError> {
        Ok(self.entry_mut(source)?.observers.unregister(observer))
    }

    pub fn on_volume_change(
        &self,
        source: VoiceSource,
        origin: EventOrigin,
        volume: Volume,
    ) -> Result<(), SourceError> {
        for observer in self.entry(source)?.observers.iter() {
            observer.on_volume_change(source, origin, volume);
        }
        Ok(())
    }

    pub fn on_mute_change(
        &self,
        source: VoiceSource,
        origin: EventOrigin,
        muted: bool,
    ) -> Result<(), SourceError> {
        for observer in self.entry(source)?.observers.iter() {
            observer.on_mute_change(source, origin, muted);
        }
        Ok(())
    }
}
