//! Audio source registry
//!
//! One entry per audio source id. Each entry holds optional audio,
//! media control, volume and volume control interfaces plus a bounded list of
//! observers. Calls for a source without the relevant interface are no-ops
//! or return a default.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::AudioContext;
use crate::error::SourceError;
use crate::interfaces::{
    AudioInterface, MediaControlInterface, SourceObserver, VolumeControlInterface,
    VolumeInterface,
};
use crate::params::{
    DeviceId, EventOrigin, MuteState, RepeatState, RoutingChange, ShuffleState,
    SourceDefinedParams, SourceState, SourceStatus, Volume,
};
use crate::registry::{ObserverList, Slot, SlotChange, MAX_OBSERVERS};
use crate::source::{AudioSource, GenericSource, MAX_SOURCE_IDS};

struct AudioSourceEntry {
    audio: Slot<dyn AudioInterface<AudioSource>>,
    media_control: Slot<dyn MediaControlInterface>,
    volume: Slot<dyn VolumeInterface<AudioSource>>,
    volume_control: Slot<dyn VolumeControlInterface<AudioSource>>,
    observers: ObserverList<dyn SourceObserver<AudioSource>>,
}

impl AudioSourceEntry {
    fn new() -> Self {
        Self {
            audio: Slot::new(),
            media_control: Slot::new(),
            volume: Slot::new(),
            volume_control: Slot::new(),
            observers: ObserverList::new(),
        }
    }
}

/// Registry of audio source interfaces
pub struct AudioSources {
    entries: Vec<AudioSourceEntry>,
}

impl AudioSources {
    /// Create a registry for `max_sources` ids (`NONE` included), capped
    /// at [`MAX_SOURCE_IDS`]
    pub fn new(max_sources: usize) -> Self {
        if max_sources > MAX_SOURCE_IDS {
            warn!(
                "AudioSources {} ids requested, capped at {}",
                max_sources, MAX_SOURCE_IDS
            );
        }
        Self {
            entries: (0..max_sources.min(MAX_SOURCE_IDS))
                .map(|_| AudioSourceEntry::new())
                .collect(),
        }
    }

    /// Number of ids this registry holds
    pub fn max_sources(&self) -> usize {
        self.entries.len()
    }

    /// All source ids except `NONE`
    pub fn sources(&self) -> impl Iterator<Item = AudioSource> {
        (1..self.entries.len())
            .filter_map(|i| u8::try_from(i).ok())
            .map(AudioSource)
    }

    fn entry(&self, source: AudioSource) -> Result<&AudioSourceEntry, SourceError> {
        self.entries
            .get(source.index())
            .ok_or(SourceError::OutOfRange {
                id: GenericSource::Audio(source),
                max: self.entries.len(),
            })
    }

    fn entry_mut(&mut self, source: AudioSource) -> Result<&mut AudioSourceEntry, SourceError> {
        let max = self.entries.len();
        self.entries
            .get_mut(source.index())
            .ok_or(SourceError::OutOfRange {
                id: GenericSource::Audio(source),
                max,
            })
    }

    // -------------------------------------------------------------------------
    // Audio interface
    // -------------------------------------------------------------------------

    /// Register the audio interface of a source
    pub fn register_audio_interface(
        &mut self,
        source: AudioSource,
        iface: Arc<dyn AudioInterface<AudioSource>>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.audio.register(iface);
        log_slot_change("audio", source, change);
        Ok(())
    }

    /// Acquire connect parameters. `None` if no audio interface is
    /// registered or the interface declines.
    pub fn get_connect_parameters(
        &self,
        source: AudioSource,
    ) -> Result<Option<SourceDefinedParams>, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .and_then(|iface| iface.get_connect_parameters(source)))
    }

    /// Release parameters acquired by [`get_connect_parameters`](Self::get_connect_parameters)
    pub fn release_connect_parameters(
        &self,
        source: AudioSource,
        params: SourceDefinedParams,
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.audio.get() {
            iface.release_connect_parameters(source, params);
        }
        Ok(())
    }

    /// Acquire disconnect parameters
    pub fn get_disconnect_parameters(
        &self,
        source: AudioSource,
    ) -> Result<Option<SourceDefinedParams>, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .and_then(|iface| iface.get_disconnect_parameters(source)))
    }

    /// Release parameters acquired by [`get_disconnect_parameters`](Self::get_disconnect_parameters)
    pub fn release_disconnect_parameters(
        &self,
        source: AudioSource,
        params: SourceDefinedParams,
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.audio.get() {
            iface.release_disconnect_parameters(source, params);
        }
        Ok(())
    }

    /// Whether the source reports its audio as routed
    pub fn is_audio_routed(&self, source: AudioSource) -> Result<bool, SourceError> {
        Ok(self
            .entry(source)?
            .audio
            .get()
            .is_some_and(|iface| iface.is_audio_routed(source)))
    }

    /// Forward a routing state to the source.
    ///
    /// A source without an audio interface has nothing to prepare and is
    /// always ready.
    pub fn set_state(
        &self,
        source: AudioSource,
        state: SourceState,
    ) -> Result<SourceStatus, SourceError> {
        let status = match self.entry(source)?.audio.get() {
            Some(iface) => iface.set_state(source, state),
            None => SourceStatus::Ready,
        };
        debug!("AudioSources set_state {} {:?} -> {:?}", source, state, status);
        Ok(status)
    }

    /// The first source whose audio is routed, or `NONE`
    pub fn routed_source(&self) -> AudioSource {
        self.sources()
            .find(|s| self.is_audio_routed(*s).unwrap_or(false))
            .unwrap_or(AudioSource::NONE)
    }

    // -------------------------------------------------------------------------
    // Media control interface
    // -------------------------------------------------------------------------

    /// Register the media control interface of a source
    pub fn register_media_control_interface(
        &mut self,
        source: AudioSource,
        iface: Arc<dyn MediaControlInterface>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.media_control.register(iface);
        log_slot_change("media control", source, change);
        Ok(())
    }

    fn with_media_control(
        &self,
        source: AudioSource,
        f: impl FnOnce(&dyn MediaControlInterface),
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.media_control.get() {
            f(iface);
        }
        Ok(())
    }

    /// Provider context of the source
    pub fn source_context(&self, source: AudioSource) -> Result<AudioContext, SourceError> {
        Ok(self
            .entry(source)?
            .media_control
            .get()
            .map(|iface| iface.context(source))
            .unwrap_or_default())
    }

    /// Device the source belongs to
    pub fn source_device(&self, source: AudioSource) -> Result<Option<DeviceId>, SourceError> {
        Ok(self
            .entry(source)?
            .media_control
            .get()
            .and_then(|iface| iface.device(source)))
    }

    pub fn play(&self, source: AudioSource) -> Result<(), SourceError> {
        debug!("AudioSources play {}", source);
        self.with_media_control(source, |i| i.play(source))
    }

    pub fn pause(&self, source: AudioSource) -> Result<(), SourceError> {
        debug!("AudioSources pause {}", source);
        self.with_media_control(source, |i| i.pause(source))
    }

    pub fn play_pause(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.play_pause(source))
    }

    pub fn stop(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.stop(source))
    }

    pub fn forward(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.forward(source))
    }

    pub fn back(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.back(source))
    }

    pub fn fast_forward(&self, source: AudioSource, state: bool) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.fast_forward(source, state))
    }

    pub fn fast_rewind(&self, source: AudioSource, state: bool) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.fast_rewind(source, state))
    }

    pub fn next_group(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.next_group(source))
    }

    pub fn previous_group(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.previous_group(source))
    }

    pub fn shuffle(&self, source: AudioSource, state: ShuffleState) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.shuffle(source, state))
    }

    pub fn repeat(&self, source: AudioSource, state: RepeatState) -> Result<(), SourceError> {
        self.with_media_control(source, |i| i.repeat(source, state))
    }

    /// Pause every source with a media control interface.
    ///
    /// `routed` is paused last so it keeps focus until the others are paused.
    pub fn pause_all(&self, routed: AudioSource) -> Result<(), SourceError> {
        info!("AudioSources pause_all, routed {}", routed);
        for source in self.sources().filter(|s| *s != routed) {
            self.pause(source)?;
        }
        if !routed.is_none() {
            self.pause(routed)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Volume interface
    // -------------------------------------------------------------------------

    /// Register the volume interface of a source
    pub fn register_volume(
        &mut self,
        source: AudioSource,
        iface: Arc<dyn VolumeInterface<AudioSource>>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.volume.register(iface);
        log_slot_change("volume", source, change);
        Ok(())
    }

    /// Volume of the source; full scale if no volume interface is registered
    pub fn volume(&self, source: AudioSource) -> Result<Volume, SourceError> {
        Ok(self
            .entry(source)?
            .volume
            .get()
            .map(|iface| iface.get_volume(source))
            .unwrap_or_else(Volume::full_scale))
    }

    pub fn set_volume(&self, source: AudioSource, volume: Volume) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.volume.get() {
            iface.set_volume(source, volume);
        }
        Ok(())
    }

    /// Mute state of the source; unmuted if no volume interface is registered
    pub fn mute_state(&self, source: AudioSource) -> Result<MuteState, SourceError> {
        Ok(self
            .entry(source)?
            .volume
            .get()
            .map(|iface| iface.get_mute_state(source))
            .unwrap_or_default())
    }

    pub fn set_mute_state(&self, source: AudioSource, state: MuteState) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.volume.get() {
            iface.set_mute_state(source, state);
        }
        Ok(())
    }

    /// Output volume taking source and system mute into account
    pub fn calculate_output_volume(
        &self,
        source: AudioSource,
        system_mute: MuteState,
    ) -> Result<Volume, SourceError> {
        let volume = self.volume(source)?;
        if system_mute.is_muted() || self.mute_state(source)?.is_muted() {
            Ok(volume.muted())
        } else {
            Ok(volume)
        }
    }

    // -------------------------------------------------------------------------
    // Volume control interface
    // -------------------------------------------------------------------------

    /// Register the volume control interface of a source
    pub fn register_volume_control(
        &mut self,
        source: AudioSource,
        iface: Arc<dyn VolumeControlInterface<AudioSource>>,
    ) -> Result<(), SourceError> {
        let change = self.entry_mut(source)?.volume_control.register(iface);
        log_slot_change("volume control", source, change);
        Ok(())
    }

    pub fn is_volume_control_registered(&self, source: AudioSource) -> Result<bool, SourceError> {
        Ok(self.entry(source)?.volume_control.is_registered())
    }

    fn with_volume_control(
        &self,
        source: AudioSource,
        f: impl FnOnce(&dyn VolumeControlInterface<AudioSource>),
    ) -> Result<(), SourceError> {
        if let Some(iface) = self.entry(source)?.volume_control.get() {
            f(iface);
        }
        Ok(())
    }

    pub fn volume_up(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.volume_up(source))
    }

    pub fn volume_down(&self, source: AudioSource) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.volume_down(source))
    }

    pub fn volume_set_absolute(&self, source: AudioSource, volume: Volume) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.volume_set_absolute(source, volume))
    }

    pub fn mute(&self, source: AudioSource, state: MuteState) -> Result<(), SourceError> {
        self.with_volume_control(source, |i| i.mute(source, state))
    }

    // -------------------------------------------------------------------------
    // Observer interface
    // -------------------------------------------------------------------------

    /// Register an observer; at most [`MAX_OBSERVERS`] per source
    pub fn register_observer(
        &mut self,
        source: AudioSource,
        observer: Arc<dyn SourceObserver<AudioSource>>,
    ) -> Result<(), SourceError> {
        let observers = &mut self.entry_mut(source)?.observers;
        match observers.register(observer) {
            Ok(true) => debug!(
                "AudioSources observer registered for {} ({} total)",
                source,
                observers.len()
            ),
            Ok(false) => debug!("AudioSources observer already registered for {}", source),
            Err(()) => {
                warn!("AudioSources observer limit reached for {}", source);
                return Err(SourceError::ObserverLimit {
                    id: GenericSource::Audio(source),
                    limit: MAX_OBSERVERS,
                });
            }
        }
        Ok(())
    }

    /// Unregister an observer. Returns whether it was registered.
    pub fn deregister_observer(
        &mut self,
        source: AudioSource,
        observer: &Arc<dyn SourceObserver<AudioSource>>,
    ) -> Result<bool, SourceError> {
        Ok(self.entry_mut(source)?.observers.unregister(observer))
    }

    pub fn on_volume_change(
        &self,
        source: AudioSource,
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
        source: AudioSource,
        origin: EventOrigin,
        muted: bool,
    ) -> Result<(), SourceError> {
        for observer in self.entry(source)?.observers.iter() {
            observer.on_mute_change(source, origin, muted);
        }
        Ok(())
    }

    pub fn on_audio_routing_change(
        &self,
        source: AudioSource,
        change: RoutingChange,
    ) -> Result<(), SourceError> {
        for observer in self.entry(source)?.observers.iter() {
            observer.on_audio_routing_change(source, change);
        }
        Ok(())
    }
}

pub(crate) fn log_slot_change(kind: &str, source: impl std::fmt::Display, change: SlotChange) {
    match change {
        SlotChange::Unchanged => debug!("{} interface for {} already registered", kind, source),
        SlotChange::Registered => debug!("{} interface registered for {}", kind, source),
        SlotChange::Replaced => info!("{} interface for {} replaced", kind, source),
    }
}
