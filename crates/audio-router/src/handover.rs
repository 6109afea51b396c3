//! Handover of routing state between earbuds
//!
//! When the primary role moves to the other earbud, the router data store is
//! marshalled on the old primary and unmarshalled on the new one. LE audio
//! sources are not mirrored, so their records stay local when LE audio is
//! routable.

use audio_sources::{AudioSource, GenericSource, VoiceSource};
use tracing::{debug, info};

use crate::data::RouterData;
use crate::error::RouterError;
use crate::router::AudioRouter;

/// The router never blocks a handover
pub fn veto() -> bool {
    false
}

impl RouterData {
    /// Encode the store for transfer
    pub fn marshal(&self) -> Result<Vec<u8>, RouterError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Apply a store received from the other earbud
    pub fn unmarshal(&mut self, bytes: &[u8], le_audio_routable: bool) -> Result<(), RouterError> {
        let handover: RouterData = serde_json::from_slice(bytes)?;
        if handover.capacity() != self.capacity() {
            return Err(RouterError::HandoverCapacity {
                expected: self.capacity(),
                received: handover.capacity(),
            });
        }

        if le_audio_routable {
            self.apply_keeping_le_audio(handover);
        } else {
            for (slot, incoming) in self.iter_mut().zip(handover.iter()) {
                *slot = *incoming;
            }
            self.last_routed_audio_source = handover.last_routed_audio_source;
        }
        Ok(())
    }

    /// Copy the handed-over non-LE records over the local non-LE slots in
    /// order, leaving local LE audio records untouched
    fn apply_keeping_le_audio(&mut self, handover: RouterData) {
        let mut local = self
            .iter_mut()
            .filter(|record| !record.source.is_le_audio());

        for incoming in handover.iter().filter(|r| !r.source.is_le_audio()) {
            match local.next() {
                Some(slot) => *slot = *incoming,
                None => break,
            }
        }
        local.for_each(|slot| slot.clear());

        self.last_routed_audio_source = handover.last_routed_audio_source;
    }

    /// Commit to the new role.
    ///
    /// The secondary drops everything it does not mirror: records other than
    /// the mirrored sources and LE audio sources are reset, and the last
    /// routed audio source is cleared unless it is one of those.
    pub fn commit(
        &mut self,
        is_primary: bool,
        mirrored_audio: AudioSource,
        mirrored_voice: VoiceSource,
    ) {
        if is_primary {
            return;
        }

        let keep = |source: GenericSource| match source {
            GenericSource::Audio(audio) => audio == mirrored_audio || audio.is_le_audio(),
            GenericSource::Voice(voice) => voice == mirrored_voice || voice.is_le_audio(),
        };

        for record in self.iter_mut().filter(|record| !keep(record.source)) {
            record.clear();
        }

        if !keep(GenericSource::Audio(self.last_routed_audio_source)) {
            self.last_routed_audio_source = AudioSource::NONE;
        }
    }
}

impl AudioRouter {
    /// Encode the router data store for handover
    pub fn marshal(&self) -> Result<Vec<u8>, RouterError> {
        debug!("AudioRouter marshal");
        self.data().marshal()
    }

    /// Apply handover data from the other earbud
    pub fn unmarshal(&mut self, bytes: &[u8]) -> Result<(), RouterError> {
        let le_audio_routable = self.core().config().le_audio_routable;
        debug!("AudioRouter unmarshal, le audio routable {}", le_audio_routable);
        self.core_mut().data_mut().unmarshal(bytes, le_audio_routable)
    }

    /// Commit to the role taken after handover
    pub fn commit(
        &mut self,
        is_primary: bool,
        mirrored_audio: AudioSource,
        mirrored_voice: VoiceSource,
    ) {
        info!("AudioRouter handover commit, is_primary {}", is_primary);
        self.core_mut()
            .data_mut()
            .commit(is_primary, mirrored_audio, mirrored_voice);
    }
}
