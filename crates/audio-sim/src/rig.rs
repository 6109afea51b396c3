//! A complete simulated earbud: sources, collaborators and a router wired
//! to the single entity policy

use std::sync::Arc;

use audio_router::{AudioRouter, Collaborators, RouterConfig, RouterError, SingleEntity};
use audio_sources::{AudioSource, AudioSources, VoiceSource, VoiceSources};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::services::{RecordingAudioAdapter, ScriptedFocus, SimFeatureManager, StaticDeviceMap};
use crate::source::{SimAudioSource, SimVoiceSource};

/// Which producers the rig simulates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub router: RouterConfig,
    /// Audio sources with a simulated producer
    pub audio: Vec<AudioSource>,
    /// Voice sources with a simulated producer
    pub voice: Vec<VoiceSource>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            audio: vec![
                AudioSource::A2DP_1,
                AudioSource::A2DP_2,
                AudioSource::USB,
                AudioSource::LINE_IN,
            ],
            voice: vec![VoiceSource::HFP_1, VoiceSource::HFP_2],
        }
    }
}

/// Handles to everything the router talks to
pub struct SimRig {
    pub focus: Arc<ScriptedFocus>,
    pub adapter: Arc<RecordingAudioAdapter>,
    pub feature_manager: Arc<SimFeatureManager>,
    pub devices: Arc<StaticDeviceMap>,
    audio: Vec<Arc<SimAudioSource>>,
    voice: Vec<Arc<SimVoiceSource>>,
}

impl SimRig {
    /// Build the rig and a router using the single entity policy
    pub fn build(config: &SimConfig) -> Result<(Self, AudioRouter), RouterError> {
        config.router.validate()?;
        let mut audio_sources = AudioSources::new(config.router.max_audio_sources);
        let mut voice_sources = VoiceSources::new(config.router.max_voice_sources);

        let mut audio = Vec::with_capacity(config.audio.len());
        for &id in &config.audio {
            let source = SimAudioSource::new(id);
            source.register(&mut audio_sources)?;
            audio.push(source);
        }

        let mut voice = Vec::with_capacity(config.voice.len());
        for &id in &config.voice {
            let source = SimVoiceSource::new(id);
            source.register(&mut voice_sources)?;
            voice.push(source);
        }

        let rig = Self {
            focus: ScriptedFocus::new(),
            adapter: RecordingAudioAdapter::new(),
            feature_manager: SimFeatureManager::new(),
            devices: StaticDeviceMap::new(),
            audio,
            voice,
        };

        let collaborators = Collaborators {
            focus: rig.focus.clone(),
            adapter: rig.adapter.clone(),
            feature_manager: rig.feature_manager.clone(),
            devices: rig.devices.clone(),
        };

        let mut router = AudioRouter::new(
            config.router.clone(),
            audio_sources,
            voice_sources,
            collaborators,
        );
        SingleEntity::init(&mut router)?;

        info!(
            "SimRig built with {} audio and {} voice producers",
            rig.audio.len(),
            rig.voice.len()
        );
        Ok((rig, router))
    }

    pub fn audio(&self, id: AudioSource) -> Option<&Arc<SimAudioSource>> {
        self.audio.iter().find(|s| s.id() == id)
    }

    pub fn voice(&self, id: VoiceSource) -> Option<&Arc<SimVoiceSource>> {
        self.voice.iter().find(|s| s.id() == id)
    }

    pub fn audio_producers(&self) -> impl Iterator<Item = &Arc<SimAudioSource>> {
        self.audio.iter()
    }

    pub fn voice_producers(&self) -> impl Iterator<Item = &Arc<SimVoiceSource>> {
        self.voice.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_router::RouterState;
    use audio_sources::GenericSource;

    #[test]
    fn test_build_registers_producers() {
        let (rig, router) = SimRig::build(&SimConfig::default()).unwrap();

        assert!(rig.audio(AudioSource::A2DP_1).is_some());
        assert!(rig.audio(AudioSource::LE_AUDIO_UNICAST).is_none());
        assert_eq!(rig.voice_producers().count(), 2);
        assert_eq!(
            router.source_state(GenericSource::Audio(AudioSource::A2DP_1)),
            RouterState::Invalid
        );
    }

    #[test]
    fn test_build_rejects_out_of_range_producer() {
        let config = SimConfig {
            audio: vec![AudioSource(42)],
            ..SimConfig::default()
        };
        assert!(SimRig::build(&config).is_err());
    }

    #[test]
    fn test_build_rejects_oversized_router_config() {
        let config: SimConfig =
            serde_json::from_str(r#"{"router": {"max_audio_sources": 300}}"#).unwrap();
        assert!(matches!(
            SimRig::build(&config),
            Err(RouterError::TooManySources { kind: "audio", .. })
        ));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: SimConfig = serde_json::from_str(r#"{"voice": []}"#).unwrap();
        assert!(config.voice.is_empty());
        assert_eq!(config.audio.len(), 4);
        assert_eq!(config.router, RouterConfig::default());
    }
}
