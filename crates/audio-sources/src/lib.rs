//! Audio and Voice Sources
//!
//! This crate provides the generic API the router and the rest of the
//! system use to control any audio or voice source without depending on the
//! code implementing it.
//!
//! # Architecture
//!
//! Producers (A2DP, USB, line-in, HFP) register implementations of one or
//! more interfaces per source id:
//!
//! - **Audio**: parameters needed to (dis)connect the DSP chain, and the
//!   routing state handshake
//! - **Media control** (audio) / **Telephony control** (voice): playback or
//!   call control, plus the provider context
//! - **Volume** and **Volume control**: locally stored or remotely owned volume
//! - **Observer**: notified of volume, mute and routing changes
//!
//! Each interface works independently; any combination may be registered.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use audio_sources::{AudioSource, AudioSources, MediaControlInterface};
//!
//! struct Player;
//! impl MediaControlInterface for Player {}
//!
//! let mut sources = AudioSources::new(AudioSource::COUNT);
//! sources
//!     .register_media_control_interface(AudioSource::A2DP_1, Arc::new(Player))
//!     .unwrap();
//! sources.play(AudioSource::A2DP_1).unwrap();
//! ```

pub mod audio_sources;
pub mod context;
pub mod error;
pub mod interfaces;
pub mod params;
mod registry;
pub mod source;
pub mod voice_sources;

pub use audio_sources::AudioSources;
pub use context::{AudioContext, SourceContext, VoiceContext};
pub use error::SourceError;
pub use interfaces::{
    AudioInterface, MediaControlInterface, SourceObserver, TelephonyControlInterface,
    VolumeControlInterface, VolumeInterface,
};
pub use params::{
    DeviceId, EventOrigin, MuteState, RepeatState, RoutingChange, ShuffleState,
    SourceDefinedParams, SourceState, SourceStatus, TransferDirection, Volume, VolumeConfig,
};
pub use registry::MAX_OBSERVERS;
pub use source::{AudioSource, GenericSource, SourceKind, VoiceSource, MAX_SOURCE_IDS};
pub use voice_sources::VoiceSources;
