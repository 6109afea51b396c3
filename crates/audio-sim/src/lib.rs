//! Audio Router Simulation Library
//!
//! This crate provides stand-ins for everything the audio router talks to,
//! so routing can be exercised without earbud hardware. It includes:
//!
//! - **SimAudioSource** / **SimVoiceSource**: producers that answer the
//!   routing handshake from a script and record every call
//! - **ScriptedFocus**: a focus provider whose answer is set by hand
//! - **RecordingAudioAdapter**: records chain (dis)connects
//! - **SimFeatureManager**: grants or refuses voice admission on demand
//! - **SimRig**: all of the above wired to a router
//!
//! # Example
//!
//! ```rust
//! use audio_sim::{SimConfig, SimRig};
//! use audio_sources::{AudioContext, AudioSource, GenericSource};
//!
//! let (rig, mut router) = SimRig::build(&SimConfig::default()).unwrap();
//! let a2dp = GenericSource::Audio(AudioSource::A2DP_1);
//!
//! rig.audio(AudioSource::A2DP_1).unwrap().set_context(AudioContext::IsPlaying);
//! rig.focus.set(Some(a2dp));
//! router.add_source(a2dp).unwrap();
//!
//! assert_eq!(rig.adapter.connected(), vec![a2dp]);
//! ```

pub mod rig;
pub mod services;
pub mod source;

pub use rig::{SimConfig, SimRig};
pub use services::{
    ChainOp, FeatureRequest, RecordingAudioAdapter, ScriptedFocus, SimFeatureManager,
    StaticDeviceMap,
};
pub use source::{SimAudioSource, SimCall, SimParams, SimVoiceSource};
