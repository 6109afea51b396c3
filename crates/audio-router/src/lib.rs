//! Audio Router
//!
//! This crate decides which of several competing audio and voice sources is
//! connected to the single DSP audio chain of an earbud.
//!
//! # Architecture
//!
//! Producers (A2DP, USB, line-in, HFP) ask for their source to be routed or
//! withdrawn. The [`AudioRouter`] validates the request and hands it to the
//! configured [`RoutingPolicy`]. The [`SingleEntity`] policy compares the
//! source the focus provider wants foregrounded with what is routed and then
//! takes one of three actions:
//!
//! - **Interrupt**: pause a playing audio source and park it, so it can be
//!   resumed without renegotiating the chain
//! - **Resume**: ask a parked source to play again once nothing outranks it
//! - **Refresh**: disconnect the routed source and connect the new one
//!
//! Every step is confirmed by the source through its audio interface. A
//! source may answer `Preparing`, in which case the router waits for another
//! update.
//!
//! The router is single-owner. Run it inside [`run_router_actor`] to drive it
//! from several tasks.
//!
//! # Example
//!
//! ```rust,ignore
//! use audio_router::{AudioRouter, RouterConfig, SingleEntity};
//!
//! let mut router = AudioRouter::new(config, audio_sources, voice_sources, collaborators);
//! SingleEntity::init(&mut router)?;
//!
//! router.add_source(GenericSource::Audio(AudioSource::A2DP_1))?;
//! for event in router.drain_events() {
//!     println!("{:?}", event);
//! }
//! ```

pub mod actor;
pub mod collaborators;
pub mod data;
pub mod error;
pub mod events;
pub mod handover;
pub mod router;
pub mod single_entity;
mod single_entity_data;
pub mod state;

pub use actor::{run_router_actor, RouterActorCommand};
pub use collaborators::{
    AudioAdapter, DeviceSourceMap, Feature, FeatureClient, FeatureHandle, FeatureManager,
    FeatureState, FocusProvider,
};
pub use data::RouterData;
pub use error::RouterError;
pub use events::RouterEvent;
pub use router::{AudioRouter, Collaborators, RouterConfig, RouterCore, RoutingPolicy};
pub use single_entity::{drive_to_stable, SingleEntity, MAX_STABLE_STATE_ATTEMPTS};
pub use state::{RouterRecord, RouterState};
