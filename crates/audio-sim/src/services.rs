//! Simulated router collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use audio_router::{
    AudioAdapter, DeviceSourceMap, Feature, FeatureClient, FeatureHandle, FeatureManager,
    FocusProvider,
};
use audio_sources::{AudioSource, DeviceId, GenericSource, SourceDefinedParams};
use tracing::{debug, warn};

use crate::source::lock;

/// Focus provider whose answer is set by the test or scenario
#[derive(Debug, Default)]
pub struct ScriptedFocus {
    focused: Mutex<Option<GenericSource>>,
}

impl ScriptedFocus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, source: Option<GenericSource>) {
        debug!("ScriptedFocus -> {:?}", source);
        *lock(&self.focused) = source;
    }
}

impl FocusProvider for ScriptedFocus {
    fn focused_source_for_audio_routing(&self) -> Option<GenericSource> {
        *lock(&self.focused)
    }
}

/// What the audio adapter was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOp {
    Connect(GenericSource),
    Disconnect(GenericSource),
}

#[derive(Debug, Default)]
struct ChainState {
    ops: Vec<ChainOp>,
    connected: Vec<GenericSource>,
    peak_connected: usize,
}

/// Audio adapter that records chain operations instead of touching a DSP
#[derive(Debug, Default)]
pub struct RecordingAudioAdapter {
    state: Mutex<ChainState>,
}

impl RecordingAudioAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ops(&self) -> Vec<ChainOp> {
        lock(&self.state).ops.clone()
    }

    pub fn take_ops(&self) -> Vec<ChainOp> {
        std::mem::take(&mut lock(&self.state).ops)
    }

    /// Sources whose chain is currently connected
    pub fn connected(&self) -> Vec<GenericSource> {
        lock(&self.state).connected.clone()
    }

    /// Most sources ever connected at the same time
    pub fn peak_connected(&self) -> usize {
        lock(&self.state).peak_connected
    }
}

impl AudioAdapter for RecordingAudioAdapter {
    fn connect(&self, source: GenericSource, _params: &SourceDefinedParams) {
        let mut state = lock(&self.state);
        state.ops.push(ChainOp::Connect(source));
        if state.connected.contains(&source) {
            warn!("RecordingAudioAdapter {} connected twice", source);
        } else {
            state.connected.push(source);
        }
        state.peak_connected = state.peak_connected.max(state.connected.len());
    }

    fn disconnect(&self, source: GenericSource, _params: &SourceDefinedParams) {
        let mut state = lock(&self.state);
        state.ops.push(ChainOp::Disconnect(source));
        state.connected.retain(|s| *s != source);
    }
}

/// A feature manager request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureRequest {
    Start { handle: FeatureHandle, granted: bool },
    Stop { handle: FeatureHandle },
}

/// Feature manager that grants or refuses admission on demand
pub struct SimFeatureManager {
    grant: AtomicBool,
    active: AtomicBool,
    next_handle: AtomicU32,
    clients: Mutex<Vec<(Feature, Arc<dyn FeatureClient>)>>,
    requests: Mutex<Vec<FeatureRequest>>,
}

impl SimFeatureManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            grant: AtomicBool::new(true),
            active: AtomicBool::new(false),
            next_handle: AtomicU32::new(1),
            clients: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Grant (or refuse) the next start requests
    pub fn set_grant(&self, grant: bool) {
        self.grant.store(grant, Ordering::SeqCst);
    }

    /// Whether a started feature has not yet indicated it stopped
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<FeatureRequest> {
        lock(&self.requests).clone()
    }

    /// Suspend every registered client, as a higher priority feature would
    pub fn suspend_all(&self) {
        for (feature, client) in lock(&self.clients).iter() {
            debug!("SimFeatureManager suspend {:?}", feature);
            client.suspend();
        }
    }
}

impl FeatureManager for SimFeatureManager {
    fn register(&self, feature: Feature, client: Arc<dyn FeatureClient>) -> FeatureHandle {
        let handle = FeatureHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        debug!("SimFeatureManager registered {:?} as {:?}", feature, handle);
        lock(&self.clients).push((feature, client));
        handle
    }

    fn start_feature_request(&self, handle: FeatureHandle) -> bool {
        let granted = self.grant.load(Ordering::SeqCst);
        if granted {
            self.active.store(true, Ordering::SeqCst);
        }
        lock(&self.requests).push(FeatureRequest::Start { handle, granted });
        granted
    }

    fn stop_feature_indication(&self, handle: FeatureHandle) {
        self.active.store(false, Ordering::SeqCst);
        lock(&self.requests).push(FeatureRequest::Stop { handle });
    }
}

/// Fixed device to source mapping
#[derive(Debug, Default)]
pub struct StaticDeviceMap {
    audio: Mutex<HashMap<DeviceId, AudioSource>>,
}

impl StaticDeviceMap {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, device: DeviceId, source: AudioSource) {
        lock(&self.audio).insert(device, source);
    }
}

impl DeviceSourceMap for StaticDeviceMap {
    fn audio_source(&self, device: DeviceId) -> Option<AudioSource> {
        lock(&self.audio).get(&device).copied()
    }
}
