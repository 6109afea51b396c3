//! Routing scenarios
//!
//! A scenario is a list of steps. Steps that talk to the router are sent to
//! the actor; steps that change what a producer or the focus provider
//! reports are applied to the rig directly, after every earlier command has
//! been processed.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use audio_router::{RouterActorCommand, RouterState};
use audio_sim::SimRig;
use audio_sources::{
    AudioContext, AudioSource, DeviceId, GenericSource, SourceStatus, VoiceContext, VoiceSource,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// One scenario step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Change the source the focus provider foregrounds
    Focus { source: Option<GenericSource> },
    Add { source: GenericSource },
    Remove { source: GenericSource },
    Update,
    /// A simulated audio producer changes what it reports
    AudioContext {
        source: AudioSource,
        context: AudioContext,
    },
    /// A simulated voice producer changes its call state
    VoiceContext {
        source: VoiceSource,
        context: VoiceContext,
    },
    /// The producer answers its next handshakes with `Preparing`
    Preparing { source: GenericSource, count: usize },
    /// The producer finished an asynchronous state change
    Ready { source: GenericSource },
    /// Map a device to an audio source
    Device { device: DeviceId, source: AudioSource },
    DeviceInUse { device: DeviceId },
    PauseAll,
    /// Print the router state of a source
    Query { source: GenericSource },
}

/// A named list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Music interrupted by a call, then resumed once the call ends
    pub fn call_interrupts_music() -> Self {
        let a1 = GenericSource::Audio(AudioSource::A2DP_1);
        let v1 = GenericSource::Voice(VoiceSource::HFP_1);

        Self {
            name: "call interrupts music".to_string(),
            steps: vec![
                Step::AudioContext {
                    source: AudioSource::A2DP_1,
                    context: AudioContext::IsPlaying,
                },
                Step::Focus { source: Some(a1) },
                Step::Add { source: a1 },
                Step::Query { source: a1 },
                Step::VoiceContext {
                    source: VoiceSource::HFP_1,
                    context: VoiceContext::InCall,
                },
                Step::Focus { source: Some(v1) },
                Step::Add { source: v1 },
                Step::Update,
                Step::Query { source: a1 },
                Step::Query { source: v1 },
                Step::VoiceContext {
                    source: VoiceSource::HFP_1,
                    context: VoiceContext::Connected,
                },
                Step::Focus { source: Some(a1) },
                Step::Remove { source: v1 },
                Step::Update,
                Step::Query { source: a1 },
            ],
        }
    }

    /// Replay every step against the actor behind `cmd_tx`
    pub async fn run(
        &self,
        rig: &SimRig,
        cmd_tx: &mpsc::Sender<RouterActorCommand>,
    ) -> anyhow::Result<()> {
        info!("Running scenario '{}' ({} steps)", self.name, self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            debug!("Step {}: {:?}", index, step);
            run_step(rig, cmd_tx, step)
                .await
                .with_context(|| format!("Step {} ({:?}) failed", index, step))?;
        }
        Ok(())
    }
}

async fn send(
    cmd_tx: &mpsc::Sender<RouterActorCommand>,
    cmd: RouterActorCommand,
) -> anyhow::Result<()> {
    cmd_tx
        .send(cmd)
        .await
        .map_err(|_| anyhow!("router actor stopped"))
}

async fn query(
    cmd_tx: &mpsc::Sender<RouterActorCommand>,
    source: GenericSource,
) -> anyhow::Result<RouterState> {
    let (response, rx) = oneshot::channel();
    send(cmd_tx, RouterActorCommand::QuerySourceState { source, response }).await?;
    rx.await.map_err(|_| anyhow!("router actor stopped"))
}

/// Wait until the actor has processed everything sent so far
async fn barrier(cmd_tx: &mpsc::Sender<RouterActorCommand>) -> anyhow::Result<()> {
    query(cmd_tx, GenericSource::Audio(AudioSource::A2DP_1)).await?;
    Ok(())
}

async fn run_step(
    rig: &SimRig,
    cmd_tx: &mpsc::Sender<RouterActorCommand>,
    step: &Step,
) -> anyhow::Result<()> {
    match step {
        Step::Focus { source } => {
            barrier(cmd_tx).await?;
            rig.focus.set(*source);
        }

        Step::Add { source } => {
            send(cmd_tx, RouterActorCommand::AddSource { source: *source }).await?;
        }

        Step::Remove { source } => {
            let (response, rx) = oneshot::channel();
            send(
                cmd_tx,
                RouterActorCommand::RemoveSource {
                    source: *source,
                    response,
                },
            )
            .await?;
            let removed = rx.await.map_err(|_| anyhow!("router actor stopped"))?;
            println!("  remove {} -> {}", source, if removed { "accepted" } else { "refused" });
        }

        Step::Update => send(cmd_tx, RouterActorCommand::Update).await?,

        Step::AudioContext { source, context } => {
            barrier(cmd_tx).await?;
            let producer = rig
                .audio(*source)
                .with_context(|| format!("{} is not simulated", source))?;
            producer.set_context(*context);
        }

        Step::VoiceContext { source, context } => {
            barrier(cmd_tx).await?;
            let producer = rig
                .voice(*source)
                .with_context(|| format!("{} is not simulated", source))?;
            producer.set_context(*context);
        }

        Step::Preparing { source, count } => {
            barrier(cmd_tx).await?;
            let statuses = std::iter::repeat(SourceStatus::Preparing).take(*count);
            match source {
                GenericSource::Audio(audio) => rig
                    .audio(*audio)
                    .with_context(|| format!("{} is not simulated", audio))?
                    .script_statuses(statuses),
                GenericSource::Voice(voice) => rig
                    .voice(*voice)
                    .with_context(|| format!("{} is not simulated", voice))?
                    .script_statuses(statuses),
            }
        }

        Step::Ready { source } => {
            send(cmd_tx, RouterActorCommand::SourceReady { source: *source }).await?;
        }

        Step::Device { device, source } => {
            barrier(cmd_tx).await?;
            rig.devices.insert(*device, *source);
        }

        Step::DeviceInUse { device } => {
            let (response, rx) = oneshot::channel();
            send(
                cmd_tx,
                RouterActorCommand::IsDeviceInUse {
                    device: *device,
                    response,
                },
            )
            .await?;
            let in_use = rx.await.map_err(|_| anyhow!("router actor stopped"))?;
            println!("  device {:?} in use: {}", device, in_use);
        }

        Step::PauseAll => send(cmd_tx, RouterActorCommand::PauseAll).await?,

        Step::Query { source } => {
            let state = query(cmd_tx, *source).await?;
            println!("  {} is {}", source, state);
        }
    }
    Ok(())
}

/// Refuse scenarios that name sources the rig does not simulate
pub fn check(scenario: &Scenario, rig: &SimRig) -> anyhow::Result<()> {
    for step in &scenario.steps {
        let missing = match step {
            Step::AudioContext { source, .. } => rig.audio(*source).is_none().then(|| source.to_string()),
            Step::VoiceContext { source, .. } => rig.voice(*source).is_none().then(|| source.to_string()),
            _ => None,
        };
        if let Some(source) = missing {
            bail!("scenario '{}' drives {} which is not simulated", scenario.name, source);
        }
    }
    Ok(())
}
