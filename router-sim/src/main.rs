//! Earbud Audio Router Simulator
//!
//! Replays a routing scenario against simulated A2DP and HFP producers and
//! prints every lifecycle event the router emits.
//!
//! ```text
//! router-sim [scenario.json]
//! ```
//!
//! Without an argument the scenario named in the settings is used, or the
//! built-in "call interrupts music" scenario when none is configured.

mod scenario;
mod settings;

use std::path::PathBuf;

use anyhow::Context;
use audio_router::{run_router_actor, RouterActorCommand, RouterEvent};
use audio_sim::SimRig;
use scenario::Scenario;
use settings::Settings;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn describe(event: &RouterEvent) -> String {
    match event {
        RouterEvent::SourceAdded(source) => format!("{} added", source),
        RouterEvent::SourceRemoved(source) => format!("{} removed", source),
        RouterEvent::StateChanged { source, from, to } => {
            format!("{} {} -> {}", source, from, to)
        }
        RouterEvent::SourcePaused(source) => format!("{} paused", source),
        RouterEvent::SourceResumed(source) => format!("{} resumed", source),
        RouterEvent::RoutingChanged { source, routed } => {
            format!("{} {}", source, if *routed { "routed" } else { "unrouted" })
        }
        RouterEvent::VoiceFeatureAcquired => "voice feature acquired".to_string(),
        RouterEvent::VoiceFeatureReleased => "voice feature released".to_string(),
        RouterEvent::ContractViolation { message } => format!("CONTRACT VIOLATION: {}", message),
    }
}

fn load_scenario(settings: &Settings) -> anyhow::Result<Scenario> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.default_scenario.clone());

    match path {
        Some(path) => Scenario::from_file(&path),
        None => Ok(Scenario::call_interrupts_music()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "router_sim=info,audio_router=info,audio_sources=info,audio_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting earbud audio router simulator");

    let settings = Settings::load();
    if Settings::settings_path().is_some_and(|path| !path.exists()) {
        if let Err(e) = settings.save() {
            tracing::warn!("Could not write default settings: {:#}", e);
        }
    }

    let scenario = load_scenario(&settings)?;
    let (rig, router) = SimRig::build(&settings.sim).context("Failed to build simulated rig")?;
    scenario::check(&scenario, &rig)?;

    let (cmd_tx, cmd_rx) = mpsc::channel(settings.command_buffer);
    let (event_tx, mut event_rx) = mpsc::channel(settings.event_buffer);
    let actor = tokio::spawn(run_router_actor(router, cmd_rx, event_tx));

    let printer = tokio::spawn(async move {
        let mut violation = None;
        while let Some(event) = event_rx.recv().await {
            println!("event: {}", describe(&event));
            if let RouterEvent::ContractViolation { message } = event {
                violation = Some(message);
            }
        }
        violation
    });

    println!("scenario: {}", scenario.name);
    let outcome = scenario.run(&rig, &cmd_tx).await;

    // The actor may already have stopped on a contract violation
    let _ = cmd_tx.send(RouterActorCommand::Shutdown).await;
    drop(cmd_tx);
    actor.await.context("Router actor panicked")?;
    let violation = printer.await.context("Event printer panicked")?;

    println!("chain operations: {:?}", rig.adapter.ops());
    println!("peak sources connected: {}", rig.adapter.peak_connected());

    if let Some(message) = violation {
        anyhow::bail!("router stopped: {}", message);
    }
    outcome
}
