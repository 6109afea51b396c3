//! Router Actor
//!
//! The routing algorithm assumes exclusive access between updates. This
//! actor owns the [`AudioRouter`] and processes commands one at a time, so
//! producers on any task can drive it through a channel.
//!
//! After every command the router's buffered events are forwarded on the
//! event channel. A contract violation is forwarded as
//! [`RouterEvent::ContractViolation`] and stops the actor.
//!
//! # Example
//!
//! ```rust,ignore
//! use audio_router::actor::{run_router_actor, RouterActorCommand};
//! use tokio::sync::mpsc;
//!
//! let (cmd_tx, cmd_rx) = mpsc::channel(64);
//! let (event_tx, mut event_rx) = mpsc::channel(256);
//!
//! tokio::spawn(run_router_actor(router, cmd_rx, event_tx));
//! cmd_tx.send(RouterActorCommand::AddSource { source }).await?;
//! ```

use audio_sources::{DeviceId, GenericSource};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::error::RouterError;
use crate::events::RouterEvent;
use crate::router::AudioRouter;
use crate::state::RouterState;

/// Commands sent to the router actor
#[derive(Debug)]
pub enum RouterActorCommand {
    /// A producer wants a source routed
    AddSource {
        source: GenericSource,
    },

    /// A producer no longer wants a source routed
    RemoveSource {
        source: GenericSource,
        /// Whether the router accepted the removal
        response: oneshot::Sender<bool>,
    },

    /// Priority or context changed; re-evaluate routing
    Update,

    /// A source that answered `Preparing` has finished its state change
    SourceReady {
        source: GenericSource,
    },

    /// Ask whether a device's audio still holds the chain
    IsDeviceInUse {
        device: DeviceId,
        response: oneshot::Sender<bool>,
    },

    /// Query the router state of a source
    QuerySourceState {
        source: GenericSource,
        response: oneshot::Sender<RouterState>,
    },

    /// Pause every audio source, the last routed one last
    PauseAll,

    /// Stop the actor
    Shutdown,
}

/// Apply one command. `Ok(false)` asks the actor to stop.
fn handle_command(router: &mut AudioRouter, cmd: RouterActorCommand) -> Result<bool, RouterError> {
    match cmd {
        RouterActorCommand::AddSource { source } => {
            router.add_source(source)?;
        }

        RouterActorCommand::RemoveSource { source, response } => {
            let removed = router.remove_source(source)?;
            let _ = response.send(removed);
        }

        RouterActorCommand::Update => {
            router.update()?;
        }

        RouterActorCommand::SourceReady { source } => {
            debug!("Router actor: {} ready", source);
            router.update()?;
        }

        RouterActorCommand::IsDeviceInUse { device, response } => {
            let in_use = router.is_device_in_use(device)?;
            let _ = response.send(in_use);
        }

        RouterActorCommand::QuerySourceState { source, response } => {
            let _ = response.send(router.source_state(source));
        }

        RouterActorCommand::PauseAll => {
            router.pause_all_sources()?;
        }

        RouterActorCommand::Shutdown => {
            info!("Router actor shutting down");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Run the router actor
///
/// # Arguments
///
/// * `router` - Router to own, with its policy configured
/// * `cmd_rx` - Receiver for commands sent to the actor
/// * `event_tx` - Sender for events emitted by the router
pub async fn run_router_actor(
    mut router: AudioRouter,
    mut cmd_rx: mpsc::Receiver<RouterActorCommand>,
    event_tx: mpsc::Sender<RouterEvent>,
) {
    info!("Router actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        let result = handle_command(&mut router, cmd);

        for event in router.drain_events() {
            let _ = event_tx.send(event).await;
        }

        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("Router actor stopping: {}", e);
                let _ = event_tx
                    .send(RouterEvent::ContractViolation {
                        message: e.to_string(),
                    })
                    .await;
                break;
            }
        }
    }

    info!("Router actor stopped");
}
