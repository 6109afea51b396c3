//! Single-entity routing policy
//!
//! One physical output is shared by every source, so at most one source may
//! hold the DSP chain at a time. Each [`update`](RoutingPolicy::update)
//! compares the focused source with what is routed and interrupted, then
//! takes exactly one action:
//!
//! 1. **Interrupt** a playing audio source that is losing the chain: pause it
//!    and mark it `ToBeInterrupted`. The chain is released on the next update.
//! 2. **Resume** the interrupted source once nothing outranks it: ask it to
//!    play and mark it `ToBeResumed`. It is reconnected on the next update.
//! 3. **Refresh**: disconnect the routed source and/or connect the source to
//!    route, then settle any source that was added but never chosen.
//!
//! Transitions are confirmed by the source through its audio interface. A
//! source that answers `Preparing` leaves the policy waiting; the producer
//! triggers another update once it is ready.

use audio_sources::{DeviceId, GenericSource, SourceContext, SourceState, SourceStatus};
use tracing::{debug, error, info, warn};

use crate::error::RouterError;
use crate::events::RouterEvent;
use crate::router::{AudioRouter, RouterCore, RoutingPolicy};
use crate::state::RouterState;

/// Maximum number of state actions in one attempt to reach a stable state
pub const MAX_STABLE_STATE_ATTEMPTS: usize = 8;

/// Step a source through transient states until it is stable.
///
/// `state_of` reads the current state and `act` runs the action for a
/// transient state. Returns `Ok(true)` once a stable state is reached and
/// `Ok(false)` as soon as an action answers `Preparing`. More than `limit`
/// actions without reaching a stable state is an error, as is any status
/// other than `Ready` or `Preparing`.
pub fn drive_to_stable<C: ?Sized>(
    ctx: &mut C,
    source: GenericSource,
    limit: usize,
    state_of: impl Fn(&C, GenericSource) -> RouterState,
    mut act: impl FnMut(&mut C, GenericSource, RouterState) -> Result<SourceStatus, RouterError>,
) -> Result<bool, RouterError> {
    debug!("drive_to_stable {}", source);

    for attempts in 0..=limit {
        let state = state_of(&*ctx, source);
        if state.is_stable() {
            return Ok(true);
        }
        if attempts == limit {
            error!("drive_to_stable {} stuck in {} after {} attempts", source, state, attempts);
            return Err(RouterError::StableStateNotReached {
                id: source,
                attempts,
            });
        }

        match act(&mut *ctx, source, state)? {
            SourceStatus::Ready => {}
            SourceStatus::Preparing => {
                debug!("drive_to_stable {} preparing in {}", source, state);
                return Ok(false);
            }
            status => {
                error!("drive_to_stable {} returned {:?} in {}", source, status, state);
                return Err(RouterError::UnexpectedStatus {
                    id: source,
                    state,
                    status,
                });
            }
        }
    }

    // The loop returns on every path of its last iteration
    Err(RouterError::StableStateNotReached {
        id: source,
        attempts: limit,
    })
}

/// Everything one update decides on
#[derive(Debug, Default, Clone, Copy)]
struct SourceRouting {
    highest_priority: Option<GenericSource>,
    highest_priority_context: Option<SourceContext>,
    to_route: Option<GenericSource>,
    routed: Option<GenericSource>,
    routed_context: Option<SourceContext>,
    interrupted: Option<GenericSource>,
    interrupted_context: Option<SourceContext>,
}

impl SourceRouting {
    /// The focused source has just become busy and is not yet routed or
    /// about to be
    fn is_source_incoming(&self) -> bool {
        let elevated = self
            .highest_priority_context
            .is_some_and(|context| context.is_incoming());

        elevated && self.highest_priority != self.to_route && self.highest_priority != self.routed
    }

    fn is_disconnecting_only(&self) -> bool {
        self.routed.is_some() && self.to_route.is_none()
    }

    fn is_connecting_only(&self) -> bool {
        self.routed.is_none() && self.to_route.is_some()
    }

    fn is_changing_source(&self) -> bool {
        self.routed.is_some() && self.to_route.is_some() && self.routed != self.to_route
    }

    /// The routed source is still the one to route but its producer has
    /// withdrawn it
    fn has_routed_source_been_removed(&self, core: &RouterCore) -> bool {
        match (self.routed, self.to_route) {
            (Some(routed), Some(to_route)) => {
                routed == to_route && !core.data().is_source_present(to_route)
            }
            _ => false,
        }
    }

    fn interrupted_matches_source_to_route(&self) -> bool {
        self.interrupted.is_some() && self.interrupted == self.to_route
    }

    fn has_interrupted_source_been_resumed_elsewhere(&self) -> bool {
        let playing = self.interrupted.is_some_and(|s| s.is_audio())
            && self
                .interrupted_context
                .is_some_and(|context| context.is_audio_playing());

        self.interrupted_matches_source_to_route() && playing
    }

    fn should_interrupt_routed_source(&self, core: &RouterCore) -> bool {
        let Some(routed) = self.routed else {
            return false;
        };

        let can_be_interrupted = self.interrupted.is_none()
            && routed.is_audio()
            && self
                .routed_context
                .is_some_and(|context| context.is_audio_playing())
            && core.data().source_state(routed) != RouterState::ToBeInterrupted;

        let losing_chain = self.is_changing_source()
            || (self.is_disconnecting_only() && self.is_source_incoming());

        losing_chain && can_be_interrupted
    }

    fn should_resume_interrupted_source(&self, core: &RouterCore) -> bool {
        let Some(interrupted) = self.interrupted else {
            return false;
        };

        let only_interrupted_left = self.to_route.is_none() && self.routed.is_some();
        let replaces_removed_source = self.has_routed_source_been_removed(core);
        let va_session_ongoing = self.routed.is_some_and(|s| s.is_audio())
            && self
                .routed_context
                .is_some_and(|context| context.is_va_response());

        (only_interrupted_left
            || replaces_removed_source
            || self.interrupted_matches_source_to_route())
            && !self.is_source_incoming()
            && !va_session_ongoing
            && core.data().source_state(interrupted) != RouterState::ToBeResumed
    }

    fn has_routed_source_been_marked_for_interruption(&self, core: &RouterCore) -> bool {
        self.interrupted.is_none()
            && self
                .routed
                .is_some_and(|s| core.data().source_state(s) == RouterState::ToBeInterrupted)
    }

    fn log(&self, core: &RouterCore) {
        let describe = |source: Option<GenericSource>| match source {
            Some(s) => format!("{} {}", s, core.data().source_state(s)),
            None => "none".to_string(),
        };
        info!(
            "SingleEntity focus {} route {} routed {} interrupted {}",
            describe(self.highest_priority),
            describe(self.to_route),
            describe(self.routed),
            describe(self.interrupted)
        );
    }
}

/// Routing policy for a single output shared by all sources
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleEntity;

impl SingleEntity {
    /// Install the single-entity policy on a router
    pub fn init(router: &mut AudioRouter) -> Result<(), RouterError> {
        router.configure_handlers(Box::new(SingleEntity))
    }

    fn connecting_action(
        core: &mut RouterCore,
        source: GenericSource,
    ) -> Result<SourceStatus, RouterError> {
        let status = core.common_set_source_state(source, SourceState::Connecting)?;
        debug!("SingleEntity connecting {} {:?}", source, status);

        if status == SourceStatus::Ready {
            if !core.data().is_source_present(source) {
                debug!("SingleEntity {} went away while connecting", source);
                core.set_source_state(source, RouterState::DisconnectingNoConnect);
            } else if !core.common_connect_source(source)? {
                info!("SingleEntity unable to connect {}", source);
                core.set_source_state(source, RouterState::DisconnectingNoConnect);
            } else {
                core.set_source_state(source, RouterState::ConnectedPending);
            }
        }
        Ok(status)
    }

    /// Release the chain, landing in `next` once the source has let go
    fn release_action(
        core: &mut RouterCore,
        source: GenericSource,
        next: RouterState,
    ) -> Result<SourceStatus, RouterError> {
        let status = core.common_set_source_state(source, SourceState::Disconnecting)?;
        debug!("SingleEntity disconnecting {} {:?}", source, status);

        if status == SourceStatus::Ready {
            if !core.common_disconnect_source(source)? {
                error!("SingleEntity unable to disconnect {}", source);
                return Err(RouterError::DisconnectFailed { id: source });
            }
            core.set_source_state(source, next);
        }
        Ok(status)
    }

    /// Tell the source `notify` and move to `next` once it is ready
    fn confirm_action(
        core: &mut RouterCore,
        source: GenericSource,
        notify: SourceState,
        next: RouterState,
    ) -> Result<SourceStatus, RouterError> {
        let status = core.common_set_source_state(source, notify)?;
        debug!("SingleEntity {:?} {} {:?}", notify, source, status);

        if status == SourceStatus::Ready {
            core.set_source_state(source, next);
        }
        Ok(status)
    }

    fn state_action(
        core: &mut RouterCore,
        source: GenericSource,
        state: RouterState,
    ) -> Result<SourceStatus, RouterError> {
        match state {
            RouterState::Connecting => Self::connecting_action(core, source),
            RouterState::ConnectedPending => Self::confirm_action(
                core,
                source,
                SourceState::Connected,
                RouterState::Connected,
            ),
            RouterState::Disconnecting => {
                Self::release_action(core, source, RouterState::DisconnectedPending)
            }
            RouterState::Interrupting => {
                Self::release_action(core, source, RouterState::InterruptedPending)
            }
            RouterState::InterruptedPending => Self::confirm_action(
                core,
                source,
                SourceState::Disconnected,
                RouterState::Interrupted,
            ),
            RouterState::DisconnectingNoConnect => Self::confirm_action(
                core,
                source,
                SourceState::Disconnecting,
                RouterState::DisconnectedPending,
            ),
            RouterState::DisconnectedPending => Self::confirm_action(
                core,
                source,
                SourceState::Disconnected,
                RouterState::Disconnected,
            ),
            state => {
                error!("SingleEntity no action for {} in {}", source, state);
                Err(RouterError::InvalidTransition {
                    id: source,
                    state,
                    action: "stabilise",
                })
            }
        }
    }

    fn attempt_stable_state(
        core: &mut RouterCore,
        source: GenericSource,
    ) -> Result<bool, RouterError> {
        drive_to_stable(
            core,
            source,
            MAX_STABLE_STATE_ATTEMPTS,
            |core, source| core.data().source_state(source),
            Self::state_action,
        )
    }

    /// Finish any transition in flight. Returns whether the router is free
    /// to take a new decision.
    fn retry_if_intermediate(core: &mut RouterCore) -> Result<bool, RouterError> {
        match core.data().transient_source() {
            Some(source) => Self::attempt_stable_state(core, source),
            None => Ok(true),
        }
    }

    fn get_sources(core: &RouterCore) -> Result<SourceRouting, RouterError> {
        let highest_priority = core.focused_source();
        let data = core.data();
        let to_route = data.source_to_route(highest_priority);
        let routed = data.active_source();
        let interrupted = data.interrupted_source();

        let context_of = |source: Option<GenericSource>| {
            source.map(|s| core.source_context(s)).transpose()
        };

        Ok(SourceRouting {
            highest_priority,
            highest_priority_context: context_of(highest_priority)?,
            to_route,
            routed,
            routed_context: context_of(routed)?,
            interrupted,
            interrupted_context: context_of(interrupted)?,
        })
    }

    fn interrupt_source(core: &mut RouterCore, source: GenericSource) -> Result<(), RouterError> {
        if let GenericSource::Audio(audio) = source {
            info!("SingleEntity interrupting {}", source);
            core.audio_sources().pause(audio)?;
            core.set_source_state(source, RouterState::ToBeInterrupted);
            core.push_event(RouterEvent::SourcePaused(source));
        }
        Ok(())
    }

    fn resume_source(core: &mut RouterCore, source: GenericSource) -> Result<(), RouterError> {
        if let GenericSource::Audio(audio) = source {
            info!("SingleEntity resuming {}", source);
            core.audio_sources().play(audio)?;
            core.set_source_state(source, RouterState::ToBeResumed);
            core.push_event(RouterEvent::SourceResumed(source));
        }
        Ok(())
    }

    fn disconnect_routed_source(
        core: &mut RouterCore,
        sources: &SourceRouting,
    ) -> Result<bool, RouterError> {
        let Some(routed) = sources.routed else {
            return Ok(true);
        };
        debug!("SingleEntity disconnect_routed_source {}", routed);

        let state = core.data().source_state(routed);
        if !matches!(state, RouterState::Connected | RouterState::ToBeInterrupted) {
            error!("SingleEntity cannot disconnect {} in {}", routed, state);
            return Err(RouterError::InvalidTransition {
                id: routed,
                state,
                action: "disconnect",
            });
        }

        let next = if sources.has_routed_source_been_marked_for_interruption(core) {
            RouterState::Interrupting
        } else {
            RouterState::Disconnecting
        };
        core.set_source_state(routed, next);

        Self::attempt_stable_state(core, routed)
    }

    fn connect_source_to_route(
        core: &mut RouterCore,
        sources: &SourceRouting,
    ) -> Result<bool, RouterError> {
        let Some(to_route) = sources.to_route else {
            return Ok(true);
        };
        debug!("SingleEntity connect_source_to_route {}", to_route);

        let state = core.data().source_state(to_route);
        if !matches!(
            state,
            RouterState::Disconnected | RouterState::NewSource | RouterState::ToBeResumed
        ) {
            error!("SingleEntity cannot connect {} in {}", to_route, state);
            return Err(RouterError::InvalidTransition {
                id: to_route,
                state,
                action: "connect",
            });
        }

        if let (Some(_), Some(interrupted)) = (sources.routed, sources.interrupted) {
            info!(
                "SingleEntity replacing routed source, {} no longer resumable",
                interrupted
            );
            core.set_source_state(interrupted, RouterState::Disconnected);
        }

        core.set_source_state(to_route, RouterState::Connecting);

        Self::attempt_stable_state(core, to_route)
    }

    fn refresh_routed_source(
        core: &mut RouterCore,
        sources: &SourceRouting,
    ) -> Result<bool, RouterError> {
        let mut stable = true;

        if sources.is_disconnecting_only()
            || sources.is_changing_source()
            || sources.has_routed_source_been_removed(core)
        {
            stable = Self::disconnect_routed_source(core, sources)?;
            debug!("SingleEntity disconnected routed source, stable {}", stable);
        }

        if stable && (sources.is_connecting_only() || sources.is_changing_source()) {
            stable = Self::connect_source_to_route(core, sources)?;
        }

        Ok(stable)
    }

    /// Tell every source that was added but not chosen that it will not be
    /// routed
    fn settle_new_sources(core: &mut RouterCore) -> Result<(), RouterError> {
        while let Some(source) = core.data().new_source() {
            let status = core.common_set_source_state(source, SourceState::Disconnected)?;
            if status != SourceStatus::Ready {
                error!("SingleEntity new source {} answered {:?}", source, status);
                return Err(RouterError::UnexpectedStatus {
                    id: source,
                    state: RouterState::NewSource,
                    status,
                });
            }
            core.set_source_state(source, RouterState::Disconnected);
        }
        Ok(())
    }
}

impl RoutingPolicy for SingleEntity {
    fn add_source(&self, core: &mut RouterCore, source: GenericSource) -> Result<(), RouterError> {
        debug!("SingleEntity add_source {}", source);

        let newly_tracked = core.data().count_tracked(source) == 0;
        if !core.data_mut().add_source(source) {
            return Ok(());
        }
        if newly_tracked {
            core.push_event(RouterEvent::SourceAdded(source));
        }
        self.update(core)
    }

    fn remove_source(
        &self,
        core: &mut RouterCore,
        source: GenericSource,
    ) -> Result<bool, RouterError> {
        debug!("SingleEntity remove_source {}", source);

        if !core.data_mut().remove_source(source) {
            return Ok(false);
        }
        core.push_event(RouterEvent::SourceRemoved(source));
        self.update(core)?;
        Ok(true)
    }

    fn is_device_in_use(&self, core: &RouterCore, device: DeviceId) -> bool {
        let devices = &core.collaborators().devices;
        let candidates = [
            devices
                .audio_source(device)
                .filter(|s| !s.is_none())
                .map(GenericSource::Audio),
            devices
                .voice_source(device)
                .filter(|s| !s.is_none())
                .map(GenericSource::Voice),
        ];

        match candidates
            .into_iter()
            .flatten()
            .find(|&source| core.data().is_source_active(source))
        {
            Some(source) => {
                debug!("SingleEntity device {:?} in use by {}", device, source);
                true
            }
            None => false,
        }
    }

    fn update(&self, core: &mut RouterCore) -> Result<(), RouterError> {
        if !Self::retry_if_intermediate(core)? {
            debug!("SingleEntity update waiting on a source");
            return Ok(());
        }

        let sources = Self::get_sources(core)?;

        if sources.has_interrupted_source_been_resumed_elsewhere() {
            if let Some(interrupted) = sources.interrupted {
                warn!("SingleEntity {} resumed elsewhere", interrupted);
                core.set_source_state(interrupted, RouterState::ToBeResumed);
            }
        }

        sources.log(core);

        if sources.should_interrupt_routed_source(core) {
            if let Some(routed) = sources.routed {
                Self::interrupt_source(core, routed)?;
            }
        } else if sources.should_resume_interrupted_source(core) {
            if let Some(interrupted) = sources.interrupted {
                Self::resume_source(core, interrupted)?;
            }
        } else if Self::refresh_routed_source(core, &sources)? {
            Self::settle_new_sources(core)?;
        }
        Ok(())
    }
}
