//! Integration tests for the Audio Router
//!
//! These tests drive a router wired to simulated producers and verify:
//! - Connecting, replacing and releasing the routed source
//! - Interrupting and resuming audio around a call
//! - Sources that confirm asynchronously
//! - Voice admission and parameter failures
//! - Handover between earbuds
//! - The actor front end

use audio_router::{
    AudioRouter, Collaborators, RouterConfig, RouterError, RouterEvent, RouterState,
};
use audio_sim::{ChainOp, FeatureRequest, SimCall, SimConfig, SimRig};
use audio_sources::{
    AudioContext, AudioSource, AudioSources, DeviceId, GenericSource, RoutingChange,
    SourceState, SourceStatus, VoiceContext, VoiceSource, VoiceSources,
};

const A1: GenericSource = GenericSource::Audio(AudioSource::A2DP_1);
const A2: GenericSource = GenericSource::Audio(AudioSource::A2DP_2);
const V1: GenericSource = GenericSource::Voice(VoiceSource::HFP_1);

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Build a rig with the default producers
    pub fn rig() -> (SimRig, AudioRouter) {
        SimRig::build(&SimConfig::default()).unwrap()
    }

    /// Focus `source` and add it
    pub fn route(rig: &SimRig, router: &mut AudioRouter, source: GenericSource) {
        rig.focus.set(Some(source));
        router.add_source(source).unwrap();
    }

    /// Route A1 while it plays, then take the chain for V1
    pub fn a1_interrupted_by_v1() -> (SimRig, AudioRouter) {
        let (rig, mut router) = rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .set_context(AudioContext::IsPlaying);
        route(&rig, &mut router, A1);

        route(&rig, &mut router, V1);
        router.update().unwrap();
        assert_eq!(router.source_state(A1), RouterState::Interrupted);
        assert_eq!(router.source_state(V1), RouterState::Connected);
        (rig, router)
    }

    /// Number of records holding the chain
    pub fn active_count(router: &AudioRouter) -> usize {
        router.data().iter().filter(|r| r.state.is_active()).count()
    }

    /// State changes recorded for one source, in order
    pub fn transitions(events: &[RouterEvent], source: GenericSource) -> Vec<RouterState> {
        events
            .iter()
            .filter_map(|e| match e {
                RouterEvent::StateChanged { source: s, to, .. } if *s == source => Some(*to),
                _ => None,
            })
            .collect()
    }
}

// ============================================================================
// Connecting and Releasing
// ============================================================================

mod routing_tests {
    use super::*;

    #[test]
    fn first_focused_source_is_connected() {
        let (rig, mut router) = helpers::rig();

        helpers::route(&rig, &mut router, A1);

        assert_eq!(router.source_state(A1), RouterState::Connected);
        assert_eq!(router.last_routed_audio_source(), AudioSource::A2DP_1);
        assert_eq!(rig.adapter.connected(), vec![A1]);
        assert_eq!(
            rig.audio(AudioSource::A2DP_1).unwrap().calls(),
            vec![
                SimCall::SetState(SourceState::Connecting, SourceStatus::Ready),
                SimCall::GetConnectParameters,
                SimCall::ReleaseConnectParameters,
                SimCall::RoutingChange(RoutingChange::Routed),
                SimCall::SetState(SourceState::Connected, SourceStatus::Ready),
            ]
        );
    }

    #[test]
    fn connect_emits_ordered_events() {
        let (rig, mut router) = helpers::rig();

        helpers::route(&rig, &mut router, A1);

        let events = router.drain_events();
        assert_eq!(events[0], RouterEvent::SourceAdded(A1));
        assert_eq!(
            helpers::transitions(&events, A1),
            vec![
                RouterState::Connecting,
                RouterState::ConnectedPending,
                RouterState::Connected,
            ]
        );
        let routed_at = events
            .iter()
            .position(|e| matches!(e, RouterEvent::RoutingChanged { routed: true, .. }))
            .unwrap();
        assert!(matches!(
            events[routed_at + 1],
            RouterEvent::StateChanged {
                to: RouterState::ConnectedPending,
                ..
            }
        ));
    }

    #[test]
    fn adding_twice_changes_nothing() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);
        router.drain_events();

        router.add_source(A1).unwrap();

        assert!(router.drain_events().is_empty());
        assert_eq!(router.data().count_tracked(A1), 1);
        assert_eq!(rig.adapter.ops(), vec![ChainOp::Connect(A1)]);
    }

    #[test]
    fn unfocused_source_is_settled_as_disconnected() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);

        router.add_source(A2).unwrap();

        assert_eq!(router.source_state(A2), RouterState::Disconnected);
        assert_eq!(
            rig.audio(AudioSource::A2DP_2).unwrap().calls(),
            vec![SimCall::SetState(SourceState::Disconnected, SourceStatus::Ready)]
        );
        assert_eq!(rig.adapter.connected(), vec![A1]);
    }

    #[test]
    fn focus_change_replaces_routed_source() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);
        router.add_source(A2).unwrap();

        rig.focus.set(Some(A2));
        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::Disconnected);
        assert_eq!(router.source_state(A2), RouterState::Connected);
        assert_eq!(
            rig.adapter.ops(),
            vec![
                ChainOp::Connect(A1),
                ChainOp::Disconnect(A1),
                ChainOp::Connect(A2),
            ]
        );
        assert_eq!(rig.adapter.peak_connected(), 1);
        assert_eq!(router.last_routed_audio_source(), AudioSource::A2DP_2);
    }

    #[test]
    fn removing_routed_source_releases_chain() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);

        assert!(router.remove_source(A1).unwrap());

        assert_eq!(router.source_state(A1), RouterState::Invalid);
        assert!(rig.adapter.connected().is_empty());
        assert!(rig
            .audio(AudioSource::A2DP_1)
            .unwrap()
            .calls()
            .contains(&SimCall::RoutingChange(RoutingChange::Unrouted)));
        assert_eq!(helpers::active_count(&router), 0);
    }

    #[test]
    fn removing_unknown_source_is_refused() {
        let (_rig, mut router) = helpers::rig();

        assert!(!router.remove_source(A2).unwrap());
        assert!(router.drain_events().is_empty());
    }

    #[test]
    fn device_in_use_follows_routed_source() {
        let (rig, mut router) = helpers::rig();
        rig.devices.insert(DeviceId(1), AudioSource::A2DP_1);
        rig.devices.insert(DeviceId(2), AudioSource::A2DP_2);

        helpers::route(&rig, &mut router, A1);
        router.add_source(A2).unwrap();

        assert!(router.is_device_in_use(DeviceId(1)).unwrap());
        assert!(!router.is_device_in_use(DeviceId(2)).unwrap());
        assert!(!router.is_device_in_use(DeviceId(9)).unwrap());
    }

    #[test]
    fn pause_all_reaches_every_audio_source() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);

        router.pause_all_sources().unwrap();

        for producer in rig.audio_producers() {
            assert!(producer.calls().contains(&SimCall::Pause));
            assert_eq!(producer.context(), AudioContext::IsPaused);
        }
    }
}

// ============================================================================
// Interrupt and Resume
// ============================================================================

mod interruption_tests {
    use super::*;

    #[test]
    fn call_pauses_playing_audio_before_taking_chain() {
        let (rig, mut router) = helpers::rig();
        let a1 = rig.audio(AudioSource::A2DP_1).unwrap();
        a1.set_context(AudioContext::IsPlaying);
        helpers::route(&rig, &mut router, A1);
        router.drain_events();
        a1.take_calls();

        helpers::route(&rig, &mut router, V1);

        // The chain is kept until the next update
        assert_eq!(router.source_state(A1), RouterState::ToBeInterrupted);
        assert_eq!(router.source_state(V1), RouterState::NewSource);
        assert_eq!(a1.take_calls(), vec![SimCall::Pause]);
        assert!(router.drain_events().contains(&RouterEvent::SourcePaused(A1)));

        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::Interrupted);
        assert_eq!(router.source_state(V1), RouterState::Connected);
        assert_eq!(
            helpers::transitions(&router.drain_events(), A1),
            vec![
                RouterState::Interrupting,
                RouterState::InterruptedPending,
                RouterState::Interrupted,
            ]
        );
        assert_eq!(rig.adapter.connected(), vec![V1]);
        assert_eq!(rig.adapter.peak_connected(), 1);
    }

    #[test]
    fn audio_resumes_after_call_ends() {
        let (rig, mut router) = helpers::a1_interrupted_by_v1();
        let a1 = rig.audio(AudioSource::A2DP_1).unwrap();
        a1.take_calls();

        rig.focus.set(Some(A1));
        assert!(router.remove_source(V1).unwrap());

        assert_eq!(router.source_state(A1), RouterState::ToBeResumed);
        assert_eq!(a1.take_calls(), vec![SimCall::Play]);
        assert!(router.drain_events().contains(&RouterEvent::SourceResumed(A1)));

        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::Connected);
        assert_eq!(router.source_state(V1), RouterState::Invalid);
        assert_eq!(rig.adapter.connected(), vec![A1]);
    }

    #[test]
    fn call_interrupts_and_resumes_music_on_minimal_config() {
        let config = SimConfig {
            router: RouterConfig {
                max_audio_sources: 3,
                max_voice_sources: 2,
                le_audio_routable: false,
            },
            audio: vec![AudioSource::A2DP_1, AudioSource::A2DP_2],
            voice: vec![VoiceSource::HFP_1],
        };
        let (rig, mut router) = SimRig::build(&config).unwrap();
        assert_eq!(router.data().capacity(), 5);
        let a1 = rig.audio(AudioSource::A2DP_1).unwrap();
        a1.set_context(AudioContext::IsPlaying);

        router.add_source(A1).unwrap();
        rig.focus.set(Some(A1));
        router.update().unwrap();
        assert_eq!(router.source_state(A1), RouterState::Connected);
        assert!(!rig.feature_manager.is_active());
        a1.take_calls();

        // Voice outranks audio
        rig.focus.set(Some(V1));
        router.add_source(V1).unwrap();
        assert_eq!(router.source_state(A1), RouterState::ToBeInterrupted);
        assert!(!rig.feature_manager.is_active());
        router.update().unwrap();
        assert_eq!(router.source_state(A1), RouterState::Interrupted);
        assert_eq!(router.source_state(V1), RouterState::Connected);
        assert!(a1.take_calls().contains(&SimCall::Pause));
        assert!(rig.feature_manager.is_active());
        assert_eq!(rig.adapter.connected(), vec![V1]);

        rig.focus.set(Some(A1));
        assert!(router.remove_source(V1).unwrap());
        assert!(!rig.feature_manager.is_active());
        assert_eq!(a1.take_calls(), vec![SimCall::Play]);

        router.update().unwrap();
        assert_eq!(router.source_state(A1), RouterState::Connected);
        assert_eq!(router.source_state(V1), RouterState::Invalid);
        assert!(!rig.feature_manager.is_active());
        assert_eq!(rig.adapter.connected(), vec![A1]);
        assert_eq!(rig.adapter.peak_connected(), 1);
    }

    #[test]
    fn interrupted_source_cannot_be_removed() {
        let (_rig, mut router) = helpers::a1_interrupted_by_v1();

        assert!(!router.remove_source(A1).unwrap());
        assert_eq!(router.source_state(A1), RouterState::Interrupted);
    }

    #[test]
    fn paused_audio_is_not_interrupted() {
        let (rig, mut router) = helpers::rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .set_context(AudioContext::IsPaused);
        helpers::route(&rig, &mut router, A1);

        helpers::route(&rig, &mut router, V1);

        assert_eq!(router.source_state(A1), RouterState::Disconnected);
        assert_eq!(router.source_state(V1), RouterState::Connected);
    }

    #[test]
    fn audio_resumed_on_phone_reconnects_without_play() {
        let (rig, mut router) = helpers::a1_interrupted_by_v1();
        let a1 = rig.audio(AudioSource::A2DP_1).unwrap();
        a1.take_calls();

        a1.set_context(AudioContext::IsPlaying);
        rig.focus.set(Some(A1));
        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::Connected);
        assert_eq!(router.source_state(V1), RouterState::Disconnected);
        assert!(!a1.calls().contains(&SimCall::Play));
    }

    #[test]
    fn incoming_call_interrupts_audio_before_it_is_added() {
        let (rig, mut router) = helpers::rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .set_context(AudioContext::IsPlaying);
        helpers::route(&rig, &mut router, A1);

        rig.voice(VoiceSource::HFP_1)
            .unwrap()
            .set_context(VoiceContext::RingingIncoming);
        rig.focus.set(Some(V1));
        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::ToBeInterrupted);
        assert_eq!(router.source_state(V1), RouterState::Invalid);
    }
}

// ============================================================================
// Asynchronous Confirmation
// ============================================================================

mod preparing_tests {
    use super::*;

    #[test]
    fn preparing_source_waits_for_next_update() {
        let (rig, mut router) = helpers::rig();
        let a1 = rig.audio(AudioSource::A2DP_1).unwrap();
        a1.script_statuses([SourceStatus::Preparing]);

        helpers::route(&rig, &mut router, A1);

        assert_eq!(router.source_state(A1), RouterState::Connecting);
        assert!(rig.adapter.ops().is_empty());

        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::Connected);
        assert_eq!(rig.adapter.connected(), vec![A1]);
    }

    #[test]
    fn preparing_routed_source_holds_back_replacement() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);
        router.add_source(A2).unwrap();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .script_statuses([SourceStatus::Preparing]);

        rig.focus.set(Some(A2));
        router.update().unwrap();

        assert_eq!(router.source_state(A1), RouterState::Disconnecting);
        assert_eq!(router.source_state(A2), RouterState::Disconnected);

        // Finishing the release frees the update to connect the replacement
        router.update().unwrap();
        assert_eq!(router.source_state(A1), RouterState::Disconnected);
        assert_eq!(router.source_state(A2), RouterState::Connected);
        assert_eq!(rig.adapter.peak_connected(), 1);
    }

    #[test]
    fn error_status_is_a_contract_violation() {
        let (rig, mut router) = helpers::rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .script_statuses([SourceStatus::Error]);

        rig.focus.set(Some(A1));
        let result = router.add_source(A1);

        assert!(matches!(
            result,
            Err(RouterError::UnexpectedStatus {
                id: A1,
                state: RouterState::Connecting,
                status: SourceStatus::Error,
            })
        ));
    }

    #[test]
    fn new_source_must_settle_immediately() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);
        rig.audio(AudioSource::A2DP_2)
            .unwrap()
            .script_statuses([SourceStatus::Preparing]);

        assert!(matches!(
            router.add_source(A2),
            Err(RouterError::UnexpectedStatus {
                id: A2,
                state: RouterState::NewSource,
                ..
            })
        ));
    }
}

// ============================================================================
// Failures
// ============================================================================

mod failure_tests {
    use super::*;

    #[test]
    fn missing_connect_parameters_backs_out() {
        let (rig, mut router) = helpers::rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .set_params_available(false);

        helpers::route(&rig, &mut router, A1);

        assert_eq!(router.source_state(A1), RouterState::Disconnected);
        assert_eq!(
            helpers::transitions(&router.drain_events(), A1),
            vec![
                RouterState::Connecting,
                RouterState::DisconnectingNoConnect,
                RouterState::DisconnectedPending,
                RouterState::Disconnected,
            ]
        );
        assert!(rig.adapter.ops().is_empty());
        assert_eq!(router.last_routed_audio_source(), AudioSource::NONE);
    }

    #[test]
    fn missing_disconnect_parameters_is_fatal() {
        let (rig, mut router) = helpers::rig();
        helpers::route(&rig, &mut router, A1);
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .set_params_available(false);

        assert!(matches!(
            router.remove_source(A1),
            Err(RouterError::DisconnectFailed { id: A1 })
        ));
    }

    #[test]
    fn refused_voice_admission_leaves_call_unrouted() {
        let (rig, mut router) = helpers::rig();
        rig.feature_manager.set_grant(false);

        helpers::route(&rig, &mut router, V1);

        assert_eq!(router.source_state(V1), RouterState::Disconnected);
        assert!(rig.adapter.ops().is_empty());
        assert!(!rig
            .voice(VoiceSource::HFP_1)
            .unwrap()
            .calls()
            .contains(&SimCall::GetConnectParameters));
        assert!(matches!(
            rig.feature_manager.requests().as_slice(),
            [FeatureRequest::Start { granted: false, .. }]
        ));
    }

    #[test]
    fn voice_gate_is_held_while_call_is_routed() {
        let (rig, mut router) = helpers::rig();

        helpers::route(&rig, &mut router, V1);
        assert!(rig.feature_manager.is_active());
        assert_eq!(
            router.core().voice_feature_state(),
            audio_router::FeatureState::Running
        );

        router.remove_source(V1).unwrap();
        assert!(!rig.feature_manager.is_active());
        assert_eq!(
            router.core().voice_feature_state(),
            audio_router::FeatureState::Idle
        );
    }

    #[test]
    fn invalid_sources_are_rejected() {
        let (_rig, mut router) = helpers::rig();

        for source in [
            GenericSource::Audio(AudioSource::NONE),
            GenericSource::Audio(AudioSource(AudioSource::COUNT as u8)),
            GenericSource::Voice(VoiceSource(VoiceSource::COUNT as u8)),
        ] {
            assert!(matches!(
                router.add_source(source),
                Err(RouterError::InvalidSource { .. })
            ));
            assert!(matches!(
                router.remove_source(source),
                Err(RouterError::InvalidSource { .. })
            ));
        }
    }

    #[test]
    fn second_policy_is_refused() {
        let (rig, mut router) = helpers::rig();

        assert!(matches!(
            audio_router::SingleEntity::init(&mut router),
            Err(RouterError::HandlersAlreadyConfigured)
        ));
        helpers::route(&rig, &mut router, A1);
        assert_eq!(router.source_state(A1), RouterState::Connected);
    }

    #[test]
    fn router_without_policy_refuses_requests() {
        let (rig, _) = helpers::rig();
        let collaborators = Collaborators {
            focus: rig.focus.clone(),
            adapter: rig.adapter.clone(),
            feature_manager: rig.feature_manager.clone(),
            devices: rig.devices.clone(),
        };
        let mut router = AudioRouter::new(
            RouterConfig::default(),
            AudioSources::new(AudioSource::COUNT),
            VoiceSources::new(VoiceSource::COUNT),
            collaborators,
        );

        assert!(matches!(
            router.add_source(A1),
            Err(RouterError::HandlersNotConfigured)
        ));
        assert!(matches!(
            router.update(),
            Err(RouterError::HandlersNotConfigured)
        ));
        assert!(matches!(
            router.is_device_in_use(DeviceId(1)),
            Err(RouterError::HandlersNotConfigured)
        ));
    }
}

// ============================================================================
// Handover
// ============================================================================

mod handover_tests {
    use super::*;

    #[test]
    fn routing_state_moves_to_new_primary() {
        let (_rig, old_primary) = helpers::a1_interrupted_by_v1();
        let (_other, mut new_primary) = helpers::rig();

        let bytes = old_primary.marshal().unwrap();
        new_primary.unmarshal(&bytes).unwrap();
        new_primary.commit(true, AudioSource::A2DP_1, VoiceSource::NONE);

        assert_eq!(new_primary.data(), old_primary.data());
        assert_eq!(new_primary.source_state(A1), RouterState::Interrupted);
        assert_eq!(new_primary.source_state(V1), RouterState::Connected);
    }

    #[test]
    fn mismatched_handover_leaves_store_usable() {
        let (rig, mut router) = helpers::rig();
        let capacity = router.data().capacity();

        let result = router.unmarshal(br#"{"records":[],"last_routed_audio_source":0}"#);
        assert!(matches!(
            result,
            Err(RouterError::HandoverCapacity { received: 0, .. })
        ));
        assert_eq!(router.data().capacity(), capacity);

        helpers::route(&rig, &mut router, A2);
        assert_eq!(router.source_state(A2), RouterState::Connected);
    }

    #[test]
    fn secondary_keeps_only_mirrored_sources() {
        let (_rig, old_primary) = helpers::a1_interrupted_by_v1();
        let (_other, mut secondary) = helpers::rig();

        secondary.unmarshal(&old_primary.marshal().unwrap()).unwrap();
        secondary.commit(false, AudioSource::NONE, VoiceSource::HFP_1);

        assert_eq!(secondary.source_state(A1), RouterState::Invalid);
        assert_eq!(secondary.source_state(V1), RouterState::Connected);
        assert_eq!(secondary.last_routed_audio_source(), AudioSource::NONE);
    }
}

// ============================================================================
// Actor
// ============================================================================

mod actor_tests {
    use super::*;
    use audio_router::{run_router_actor, RouterActorCommand};
    use tokio::sync::{mpsc, oneshot};

    async fn collect_until_idle(event_rx: &mut mpsc::Receiver<RouterEvent>) -> Vec<RouterEvent> {
        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn query(cmd_tx: &mpsc::Sender<RouterActorCommand>, source: GenericSource) -> RouterState {
        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(RouterActorCommand::QuerySourceState { source, response })
            .await
            .unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn actor_routes_and_forwards_events() {
        let (rig, router) = helpers::rig();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = mpsc::channel(256);
        let handle = tokio::spawn(run_router_actor(router, cmd_rx, event_tx));

        rig.focus.set(Some(A1));
        cmd_tx
            .send(RouterActorCommand::AddSource { source: A1 })
            .await
            .unwrap();
        assert_eq!(query(&cmd_tx, A1).await, RouterState::Connected);

        let events = collect_until_idle(&mut event_rx).await;
        assert_eq!(events.first(), Some(&RouterEvent::SourceAdded(A1)));
        assert!(events.contains(&RouterEvent::RoutingChanged {
            source: A1,
            routed: true
        }));

        cmd_tx.send(RouterActorCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn actor_completes_preparing_source_on_ready() {
        let (rig, router) = helpers::rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .script_statuses([SourceStatus::Preparing]);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = mpsc::channel(256);
        let handle = tokio::spawn(run_router_actor(router, cmd_rx, event_tx));

        rig.focus.set(Some(A1));
        cmd_tx
            .send(RouterActorCommand::AddSource { source: A1 })
            .await
            .unwrap();
        assert_eq!(query(&cmd_tx, A1).await, RouterState::Connecting);

        cmd_tx
            .send(RouterActorCommand::SourceReady { source: A1 })
            .await
            .unwrap();
        assert_eq!(query(&cmd_tx, A1).await, RouterState::Connected);

        cmd_tx.send(RouterActorCommand::Shutdown).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn actor_answers_remove_and_device_queries() {
        let (rig, router) = helpers::rig();
        rig.devices.insert(DeviceId(1), AudioSource::A2DP_1);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, _event_rx) = mpsc::channel(256);
        let handle = tokio::spawn(run_router_actor(router, cmd_rx, event_tx));

        rig.focus.set(Some(A1));
        cmd_tx
            .send(RouterActorCommand::AddSource { source: A1 })
            .await
            .unwrap();

        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(RouterActorCommand::IsDeviceInUse {
                device: DeviceId(1),
                response,
            })
            .await
            .unwrap();
        assert!(rx.await.unwrap());

        let (response, rx) = oneshot::channel();
        cmd_tx
            .send(RouterActorCommand::RemoveSource { source: A1, response })
            .await
            .unwrap();
        assert!(rx.await.unwrap());
        assert_eq!(query(&cmd_tx, A1).await, RouterState::Invalid);

        drop(cmd_tx);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn actor_stops_on_contract_violation() {
        let (rig, router) = helpers::rig();
        rig.audio(AudioSource::A2DP_1)
            .unwrap()
            .script_statuses([SourceStatus::Error]);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, mut event_rx) = mpsc::channel(256);
        let handle = tokio::spawn(run_router_actor(router, cmd_rx, event_tx));

        rig.focus.set(Some(A1));
        cmd_tx
            .send(RouterActorCommand::AddSource { source: A1 })
            .await
            .unwrap();
        handle.await.unwrap();

        let events = collect_until_idle(&mut event_rx).await;
        assert!(matches!(
            events.last(),
            Some(RouterEvent::ContractViolation { .. })
        ));
        assert!(cmd_tx.send(RouterActorCommand::Update).await.is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Add(GenericSource),
        Remove(GenericSource),
        Focus(Option<GenericSource>),
        Play(AudioSource),
        Pause(AudioSource),
        Call(VoiceContext),
        Update,
    }

    fn source() -> impl Strategy<Value = GenericSource> {
        prop_oneof![Just(A1), Just(A2), Just(V1)]
    }

    fn audio() -> impl Strategy<Value = AudioSource> {
        prop_oneof![Just(AudioSource::A2DP_1), Just(AudioSource::A2DP_2)]
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            source().prop_map(Op::Add),
            source().prop_map(Op::Remove),
            prop::option::of(source()).prop_map(Op::Focus),
            audio().prop_map(Op::Play),
            audio().prop_map(Op::Pause),
            prop_oneof![
                Just(VoiceContext::Connected),
                Just(VoiceContext::RingingIncoming),
                Just(VoiceContext::InCall),
            ]
            .prop_map(Op::Call),
            Just(Op::Update),
        ]
    }

    fn apply(rig: &SimRig, router: &mut AudioRouter, op: &Op) -> Result<(), RouterError> {
        match op {
            Op::Add(source) => router.add_source(*source),
            Op::Remove(source) => router.remove_source(*source).map(|_| ()),
            Op::Focus(source) => {
                rig.focus.set(*source);
                Ok(())
            }
            Op::Play(audio) => {
                if let Some(producer) = rig.audio(*audio) {
                    producer.set_context(AudioContext::IsPlaying);
                }
                Ok(())
            }
            Op::Pause(audio) => {
                if let Some(producer) = rig.audio(*audio) {
                    producer.set_context(AudioContext::IsPaused);
                }
                Ok(())
            }
            Op::Call(context) => {
                if let Some(producer) = rig.voice(VoiceSource::HFP_1) {
                    producer.set_context(*context);
                }
                Ok(())
            }
            Op::Update => router.update(),
        }
    }

    proptest! {
        #[test]
        fn at_most_one_source_holds_the_chain(ops in prop::collection::vec(op(), 1..40)) {
            let (rig, mut router) = helpers::rig();

            for op in &ops {
                prop_assert!(apply(&rig, &mut router, op).is_ok(), "{:?} failed", op);
                prop_assert!(helpers::active_count(&router) <= 1);
                prop_assert!(rig.adapter.connected().len() <= 1);
            }
            prop_assert!(rig.adapter.peak_connected() <= 1);
        }

        #[test]
        fn records_never_duplicate_a_source(ops in prop::collection::vec(op(), 1..40)) {
            let (rig, mut router) = helpers::rig();

            for op in &ops {
                let _ = apply(&rig, &mut router, op);
                for source in [A1, A2, V1] {
                    prop_assert!(router.data().count_tracked(source) <= 1);
                }
            }
        }
    }
}
