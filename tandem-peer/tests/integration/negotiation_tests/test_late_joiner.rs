use std::time::Duration;

use tandem_core::{ConnectionState, Role, RoomId, SignalMessage};
use tandem_peer::{LocalBus, NegotiatorEvent, SessionConfig};

use crate::integration::init_tracing;
use crate::utils::{
    REMOTE_OFFER_SDP, connection_timeout, fast_config, manual_negotiator, observer, offer_json,
    open_peer, wait_for_signal,
};

#[tokio::test]
async fn test_joiner_after_offer_still_connects() {
    init_tracing();

    let bus = LocalBus::new();
    let room = RoomId::from("late");

    let alice = open_peer(&bus, &room, Role::Initiator, "alice", fast_config())
        .await
        .expect("Failed to open alice");

    // The first offer goes out to an empty room and is lost.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let bob = open_peer(&bus, &room, Role::Joiner, "bob", fast_config())
        .await
        .expect("Failed to open bob");

    for peer in [&alice, &bob] {
        let state = peer
            .handle()
            .wait_for_state(ConnectionState::Connected, connection_timeout())
            .await;
        assert_eq!(state, Some(ConnectionState::Connected));
    }
}

#[tokio::test]
async fn test_offer_published_once_without_resend() {
    init_tracing();

    let bus = LocalBus::new();
    let room = RoomId::from("once");
    let mut remote = observer(&bus, &room).await.expect("Failed to subscribe");

    let config = SessionConfig {
        offer_resend_interval_ms: None,
        ..SessionConfig::default()
    };
    let _alice = open_peer(&bus, &room, Role::Initiator, "alice", config)
        .await
        .expect("Failed to open alice");

    wait_for_signal(&mut remote, "offer")
        .await
        .expect("First offer missing");

    let again = wait_for_signal(&mut remote, "offer").await;
    assert!(again.is_err(), "offer must not be re-published");
}

#[tokio::test]
async fn test_repeated_offer_gets_same_answer() {
    init_tracing();

    let bus = LocalBus::new();
    let room = RoomId::from("repeat");
    let mut remote = observer(&bus, &room).await.expect("Failed to subscribe");
    let mut bob = manual_negotiator(&bus, &room, Role::Joiner)
        .await
        .expect("Failed to build joiner");

    bob.negotiator
        .dispatch(NegotiatorEvent::Inbound(offer_json(REMOTE_OFFER_SDP)))
        .await
        .expect("Offer rejected");
    let first = wait_for_signal(&mut remote, "answer")
        .await
        .expect("No answer");

    bob.negotiator
        .dispatch(NegotiatorEvent::Inbound(offer_json(REMOTE_OFFER_SDP)))
        .await
        .expect("Repeated offer rejected");
    let second = wait_for_signal(&mut remote, "answer")
        .await
        .expect("Answer not re-sent");

    assert_eq!(first, second);
    assert!(matches!(first, SignalMessage::Answer { .. }));
}
