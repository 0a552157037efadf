use tandem_core::{ConnectionState, Role, RoomId};
use tandem_peer::{LocalBus, NegotiatorEvent};

use crate::integration::init_tracing;
use crate::utils::{
    ManualNegotiator, REMOTE_OFFER_SDP, connection_timeout, ice_json, manual_negotiator, observer,
    offer_json, wait_for_signal,
};

#[tokio::test]
async fn test_candidates_before_offer_are_queued_then_applied() {
    init_tracing();

    let bus = LocalBus::new();
    let room = RoomId::from("early-ice");
    let mut remote = observer(&bus, &room).await.expect("Failed to subscribe");

    let ManualNegotiator {
        mut negotiator,
        handle,
        transport,
        ..
    } = manual_negotiator(&bus, &room, Role::Joiner)
        .await
        .expect("Failed to build joiner");
    assert_eq!(negotiator.state(), ConnectionState::Negotiating);

    for n in 0..3 {
        let candidate = format!("candidate:remote {} udp 2130706431 10.0.0.2 6000{} typ host", n, n);
        negotiator
            .dispatch(NegotiatorEvent::Inbound(ice_json(&candidate)))
            .await
            .expect("Early candidate rejected");
    }

    assert_eq!(negotiator.pending_candidate_count(), 3);
    assert!(transport.applied_candidates().await.is_empty());

    negotiator
        .dispatch(NegotiatorEvent::Inbound(offer_json(REMOTE_OFFER_SDP)))
        .await
        .expect("Offer rejected");

    assert!(negotiator.has_remote_description());
    assert_eq!(negotiator.pending_candidate_count(), 0);
    assert_eq!(transport.applied_candidates().await.len(), 3);

    wait_for_signal(&mut remote, "answer")
        .await
        .expect("No answer published");

    // Hand the rest to the event loop: the buffered transport events connect the session.
    tokio::spawn(negotiator.run());

    let state = handle
        .wait_for_state(ConnectionState::Connected, connection_timeout())
        .await;
    assert_eq!(state, Some(ConnectionState::Connected));

    let stream = handle
        .wait_for_remote_tracks(1, connection_timeout())
        .await
        .expect("Remote stream never attached");
    assert_eq!(stream.stream_id, "remote");
    assert!(stream.contains("remote-video"));
}
