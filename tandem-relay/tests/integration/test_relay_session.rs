use std::sync::Arc;
use std::time::Duration;

use tandem_core::{ConnectionState, RoomId};
use tandem_peer::{
    OpenedSession, RoleLedger, RtcTransport, SessionConfig, SessionSetup, SyntheticSource,
    TransportConfig, open_session, transport_events,
};
use tandem_relay::RelayChannel;

use crate::integration::init_tracing;
use crate::utils::TestRelay;

async fn open_over_relay(
    channel: &RelayChannel,
    ledger: &RoleLedger,
    room: &RoomId,
) -> OpenedSession {
    let mut setup = SessionSetup::new(room.clone(), ledger.claim(room));
    setup.config = SessionConfig {
        offer_resend_interval_ms: Some(100),
        ..SessionConfig::default()
    };

    let (tx, rx) = transport_events(&setup.config);
    let transport = RtcTransport::new(TransportConfig::local_only(), tx)
        .await
        .expect("Failed to create RTC transport");

    open_session(setup, &SyntheticSource::default(), channel, Arc::new(transport), rx)
        .await
        .expect("Failed to open session")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sessions_connect_through_relay() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let channel = relay.channel();
    let ledger = RoleLedger::new();
    let room = RoomId::new();

    let alice = open_over_relay(&channel, &ledger, &room).await;
    let bob = open_over_relay(&channel, &ledger, &room).await;

    for session in [&alice, &bob] {
        let state = session
            .handle
            .wait_for_state(ConnectionState::Connected, Duration::from_secs(15))
            .await;
        assert_eq!(state, Some(ConnectionState::Connected));
    }

    alice.handle.dispose();
    bob.handle.dispose();
    relay
        .wait_for_peers(&room, 0)
        .await
        .expect("Sessions did not leave the relay");
}
