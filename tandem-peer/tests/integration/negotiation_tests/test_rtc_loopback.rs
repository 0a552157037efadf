use std::sync::Arc;
use std::time::Duration;

use tandem_core::{ConnectionState, MediaSample, MediaTrack, Role, RoomId, TrackKind};
use tandem_peer::{
    LocalBus, LocalStream, OpenedSession, PeerTransport, RtcTransport, SessionConfig,
    SessionSetup, SyntheticSource, TransportConfig, open_session, transport_events,
};

use crate::integration::init_tracing;
use crate::utils::fast_config;

/// Timeout for a real ICE/DTLS handshake over loopback.
const RTC_CONNECTION_TIMEOUT: Duration = Duration::from_secs(15);

async fn open_rtc_peer(bus: &LocalBus, room: &RoomId, role: Role) -> OpenedSession {
    let mut setup = SessionSetup::new(room.clone(), role);
    setup.config = fast_config();

    let (tx, rx) = transport_events(&setup.config);
    let transport = RtcTransport::new(TransportConfig::local_only(), tx)
        .await
        .expect("Failed to create RTC transport");

    open_session(setup, &SyntheticSource::default(), bus, Arc::new(transport), rx)
        .await
        .expect("Failed to open session")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rtc_peers_connect_over_loopback() {
    init_tracing();

    let bus = LocalBus::new();
    let room = RoomId::new();

    let alice = open_rtc_peer(&bus, &room, Role::Initiator).await;
    let bob = open_rtc_peer(&bus, &room, Role::Joiner).await;

    for session in [&alice, &bob] {
        let state = session
            .handle
            .wait_for_state(ConnectionState::Connected, RTC_CONNECTION_TIMEOUT)
            .await;
        assert_eq!(state, Some(ConnectionState::Connected));
    }

    alice.handle.dispose();
    bob.handle.dispose();
    alice.local_stream.stop();
    bob.local_stream.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sample_pump_stops_when_transport_closes() {
    init_tracing();

    let (tx, _rx) = transport_events(&SessionConfig::default());
    let transport = RtcTransport::new(TransportConfig::local_only(), tx)
        .await
        .expect("Failed to create RTC transport");

    let track = MediaTrack::new("pump-video", TrackKind::Video, "pump");
    let stream = LocalStream::new("pump", vec![track.clone()]);
    let producer = stream.producer();
    let sample = || MediaSample {
        track_id: track.id.clone(),
        data: vec![0u8; 32].into(),
        duration: Duration::from_millis(33),
    };

    transport
        .add_track(&track, &stream)
        .await
        .expect("Failed to add track");
    assert_eq!(producer.push(sample()), 1, "sample pump is not subscribed");

    transport.close().await.expect("Failed to close transport");

    let drained = tokio::time::timeout(Duration::from_secs(2), async {
        while producer.push(sample()) > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "sample pump kept running after close");
}
