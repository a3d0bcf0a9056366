//! Integration tests for the peer connection layer.
//!
//! Most scenarios run over in-memory duplex pipes via the generic
//! constructors; one end-to-end test exercises real TCP loopback.

use std::{num::NonZeroU32, time::Duration};

use saltline_core::{SessionConfig, SessionError};
use saltline_net::{
    CloseReason, FramedWriter, Listener, Peer, PeerConfig, PeerEvent, write_preamble,
};
use saltline_proto::SALT_SIZE;
use tokio::{sync::mpsc, time::timeout};

const PASSPHRASE: &str = "correct horse";

async fn next_event(rx: &mut mpsc::Receiver<PeerEvent>) -> PeerEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed unexpectedly")
}

async fn duplex_pair(
    config: PeerConfig,
) -> (Peer, mpsc::Receiver<PeerEvent>, Peer, mpsc::Receiver<PeerEvent>) {
    let (a_stream, b_stream) = tokio::io::duplex(64 * 1024);

    // The preamble fits the pipe buffer, so initiating first then
    // responding cannot deadlock.
    let (alice, alice_rx) = Peer::initiate_on(a_stream, PASSPHRASE, config.clone()).await.unwrap();
    let (bob, bob_rx) = Peer::respond_on(b_stream, PASSPHRASE, config).await.unwrap();

    (alice, alice_rx, bob, bob_rx)
}

#[tokio::test]
async fn message_flows_both_directions() {
    let (alice, mut alice_rx, bob, mut bob_rx) = duplex_pair(PeerConfig::default()).await;

    alice.send(b"hello bob").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(b"hello bob".to_vec()));

    bob.send(b"hello alice").await.unwrap();
    assert_eq!(next_event(&mut alice_rx).await, PeerEvent::Message(b"hello alice".to_vec()));
}

#[tokio::test]
async fn messages_arrive_in_order() {
    let config = PeerConfig {
        session: SessionConfig { rekey_after_messages: None },
        ..PeerConfig::default()
    };
    let (alice, _alice_rx, _bob, mut bob_rx) = duplex_pair(config).await;

    for i in 0u8..10 {
        alice.send(&[i; 3]).await.unwrap();
    }
    for i in 0u8..10 {
        assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(vec![i; 3]));
    }
}

#[tokio::test]
async fn empty_message_round_trips() {
    let (alice, _alice_rx, _bob, mut bob_rx) = duplex_pair(PeerConfig::default()).await;

    alice.send(b"").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(Vec::new()));
}

#[tokio::test]
async fn manual_rekey_keeps_traffic_flowing() {
    let (alice, mut alice_rx, bob, mut bob_rx) = duplex_pair(PeerConfig::default()).await;

    alice.rekey().await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Rekeyed);
    assert_eq!(alice.epoch_index(), 1);
    assert_eq!(bob.epoch_index(), 1);

    // Traffic under the new epoch flows both ways.
    alice.send(b"after rekey").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(b"after rekey".to_vec()));

    bob.send(b"ack").await.unwrap();
    assert_eq!(next_event(&mut alice_rx).await, PeerEvent::Message(b"ack".to_vec()));
}

#[tokio::test]
async fn automatic_rekey_at_threshold() {
    let config = PeerConfig {
        session: SessionConfig { rekey_after_messages: NonZeroU32::new(3) },
        ..PeerConfig::default()
    };
    let (alice, _alice_rx, bob, mut bob_rx) = duplex_pair(config).await;

    for _ in 0..3 {
        alice.send(b"counted").await.unwrap();
    }

    for _ in 0..3 {
        assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(b"counted".to_vec()));
    }
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Rekeyed);
    assert_eq!(bob.epoch_index(), 1);

    // The epochs stayed aligned across the automatic rotation.
    alice.send(b"next epoch").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(b"next epoch".to_vec()));
}

#[tokio::test]
async fn wrong_passphrase_surfaces_failed_messages() {
    let (a_stream, b_stream) = tokio::io::duplex(64 * 1024);
    let (alice, _alice_rx) =
        Peer::initiate_on(a_stream, PASSPHRASE, PeerConfig::default()).await.unwrap();
    let (_bob, mut bob_rx) =
        Peer::respond_on(b_stream, "incorrect horse", PeerConfig::default()).await.unwrap();

    alice.send(b"secret").await.unwrap();
    assert_eq!(
        next_event(&mut bob_rx).await,
        PeerEvent::MessageFailed(SessionError::Authentication)
    );
}

#[tokio::test]
async fn undecryptable_frame_does_not_end_the_session() {
    let (mut raw, ours) = tokio::io::duplex(64 * 1024);

    // Speak the wire protocol by hand: preamble, then a ciphertext frame
    // of garbage, then nothing else yet.
    let salt = [7u8; SALT_SIZE];
    write_preamble(&mut raw, &salt).await.unwrap();

    let (_peer, mut rx) = Peer::respond_on(ours, PASSPHRASE, PeerConfig::default()).await.unwrap();

    let mut writer = FramedWriter::new(raw);
    let mut garbage = vec![0u8]; // ciphertext kind
    garbage.extend_from_slice(&[0xddu8; 40]);
    writer.send(&garbage).await.unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        PeerEvent::MessageFailed(SessionError::Authentication)
    );
}

#[tokio::test]
async fn unknown_frame_kind_is_fatal() {
    let (mut raw, ours) = tokio::io::duplex(64 * 1024);

    let salt = [7u8; SALT_SIZE];
    write_preamble(&mut raw, &salt).await.unwrap();

    let (_peer, mut rx) = Peer::respond_on(ours, PASSPHRASE, PeerConfig::default()).await.unwrap();

    let mut writer = FramedWriter::new(raw);
    writer.send(&[9u8, 1, 2, 3]).await.unwrap();

    match next_event(&mut rx).await {
        PeerEvent::Closed(CloseReason::Protocol(err)) => assert!(err.is_fatal()),
        other => panic!("expected fatal close, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_rekey_is_fatal() {
    let (mut raw, ours) = tokio::io::duplex(64 * 1024);

    let salt = [7u8; SALT_SIZE];
    write_preamble(&mut raw, &salt).await.unwrap();

    let (_peer, mut rx) = Peer::respond_on(ours, PASSPHRASE, PeerConfig::default()).await.unwrap();

    // Rekey kind with a truncated body.
    let mut frame = vec![1u8];
    frame.extend_from_slice(b"__REKEY__");
    frame.extend_from_slice(&[0u8; 4]);

    let mut writer = FramedWriter::new(raw);
    writer.send(&frame).await.unwrap();

    match next_event(&mut rx).await {
        PeerEvent::Closed(CloseReason::Protocol(err)) => assert!(err.is_fatal()),
        other => panic!("expected fatal close, got {other:?}"),
    }
}

#[tokio::test]
async fn peer_drop_is_end_of_stream() {
    let (alice, _alice_rx, _bob, mut bob_rx) = duplex_pair(PeerConfig::default()).await;

    alice.close();
    drop(alice);

    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Closed(CloseReason::EndOfStream));
}

#[tokio::test]
async fn tcp_end_to_end() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accept = tokio::spawn(async move {
        listener.accept(PASSPHRASE, PeerConfig::default()).await.unwrap()
    });

    let (bob, mut bob_rx) =
        Peer::connect(addr, PASSPHRASE, PeerConfig::default()).await.unwrap();
    let (alice, mut alice_rx) = accept.await.unwrap();

    alice.send(b"over tcp").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(b"over tcp".to_vec()));

    // Rekey mid-conversation, then keep talking in both directions.
    bob.rekey().await.unwrap();
    assert_eq!(next_event(&mut alice_rx).await, PeerEvent::Rekeyed);

    bob.send(b"new epoch").await.unwrap();
    assert_eq!(next_event(&mut alice_rx).await, PeerEvent::Message(b"new epoch".to_vec()));

    alice.send(b"confirmed").await.unwrap();
    assert_eq!(next_event(&mut bob_rx).await, PeerEvent::Message(b"confirmed".to_vec()));
}
