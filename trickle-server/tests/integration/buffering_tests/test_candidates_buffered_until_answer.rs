use bytes::Bytes;
use std::time::Duration;
use trickle_server::{SdpKind, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{
    candidate, eventually, expect_candidate, expect_description, expect_silence, spawn_answerer,
    spawn_offerer,
};

#[tokio::test]
async fn test_offerer_buffers_candidates_until_answer() {
    init_tracing();

    let mut offerer = spawn_offerer(1, None).await.expect("offerer");
    let offer = expect_description(&mut offerer.signals).await.unwrap();
    assert_eq!(offer.kind, SdpKind::Offer);

    for n in 1..=3 {
        offerer.transport.gather(candidate(n)).await;
    }

    let connection = offerer.connection.clone();
    assert!(eventually(|| {
        let connection = connection.clone();
        async move { connection.pending_candidates().len() == 3 }
    })
    .await);
    expect_silence(&mut offerer.signals, Duration::from_millis(100)).await;

    let answer = SessionDescription::answer("v=0\r\ns=answer\r\n");
    offerer
        .connection
        .accept_remote_description(Bytes::from(answer.encode().unwrap()))
        .await
        .unwrap();

    for n in 1..=3 {
        assert_eq!(expect_candidate(&mut offerer.signals).await.unwrap(), candidate(n));
    }
    assert!(offerer.connection.pending_candidates().is_empty());

    // Gathered after the answer: sent straight away, never buffered.
    offerer.transport.gather(candidate(4)).await;
    assert_eq!(expect_candidate(&mut offerer.signals).await.unwrap(), candidate(4));
    assert!(offerer.connection.pending_candidates().is_empty());

    expect_silence(&mut offerer.signals, Duration::from_millis(100)).await;
    assert_eq!(offerer.signaling.candidates().await.len(), 4);
}

#[tokio::test]
async fn test_answerer_sends_candidates_immediately() {
    init_tracing();

    let mut answerer = spawn_answerer(None).await.expect("answerer");
    let offer = SessionDescription::offer("v=0\r\ns=offer\r\n");
    answerer
        .connection
        .accept_remote_description(Bytes::from(offer.encode().unwrap()))
        .await
        .unwrap();

    let answer = expect_description(&mut answerer.signals).await.unwrap();
    assert_eq!(answer.kind, SdpKind::Answer);

    answerer.transport.gather(candidate(7)).await;
    assert_eq!(expect_candidate(&mut answerer.signals).await.unwrap(), candidate(7));
    assert!(answerer.connection.pending_candidates().is_empty());
}
