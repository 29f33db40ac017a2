use bytes::Bytes;
use std::time::Duration;
use trickle_server::{
    ConnectionState, NegotiationError, PeerConnectionState, SdpKind, SessionDescription,
};

use crate::integration::init_tracing;
use crate::utils::{TransportCall, expect_description, spawn_answerer, spawn_offerer};

#[tokio::test]
async fn test_offer_answer_exchange() {
    init_tracing();

    let mut offerer = spawn_offerer(1, None).await.expect("offerer");
    let mut answerer = spawn_answerer(None).await.expect("answerer");

    assert_eq!(offerer.connection.state(), ConnectionState::LocalDescriptionSet);
    assert_eq!(answerer.connection.state(), ConnectionState::New);

    let offer = expect_description(&mut offerer.signals).await.expect("offer");
    assert_eq!(offer.kind, SdpKind::Offer);
    assert_eq!(offerer.connection.local_description(), Some(offer.clone()));

    answerer
        .connection
        .accept_remote_description(Bytes::from(offer.encode().unwrap()))
        .await
        .expect("answerer accepts offer");

    let answer = expect_description(&mut answerer.signals).await.expect("answer");
    assert_eq!(answer.kind, SdpKind::Answer);
    assert_eq!(
        answerer.connection.state(),
        ConnectionState::RemoteDescriptionSet
    );
    assert_eq!(answerer.connection.remote_description(), Some(offer));

    offerer
        .connection
        .accept_remote_description(Bytes::from(answer.encode().unwrap()))
        .await
        .expect("offerer accepts answer");
    assert_eq!(
        offerer.connection.state(),
        ConnectionState::RemoteDescriptionSet
    );

    assert_eq!(
        offerer.transport.calls(),
        vec![
            TransportCall::CreateOffer,
            TransportCall::SetLocal(SdpKind::Offer),
            TransportCall::SetRemote(SdpKind::Answer),
        ]
    );
    assert_eq!(
        answerer.transport.calls(),
        vec![
            TransportCall::SetRemote(SdpKind::Offer),
            TransportCall::CreateAnswer,
            TransportCall::SetLocal(SdpKind::Answer),
        ]
    );
}

#[tokio::test]
async fn test_second_answer_is_rejected_without_failing() {
    init_tracing();

    let mut offerer = spawn_offerer(1, None).await.expect("offerer");
    let _offer = expect_description(&mut offerer.signals).await.expect("offer");

    let answer = SessionDescription::answer("v=0\r\ns=first\r\n");
    let body = Bytes::from(answer.encode().unwrap());
    offerer
        .connection
        .accept_remote_description(body.clone())
        .await
        .expect("first answer");

    let err = offerer
        .connection
        .accept_remote_description(body)
        .await
        .unwrap_err();
    assert!(matches!(err, NegotiationError::DuplicateDescription(SdpKind::Answer)));
    assert_eq!(
        offerer.connection.state(),
        ConnectionState::RemoteDescriptionSet
    );
    assert_eq!(offerer.transport.calls().len(), 3);
}

#[tokio::test]
async fn test_connected_after_transport_reports_it() {
    init_tracing();

    let offerer = spawn_offerer(1, None).await.expect("offerer");
    let answer = SessionDescription::answer("v=0\r\n");
    offerer
        .connection
        .accept_remote_description(Bytes::from(answer.encode().unwrap()))
        .await
        .unwrap();

    offerer.transport.report_state(PeerConnectionState::Connecting).await;
    assert!(
        offerer
            .connection
            .wait_for_state(ConnectionState::Negotiating, Duration::from_secs(5))
            .await
    );

    offerer.transport.report_state(PeerConnectionState::Connected).await;
    assert!(
        offerer
            .connection
            .wait_for_state(ConnectionState::Connected, Duration::from_secs(5))
            .await
    );

    offerer.transport.report_state(PeerConnectionState::Disconnected).await;
    assert!(
        offerer
            .connection
            .wait_for_state(ConnectionState::Disconnected, Duration::from_secs(5))
            .await
    );

    offerer.transport.report_state(PeerConnectionState::Connected).await;
    assert!(
        offerer
            .connection
            .wait_for_state(ConnectionState::Connected, Duration::from_secs(5))
            .await
    );
}
