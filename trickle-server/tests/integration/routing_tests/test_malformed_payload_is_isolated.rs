use reqwest::StatusCode;
use trickle_server::{ConnectionEvent, ConnectionState, SessionDescription};

use crate::integration::init_tracing;
use crate::utils::{
    answerer_service, candidate, expect_description, next_event, offerer_service,
    serve_on_loopback, spawn_answerer, spawn_offerer,
};

#[tokio::test]
async fn test_malformed_description_fails_only_its_connection() {
    init_tracing();

    let service = offerer_service();
    let mut first = spawn_offerer(1, Some(&service)).await.expect("offerer 1");
    let mut second = spawn_offerer(2, Some(&service)).await.expect("offerer 2");
    expect_description(&mut first.signals).await.unwrap();
    expect_description(&mut second.signals).await.unwrap();
    let mut first_events = first.connection.subscribe();

    let (addr, shutdown) = serve_on_loopback(&service).await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/sdp1"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(first.connection.state(), ConnectionState::Failed);
    next_event(&mut first_events, |e| matches!(e, ConnectionEvent::Failed { .. }))
        .await
        .unwrap();

    assert_eq!(
        second.connection.state(),
        ConnectionState::LocalDescriptionSet
    );

    // The listener and the other connection keep working.
    let answer = SessionDescription::answer("v=0\r\n");
    let response = client
        .post(format!("http://{addr}/sdp2"))
        .body(answer.encode().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        second.connection.state(),
        ConnectionState::RemoteDescriptionSet
    );

    // The failed connection no longer accepts anything.
    let response = client
        .post(format!("http://{addr}/candidate1"))
        .body(candidate(1).as_str().to_owned())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(first.connection.state(), ConnectionState::Failed);

    shutdown.cancel();
}

#[tokio::test]
async fn test_description_of_wrong_kind_is_malformed() {
    init_tracing();

    let service = answerer_service();
    let answerer = spawn_answerer(Some(&service)).await.expect("answerer");
    let (addr, shutdown) = serve_on_loopback(&service).await.unwrap();

    let answer = SessionDescription::answer("v=0\r\n");
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/sdp"))
        .body(answer.encode().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(answerer.connection.state(), ConnectionState::Failed);

    shutdown.cancel();
}

#[tokio::test]
async fn test_empty_candidate_is_malformed() {
    init_tracing();

    let service = answerer_service();
    let answerer = spawn_answerer(Some(&service)).await.expect("answerer");
    let (addr, shutdown) = serve_on_loopback(&service).await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/candidate"))
        .body("  \n")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(answerer.connection.state(), ConnectionState::Failed);
    assert!(answerer.transport.added_candidates().is_empty());

    shutdown.cancel();
}
