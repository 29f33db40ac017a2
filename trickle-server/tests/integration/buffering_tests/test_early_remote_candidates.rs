use bytes::Bytes;
use trickle_server::{
    ConnectionState, EARLY_CANDIDATE_LIMIT, NegotiationError, SdpKind, SessionDescription,
};

use crate::integration::init_tracing;
use crate::utils::{TransportCall, candidate, spawn_answerer};

#[tokio::test]
async fn test_remote_candidate_before_offer_is_applied_after_it() {
    init_tracing();

    let answerer = spawn_answerer(None).await.expect("answerer");

    answerer
        .connection
        .accept_remote_candidate(Bytes::from(candidate(1).as_str().to_owned()))
        .await
        .expect("early candidate accepted");
    assert!(answerer.transport.added_candidates().is_empty());
    assert_eq!(answerer.connection.state(), ConnectionState::New);

    let offer = SessionDescription::offer("v=0\r\n");
    answerer
        .connection
        .accept_remote_description(Bytes::from(offer.encode().unwrap()))
        .await
        .unwrap();

    let calls = answerer.transport.calls();
    let set_remote = calls
        .iter()
        .position(|c| *c == TransportCall::SetRemote(SdpKind::Offer))
        .expect("remote description applied");
    let added = calls
        .iter()
        .position(|c| *c == TransportCall::AddCandidate(candidate(1)))
        .expect("early candidate applied");
    assert!(set_remote < added);

    answerer
        .connection
        .accept_remote_candidate(Bytes::from(candidate(2).as_str().to_owned()))
        .await
        .unwrap();
    assert_eq!(
        answerer.transport.added_candidates(),
        vec![candidate(1), candidate(2)]
    );
}

#[tokio::test]
async fn test_early_candidates_are_capped_until_offer() {
    init_tracing();

    let answerer = spawn_answerer(None).await.expect("answerer");

    for n in 0..EARLY_CANDIDATE_LIMIT as u32 {
        answerer
            .connection
            .accept_remote_candidate(Bytes::from(candidate(n + 1).as_str().to_owned()))
            .await
            .expect("held until the offer");
    }

    let overflow = answerer
        .connection
        .accept_remote_candidate(Bytes::from(candidate(999).as_str().to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(
        overflow,
        NegotiationError::TooManyEarlyCandidates(limit) if limit == EARLY_CANDIDATE_LIMIT
    ));
    assert_eq!(overflow.status_code().as_u16(), 409);
    assert_eq!(answerer.connection.state(), ConnectionState::New);

    let offer = SessionDescription::offer("v=0\r\n");
    answerer
        .connection
        .accept_remote_description(Bytes::from(offer.encode().unwrap()))
        .await
        .unwrap();

    let added = answerer.transport.added_candidates();
    assert_eq!(added.len(), EARLY_CANDIDATE_LIMIT);
    assert!(!added.contains(&candidate(999)));
}
