//! Contract tests for the submission protocol client against a simulated
//! destination backend.
//!
//! wiremock stands in for the government backend; every path and response
//! shape matches the standard destination protocol config. Call-count
//! expectations double as assertions that validation failures and
//! cancellations produce zero network traffic and that every attempt
//! acquires a fresh action token.

use std::sync::Arc;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arrivo_client::{
    AttemptOutcome, CancellationToken, ClientConfig, DestinationProtocolConfig,
    DestinationRegistry, DirectTransport, ProtocolStep, SubmissionProtocolClient, SubmitError,
    Transport, TransportKind,
};
use arrivo_core::{DataCategory, DestinationId, TravelerPayload, UserId, ValidationError};

fn payload(destination: DestinationId) -> TravelerPayload {
    TravelerPayload::new(UserId::new(), destination)
        .with_field(DataCategory::Identity, "fullName", "MARTA KOVACS")
        .with_field(DataCategory::Identity, "passportNo", "K1234567")
        .with_field(DataCategory::Identity, "nationality", "HUN")
        .with_field(DataCategory::Itinerary, "arrivalDate", "2026-03-01")
        .with_field(DataCategory::Itinerary, "departureCountry", "HUN")
        .with_field(
            DataCategory::Accommodation,
            "accommodationAddress",
            "12 Sukhumvit Rd, Bangkok",
        )
        .with_field(DataCategory::Funds, "declaredAmount", "2000")
}

fn client_for(server: &MockServer, destination: DestinationId) -> SubmissionProtocolClient {
    let config = ClientConfig::local_mock(&server.uri(), "http://127.0.0.1:9").unwrap();
    let mut registry = DestinationRegistry::new();
    registry.register(DestinationProtocolConfig::standard(destination));
    SubmissionProtocolClient::new(config, registry)
}

fn direct(server: &MockServer) -> Arc<dyn Transport> {
    let config = ClientConfig::local_mock(&server.uri(), "http://127.0.0.1:9").unwrap();
    Arc::new(DirectTransport::new(
        reqwest::Client::new(),
        config.backend_url,
    ))
}

/// Mount the full nine-step happy path. `expected_attempts` feeds the
/// per-endpoint call-count expectation.
async fn mount_happy_backend(server: &MockServer, expected_attempts: u64) {
    let routes: &[(&str, serde_json::Value)] = &[
        (
            "/api/v1/session/init-token",
            serde_json::json!({ "actionToken": "tok-4821" }),
        ),
        (
            "/api/v1/reference/selectable",
            serde_json::json!({ "countries": ["HUN", "THA"], "locations": ["BKK"] }),
        ),
        (
            "/api/v1/arrival-card/register",
            serde_json::json!({ "draftId": "draft-77" }),
        ),
        (
            "/api/v1/health-declaration/check",
            serde_json::json!({ "eligible": true }),
        ),
        (
            "/api/v1/arrival-card/advance",
            serde_json::json!({ "stage": "READY_TO_PREVIEW" }),
        ),
        (
            "/api/v1/arrival-card/preview",
            serde_json::json!({ "previewRef": "prev-19" }),
        ),
        (
            "/api/v1/arrival-card/submit",
            serde_json::json!({ "submissionRef": "sub-3" }),
        ),
        (
            "/api/v1/arrival-card/confirm",
            serde_json::json!({ "arrCardNo": "387778D" }),
        ),
        (
            "/api/v1/document/fetch",
            serde_json::json!({
                "documentLocation": "https://docs.example.gov/387778D.pdf",
                "qrLocation": "https://docs.example.gov/387778D.qr.png",
            }),
        ),
    ];
    for (route, body) in routes {
        Mock::given(method("POST"))
            .and(path(*route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_attempts)
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn happy_path_runs_all_nine_steps_and_returns_the_document() {
    let server = MockServer::start().await;
    mount_happy_backend(&server, 1).await;

    let destination = DestinationId::new();
    let client = client_for(&server, destination);

    let attempt = client
        .submit(&payload(destination), direct(&server), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(attempt.outcome, AttemptOutcome::Success);
    assert_eq!(attempt.transport_used, TransportKind::Direct);
    assert_eq!(attempt.step_timings.len(), 9);
    assert_eq!(
        attempt.step_timings.first().map(|t| t.step),
        Some(ProtocolStep::InitToken)
    );
    let document = attempt.document.unwrap();
    assert_eq!(document.arr_card_no.as_str(), "387778D");
    assert!(document.document_location.ends_with(".pdf"));
}

#[tokio::test]
async fn missing_arrival_date_fails_with_zero_network_steps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/session/init-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let destination = DestinationId::new();
    let client = client_for(&server, destination);
    let mut incomplete = payload(destination);
    incomplete.set_field(DataCategory::Itinerary, "arrivalDate", "");

    let err = client
        .submit(&incomplete, direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.error,
        SubmitError::Validation(ValidationError::MissingField("arrivalDate"))
    ));
    // The protocol run never started; there is no record of one.
    assert!(err.attempt.is_none());
}

#[tokio::test]
async fn step_timeout_fails_that_step_and_aborts_the_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/session/init-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "actionToken": "tok-4821" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/reference/selectable"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "countries": [] }))
                .set_delay(std::time::Duration::from_millis(1500)),
        )
        .mount(&server)
        .await;

    let destination = DestinationId::new();
    let mut config = ClientConfig::local_mock(&server.uri(), "http://127.0.0.1:9").unwrap();
    config.step_timeout_secs = 1;
    let mut registry = DestinationRegistry::new();
    registry.register(DestinationProtocolConfig::standard(destination));
    let client = SubmissionProtocolClient::new(config, registry);

    let err = client
        .submit(&payload(destination), direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.error,
        SubmitError::Timeout {
            step: ProtocolStep::FetchReferenceData
        }
    ));
    // The terminal record keeps the timings of the steps that completed.
    let attempt = err.attempt.unwrap();
    assert_eq!(attempt.outcome, AttemptOutcome::Failed);
    assert_eq!(attempt.step_timings.len(), 1);
    assert_eq!(attempt.step_timings[0].step, ProtocolStep::InitToken);
    assert!(attempt.document.is_none());
    assert!(!attempt.is_success());
}

#[tokio::test]
async fn challenge_response_surfaces_as_challenge_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/session/init-token"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "challenge": { "type": "interactive", "sitekey": "abc" }
        })))
        .mount(&server)
        .await;

    let destination = DestinationId::new();
    let client = client_for(&server, destination);

    let err = client
        .submit(&payload(destination), direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.error,
        SubmitError::Challenge {
            step: ProtocolStep::InitToken
        }
    ));
    assert!(err.error.wants_transport_switch());
    assert_eq!(err.attempt.unwrap().outcome, AttemptOutcome::Failed);
}

#[tokio::test]
async fn unexpected_response_shape_is_a_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/session/init-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "sessionId": "nope" })),
        )
        .mount(&server)
        .await;

    let destination = DestinationId::new();
    let client = client_for(&server, destination);

    let err = client
        .submit(&payload(destination), direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    match err.error {
        SubmitError::Protocol { step, reason } => {
            assert_eq!(step, ProtocolStep::InitToken);
            assert!(reason.contains("actionToken"));
        }
        other => panic!("expected Protocol error, got: {other:?}"),
    }
}

#[tokio::test]
async fn pre_cancelled_attempt_executes_no_steps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/session/init-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let destination = DestinationId::new();
    let client = client_for(&server, destination);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client
        .submit(&payload(destination), direct(&server), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err.error,
        SubmitError::Cancelled {
            next_step: ProtocolStep::InitToken
        }
    ));
    // Cancellation still leaves a terminal record, with no document and
    // no timings because no step ran.
    let attempt = err.attempt.unwrap();
    assert_eq!(attempt.outcome, AttemptOutcome::Cancelled);
    assert!(attempt.step_timings.is_empty());
    assert!(attempt.document.is_none());
}

#[tokio::test]
async fn second_concurrent_submit_for_same_entry_is_rejected() {
    let server = MockServer::start().await;
    // Slow down the first step enough for the second call to land while
    // the first attempt is still in flight.
    Mock::given(method("POST"))
        .and(path("/api/v1/session/init-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "actionToken": "tok-4821" }))
                .set_delay(std::time::Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    // Attempts that get past the guard fail at step 2.
    Mock::given(method("POST"))
        .and(path("/api/v1/reference/selectable"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let destination = DestinationId::new();
    let client = Arc::new(client_for(&server, destination));
    let payload = payload(destination);

    let first = {
        let client = Arc::clone(&client);
        let payload = payload.clone();
        let transport = direct(&server);
        tokio::spawn(async move {
            client
                .submit(&payload, transport, &CancellationToken::new())
                .await
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let second = client
        .submit(&payload, direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(second.error, SubmitError::Conflict { .. }));
    assert!(second.attempt.is_none());

    // The first attempt still runs to its own (failed) conclusion.
    let first = first.await.unwrap().unwrap_err();
    assert!(matches!(first.error, SubmitError::Protocol { .. }));

    // The slot frees up once the first attempt is done: the retry gets
    // past the guard and fails at step 2 like the first one did.
    let retry = client
        .submit(&payload, direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(retry.error, SubmitError::Protocol { .. }));
}

#[tokio::test]
async fn every_attempt_acquires_a_fresh_action_token() {
    let server = MockServer::start().await;
    mount_happy_backend(&server, 2).await;

    let destination = DestinationId::new();
    let client = client_for(&server, destination);
    let payload = payload(destination);

    for _ in 0..2 {
        client
            .submit(&payload, direct(&server), &CancellationToken::new())
            .await
            .unwrap();
    }
    // mount_happy_backend's expect(2) on init-token verifies on drop.
}

#[tokio::test]
async fn unconfigured_destination_is_rejected_before_any_network() {
    let server = MockServer::start().await;
    let client = SubmissionProtocolClient::new(
        ClientConfig::local_mock(&server.uri(), "http://127.0.0.1:9").unwrap(),
        DestinationRegistry::new(),
    );
    let destination = DestinationId::new();

    let err = client
        .submit(&payload(destination), direct(&server), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err.error, SubmitError::UnconfiguredDestination(d) if d == destination));
    assert!(err.attempt.is_none());
}
