//! The automated transport replays the identical step envelopes through
//! the browser-automation bridge. wiremock stands in for the bridge: it
//! receives `POST /session/execute` with the step envelope and answers
//! with the backend's status/body pair.

use std::sync::Arc;

use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use arrivo_client::{
    AutomatedTransport, CancellationToken, ClientConfig, DestinationProtocolConfig,
    DestinationRegistry, SubmissionProtocolClient, Transport, TransportKind,
};
use arrivo_core::{DataCategory, DestinationId, TravelerPayload, UserId};

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
}

/// Mount a bridge answer for one replayed step, matched on the envelope's
/// `path` field.
async fn mount_bridge_step(bridge: &MockServer, step_path: &str, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/session/execute"))
        .and(body_partial_json(serde_json::json!({ "path": step_path })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "status": 200, "body": body })),
        )
        .mount(bridge)
        .await;
}

#[tokio::test]
async fn full_protocol_runs_through_the_bridge() {
    let bridge = MockServer::start().await;
    mount_bridge_step(
        &bridge,
        "api/v1/session/init-token",
        serde_json::json!({ "actionToken": "tok-99" }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/reference/selectable",
        serde_json::json!({ "countries": ["THA"], "locations": [] }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/arrival-card/register",
        serde_json::json!({ "draftId": "draft-5" }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/health-declaration/check",
        serde_json::json!({ "eligible": true }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/arrival-card/advance",
        serde_json::json!({}),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/arrival-card/preview",
        serde_json::json!({ "previewRef": "prev-2" }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/arrival-card/submit",
        serde_json::json!({ "submissionRef": "sub-8" }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/arrival-card/confirm",
        serde_json::json!({ "arrCardNo": "552301A" }),
    )
    .await;
    mount_bridge_step(
        &bridge,
        "api/v1/document/fetch",
        serde_json::json!({
            "documentLocation": "https://docs.example.gov/552301A.pdf",
            "qrLocation": "https://docs.example.gov/552301A.qr.png",
        }),
    )
    .await;

    let destination = DestinationId::new();
    let config = ClientConfig::local_mock("http://127.0.0.1:9", &bridge.uri()).unwrap();
    let mut registry = DestinationRegistry::new();
    registry.register(DestinationProtocolConfig::standard(destination));
    let client = SubmissionProtocolClient::new(config.clone(), registry);

    let transport: Arc<dyn Transport> = Arc::new(AutomatedTransport::new(
        reqwest::Client::new(),
        config.bridge_url,
    ));

    let attempt = client
        .submit(&payload(destination), transport, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(attempt.transport_used, TransportKind::Automated);
    let document = attempt.document.unwrap();
    assert_eq!(document.arr_card_no.as_str(), "552301A");
    assert_eq!(document.transport_used, TransportKind::Automated);
}
