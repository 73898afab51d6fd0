//! Protocol step machinery.
//!
//! The submission protocol is a fixed ordered sequence of request/response
//! exchanges. Each step is a `(request builder, response parser)` pair over
//! a mutable [`ProtocolContext`] that accumulates the session token, draft
//! id, and finally the issued document references. The pairs are plain `fn`
//! pointers collected in a [`DestinationProtocolConfig`]; per-destination
//! configs are resolved once at startup through [`DestinationRegistry`] —
//! no string-keyed dispatch happens inside protocol logic.
//!
//! Response parsers own all shape checking: a non-2xx status or a missing
//! field is a [`SubmitError::Protocol`] carrying the step and reason.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use arrivo_core::{DestinationId, TravelerPayload};

use crate::error::SubmitError;

/// The ordered steps of the submission protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStep {
    /// Acquire the session/action token. Attempt-scoped; never persisted.
    InitToken,
    /// Fetch selectable reference data (countries, locations).
    FetchReferenceData,
    /// Register a draft arrival-card entry from the payload.
    RegisterDraft,
    /// Verify health-declaration prerequisites for the draft.
    CheckHealthDeclaration,
    /// Advance the draft to the submittable stage.
    AdvanceDraft,
    /// Request a submission preview.
    RequestPreview,
    /// Submit the draft.
    Submit,
    /// Confirm the submission; yields the arrival-card number.
    ConfirmSubmission,
    /// Fetch the issued document (PDF/QR references).
    FetchDocument,
}

impl ProtocolStep {
    /// All steps in protocol order.
    pub const SEQUENCE: [ProtocolStep; 9] = [
        ProtocolStep::InitToken,
        ProtocolStep::FetchReferenceData,
        ProtocolStep::RegisterDraft,
        ProtocolStep::CheckHealthDeclaration,
        ProtocolStep::AdvanceDraft,
        ProtocolStep::RequestPreview,
        ProtocolStep::Submit,
        ProtocolStep::ConfirmSubmission,
        ProtocolStep::FetchDocument,
    ];

    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InitToken => "init_token",
            Self::FetchReferenceData => "fetch_reference_data",
            Self::RegisterDraft => "register_draft",
            Self::CheckHealthDeclaration => "check_health_declaration",
            Self::AdvanceDraft => "advance_draft",
            Self::RequestPreview => "request_preview",
            Self::Submit => "submit",
            Self::ConfirmSubmission => "confirm_submission",
            Self::FetchDocument => "fetch_document",
        }
    }
}

impl std::fmt::Display for ProtocolStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of a step request. The protocol only needs these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepMethod {
    Get,
    Post,
}

/// One step's wire request, transport-agnostic. The direct transport sends
/// it straight at the backend; the automated transport replays the same
/// envelope inside the browser bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRequest {
    pub method: StepMethod,
    /// Path relative to the backend base URL.
    pub path: String,
    /// JSON body. `Null` for GET requests.
    pub body: serde_json::Value,
}

/// One step's wire response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl StepResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Mutable per-attempt state threaded through the step sequence.
///
/// The action token lives only here; dropping the context at the end of an
/// attempt is what guarantees the token is never reused or persisted.
#[derive(Debug)]
pub struct ProtocolContext<'a> {
    /// The validated payload driving this attempt.
    pub payload: &'a TravelerPayload,
    /// Session/action token from [`ProtocolStep::InitToken`].
    pub action_token: Option<String>,
    /// Draft id from [`ProtocolStep::RegisterDraft`].
    pub draft_id: Option<String>,
    /// Preview reference from [`ProtocolStep::RequestPreview`].
    pub preview_ref: Option<String>,
    /// Submission reference from [`ProtocolStep::Submit`].
    pub submission_ref: Option<String>,
    /// Arrival-card number from [`ProtocolStep::ConfirmSubmission`].
    pub arr_card_no: Option<String>,
    /// Document location from [`ProtocolStep::FetchDocument`].
    pub document_location: Option<String>,
    /// QR location from [`ProtocolStep::FetchDocument`].
    pub qr_location: Option<String>,
}

impl<'a> ProtocolContext<'a> {
    /// Fresh context for one attempt.
    pub fn new(payload: &'a TravelerPayload) -> Self {
        Self {
            payload,
            action_token: None,
            draft_id: None,
            preview_ref: None,
            submission_ref: None,
            arr_card_no: None,
            document_location: None,
            qr_location: None,
        }
    }

    fn require(&self, field: Option<&str>, what: &str, step: ProtocolStep) -> Result<String, SubmitError> {
        field.map(str::to_owned).ok_or_else(|| SubmitError::Protocol {
            step,
            reason: format!("step order violation: {what} not yet acquired"),
        })
    }

    fn token(&self, step: ProtocolStep) -> Result<String, SubmitError> {
        self.require(self.action_token.as_deref(), "action token", step)
    }

    fn draft(&self, step: ProtocolStep) -> Result<String, SubmitError> {
        self.require(self.draft_id.as_deref(), "draft id", step)
    }
}

/// Request builder for one step.
pub type StepBuilder = fn(&ProtocolContext<'_>) -> Result<StepRequest, SubmitError>;
/// Response parser for one step. Applies extracted values to the context.
pub type StepParser = fn(&mut ProtocolContext<'_>, &StepResponse) -> Result<(), SubmitError>;

/// One step of a destination's protocol: which step it is, how to build its
/// request, and how to digest its response.
#[derive(Clone)]
pub struct StepSpec {
    pub step: ProtocolStep,
    pub build: StepBuilder,
    pub apply: StepParser,
}

impl std::fmt::Debug for StepSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepSpec").field("step", &self.step).finish()
    }
}

/// The full protocol configuration for one destination.
#[derive(Debug, Clone)]
pub struct DestinationProtocolConfig {
    pub destination_id: DestinationId,
    steps: Vec<StepSpec>,
}

impl DestinationProtocolConfig {
    /// Build a config from an explicit step list.
    ///
    /// The list must follow [`ProtocolStep::SEQUENCE`]; destinations may
    /// swap builders/parsers but not reorder or drop steps.
    pub fn new(destination_id: DestinationId, steps: Vec<StepSpec>) -> Result<Self, SubmitError> {
        let order: Vec<_> = steps.iter().map(|s| s.step).collect();
        if order != ProtocolStep::SEQUENCE {
            return Err(SubmitError::Protocol {
                step: *order.first().unwrap_or(&ProtocolStep::InitToken),
                reason: "destination step list does not follow the protocol sequence".into(),
            });
        }
        Ok(Self {
            destination_id,
            steps,
        })
    }

    /// The canonical step set shared by destinations that follow the
    /// standard arrival-card backend shape.
    pub fn standard(destination_id: DestinationId) -> Self {
        Self {
            destination_id,
            steps: standard_steps(),
        }
    }

    /// Steps in protocol order.
    pub fn steps(&self) -> &[StepSpec] {
        &self.steps
    }
}

/// Registry of per-destination protocol configs, resolved once at startup.
#[derive(Debug, Default)]
pub struct DestinationRegistry {
    configs: HashMap<DestinationId, Arc<DestinationProtocolConfig>>,
}

impl DestinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a destination's protocol config.
    pub fn register(&mut self, config: DestinationProtocolConfig) {
        self.configs
            .insert(config.destination_id, Arc::new(config));
    }

    /// Resolve the config for a destination.
    pub fn resolve(
        &self,
        destination_id: DestinationId,
    ) -> Result<Arc<DestinationProtocolConfig>, SubmitError> {
        self.configs
            .get(&destination_id)
            .cloned()
            .ok_or(SubmitError::UnconfiguredDestination(destination_id))
    }
}

// ── Standard step builders/parsers ───────────────────────────────────

fn standard_steps() -> Vec<StepSpec> {
    vec![
        StepSpec {
            step: ProtocolStep::InitToken,
            build: build_init_token,
            apply: apply_init_token,
        },
        StepSpec {
            step: ProtocolStep::FetchReferenceData,
            build: build_reference_data,
            apply: apply_reference_data,
        },
        StepSpec {
            step: ProtocolStep::RegisterDraft,
            build: build_register_draft,
            apply: apply_register_draft,
        },
        StepSpec {
            step: ProtocolStep::CheckHealthDeclaration,
            build: build_health_check,
            apply: apply_health_check,
        },
        StepSpec {
            step: ProtocolStep::AdvanceDraft,
            build: build_advance,
            apply: apply_advance,
        },
        StepSpec {
            step: ProtocolStep::RequestPreview,
            build: build_preview,
            apply: apply_preview,
        },
        StepSpec {
            step: ProtocolStep::Submit,
            build: build_submit,
            apply: apply_submit,
        },
        StepSpec {
            step: ProtocolStep::ConfirmSubmission,
            build: build_confirm,
            apply: apply_confirm,
        },
        StepSpec {
            step: ProtocolStep::FetchDocument,
            build: build_fetch_document,
            apply: apply_fetch_document,
        },
    ]
}

fn expect_success(step: ProtocolStep, resp: &StepResponse) -> Result<(), SubmitError> {
    if resp.is_success() {
        return Ok(());
    }
    Err(SubmitError::Protocol {
        step,
        reason: format!("backend returned status {}", resp.status),
    })
}

fn extract_str(
    step: ProtocolStep,
    body: &serde_json::Value,
    key: &str,
) -> Result<String, SubmitError> {
    body.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| SubmitError::Protocol {
            step,
            reason: format!("response missing '{key}'"),
        })
}

fn build_init_token(_ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/session/init-token".into(),
        body: serde_json::json!({}),
    })
}

fn apply_init_token(ctx: &mut ProtocolContext<'_>, resp: &StepResponse) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::InitToken, resp)?;
    ctx.action_token = Some(extract_str(
        ProtocolStep::InitToken,
        &resp.body,
        "actionToken",
    )?);
    Ok(())
}

fn build_reference_data(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::FetchReferenceData)?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/reference/selectable".into(),
        body: serde_json::json!({ "actionToken": token }),
    })
}

fn apply_reference_data(
    _ctx: &mut ProtocolContext<'_>,
    resp: &StepResponse,
) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::FetchReferenceData, resp)?;
    // The selectable lists themselves feed the (external) form layer; the
    // protocol only checks the response carries them.
    if !resp.body.get("countries").is_some_and(|v| v.is_array()) {
        return Err(SubmitError::Protocol {
            step: ProtocolStep::FetchReferenceData,
            reason: "response missing 'countries' list".into(),
        });
    }
    Ok(())
}

fn build_register_draft(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::RegisterDraft)?;
    let mut fields = serde_json::Map::new();
    for f in ctx.payload.fields() {
        fields.insert(f.name.clone(), serde_json::Value::String(f.value.clone()));
    }
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/arrival-card/register".into(),
        body: serde_json::json!({ "actionToken": token, "entry": fields }),
    })
}

fn apply_register_draft(
    ctx: &mut ProtocolContext<'_>,
    resp: &StepResponse,
) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::RegisterDraft, resp)?;
    ctx.draft_id = Some(extract_str(
        ProtocolStep::RegisterDraft,
        &resp.body,
        "draftId",
    )?);
    Ok(())
}

fn build_health_check(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::CheckHealthDeclaration)?;
    let draft = ctx.draft(ProtocolStep::CheckHealthDeclaration)?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/health-declaration/check".into(),
        body: serde_json::json!({ "actionToken": token, "draftId": draft }),
    })
}

fn apply_health_check(
    _ctx: &mut ProtocolContext<'_>,
    resp: &StepResponse,
) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::CheckHealthDeclaration, resp)?;
    match resp.body.get("eligible").and_then(|v| v.as_bool()) {
        Some(true) => Ok(()),
        Some(false) => Err(SubmitError::Protocol {
            step: ProtocolStep::CheckHealthDeclaration,
            reason: "health-declaration prerequisite not met".into(),
        }),
        None => Err(SubmitError::Protocol {
            step: ProtocolStep::CheckHealthDeclaration,
            reason: "response missing 'eligible'".into(),
        }),
    }
}

fn build_advance(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::AdvanceDraft)?;
    let draft = ctx.draft(ProtocolStep::AdvanceDraft)?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/arrival-card/advance".into(),
        body: serde_json::json!({ "actionToken": token, "draftId": draft }),
    })
}

fn apply_advance(_ctx: &mut ProtocolContext<'_>, resp: &StepResponse) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::AdvanceDraft, resp)
}

fn build_preview(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::RequestPreview)?;
    let draft = ctx.draft(ProtocolStep::RequestPreview)?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/arrival-card/preview".into(),
        body: serde_json::json!({ "actionToken": token, "draftId": draft }),
    })
}

fn apply_preview(ctx: &mut ProtocolContext<'_>, resp: &StepResponse) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::RequestPreview, resp)?;
    ctx.preview_ref = Some(extract_str(
        ProtocolStep::RequestPreview,
        &resp.body,
        "previewRef",
    )?);
    Ok(())
}

fn build_submit(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::Submit)?;
    let draft = ctx.draft(ProtocolStep::Submit)?;
    let preview = ctx.require(ctx.preview_ref.as_deref(), "preview ref", ProtocolStep::Submit)?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/arrival-card/submit".into(),
        body: serde_json::json!({
            "actionToken": token,
            "draftId": draft,
            "previewRef": preview,
        }),
    })
}

fn apply_submit(ctx: &mut ProtocolContext<'_>, resp: &StepResponse) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::Submit, resp)?;
    ctx.submission_ref = Some(extract_str(
        ProtocolStep::Submit,
        &resp.body,
        "submissionRef",
    )?);
    Ok(())
}

fn build_confirm(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::ConfirmSubmission)?;
    let submission = ctx.require(
        ctx.submission_ref.as_deref(),
        "submission ref",
        ProtocolStep::ConfirmSubmission,
    )?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/arrival-card/confirm".into(),
        body: serde_json::json!({ "actionToken": token, "submissionRef": submission }),
    })
}

fn apply_confirm(ctx: &mut ProtocolContext<'_>, resp: &StepResponse) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::ConfirmSubmission, resp)?;
    ctx.arr_card_no = Some(extract_str(
        ProtocolStep::ConfirmSubmission,
        &resp.body,
        "arrCardNo",
    )?);
    Ok(())
}

fn build_fetch_document(ctx: &ProtocolContext<'_>) -> Result<StepRequest, SubmitError> {
    let token = ctx.token(ProtocolStep::FetchDocument)?;
    let card = ctx.require(
        ctx.arr_card_no.as_deref(),
        "arrival-card number",
        ProtocolStep::FetchDocument,
    )?;
    Ok(StepRequest {
        method: StepMethod::Post,
        path: "api/v1/document/fetch".into(),
        body: serde_json::json!({ "actionToken": token, "arrCardNo": card }),
    })
}

fn apply_fetch_document(
    ctx: &mut ProtocolContext<'_>,
    resp: &StepResponse,
) -> Result<(), SubmitError> {
    expect_success(ProtocolStep::FetchDocument, resp)?;
    ctx.document_location = Some(extract_str(
        ProtocolStep::FetchDocument,
        &resp.body,
        "documentLocation",
    )?);
    ctx.qr_location = Some(extract_str(
        ProtocolStep::FetchDocument,
        &resp.body,
        "qrLocation",
    )?);
    Ok(())
}
