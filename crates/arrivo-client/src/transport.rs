//! The two protocol transports.
//!
//! Both expose the identical step interface: take a [`StepRequest`], return
//! a [`StepResponse`]. [`DirectTransport`] sends the request straight at
//! the destination backend. [`AutomatedTransport`] hands the same envelope
//! to a local browser-automation bridge, which replays it inside an
//! embedded browser session; the bridge satisfies anti-automation
//! challenges, so challenge markers never surface from that path.
//!
//! The protocol client holds an `Arc<dyn Transport>` and never branches on
//! the concrete kind.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::protocol::{StepMethod, StepRequest, StepResponse};

/// Which execution strategy a transport is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Plain HTTPS calls at the backend.
    Direct,
    /// Step replay through the browser-automation bridge.
    Automated,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Automated => f.write_str("automated"),
        }
    }
}

/// Transport-level failures, before any protocol interpretation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connectivity/DNS failure.
    #[error("network failure: {0}")]
    Network(String),

    /// The step exceeded its deadline.
    #[error("step deadline exceeded")]
    Timeout,

    /// The backend answered with an anti-automation challenge this
    /// transport cannot solve.
    #[error("anti-automation challenge")]
    Challenge,
}

/// One protocol step execution strategy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which strategy this is (recorded on the attempt, never branched on
    /// by the protocol client).
    fn kind(&self) -> TransportKind;

    /// Execute one step within `timeout`.
    async fn execute(
        &self,
        request: &StepRequest,
        timeout: Duration,
    ) -> Result<StepResponse, TransportError>;
}

async fn body_as_json(resp: reqwest::Response) -> serde_json::Value {
    // Backends occasionally answer challenges and errors with HTML; keep
    // the raw text available rather than failing the read.
    let text = resp.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
}

/// Direct-call transport: reqwest straight at the destination backend.
#[derive(Debug, Clone)]
pub struct DirectTransport {
    http: reqwest::Client,
    backend_url: Url,
}

impl DirectTransport {
    pub fn new(http: reqwest::Client, backend_url: Url) -> Self {
        Self { http, backend_url }
    }
}

#[async_trait]
impl Transport for DirectTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Direct
    }

    async fn execute(
        &self,
        request: &StepRequest,
        timeout: Duration,
    ) -> Result<StepResponse, TransportError> {
        let url = self
            .backend_url
            .join(&request.path)
            .map_err(|e| TransportError::Network(format!("bad step path: {e}")))?;

        let builder = match request.method {
            StepMethod::Get => self.http.get(url),
            StepMethod::Post => self.http.post(url).json(&request.body),
        };

        let resp = match tokio::time::timeout(timeout, builder.send()).await {
            Err(_) => return Err(TransportError::Timeout),
            Ok(Err(e)) if e.is_timeout() => return Err(TransportError::Timeout),
            Ok(Err(e)) => return Err(TransportError::Network(e.to_string())),
            Ok(Ok(resp)) => resp,
        };

        let status = resp.status().as_u16();
        let body = body_as_json(resp).await;

        // Challenge pages come back as 403 with a challenge marker. Only
        // the automation bridge can satisfy them.
        if status == 403 && body.get("challenge").is_some() {
            tracing::warn!(path = %request.path, "backend raised an anti-automation challenge");
            return Err(TransportError::Challenge);
        }

        Ok(StepResponse { status, body })
    }
}

/// Browser-automation transport: the same step envelopes, replayed through
/// a local bridge that drives an embedded browser session.
#[derive(Debug, Clone)]
pub struct AutomatedTransport {
    http: reqwest::Client,
    bridge_url: Url,
}

impl AutomatedTransport {
    pub fn new(http: reqwest::Client, bridge_url: Url) -> Self {
        Self { http, bridge_url }
    }
}

#[async_trait]
impl Transport for AutomatedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Automated
    }

    async fn execute(
        &self,
        request: &StepRequest,
        timeout: Duration,
    ) -> Result<StepResponse, TransportError> {
        let url = self
            .bridge_url
            .join("session/execute")
            .map_err(|e| TransportError::Network(format!("bad bridge url: {e}")))?;

        let send = self.http.post(url).json(request).send();
        let resp = match tokio::time::timeout(timeout, send).await {
            Err(_) => return Err(TransportError::Timeout),
            Ok(Err(e)) if e.is_timeout() => return Err(TransportError::Timeout),
            Ok(Err(e)) => return Err(TransportError::Network(e.to_string())),
            Ok(Ok(resp)) => resp,
        };

        if !resp.status().is_success() {
            return Err(TransportError::Network(format!(
                "automation bridge returned status {}",
                resp.status().as_u16()
            )));
        }

        resp.json::<StepResponse>()
            .await
            .map_err(|e| TransportError::Network(format!("bridge response unreadable: {e}")))
    }
}
