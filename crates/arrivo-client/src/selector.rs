//! Transport selection.
//!
//! A lightweight capability probe decides whether direct calls work in the
//! current runtime/network context. The probe runs once per process and the
//! result is cached; a failed probe selects the automated transport and
//! attaches a one-time advisory (not an error) so the caller can tell the
//! user a slower but more reliable path is in use. `reprobe()` clears the
//! cache for user-triggered "retry with the other mode".

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::transport::{AutomatedTransport, DirectTransport, Transport, TransportKind};

/// Advisory text attached the first time the selector falls back.
const FALLBACK_ADVISORY: &str =
    "Direct submission is unreachable from this network; using the browser-automation \
     path instead. Submissions will work but may take longer.";

/// The selector's answer: a ready-to-use transport plus an optional
/// one-time advisory.
#[derive(Clone)]
pub struct TransportChoice {
    pub transport: Arc<dyn Transport>,
    /// Present only on the first fallback selection of the process.
    pub advisory: Option<&'static str>,
}

impl TransportChoice {
    pub fn kind(&self) -> TransportKind {
        self.transport.kind()
    }
}

/// Probes once, caches, hands out transports.
pub struct TransportSelector {
    config: ClientConfig,
    http: reqwest::Client,
    cached: Mutex<Option<TransportKind>>,
    advisory_shown: Mutex<bool>,
}

impl TransportSelector {
    pub fn new(config: ClientConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            cached: Mutex::new(None),
            advisory_shown: Mutex::new(false),
        }
    }

    /// Select a transport, probing on first use.
    pub async fn select(&self) -> TransportChoice {
        let cached = *self.cached.lock();
        let kind = match cached {
            Some(kind) => kind,
            None => {
                let kind = self.probe().await;
                *self.cached.lock() = Some(kind);
                kind
            }
        };
        self.choice(kind)
    }

    /// Drop the cached result and probe again (user-triggered retry).
    pub async fn reprobe(&self) -> TransportChoice {
        *self.cached.lock() = None;
        self.select().await
    }

    async fn probe(&self) -> TransportKind {
        let send = self.http.get(self.config.probe_url.clone()).send();
        match tokio::time::timeout(self.config.probe_timeout(), send).await {
            Ok(Ok(resp)) if resp.status().is_success() => {
                tracing::debug!("capability probe succeeded; direct transport selected");
                TransportKind::Direct
            }
            Ok(Ok(resp)) => {
                tracing::info!(
                    status = resp.status().as_u16(),
                    "capability probe answered non-success; falling back to automated transport"
                );
                TransportKind::Automated
            }
            Ok(Err(e)) => {
                tracing::info!(error = %e, "capability probe failed; falling back to automated transport");
                TransportKind::Automated
            }
            Err(_) => {
                tracing::info!("capability probe timed out; falling back to automated transport");
                TransportKind::Automated
            }
        }
    }

    fn choice(&self, kind: TransportKind) -> TransportChoice {
        let transport: Arc<dyn Transport> = match kind {
            TransportKind::Direct => Arc::new(DirectTransport::new(
                self.http.clone(),
                self.config.backend_url.clone(),
            )),
            TransportKind::Automated => Arc::new(AutomatedTransport::new(
                self.http.clone(),
                self.config.bridge_url.clone(),
            )),
        };

        let advisory = if kind == TransportKind::Automated {
            let mut shown = self.advisory_shown.lock();
            if *shown {
                None
            } else {
                *shown = true;
                Some(FALLBACK_ADVISORY)
            }
        } else {
            None
        };

        TransportChoice { transport, advisory }
    }
}
