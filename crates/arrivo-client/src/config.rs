//! Protocol client configuration.
//!
//! Base URLs for the destination backend, the local browser-automation
//! bridge, and the capability-probe endpoint, plus the per-step and probe
//! timeouts. Defaults suit production; override via environment variables
//! or explicit construction for staging/testing.

use std::time::Duration;

use url::Url;

/// Configuration for the submission protocol client and transport selector.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the destination submission backend.
    pub backend_url: Url,
    /// Base URL of the local browser-automation bridge.
    pub bridge_url: Url,
    /// Endpoint probed by the transport selector. Must be cheap and
    /// known-reachable when direct calls work at all.
    pub probe_url: Url,
    /// Per-step timeout. Applies to each protocol step independently,
    /// never to the attempt as a whole.
    pub step_timeout_secs: u64,
    /// Capability-probe timeout, in milliseconds.
    pub probe_timeout_millis: u64,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ARRIVO_BACKEND_URL` (default: `https://arrival.immigration.example.gov`)
    /// - `ARRIVO_BRIDGE_URL` (default: `http://127.0.0.1:9515`)
    /// - `ARRIVO_PROBE_URL` (default: `{backend}/api/v1/health`)
    /// - `ARRIVO_STEP_TIMEOUT_SECS` (default: 30)
    /// - `ARRIVO_PROBE_TIMEOUT_MILLIS` (default: 2000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = env_url(
            "ARRIVO_BACKEND_URL",
            "https://arrival.immigration.example.gov",
        )?;
        let default_probe = backend_url
            .join("api/v1/health")
            .map_err(|e| ConfigError::InvalidUrl("ARRIVO_PROBE_URL".into(), e.to_string()))?;
        Ok(Self {
            probe_url: env_url("ARRIVO_PROBE_URL", default_probe.as_str())?,
            bridge_url: env_url("ARRIVO_BRIDGE_URL", "http://127.0.0.1:9515")?,
            backend_url,
            step_timeout_secs: env_u64("ARRIVO_STEP_TIMEOUT_SECS", 30),
            probe_timeout_millis: env_u64("ARRIVO_PROBE_TIMEOUT_MILLIS", 2000),
        })
    }

    /// Configuration pointing every URL at local mock servers (for tests).
    pub fn local_mock(backend: &str, bridge: &str) -> Result<Self, ConfigError> {
        let parse = |label: &str, raw: &str| {
            Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(label.to_string(), e.to_string()))
        };
        let backend_url = parse("backend", backend)?;
        let probe_url = backend_url
            .join("api/v1/health")
            .map_err(|e| ConfigError::InvalidUrl("probe".into(), e.to_string()))?;
        Ok(Self {
            backend_url,
            bridge_url: parse("bridge", bridge)?,
            probe_url,
            step_timeout_secs: 5,
            probe_timeout_millis: 500,
        })
    }

    /// Per-step timeout as a [`Duration`].
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Probe timeout as a [`Duration`].
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_millis)
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_u64(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
