//! Zero-shot provider seam.
//!
//! The provider is an external collaborator (typically an NLI model behind a
//! network boundary). The engine only needs two calls: a health probe and a
//! `classify(text, labels)` request. Every call is wrapped in a hard timeout;
//! any failure disables ML scoring for the rest of the session.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrediction {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroShotResponse {
    pub predictions: Vec<LabelPrediction>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderHealth {
    Healthy,
    Degraded(String),
    Unavailable(String),
}

#[async_trait]
pub trait ZeroShotProvider: Send + Sync {
    async fn health(&self) -> ProviderHealth {
        ProviderHealth::Healthy
    }

    async fn classify(&self, text: &str, labels: &[String]) -> Result<ZeroShotResponse>;
}

/// Session-level switch. Starts enabled when configured; the first provider
/// failure turns it off for good.
#[derive(Debug)]
pub(crate) struct MlSession {
    enabled: AtomicBool,
}

impl MlSession {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled: AtomicBool::new(enabled) }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn disable(&self, reason: &Error) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            tracing::info!(error = %reason, "zero-shot scoring disabled for this session");
        }
    }
}

/// Health probe plus classification, both under `timeout`.
pub(crate) async fn request(
    provider: &dyn ZeroShotProvider,
    text: &str,
    labels: &[String],
    timeout: Duration,
) -> Result<ZeroShotResponse> {
    let millis = timeout.as_millis() as u64;
    match tokio::time::timeout(timeout, provider.health()).await {
        Ok(ProviderHealth::Healthy) => {}
        Ok(ProviderHealth::Degraded(why) | ProviderHealth::Unavailable(why)) => {
            return Err(Error::ProviderUnhealthy(why));
        }
        Err(_) => return Err(Error::ProviderTimeout(millis)),
    }
    tokio::time::timeout(timeout, provider.classify(text, labels)).await.map_err(|_| Error::ProviderTimeout(millis))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl ZeroShotProvider for Slow {
        async fn classify(&self, _text: &str, _labels: &[String]) -> Result<ZeroShotResponse> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ZeroShotResponse { predictions: Vec::new(), model: "slow".into() })
        }
    }

    struct Sick;

    #[async_trait]
    impl ZeroShotProvider for Sick {
        async fn health(&self) -> ProviderHealth {
            ProviderHealth::Unavailable("warming up".into())
        }

        async fn classify(&self, _text: &str, _labels: &[String]) -> Result<ZeroShotResponse> {
            unreachable!("unhealthy providers are never asked to classify")
        }
    }

    #[tokio::test]
    async fn slow_providers_time_out() {
        let err = request(&Slow, "hi", &[], Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, Error::ProviderTimeout(20)));
    }

    #[tokio::test]
    async fn unhealthy_providers_are_not_called() {
        let err = request(&Sick, "hi", &[], Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, Error::ProviderUnhealthy(ref why) if why == "warming up"));
    }

    #[test]
    fn session_disables_once() {
        let session = MlSession::new(true);
        assert!(session.is_enabled());
        session.disable(&Error::Provider("boom".into()));
        session.disable(&Error::Provider("again".into()));
        assert!(!session.is_enabled());
    }
}
