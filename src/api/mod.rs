//! Stateless endpoint wrappers for the third-party providers. Each
//! function performs exactly one HTTP exchange and returns the provider's
//! payload; caching, fallbacks and reshaping live in `service`.

pub mod ai_api;
pub mod fonts_api;
pub mod weather_api;

use crate::config::Config;
use crate::error::{CodeMasterError, IsRetryable, Result};
use backon::{ExponentialBuilder, Retryable};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const USER_AGENT: &str = concat!("codemaster/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client honoring the configured proxy.
pub fn build_http_client(cfg: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30));
    if let Some(proxy_url) = cfg.proxy.as_ref() {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }
    Ok(builder.build()?)
}

pub fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// Run `call` with network-aware retries; `what` names the call in logs.
pub async fn with_retry<T, F, Fut>(what: &str, retry_policy: ExponentialBuilder, call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    call.retry(retry_policy)
        .when(|e: &CodeMasterError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!("{} retrying after error {}, sleeping {:?}", what, err, dur);
        })
        .await
}

/// Turn a provider response into `T`, mapping non-success statuses onto
/// the error taxonomy.
pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(CodeMasterError::from_status(status, body));
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| CodeMasterError::InvalidResponse(e.to_string()))
}
