//! Shared HTTP plumbing for the model providers.

use std::time::Duration;

use anyhow::{bail, Result};

/// Build a client whose every request is bounded by `timeout_secs`.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request once and decode a JSON body, turning non-2xx statuses
/// into errors that carry the provider's response text.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    label: &str,
) -> Result<serde_json::Value> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        bail!("{} API error {}: {}", label, status, body_text);
    }
    Ok(response.json().await?)
}
