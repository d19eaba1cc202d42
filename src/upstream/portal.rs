//! HTTP plumbing shared by the public data portal endpoints.

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, warn};

use super::UpstreamError;

#[derive(Clone)]
pub(super) struct PortalClient {
    client: Client,
    base_url: String,
    service_key: String,
}

impl PortalClient {
    pub(super) fn new(
        base_url: &str,
        service_key: &str,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: encode_service_key(service_key),
        })
    }

    pub(super) fn url(&self, endpoint: &str, query: &[(&str, &str)]) -> String {
        // the key is appended verbatim, re-encoding it would break `%2B` and friends
        let mut url = format!(
            "{}/{}?serviceKey={}",
            self.base_url, endpoint, self.service_key
        );
        for (key, value) in query {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    /// The raw response body of a successful request.
    pub(super) async fn get(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<String, UpstreamError> {
        let start = Instant::now();
        let response = self
            .client
            .get(self.url(endpoint, query))
            .send()
            .await
            .inspect_err(|error| warn!(endpoint, ?query, %error, "upstream request failed"))?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, ?query, status = status.as_u16(), "upstream returned an error status");
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        debug!(
            endpoint,
            ?query,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "upstream response"
        );
        Ok(body)
    }
}

/// A key containing `%` is already URL-encoded (the portal hands out both forms).
fn encode_service_key(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains('%') {
        raw.to_string()
    } else {
        urlencoding::encode(raw).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_service_key() {
        assert_eq!(encode_service_key("ab+c/d=="), "ab%2Bc%2Fd%3D%3D");
        assert_eq!(encode_service_key("ab%2Bc%2Fd%3D%3D"), "ab%2Bc%2Fd%3D%3D");
        assert_eq!(encode_service_key(" plain "), "plain");
    }

    #[test]
    fn test_url_keeps_key_and_encodes_params() {
        let client =
            PortalClient::new("http://example.test/api/", "k%2B", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.url("stops", &[("arsId", "01 001"), ("_type", "json")]),
            "http://example.test/api/stops?serviceKey=k%2B&arsId=01%20001&_type=json"
        );
    }
}
