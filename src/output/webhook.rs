use std::time::Duration;

use reqwest::{Client, Proxy, StatusCode};
use url::Url;

use crate::error::{Result, WindefError};
use crate::result::{PluginResults, ScanResult};

/// Header carrying the scan ID on webhook callbacks.
pub const SCAN_ID_HEADER: &str = "X-Malice-ID";

/// Best-effort result notification.
///
/// No retries. Any HTTP response counts as delivered; non-2xx statuses
/// are only logged. The request timeout is independent of the scan timeout.
pub struct Webhook {
    client: Client,
    endpoint: Url,
}

impl Webhook {
    pub fn new(endpoint: &str, proxy: Option<&str>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim()).map_err(|e| {
            WindefError::Config(format!("invalid webhook endpoint {endpoint:?}: {e}"))
        })?;

        let mut builder = Client::builder()
            .user_agent(concat!("windef/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout);
        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// POST the JSON envelope and return the response status.
    pub async fn notify(&self, scan_id: &str, result: &ScanResult) -> Result<StatusCode> {
        let envelope = PluginResults::from(result.clone());
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(SCAN_ID_HEADER, scan_id)
            .json(&envelope)
            .send()
            .await
            .map_err(|e| WindefError::sink("webhook", e))?;

        let status = resp.status();
        if status.is_success() {
            tracing::info!(endpoint = %self.endpoint, %status, "webhook delivered");
        } else {
            tracing::warn!(endpoint = %self.endpoint, %status, "webhook returned non-success status");
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_envelope_with_scan_id_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/callback"))
            .and(header(SCAN_ID_HEADER, "abc123"))
            .and(body_json(json!({
                "windows-defender": {
                    "infected": false,
                    "result": "",
                    "engine": "",
                    "updated": "20170707",
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let hook = Webhook::new(
            &format!("{}/callback", server.uri()),
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        let status = hook
            .notify("abc123", &ScanResult::clean("", "20170707"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn routes_through_configured_proxy() {
        let proxy = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/callback"))
            .and(header(SCAN_ID_HEADER, "abc123"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&proxy)
            .await;

        // The endpoint host does not resolve; only the proxy can answer.
        let hook = Webhook::new(
            "http://malice.invalid/callback",
            Some(&proxy.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let status = hook
            .notify("abc123", &ScanResult::clean("", "20170707"))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn non_success_status_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let hook = Webhook::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        let status = hook.notify("id", &ScanResult::clean("", "")).await.unwrap();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn slow_endpoint_hits_webhook_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let hook = Webhook::new(&server.uri(), None, Duration::from_millis(200)).unwrap();
        let err = hook.notify("id", &ScanResult::clean("", "")).await.unwrap_err();
        assert!(matches!(err, WindefError::Sink { .. }));
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let err = Webhook::new("not a url", None, Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, WindefError::Config(_)));
    }
}
