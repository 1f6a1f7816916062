//! Shared HTTP transport.
//!
//! One `reqwest` client per panel, with a bounded per-request timeout and
//! optional bearer-token signing. The engine only needs "abortable POST
//! with a JSON body"; everything else stays here.

use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Build the shared HTTP client with a bounded per-request timeout.
pub fn create_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("revpilot/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("failed to create HTTP client: {}", e))
}

/// Authenticated transport to the RevenuePilot backend.
#[derive(Debug, Clone)]
pub struct ApiTransport {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiTransport {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        token: Option<String>,
    ) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("invalid base URL '{}': {}", base_url, e))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Absolute URL for an endpoint path like `/api/ai/codes/suggest`.
    pub fn endpoint_url(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| anyhow::anyhow!("invalid endpoint path '{}': {}", path, e))
    }

    /// A signed JSON POST, ready to send. Dropping the returned future of
    /// `send()` aborts the request at the transport level.
    pub fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<reqwest::RequestBuilder> {
        let url = self.endpoint_url(path)?;
        let mut builder = self.client.post(url).json(body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_join_against_the_base() {
        let client = create_client(Duration::from_secs(5)).unwrap();
        let transport =
            ApiTransport::new(client, "https://api.example.test", Some("tok".into())).unwrap();
        let url = transport.endpoint_url("/api/ai/codes/suggest").unwrap();
        assert_eq!(url.as_str(), "https://api.example.test/api/ai/codes/suggest");
    }

    #[test]
    fn garbage_base_url_is_rejected() {
        let client = create_client(Duration::from_secs(5)).unwrap();
        assert!(ApiTransport::new(client, "not a url", None).is_err());
    }
}
