use anyhow::Context;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use taskdesk_shared::{ApiError, ApiRequest, ApiResponse, Method, Transport};
use tracing::{debug, warn};

use crate::config::Config;

/// `Transport` over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .context("failed building HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url().to_string(),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    #[tracing::instrument(skip(self, request), fields(method = request.method.as_str(), path = %request.path))]
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, self.url_for(&request.path))
            .header(ACCEPT, "application/json");
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            let encoded =
                serde_json::to_string(body).map_err(|err| ApiError::Decode(err.to_string()))?;
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(encoded);
        }

        let response = builder.send().await.map_err(|err| {
            warn!(error = %err, "request failed before a response arrived");
            ApiError::Network(err.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Network(format!("failed reading response body: {err}")))?;
        debug!(status, bytes = body.len(), "http response");

        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
mod http_tests {
    use super::*;

    #[test]
    fn paths_join_onto_the_trimmed_base() {
        let cfg = Config {
            api_url: "https://tasks.example.com/api/".to_string(),
            ..Config::default()
        };
        let transport = HttpTransport::new(&cfg).expect("client");
        assert_eq!(
            transport.url_for("/tasks/?page=1"),
            "https://tasks.example.com/api/tasks/?page=1"
        );
    }
}
