use gloo::net::http::{
  Method as HttpMethod,
  RequestBuilder
};
use taskdesk_shared::{
  ApiError,
  ApiRequest,
  ApiResponse,
  Method,
  Transport
};

pub const DEFAULT_API_URL: &str =
  "http://localhost:8000/api";

/// Base URL baked in at build time through `TASKDESK_API_URL`.
pub fn api_base_url() -> String {
  option_env!("TASKDESK_API_URL")
    .unwrap_or(DEFAULT_API_URL)
    .trim_end_matches('/')
    .to_string()
}

/// `Transport` over the browser fetch API.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTransport {
  base_url: String
}

impl FetchTransport {
  pub fn new(base_url: String) -> Self {
    Self { base_url }
  }
}

impl Transport for FetchTransport {
  async fn send(
    &self,
    request: &ApiRequest
  ) -> Result<ApiResponse, ApiError> {
    let method = match request.method {
      | Method::Get => HttpMethod::GET,
      | Method::Post => HttpMethod::POST,
      | Method::Put => HttpMethod::PUT,
      | Method::Patch => HttpMethod::PATCH,
      | Method::Delete => HttpMethod::DELETE
    };
    let url = format!(
      "{}{}",
      self.base_url, request.path
    );

    let mut builder = RequestBuilder::new(&url)
      .method(method)
      .header("Accept", "application/json");
    if let Some(token) = &request.bearer {
      builder = builder.header(
        "Authorization",
        &format!("Bearer {token}")
      );
    }

    let prepared = match &request.body {
      | Some(body) => {
        let encoded =
          serde_json::to_string(body)
            .map_err(|err| {
              ApiError::Decode(err.to_string())
            })?;
        builder
          .header(
            "Content-Type",
            "application/json"
          )
          .body(encoded)
      }
      | None => builder.build()
    }
    .map_err(|err| {
      ApiError::Network(err.to_string())
    })?;

    let response =
      prepared.send().await.map_err(|err| {
        tracing::warn!(
          error = %err,
          url = %url,
          "fetch failed"
        );
        ApiError::Network(err.to_string())
      })?;

    let status = response.status();
    let body =
      response.text().await.map_err(|err| {
        ApiError::Network(format!(
          "failed reading response body: \
           {err}"
        ))
      })?;
    tracing::debug!(
      status,
      url = %url,
      "fetch answered"
    );

    Ok(ApiResponse::new(status, body))
  }
}
