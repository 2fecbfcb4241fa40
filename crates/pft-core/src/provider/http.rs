//! Shared JSON-over-HTTP client for the remote providers.

use std::fmt;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use super::{ProviderError, ProviderResult};
use crate::config::ProviderConfig;
use crate::util::compact_text;

/// How requests are authenticated.
#[derive(Clone)]
pub(crate) enum Auth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Custom header carrying the token
    Header { name: &'static str, value: String },
    /// Supabase: `apikey` header plus a bearer token
    Supabase { api_key: String, bearer: String },
}

#[derive(Clone)]
pub(crate) struct JsonClient {
    base_url: String,
    auth: Auth,
    client: reqwest::Client,
}

impl fmt::Debug for JsonClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("JsonClient")
            .field("base_url", &self.base_url)
            .field("auth", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl JsonClient {
    pub(crate) fn new(base_url: String, auth: Auth, config: &ProviderConfig) -> ProviderResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            client,
        })
    }

    /// Absolute URL for a path (which may carry a query string).
    pub(crate) fn url(&self, path: &str) -> ProviderResult<Url> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> ProviderResult<RequestBuilder> {
        let builder = self
            .client
            .request(method, self.url(path)?)
            .header("Accept", "application/json");
        Ok(match &self.auth {
            Auth::Bearer(token) => builder.bearer_auth(token),
            Auth::Header { name, value } => builder.header(*name, value),
            Auth::Supabase { api_key, bearer } => {
                builder.header("apikey", api_key).bearer_auth(bearer)
            }
        })
    }
}

/// Send and decode a JSON body from a successful response.
pub(crate) async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> ProviderResult<T> {
    let response = builder.send().await?;
    handle_response(response).await
}

/// Send and accept any of `accepted` without decoding the body.
pub(crate) async fn send_expecting(
    builder: RequestBuilder,
    accepted: &[StatusCode],
) -> ProviderResult<StatusCode> {
    let response = builder.send().await?;
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(status);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

pub(crate) async fn handle_response<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(api_error(status, &body));
    }
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|error| ProviderError::InvalidPayload(format!("{error}: {}", compact_text(&body))))
}

pub(crate) fn api_error(status: StatusCode, body: &str) -> ProviderError {
    ProviderError::Api {
        status: status.as_u16(),
        message: parse_api_error(status, body),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    message: Option<String>,
    user_facing_message: Option<String>,
    error: Option<String>,
    #[serde(default)]
    errors: Vec<ApiFieldError>,
}

#[derive(Debug, Deserialize)]
struct ApiFieldError {
    message: Option<String>,
}

/// Condense an error body into `message (status)`.
pub(crate) fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        let message = payload
            .user_facing_message
            .or(payload.message)
            .or(payload.error)
            .or_else(|| payload.errors.into_iter().find_map(|error| error.message))
            .filter(|message| !message.trim().is_empty());
        if let Some(message) = message {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{trimmed} ({})", status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_error_prefers_structured_messages() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_REQUEST, r#"{"message":"bad title"}"#),
            "bad title (400)"
        );
        assert_eq!(
            parse_api_error(
                StatusCode::BAD_REQUEST,
                r#"{"userFacingMessage":"Idea too short","message":"internal"}"#
            ),
            "Idea too short (400)"
        );
        assert_eq!(
            parse_api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"errors":[{"field":"title","message":"Title is required"}]}"#
            ),
            "Title is required (422)"
        );
    }

    #[test]
    fn parse_api_error_falls_back_to_body() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "  upstream down "),
            "upstream down (502)"
        );
        assert_eq!(parse_api_error(StatusCode::UNAUTHORIZED, ""), "HTTP 401");
    }

    #[test]
    fn url_joins_base_and_path() {
        let client = JsonClient::new(
            "https://feedback.example.com/".to_string(),
            Auth::Bearer("t".to_string()),
            &ProviderConfig::default(),
        )
        .unwrap();
        assert_eq!(
            client.url("/api/v1/posts?limit=1").unwrap().as_str(),
            "https://feedback.example.com/api/v1/posts?limit=1"
        );
        let debug = format!("{client:?}");
        assert!(!debug.contains("\"t\""));
    }
}
