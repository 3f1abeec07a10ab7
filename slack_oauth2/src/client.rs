use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{SLACK_API_BASE, SLACK_CLIENT_ID, SLACK_CLIENT_SECRET, SLACK_REDIRECT_URI, SLACK_TOKEN_URL};
use crate::errors::{ApiError, SlackError};
use crate::types::AccessToken;

/// Error codes Slack returns when a call touches fields the token's
/// granted scopes do not cover. These mean the token is fine but the
/// optional permission was not authorized.
const SCOPE_DENIED_ERRORS: &[&str] = &["missing_scope", "not_allowed_token_type"];

/// Signed GET access to the provider API, as consumed by the resolution
/// engine. One implementation talks to Slack over HTTPS; tests substitute
/// a scripted fake.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn authenticated_get(
        &self,
        token: &AccessToken,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError>;
}

/// reqwest-backed [`SlackApi`] implementation.
pub struct HttpSlackApi {
    client: reqwest::Client,
}

impl HttpSlackApi {
    pub fn new() -> Self {
        Self {
            client: get_client(),
        }
    }
}

impl Default for HttpSlackApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlackApi for HttpSlackApi {
    async fn authenticated_get(
        &self,
        token: &AccessToken,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", SLACK_API_BASE.as_str(), path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Unexpected status from {}: {}", path, status);
            return Err(ApiError::Transport(format!(
                "unexpected status from {path}: {status}"
            )));
        }

        let response_body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        tracing::debug!("Response body from {}: {:#?}", path, response_body);
        let payload: Value = serde_json::from_str(&response_body).map_err(|e| {
            ApiError::Malformed(format!("Failed to deserialize response body: {e}"))
        })?;

        classify_payload(payload)
    }
}

/// Slack reports call-level failure in the body, not the HTTP status:
/// a 200 response with `ok: false` and a machine-readable `error` code.
/// Scope denials become [`ApiError::PermissionDenied`] so the resolver can
/// recover; every other `ok: false` code is a hard call failure.
pub(crate) fn classify_payload(payload: Value) -> Result<Value, ApiError> {
    let ok = payload.get("ok").and_then(Value::as_bool).unwrap_or(false);
    if ok {
        return Ok(payload);
    }

    let code = payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();

    if SCOPE_DENIED_ERRORS.contains(&code.as_str()) {
        tracing::debug!("Scope denied: {}", code);
        Err(ApiError::PermissionDenied(code))
    } else {
        tracing::error!("Api call failed: {}", code);
        Err(ApiError::Api(code))
    }
}

/// Exchange the authorization code for an access token.
///
/// The callback URL registered at authorize time is echoed back here;
/// Slack rejects the exchange if the two differ. Any failure on this call
/// fails the whole login attempt.
pub async fn exchange_code_for_token(code: &str) -> Result<AccessToken, SlackError> {
    let client = get_client();
    let response = client
        .post(SLACK_TOKEN_URL.as_str())
        .form(&[
            ("code", code),
            ("client_id", SLACK_CLIENT_ID.as_str()),
            ("client_secret", SLACK_CLIENT_SECRET.as_str()),
            ("redirect_uri", SLACK_REDIRECT_URI.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| SlackError::TokenExchange(e.to_string()))?;

    match response.status() {
        reqwest::StatusCode::OK => {
            tracing::debug!("Token exchange response: {:#?}", response);
        }
        status => {
            tracing::error!("Token exchange response: {:#?}", response);
            return Err(SlackError::TokenExchange(status.to_string()));
        }
    };

    let response_body = response
        .text()
        .await
        .map_err(|e| SlackError::TokenExchange(e.to_string()))?;
    let payload: Value = serde_json::from_str(&response_body)
        .map_err(|e| SlackError::TokenExchange(e.to_string()))?;

    let payload = classify_payload(payload)
        .map_err(|e| SlackError::TokenExchange(e.to_string()))?;

    let token: AccessToken = serde_json::from_value(payload)
        .map_err(|e| SlackError::TokenExchange(format!("Failed to deserialize token: {e}")))?;

    Ok(token)
}

/// Creates the HTTP client used for token exchange and API calls.
///
/// The 30 second timeout bounds every outbound call; a timed-out call
/// surfaces as a transport failure, never as a denied scope.
fn get_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .build()
        .expect("Failed to create reqwest client")
}
