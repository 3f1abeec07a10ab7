use thiserror::Error;

/// Failures that abort a whole login attempt.
///
/// Anything surfaced through this enum means the attempt is over; the
/// hosting layer is expected to turn it into a login-failure response.
/// Denied optional scopes never appear here; the resolver recovers from
/// those locally with an empty record.
#[derive(Debug, Error, Clone)]
pub enum SlackError {
    #[error("Token exchange error: {0}")]
    TokenExchange(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Api error: {0}")]
    Api(String),

    #[error("Config error: {0}")]
    Config(String),
}

/// Outcome classification for a single authenticated API call.
///
/// Slack reports call-level failure in the response body rather than the
/// HTTP status, so the client maps every response into one of these
/// variants and the resolver branches on them explicitly.
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// The token lacks an optional permission scope for this endpoint.
    /// Recoverable: the resolver substitutes an empty record.
    #[error("Permission scope not granted: {0}")]
    PermissionDenied(String),

    /// Network failure, timeout, or unexpected HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be parsed.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// `ok: false` with an error code that is not a scope denial,
    /// e.g. `invalid_auth` or `token_revoked`.
    #[error("Api error: {0}")]
    Api(String),
}

impl From<ApiError> for SlackError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::PermissionDenied(code) | ApiError::Api(code) => SlackError::Api(code),
            ApiError::Transport(msg) => SlackError::Transport(msg),
            ApiError::Malformed(msg) => SlackError::Malformed(msg),
        }
    }
}
