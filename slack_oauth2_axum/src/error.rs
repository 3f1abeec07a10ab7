use http::StatusCode;
use slack_oauth2::SlackError;

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

/// Implementation for SlackError to map variants to appropriate status codes
impl<T> IntoResponseError<T> for Result<T, SlackError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match e {
                SlackError::TokenExchange(_) => StatusCode::BAD_REQUEST,
                SlackError::Api(_) => StatusCode::UNAUTHORIZED,
                SlackError::Transport(_) => StatusCode::BAD_GATEWAY,
                SlackError::Malformed(_) => StatusCode::BAD_GATEWAY,
                SlackError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })
    }
}
