//! Mountable router for the Slack login endpoints

use axum::Router;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Create the router for the Slack login endpoints.
///
/// Mount it under [`SLACK_ROUTE_PREFIX`](slack_oauth2::SLACK_ROUTE_PREFIX);
/// the endpoints will then be available at:
/// - `{SLACK_ROUTE_PREFIX}/slack`: redirect to Slack's authorize page
/// - `{SLACK_ROUTE_PREFIX}/slack/authorized`: authorization-code callback
pub fn slack_login_router() -> Router {
    super::oauth2::router().layer(
        TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new()
                    .level(Level::INFO)
                    .include_headers(true),
            )
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as [`slack_login_router`] but without HTTP request tracing.
/// Use this if you mount your own tracing middleware.
pub fn slack_login_router_no_trace() -> Router {
    super::oauth2::router()
}
