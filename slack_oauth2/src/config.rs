//! Environment-based configuration for the slack_oauth2 crate

use std::env;
use std::sync::LazyLock;

/// Route prefix under which the login endpoints are mounted.
/// Default: "/auth"
pub static SLACK_ROUTE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("SLACK_ROUTE_PREFIX").unwrap_or_else(|_| "/auth".to_string()));

/// Base URL of the Slack API host. Overridable for tests against a fake server.
pub(crate) static SLACK_API_BASE: LazyLock<String> = LazyLock::new(|| {
    env::var("SLACK_API_BASE").unwrap_or_else(|_| "https://slack.com".to_string())
});

pub(crate) static SLACK_AUTH_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("SLACK_AUTH_URL").unwrap_or_else(|_| format!("{}/oauth/v2/authorize", *SLACK_API_BASE))
});

pub(crate) static SLACK_TOKEN_URL: LazyLock<String> = LazyLock::new(|| {
    env::var("SLACK_TOKEN_URL").unwrap_or_else(|_| format!("{}/api/oauth.v2.access", *SLACK_API_BASE))
});

pub(crate) static SLACK_CLIENT_ID: LazyLock<String> =
    LazyLock::new(|| env::var("SLACK_CLIENT_ID").expect("SLACK_CLIENT_ID must be set"));

pub(crate) static SLACK_CLIENT_SECRET: LazyLock<String> =
    LazyLock::new(|| env::var("SLACK_CLIENT_SECRET").expect("SLACK_CLIENT_SECRET must be set"));

/// Callback URL echoed to Slack during the token exchange. Must match the
/// redirect URI registered for the app. Derived from ORIGIN unless set
/// explicitly.
pub(crate) static SLACK_REDIRECT_URI: LazyLock<String> = LazyLock::new(|| {
    env::var("SLACK_REDIRECT_URI").unwrap_or_else(|_| {
        format!(
            "{}{}/slack/authorized",
            env::var("ORIGIN").expect("Missing ORIGIN!"),
            SLACK_ROUTE_PREFIX.as_str()
        )
    })
});

// Provider API paths consumed by the resolution engine.
pub(crate) const USERS_IDENTITY_PATH: &str = "/api/users.identity";
pub(crate) const USERS_INFO_PATH: &str = "/api/users.info";
pub(crate) const TEAM_INFO_PATH: &str = "/api/team.info";
