//! slack_oauth2 - Server-side "Sign in with Slack" login flow
//!
//! This crate implements the server half of the OAuth2 authorization-code
//! flow against Slack, plus the post-token identity-resolution step that
//! aggregates several provider API responses into one normalized login
//! record. Token storage, session issuance, and CSRF-state generation are
//! left to the hosting application.

mod authorize;
mod client;
mod config;
mod errors;
mod resolver;
mod types;

pub use authorize::{
    AUTHORIZE_PASSTHROUGH_PARAMS, forward_authorize_params, prepare_slack_auth_request,
};
pub use client::{HttpSlackApi, SlackApi, exchange_code_for_token};
pub use errors::{ApiError, SlackError};
pub use resolver::IdentityResolver;
pub use types::{
    AccessToken, AuthCallback, ExtraInfo, Identity, NormalizedProfile, RawBundle, ResolvedLogin,
    TeamIcon, TeamIdentity, TeamInfo, TeamRecord, TeamSection, UserIdentity, UserInfo,
    UserProfileFields, UserRecord, UserSection,
};

// Re-export the route prefix
pub use config::SLACK_ROUTE_PREFIX;

/// Validate required environment variables early, before the first login
/// attempt forces them.
pub fn init() -> Result<(), SlackError> {
    let _ = *config::SLACK_REDIRECT_URI; // This will validate ORIGIN
    let _ = *config::SLACK_CLIENT_ID;
    let _ = *config::SLACK_CLIENT_SECRET;

    Ok(())
}
