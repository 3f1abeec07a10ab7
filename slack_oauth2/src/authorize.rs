use std::collections::HashMap;
use url::Url;

use crate::config::{SLACK_AUTH_URL, SLACK_CLIENT_ID, SLACK_REDIRECT_URI};
use crate::errors::SlackError;

/// Incoming request parameters that may be forwarded to Slack's authorize
/// endpoint. Everything else in the incoming query is ignored.
pub const AUTHORIZE_PASSTHROUGH_PARAMS: &[&str] = &["scope", "user_scope", "team"];

/// Copy whitelisted parameters from the incoming request's query into the
/// outbound authorization request. Pass-through only: values are not
/// validated, and whitelisted names absent from the incoming query are
/// left at their default (omitted).
pub fn forward_authorize_params(
    whitelist: &[&str],
    incoming: &HashMap<String, String>,
) -> Vec<(String, String)> {
    whitelist
        .iter()
        .filter_map(|name| {
            incoming
                .get(*name)
                .map(|value| (name.to_string(), value.clone()))
        })
        .collect()
}

/// Build the authorization redirect URL for one login attempt.
///
/// `state` is whatever CSRF token the hosting layer generated; this crate
/// only threads it through. Scope selection happens via the forwarded
/// `scope` / `user_scope` / `team` parameters.
pub fn prepare_slack_auth_request(
    incoming: &HashMap<String, String>,
    state: Option<&str>,
) -> Result<String, SlackError> {
    let forwarded = forward_authorize_params(AUTHORIZE_PASSTHROUGH_PARAMS, incoming);
    let auth_url = build_auth_url(
        SLACK_AUTH_URL.as_str(),
        SLACK_CLIENT_ID.as_str(),
        SLACK_REDIRECT_URI.as_str(),
        state,
        &forwarded,
    )?;

    tracing::debug!("Auth URL: {:#?}", auth_url);
    Ok(auth_url)
}

fn build_auth_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    state: Option<&str>,
    forwarded: &[(String, String)],
) -> Result<String, SlackError> {
    let mut url = Url::parse(authorize_endpoint)
        .map_err(|e| SlackError::Config(format!("Invalid authorize endpoint: {e}")))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("client_id", client_id);
        pairs.append_pair("redirect_uri", redirect_uri);
        if let Some(state) = state {
            pairs.append_pair("state", state);
        }
        for (name, value) in forwarded {
            pairs.append_pair(name, value);
        }
    }

    Ok(url.into())
}
