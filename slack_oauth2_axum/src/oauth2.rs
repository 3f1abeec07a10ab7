use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::Redirect,
    routing::get,
};
use std::collections::HashMap;

use slack_oauth2::{
    AuthCallback, HttpSlackApi, IdentityResolver, ResolvedLogin, exchange_code_for_token,
    prepare_slack_auth_request,
};

use super::error::IntoResponseError;

pub(super) fn router() -> Router {
    Router::new()
        .route("/slack", get(slack_auth))
        .route("/slack/authorized", get(authorized))
}

/// Redirect the browser to Slack's authorize endpoint.
///
/// Whitelisted query parameters (scope, user_scope, team) pass through to
/// Slack; a `state` value generated by the hosting layer's CSRF machinery
/// is forwarded untouched.
async fn slack_auth(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Redirect, (StatusCode, String)> {
    let state = params.get("state").map(String::as_str);
    let auth_url = prepare_slack_auth_request(&params, state).into_response_error()?;

    Ok(Redirect::to(&auth_url))
}

/// Callback endpoint for the authorization-code redirect.
///
/// Exchanges the code for a token, runs the identity resolution pass, and
/// returns the resolved login record for the session-issuance layer.
async fn authorized(
    Query(query): Query<AuthCallback>,
) -> Result<Json<ResolvedLogin>, (StatusCode, String)> {
    if let Some(error) = query.error {
        tracing::debug!("Authorization declined: {}", error);
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Authorization failed: {error}"),
        ));
    }

    let code = query.code.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            "Missing authorization code".to_string(),
        )
    })?;

    let token = exchange_code_for_token(&code).await.into_response_error()?;

    let api = HttpSlackApi::new();
    let login = IdentityResolver::new(&api, token)
        .resolve()
        .await
        .into_response_error()?;

    Ok(Json(login))
}
