use serde_json::{Value, json};

use crate::client::SlackApi;
use crate::config::{TEAM_INFO_PATH, USERS_IDENTITY_PATH, USERS_INFO_PATH};
use crate::errors::{ApiError, SlackError};
use crate::types::{
    AccessToken, ExtraInfo, Identity, NormalizedProfile, RawBundle, ResolvedLogin, TeamInfo,
    TeamSection, UserInfo, UserSection,
};

/// Per-login-attempt identity resolution.
///
/// Owns the attempt's access token and a memo slot for each dependent API
/// call: the first read of a derived value performs the underlying call and
/// stores the result, later reads reuse it. Each fetch kind therefore hits
/// the network at most once per attempt, no matter how many of the derived
/// views are read or in which order.
///
/// The resolver is request-scoped. Concurrent login attempts each construct
/// their own resolver; nothing here is shared or invalidated, and the whole
/// struct is dropped once the callback response is produced.
pub struct IdentityResolver<'a, C: SlackApi> {
    api: &'a C,
    token: AccessToken,
    identity: Option<Identity>,
    user_info: Option<UserInfo>,
    team_info: Option<TeamInfo>,
}

impl<'a, C: SlackApi> IdentityResolver<'a, C> {
    pub fn new(api: &'a C, token: AccessToken) -> Self {
        Self {
            api,
            token,
            identity: None,
            user_info: None,
            team_info: None,
        }
    }

    /// Basic identity call (`users.identity`).
    ///
    /// Mandatory: requires no scope beyond basic identity, so any failure
    /// here (scope-shaped or not) means the token is unusable and the
    /// attempt is aborted.
    pub async fn identity(&mut self) -> Result<Identity, SlackError> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }

        let payload = self
            .api
            .authenticated_get(&self.token, USERS_IDENTITY_PATH, &[])
            .await?;
        let identity: Identity = serde_json::from_value(payload)
            .map_err(|e| SlackError::Malformed(format!("users.identity: {e}")))?;

        self.identity = Some(identity.clone());
        Ok(identity)
    }

    /// Extended user profile (`users.info`), gated behind users:read.
    ///
    /// Needs the user id from [`identity`](Self::identity), fetching it
    /// first if necessary. A denied scope yields the empty record; any
    /// transport-level failure aborts the attempt.
    pub async fn user_info(&mut self) -> Result<UserInfo, SlackError> {
        if let Some(info) = &self.user_info {
            return Ok(info.clone());
        }

        let user_id = self.identity().await?.user.id;
        let info = match self
            .api
            .authenticated_get(&self.token, USERS_INFO_PATH, &[("user", user_id.as_str())])
            .await
        {
            Ok(payload) => serde_json::from_value(payload)
                .map_err(|e| SlackError::Malformed(format!("users.info: {e}")))?,
            Err(ApiError::PermissionDenied(code)) => {
                tracing::debug!("users.info denied: {}", code);
                UserInfo::default()
            }
            Err(e) => return Err(e.into()),
        };

        self.user_info = Some(info.clone());
        Ok(info)
    }

    /// Team profile (`team.info`), gated behind team:read.
    /// Independent of [`user_info`](Self::user_info); same denial policy.
    pub async fn team_info(&mut self) -> Result<TeamInfo, SlackError> {
        if let Some(info) = &self.team_info {
            return Ok(info.clone());
        }

        let info = match self
            .api
            .authenticated_get(&self.token, TEAM_INFO_PATH, &[])
            .await
        {
            Ok(payload) => serde_json::from_value(payload)
                .map_err(|e| SlackError::Malformed(format!("team.info: {e}")))?,
            Err(ApiError::PermissionDenied(code)) => {
                tracing::debug!("team.info denied: {}", code);
                TeamInfo::default()
            }
            Err(e) => return Err(e.into()),
        };

        self.team_info = Some(info.clone());
        Ok(info)
    }

    /// Incoming-webhook grant attached to the token response, if the
    /// permission was authorized. Pure local lookup; never fails.
    pub fn web_hook_info(&self) -> Value {
        self.token
            .auxiliary("incoming_webhook")
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    /// Bot grant attached to the token response. Same rules as
    /// [`web_hook_info`](Self::web_hook_info).
    pub fn bot_info(&self) -> Value {
        self.token
            .auxiliary("bot")
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    /// Globally unique login key.
    ///
    /// A Slack user id is not guaranteed unique across all users; the
    /// user id combined with the team id is. Computed from the mandatory
    /// identity call only, never from the optional-scope profiles, which
    /// may legitimately be empty.
    pub async fn uid(&mut self) -> Result<String, SlackError> {
        let identity = self.identity().await?;
        Ok(format!("{}-{}", identity.user.id, identity.team.id))
    }

    /// Stable-shaped public profile, with fields the token could not read
    /// left as `None`. Triggers the lazy team/user fetches if they have not
    /// run yet.
    pub async fn info(&mut self) -> Result<NormalizedProfile, SlackError> {
        let team = self.team_info().await?;
        let user = self.user_info().await?;

        Ok(NormalizedProfile {
            team: TeamSection {
                id: team.team.id,
                name: team.team.name,
                domain: team.team.domain,
                icon: team.team.icon.image_102,
            },
            user: UserSection {
                id: user.user.id,
                name: user.user.name,
                real_name: user.user.real_name,
                email: user.user.profile.email,
                image: user.user.profile.image_48,
            },
        })
    }

    /// Provider-native responses, unmodified, for downstream consumers.
    pub async fn raw_info(&mut self) -> Result<RawBundle, SlackError> {
        Ok(RawBundle {
            user_info: self.user_info().await?,
            team_info: self.team_info().await?,
            web_hook_info: self.web_hook_info(),
            bot_info: self.bot_info(),
        })
    }

    /// Run the full resolution pass and assemble the record handed to the
    /// session-issuance layer.
    pub async fn resolve(mut self) -> Result<ResolvedLogin, SlackError> {
        let uid = self.uid().await?;
        let info = self.info().await?;
        let raw_info = self.raw_info().await?;

        tracing::debug!("Resolved login: {}", uid);
        Ok(ResolvedLogin {
            uid,
            info,
            extra: ExtraInfo { raw_info },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted stand-in for the Slack API that records how often each
    /// path is called.
    struct MockApi {
        responses: HashMap<String, Result<Value, ApiError>>,
        calls: Mutex<HashMap<String, usize>>,
    }

    impl MockApi {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: Mutex::new(HashMap::new()),
            }
        }

        fn respond(mut self, path: &str, response: Result<Value, ApiError>) -> Self {
            self.responses.insert(path.to_string(), response);
            self
        }

        fn call_count(&self, path: &str) -> usize {
            *self.calls.lock().unwrap().get(path).unwrap_or(&0)
        }
    }

    #[async_trait]
    impl SlackApi for MockApi {
        async fn authenticated_get(
            &self,
            _token: &AccessToken,
            path: &str,
            _query: &[(&str, &str)],
        ) -> Result<Value, ApiError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(path.to_string())
                .or_insert(0) += 1;
            self.responses
                .get(path)
                .cloned()
                .unwrap_or_else(|| panic!("unexpected call to {path}"))
        }
    }

    fn token(extra: Value) -> AccessToken {
        let mut payload = json!({ "access_token": "xoxp-test" });
        if let (Some(map), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
            map.extend(extra.clone());
        }
        serde_json::from_value(payload).unwrap()
    }

    fn identity_payload() -> Value {
        json!({
            "ok": true,
            "user": { "id": "U1", "name": "alice" },
            "team": { "id": "T1", "name": "Acme" }
        })
    }

    fn user_info_payload() -> Value {
        json!({
            "ok": true,
            "user": {
                "id": "U1",
                "name": "alice",
                "real_name": "Alice Example",
                "profile": { "email": "alice@example.com", "image_48": "u48" }
            }
        })
    }

    fn team_info_payload() -> Value {
        json!({
            "ok": true,
            "team": {
                "id": "T1",
                "name": "Acme",
                "domain": "acme",
                "icon": { "image_102": "t102" }
            }
        })
    }

    fn denied() -> Result<Value, ApiError> {
        Err(ApiError::PermissionDenied("missing_scope".to_string()))
    }

    /// Test that uid combines the user and team ids from the identity call
    #[tokio::test]
    async fn test_uid_format() {
        let api = MockApi::new().respond(USERS_IDENTITY_PATH, Ok(identity_payload()));
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        let uid = resolver.uid().await.unwrap();
        assert_eq!(uid, "U1-T1");
    }

    /// Test that uid is unaffected by denied optional scopes
    ///
    /// The canonical key must be computed from the mandatory identity call
    /// only, so denying both optional endpoints must not change it.
    #[tokio::test]
    async fn test_uid_invariant_to_denied_scopes() {
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(USERS_INFO_PATH, denied())
            .respond(TEAM_INFO_PATH, denied());
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        // Resolve the optional profiles first, then read the uid.
        resolver.user_info().await.unwrap();
        resolver.team_info().await.unwrap();
        let uid = resolver.uid().await.unwrap();

        assert_eq!(uid, "U1-T1");
    }

    /// Test that each fetch kind executes at most once per attempt
    ///
    /// Reads uid, info and raw_info repeatedly; the fake provider must see
    /// exactly one call per endpoint.
    #[tokio::test]
    async fn test_memoization_at_most_one_call_per_endpoint() {
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(USERS_INFO_PATH, Ok(user_info_payload()))
            .respond(TEAM_INFO_PATH, Ok(team_info_payload()));
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        resolver.uid().await.unwrap();
        resolver.uid().await.unwrap();
        resolver.info().await.unwrap();
        resolver.info().await.unwrap();
        resolver.raw_info().await.unwrap();
        resolver.user_info().await.unwrap();
        resolver.team_info().await.unwrap();

        assert_eq!(api.call_count(USERS_IDENTITY_PATH), 1);
        assert_eq!(api.call_count(USERS_INFO_PATH), 1);
        assert_eq!(api.call_count(TEAM_INFO_PATH), 1);
    }

    /// Test that a denied users:read scope empties only the user section
    #[tokio::test]
    async fn test_user_scope_denied_yields_empty_user_section() {
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(USERS_INFO_PATH, denied())
            .respond(TEAM_INFO_PATH, Ok(team_info_payload()));
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        let info = resolver.info().await.unwrap();

        assert_eq!(info.user, UserSection::default());
        assert_eq!(info.team.id.as_deref(), Some("T1"));
        assert_eq!(info.team.name.as_deref(), Some("Acme"));
        assert_eq!(info.team.icon.as_deref(), Some("t102"));
    }

    /// Test that a denied team:read scope empties only the team section
    #[tokio::test]
    async fn test_team_scope_denied_yields_empty_team_section() {
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(USERS_INFO_PATH, Ok(user_info_payload()))
            .respond(TEAM_INFO_PATH, denied());
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        let info = resolver.info().await.unwrap();

        assert_eq!(info.team, TeamSection::default());
        assert_eq!(info.user.id.as_deref(), Some("U1"));
        assert_eq!(info.user.email.as_deref(), Some("alice@example.com"));
    }

    /// Test that a transport error on an optional call is fatal
    ///
    /// Only scope denials are recoverable; a network failure on users.info
    /// must abort the attempt like any other transport failure.
    #[tokio::test]
    async fn test_transport_error_on_optional_call_is_fatal() {
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(
                USERS_INFO_PATH,
                Err(ApiError::Transport("connection reset".to_string())),
            );
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        let result = resolver.user_info().await;
        assert!(matches!(result, Err(SlackError::Transport(_))));
    }

    /// Test that a failed mandatory identity call aborts before dependents
    ///
    /// When users.identity fails with a transport error, resolution must
    /// stop without ever attempting the dependent optional calls.
    #[tokio::test]
    async fn test_identity_failure_aborts_resolution() {
        let api = MockApi::new().respond(
            USERS_IDENTITY_PATH,
            Err(ApiError::Transport("timed out".to_string())),
        );
        let resolver = IdentityResolver::new(&api, token(json!({})));

        let result = resolver.resolve().await;

        assert!(matches!(result, Err(SlackError::Transport(_))));
        assert_eq!(api.call_count(USERS_IDENTITY_PATH), 1);
        assert_eq!(api.call_count(USERS_INFO_PATH), 0);
        assert_eq!(api.call_count(TEAM_INFO_PATH), 0);
    }

    /// Test that a scope-shaped failure on identity is still fatal
    ///
    /// The identity call needs no optional scope, so even a
    /// permission-denied response there means the token is unusable.
    #[tokio::test]
    async fn test_identity_scope_denial_is_fatal() {
        let api = MockApi::new().respond(USERS_IDENTITY_PATH, denied());
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        let result = resolver.identity().await;
        assert!(matches!(result, Err(SlackError::Api(_))));
    }

    /// Test that a malformed identity payload is fatal
    #[tokio::test]
    async fn test_identity_malformed_payload_is_fatal() {
        let api = MockApi::new().respond(
            USERS_IDENTITY_PATH,
            Ok(json!({ "ok": true, "user": { "name": "no id" } })),
        );
        let mut resolver = IdentityResolver::new(&api, token(json!({})));

        let result = resolver.identity().await;
        assert!(matches!(result, Err(SlackError::Malformed(_))));
    }

    /// Test auxiliary grant extraction with only the bot grant present
    ///
    /// Token auxiliaries `{bot: {...}}` and no `incoming_webhook` key:
    /// the webhook lookup yields an empty record and the bot lookup yields
    /// the record unchanged.
    #[tokio::test]
    async fn test_auxiliary_grant_extraction() {
        let bot = json!({ "bot_user_id": "B1", "bot_access_token": "xoxb-1" });
        let api = MockApi::new();
        let resolver = IdentityResolver::new(&api, token(json!({ "bot": bot })));

        assert_eq!(resolver.web_hook_info(), json!({}));
        assert_eq!(resolver.bot_info(), bot);
    }

    /// Test the end-to-end partial-grant scenario
    ///
    /// Token valid; identity resolves; users.info denied; team.info
    /// succeeds; no auxiliary grants. The resolved record carries the uid,
    /// an empty user section, the populated team section, and empty grant
    /// records in the raw bundle.
    #[tokio::test]
    async fn test_resolve_end_to_end_partial_grants() {
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(USERS_INFO_PATH, denied())
            .respond(
                TEAM_INFO_PATH,
                Ok(json!({
                    "ok": true,
                    "team": {
                        "id": "T1",
                        "name": "Acme",
                        "domain": "acme",
                        "icon": { "image_102": "u1" }
                    }
                })),
            );
        let resolver = IdentityResolver::new(&api, token(json!({})));

        let login = resolver.resolve().await.unwrap();

        assert_eq!(login.uid, "U1-T1");
        assert_eq!(login.info.user, UserSection::default());
        assert_eq!(
            login.info.team,
            TeamSection {
                id: Some("T1".to_string()),
                name: Some("Acme".to_string()),
                domain: Some("acme".to_string()),
                icon: Some("u1".to_string()),
            }
        );
        assert_eq!(login.extra.raw_info.web_hook_info, json!({}));
        assert_eq!(login.extra.raw_info.bot_info, json!({}));
        assert!(login.extra.raw_info.user_info.user.id.is_none());
        assert_eq!(
            login.extra.raw_info.team_info.team.domain.as_deref(),
            Some("acme")
        );

        // resolve() reads every derived view; still one call per endpoint.
        assert_eq!(api.call_count(USERS_IDENTITY_PATH), 1);
        assert_eq!(api.call_count(USERS_INFO_PATH), 1);
        assert_eq!(api.call_count(TEAM_INFO_PATH), 1);
    }

    /// Test that the raw bundle preserves provider-native fields unmodified
    #[tokio::test]
    async fn test_raw_bundle_preserves_responses() {
        let webhook = json!({
            "channel": "#general",
            "url": "https://hooks.slack.com/services/T1/B1/x"
        });
        let api = MockApi::new()
            .respond(USERS_IDENTITY_PATH, Ok(identity_payload()))
            .respond(USERS_INFO_PATH, Ok(user_info_payload()))
            .respond(TEAM_INFO_PATH, Ok(team_info_payload()));
        let mut resolver =
            IdentityResolver::new(&api, token(json!({ "incoming_webhook": webhook })));

        let raw = resolver.raw_info().await.unwrap();

        assert_eq!(raw.user_info.user.real_name.as_deref(), Some("Alice Example"));
        assert_eq!(raw.team_info.team.icon.image_102.as_deref(), Some("t102"));
        assert_eq!(raw.web_hook_info, webhook);
        assert_eq!(raw.bot_info, json!({}));
    }
}
