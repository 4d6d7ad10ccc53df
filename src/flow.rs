use std::collections::HashMap;

use axum::http::header::{CONTENT_SECURITY_POLICY, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::config::AppConfigTable;
use crate::registry::{ProviderRegistry, provider_id};
use crate::{Provider, ProviderKind, RelayError};

/// The two-step browser flow: `login` redirects to the provider's consent
/// screen, `callback` exchanges the code, fetches the profile and delivers
/// it to the opener window.
#[derive(Debug, Clone)]
pub struct FlowHandler {
    registry: ProviderRegistry,
    app_providers: HashMap<String, HashMap<ProviderKind, String>>,
}

impl FlowHandler {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            app_providers: HashMap::new(),
        }
    }

    /// Wire up every `(app, provider)` pair of the table: one adapter per
    /// pair in the registry, plus the app -> kind -> provider-id map.
    pub fn from_table(table: &AppConfigTable) -> Result<Self, RelayError> {
        let mut registry = ProviderRegistry::new()?;
        let mut handler_map: HashMap<String, HashMap<ProviderKind, String>> = HashMap::new();

        for app in table.apps() {
            for (kind, config) in &app.oauth_providers {
                let id = provider_id(&app.id, *kind);
                registry.register(*kind, config.clone(), Some(&id));
                handler_map
                    .entry(app.id.clone())
                    .or_default()
                    .insert(*kind, id);
            }
        }

        let mut handler = Self::new(registry);
        handler.app_providers = handler_map;
        Ok(handler)
    }

    pub fn register_app_provider(
        &mut self,
        app_id: impl Into<String>,
        kind: ProviderKind,
        provider_id: impl Into<String>,
    ) {
        self.app_providers
            .entry(app_id.into())
            .or_default()
            .insert(kind, provider_id.into());
    }

    pub fn provider_id(&self, app_id: &str, kind: ProviderKind) -> Option<&str> {
        self.app_providers
            .get(app_id)?
            .get(&kind)
            .map(String::as_str)
    }

    /// Resolve the adapter for `(app_id, provider)`. An unknown provider
    /// name surfaces as the same 404 as an unmapped one, so
    /// `/app/acme/login/facebook` and `/app/acme/login/github` without
    /// credentials read identically from outside.
    fn resolve(&self, app_id: &str, provider: &str) -> Result<&Provider, RelayError> {
        let not_mapped = || RelayError::ProviderNotMapped {
            app_id: app_id.to_string(),
        };
        let kind: ProviderKind = provider.parse().map_err(|_| not_mapped())?;
        let id = self.provider_id(app_id, kind).ok_or_else(not_mapped)?;
        self.registry.provider(id)
    }

    /// 302 to the provider's consent screen. The state token is issued here
    /// but the callback does not verify it; see DESIGN.md.
    pub fn login(&self, app_id: &str, provider: &str) -> Result<Response, RelayError> {
        let state = ProviderRegistry::generate_state();
        let adapter = self.resolve(app_id, provider)?;
        let auth_url = adapter.authorization_url(&state)?;

        tracing::debug!(app_id, provider, "redirecting to consent screen");
        Ok((
            StatusCode::FOUND,
            [(LOCATION, auth_url.to_string())],
        )
            .into_response())
    }

    /// Exchange the code, fetch the profile, and answer with an HTML page
    /// that posts the result to the window that opened the popup.
    pub async fn callback(
        &self,
        app_id: &str,
        provider: &str,
        query: &str,
    ) -> Result<Response, RelayError> {
        let (code, state) = callback_params(query);
        let (Some(code), Some(_state)) = (code, state) else {
            return Err(RelayError::MissingCallbackParams);
        };

        let adapter = self.resolve(app_id, provider)?;
        let token = adapter.exchange_code(&code).await?;
        let mut profile = adapter.fetch_profile(&token).await?;
        profile.app_id = Some(app_id.to_string());

        let access_token = token.access_token(adapter.kind().as_str())?;
        let profile_json =
            serde_json::to_string(&profile).map_err(|err| RelayError::InvalidResponse {
                message: err.to_string(),
                body: String::new(),
            })?;

        let nonce = Uuid::new_v4().to_string();
        let body = post_message_page(&nonce, access_token, &profile_json);
        let csp = format!(
            "default-src 'self'; script-src 'self' 'unsafe-inline' 'nonce-{nonce}'"
        );

        tracing::debug!(app_id, provider, user_id = %profile.id, "oauth callback completed");
        Ok((
            StatusCode::OK,
            [
                (CONTENT_TYPE, "text/html".to_string()),
                (CONTENT_SECURITY_POLICY, csp),
            ],
            body,
        )
            .into_response())
    }
}

fn callback_params(query: &str) -> (Option<String>, Option<String>) {
    let mut code = None;
    let mut state = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }
    (code, state)
}

fn post_message_page(nonce: &str, access_token: &str, profile_json: &str) -> String {
    format!(
        r#"<script nonce="{nonce}">
  window.opener.postMessage({{eventType: 'oauth_success', token: "{access_token}", userProfile: {profile_json}}}, "*");
  window.close();
</script>"#
    )
}

#[cfg(test)]
mod tests {
    use super::{FlowHandler, callback_params, post_message_page};
    use crate::RelayError;
    use crate::config::OAuthConfig;
    use crate::registry::ProviderRegistry;
    use crate::provider::ProviderKind;
    use axum::http::header::LOCATION;
    use axum::http::StatusCode;

    fn handler_with_github() -> FlowHandler {
        let mut registry = ProviderRegistry::new().unwrap();
        registry.register(
            ProviderKind::Github,
            OAuthConfig::new("gh-id", "gh-secret", "https://relay/app/acme/callback/github"),
            Some("acme_github"),
        );
        let mut handler = FlowHandler::new(registry);
        handler.register_app_provider("acme", ProviderKind::Github, "acme_github");
        handler
    }

    #[test]
    fn login_redirects_to_provider() {
        let response = handler_with_github().login("acme", "github").unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(location.contains("client_id=gh-id"));
    }

    #[test]
    fn login_for_unmapped_provider_is_not_found() {
        let err = handler_with_github().login("acme", "google").unwrap_err();
        assert_eq!(err.to_string(), "Provider not found for app: acme");
    }

    #[test]
    fn login_for_unknown_provider_name_reads_the_same() {
        let err = handler_with_github().login("acme", "facebook").unwrap_err();
        assert!(matches!(err, RelayError::ProviderNotMapped { .. }));
    }

    #[tokio::test]
    async fn callback_without_state_is_bad_request() {
        let err = handler_with_github()
            .callback("acme", "github", "code=abc")
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::MissingCallbackParams));
    }

    #[test]
    fn callback_params_ignores_unknown_keys() {
        let (code, state) = callback_params("code=a&state=b&foo=bar");
        assert_eq!(code.as_deref(), Some("a"));
        assert_eq!(state.as_deref(), Some("b"));
    }

    #[test]
    fn post_message_page_carries_nonce_and_payload() {
        let page = post_message_page("n-1", "tok", r#"{"id":"1"}"#);
        assert!(page.contains(r#"<script nonce="n-1">"#));
        assert!(page.contains(r#"token: "tok""#));
        assert!(page.contains(r#"userProfile: {"id":"1"}"#));
        assert!(page.contains("window.close()"));
    }
}
