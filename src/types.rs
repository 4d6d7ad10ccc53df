use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RelayError;

/// Superset of the token-endpoint responses across all five providers.
///
/// Providers disagree on shape (DingTalk returns camelCase `accessToken`,
/// QQ omits `token_type`), so every field is optional and unknown fields are
/// kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl TokenResponse {
    /// The access token, honoring DingTalk's camelCase spelling when the
    /// snake_case field is absent.
    pub fn access_token(&self, provider: &'static str) -> Result<&str, RelayError> {
        if let Some(token) = self.access_token.as_deref() {
            return Ok(token);
        }
        self.extra
            .get("accessToken")
            .and_then(|value| value.as_str())
            .ok_or(RelayError::MissingField {
                provider,
                field: "access token",
            })
    }

    /// `{token_type} {access_token}` credential for providers that take the
    /// raw Authorization header value (GitHub).
    pub fn authorization_value(&self, provider: &'static str) -> Result<String, RelayError> {
        let token = self.access_token(provider)?;
        let token_type = self.token_type.as_deref().unwrap_or("Bearer");
        Ok(format!("{token_type} {token}"))
    }
}

/// Normalized user identity returned to the opener window.
///
/// Provider-specific fields (bio, gender, email_verified, ...) survive in
/// `extra`; `app_id` is merged in by the callback flow before delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub account: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub provider: String,
    #[serde(rename = "appId", skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserProfile {
    pub fn new(
        provider: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
        account: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            account: account.into(),
            email: None,
            avatar: None,
            provider: provider.into(),
            app_id: None,
            extra: HashMap::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::TokenResponse;
    use crate::RelayError;

    #[test]
    fn access_token_prefers_snake_case() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","token_type":"bearer"}"#).unwrap();
        assert_eq!(token.access_token("github").unwrap(), "abc");
        assert_eq!(token.authorization_value("github").unwrap(), "bearer abc");
    }

    #[test]
    fn access_token_falls_back_to_camel_case() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"dt-token","expireIn":7200}"#).unwrap();
        assert_eq!(token.access_token("dingtalk").unwrap(), "dt-token");
    }

    #[test]
    fn missing_access_token_is_an_error() {
        let token = TokenResponse::default();
        let err = token.access_token("dingtalk").unwrap_err();
        assert!(matches!(err, RelayError::MissingField { provider: "dingtalk", .. }));
    }

    #[test]
    fn profile_serializes_app_id_as_camel_case() {
        let mut profile = super::UserProfile::new("github", "1", "Octo", "octo");
        profile.app_id = Some("app1".to_string());
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["appId"], "app1");
        assert_eq!(json["provider"], "github");
    }
}
