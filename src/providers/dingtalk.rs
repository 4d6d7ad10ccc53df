use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{UpstreamCall, authorize_url, expect_json};
use crate::config::OAuthConfig;
use crate::{RelayError, TokenResponse, UserProfile};

const AUTHORIZE_URL: &str = "https://login.dingtalk.com/oauth2/auth";
const TOKEN_URL: &str = "https://api.dingtalk.com/v1.0/oauth2/userAccessToken";
const USER_API_URL: &str = "https://api.dingtalk.com/v1.0/contact/users/me";

/// DingTalk's v1.0 API takes camelCase JSON on the token endpoint and a
/// custom `x-acs-dingtalk-access-token` header on the contact endpoint.
#[derive(Debug, Clone)]
pub struct DingtalkProvider {
    config: OAuthConfig,
    http: Client,
    token_url: String,
    user_api_url: String,
}

impl DingtalkProvider {
    pub fn new(config: OAuthConfig, http: Client) -> Self {
        Self {
            config,
            http,
            token_url: TOKEN_URL.to_string(),
            user_api_url: USER_API_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_user_api_url(mut self, url: impl Into<String>) -> Self {
        self.user_api_url = url.into();
        self
    }

    pub fn authorization_url(&self, state: &str) -> Result<Url, RelayError> {
        let scope = self.config.scope_joined(" ", "");
        authorize_url(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, RelayError> {
        let response = self
            .http
            .post(&self.token_url)
            .json(&json!({
                "clientId": self.config.client_id,
                "clientSecret": self.config.client_secret,
                "code": code,
                "grantType": "authorization_code",
            }))
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        expect_json(UpstreamCall::Token, response).await
    }

    pub async fn fetch_profile(&self, token: &TokenResponse) -> Result<UserProfile, RelayError> {
        let access_token = token.access_token("dingtalk")?;
        let response = self
            .http
            .get(&self.user_api_url)
            .header("x-acs-dingtalk-access-token", access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let fields: DingtalkProfileFields = expect_json(UpstreamCall::Profile, response).await?;
        Ok(fields.normalize())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DingtalkProfileFields {
    union_id: String,
    name: String,
    #[serde(default)]
    mobile: String,
    #[serde(default)]
    state_code: String,
    #[serde(default)]
    avatar_url: String,
}

impl DingtalkProfileFields {
    fn normalize(self) -> UserProfile {
        // Mainland numbers get a synthetic mailbox; everything else stays
        // empty, matching the relay's historical output.
        let email = if self.state_code == "86" {
            format!("{}@dingtalk.com", self.mobile)
        } else {
            String::new()
        };
        UserProfile::new("dingtalk", self.union_id, self.name, self.mobile)
            .with_email(email)
            .with_avatar(self.avatar_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::query_map;

    #[test]
    fn authorization_url_space_joins_scope() {
        let config = OAuthConfig::new("dt-id", "dt-secret", "https://relay/cb")
            .with_scope(["Contact.User.mobile", "Contact.User.Read"]);
        let provider = DingtalkProvider::new(config, Client::new());
        let url = provider.authorization_url("s").unwrap();

        let pairs = query_map(&url);
        assert_eq!(url.host_str(), Some("login.dingtalk.com"));
        assert_eq!(
            pairs.get("scope"),
            Some(&"Contact.User.mobile Contact.User.Read".to_string())
        );
    }

    #[test]
    fn mainland_mobile_gets_synthetic_email() {
        let fields = DingtalkProfileFields {
            union_id: "u-1".to_string(),
            name: "Li".to_string(),
            mobile: "13800000000".to_string(),
            state_code: "86".to_string(),
            avatar_url: "https://static.dingtalk.com/avatar".to_string(),
        };
        let profile = fields.normalize();
        assert_eq!(profile.email.as_deref(), Some("13800000000@dingtalk.com"));
        assert_eq!(profile.account, "13800000000");
    }

    #[test]
    fn non_mainland_mobile_gets_empty_email() {
        let fields = DingtalkProfileFields {
            union_id: "u-2".to_string(),
            name: "Kim".to_string(),
            mobile: "1050000000".to_string(),
            state_code: "82".to_string(),
            avatar_url: String::new(),
        };
        assert_eq!(fields.normalize().email.as_deref(), Some(""));
    }
}
