use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{UpstreamCall, authorize_url, expect_json};
use crate::config::OAuthConfig;
use crate::{RelayError, TokenResponse, UserProfile};

const AUTHORIZE_URL: &str = "https://gitee.com/oauth/authorize";
const TOKEN_URL: &str = "https://gitee.com/oauth/token";
const USER_API_URL: &str = "https://gitee.com/api/v5/user";

const DEFAULT_SCOPE: &str = "user_info";

#[derive(Debug, Clone)]
pub struct GiteeProvider {
    config: OAuthConfig,
    http: Client,
    token_url: String,
    user_api_url: String,
}

impl GiteeProvider {
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
        let scope = self.config.scope_joined(" ", DEFAULT_SCOPE);
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
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, super::USER_AGENT)
            .send()
            .await?;

        expect_json(UpstreamCall::Token, response).await
    }

    pub async fn fetch_profile(&self, token: &TokenResponse) -> Result<UserProfile, RelayError> {
        // Gitee takes the token as a query param rather than a header.
        let access_token = token.access_token("gitee")?;
        let response = self
            .http
            .get(&self.user_api_url)
            .query(&[("access_token", access_token)])
            .header(ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, super::USER_AGENT)
            .send()
            .await?;

        let fields: GiteeProfileFields = expect_json(UpstreamCall::Profile, response).await?;
        Ok(fields.normalize())
    }
}

#[derive(Debug, Deserialize)]
struct GiteeProfileFields {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    bio: Option<String>,
    blog: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
}

impl GiteeProfileFields {
    fn normalize(self) -> UserProfile {
        let name = self.name.clone().unwrap_or_else(|| self.login.clone());
        let mut profile = UserProfile::new("gitee", self.id.to_string(), name, self.login)
            .with_extra("bio", json!(self.bio))
            .with_extra("blog", json!(self.blog))
            .with_extra("location", serde_json::Value::Null)
            .with_extra("company", serde_json::Value::Null)
            .with_extra("public_repos", self.public_repos)
            .with_extra("followers", self.followers)
            .with_extra("following", self.following)
            .with_extra("created_at", json!(self.created_at))
            .with_extra("updated_at", json!(self.updated_at));
        profile.email = self.email;
        if let Some(avatar) = self.avatar_url {
            profile = profile.with_avatar(avatar);
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::query_map;

    #[test]
    fn authorization_url_defaults_scope_to_user_info() {
        let config = OAuthConfig::new("ge-id", "ge-secret", "https://relay/cb");
        let provider = GiteeProvider::new(config, Client::new());
        let url = provider.authorization_url("s").unwrap();

        let pairs = query_map(&url);
        assert_eq!(url.host_str(), Some("gitee.com"));
        assert_eq!(pairs.get("scope"), Some(&"user_info".to_string()));
    }

    #[test]
    fn profile_keeps_repo_and_follower_counts() {
        let fields: GiteeProfileFields = serde_json::from_value(serde_json::json!({
            "id": 9,
            "login": "mei",
            "name": "Mei",
            "email": "mei@example.com",
            "avatar_url": "https://gitee.com/assets/mei.png",
            "public_repos": 12,
            "followers": 34,
            "following": 5,
            "created_at": "2020-01-01T00:00:00+08:00"
        }))
        .unwrap();
        let profile = fields.normalize();
        assert_eq!(profile.extra["public_repos"], 12);
        assert_eq!(profile.extra["followers"], 34);
        assert!(profile.extra["company"].is_null());
    }
}
