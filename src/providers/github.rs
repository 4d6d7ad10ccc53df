use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{UpstreamCall, authorize_url, expect_json};
use crate::config::OAuthConfig;
use crate::{RelayError, TokenResponse, UserProfile};

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_API_URL: &str = "https://api.github.com/user";

const DEFAULT_SCOPE: &str = "read:user user:email";

/// GitHub quirks: no `redirect_uri` on the authorize URL, token exchange via
/// query params, and the profile call takes the raw
/// `{token_type} {access_token}` Authorization value.
#[derive(Debug, Clone)]
pub struct GithubProvider {
    config: OAuthConfig,
    http: Client,
    token_url: String,
    user_api_url: String,
}

impl GithubProvider {
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
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, RelayError> {
        let response = self
            .http
            .get(&self.token_url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
            ])
            .header(ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, super::USER_AGENT)
            .send()
            .await?;

        expect_json(UpstreamCall::Token, response).await
    }

    pub async fn fetch_profile(&self, token: &TokenResponse) -> Result<UserProfile, RelayError> {
        let credential = token.authorization_value("github")?;
        let response = self
            .http
            .get(&self.user_api_url)
            .header(AUTHORIZATION, credential)
            .header(ACCEPT, "application/json; charset=utf-8")
            .header(reqwest::header::USER_AGENT, super::USER_AGENT)
            .send()
            .await?;

        let fields: GithubProfileFields = expect_json(UpstreamCall::Profile, response).await?;
        Ok(fields.normalize())
    }
}

#[derive(Debug, Deserialize)]
struct GithubProfileFields {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
    bio: Option<String>,
    location: Option<String>,
    company: Option<String>,
    blog: Option<String>,
    twitter_username: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    #[serde(default)]
    public_repos: u64,
    #[serde(default)]
    followers: u64,
    #[serde(default)]
    following: u64,
}

impl GithubProfileFields {
    fn normalize(self) -> UserProfile {
        let name = self.name.clone().unwrap_or_else(|| self.login.clone());
        let mut profile =
            UserProfile::new("github", self.id.to_string(), name, self.login)
                .with_extra("bio", json!(self.bio))
                .with_extra("location", json!(self.location))
                .with_extra("company", json!(self.company))
                .with_extra("blog", json!(self.blog))
                .with_extra("html_url", json!(self.html_url))
                .with_extra("twitter_username", json!(self.twitter_username))
                .with_extra("created_at", json!(self.created_at))
                .with_extra("updated_at", json!(self.updated_at))
                .with_extra("public_repos", self.public_repos)
                .with_extra("followers", self.followers)
                .with_extra("following", self.following);
        profile.email = self.email;
        if let Some(avatar) = self.avatar_url {
            profile = profile.with_avatar(avatar);
        }
        profile
    }
}
