use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{UpstreamCall, authorize_url, expect_json};
use crate::config::OAuthConfig;
use crate::{RelayError, TokenResponse, UserProfile};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USER_API_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

const DEFAULT_SCOPE: &str = "openid profile email";

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    config: OAuthConfig,
    http: Client,
    token_url: String,
    user_api_url: String,
}

impl GoogleProvider {
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
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, RelayError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        expect_json(UpstreamCall::Token, response).await
    }

    pub async fn fetch_profile(&self, token: &TokenResponse) -> Result<UserProfile, RelayError> {
        let access_token = token.access_token("google")?;
        let response = self
            .http
            .get(&self.user_api_url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(ACCEPT, "application/json; charset=utf-8")
            .send()
            .await?;

        let fields: GoogleProfileFields = expect_json(UpstreamCall::Profile, response).await?;
        Ok(fields.normalize())
    }
}

#[derive(Debug, Deserialize)]
struct GoogleProfileFields {
    sub: String,
    name: String,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
    email: String,
    #[serde(default)]
    email_verified: bool,
    locale: Option<String>,
    hd: Option<String>,
}

impl GoogleProfileFields {
    fn normalize(self) -> UserProfile {
        let mut profile = UserProfile::new("google", self.sub, self.name, self.email.clone())
            .with_email(self.email)
            .with_extra("email_verified", self.email_verified)
            .with_extra("given_name", json!(self.given_name))
            .with_extra("family_name", json!(self.family_name))
            .with_extra("locale", json!(self.locale))
            .with_extra("hd", json!(self.hd));
        if let Some(picture) = self.picture {
            profile = profile.with_avatar(picture);
        }
        profile
    }
}
