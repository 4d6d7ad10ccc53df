use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::{UpstreamCall, authorize_url, expect_json};
use crate::config::OAuthConfig;
use crate::{RelayError, TokenResponse, UserProfile};

const AUTHORIZE_URL: &str = "https://graph.qq.com/oauth2.0/authorize";
const TOKEN_URL: &str = "https://graph.qq.com/oauth2.0/token";
const OPENID_URL: &str = "https://graph.qq.com/oauth2.0/me";
const USER_API_URL: &str = "https://graph.qq.com/user/get_user_info";

const DEFAULT_SCOPE: &str = "get_user_info";

/// QQ is the odd one out: comma-joined scope, `fmt=json` everywhere, and a
/// two-step profile fetch (OpenID first, then the profile keyed by it). The
/// user-info endpoint reports failures in-band via a non-zero `ret`.
#[derive(Debug, Clone)]
pub struct QqProvider {
    config: OAuthConfig,
    http: Client,
    token_url: String,
    openid_url: String,
    user_api_url: String,
}

impl QqProvider {
    pub fn new(config: OAuthConfig, http: Client) -> Self {
        Self {
            config,
            http,
            token_url: TOKEN_URL.to_string(),
            openid_url: OPENID_URL.to_string(),
            user_api_url: USER_API_URL.to_string(),
        }
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_openid_url(mut self, url: impl Into<String>) -> Self {
        self.openid_url = url.into();
        self
    }

    pub fn with_user_api_url(mut self, url: impl Into<String>) -> Self {
        self.user_api_url = url.into();
        self
    }

    pub fn authorization_url(&self, state: &str) -> Result<Url, RelayError> {
        let scope = self.config.scope_joined(",", DEFAULT_SCOPE);
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
            .get(&self.token_url)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
                ("fmt", "json"),
            ])
            .header(ACCEPT, "application/json")
            .header(reqwest::header::USER_AGENT, super::USER_AGENT)
            .send()
            .await?;

        expect_json(UpstreamCall::Token, response).await
    }

    pub async fn fetch_profile(&self, token: &TokenResponse) -> Result<UserProfile, RelayError> {
        let access_token = token.access_token("qq")?;

        let response = self
            .http
            .get(&self.openid_url)
            .query(&[("access_token", access_token), ("fmt", "json")])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let openid: QqOpenIdResponse = expect_json(UpstreamCall::Profile, response).await?;

        let response = self
            .http
            .get(&self.user_api_url)
            .query(&[
                ("access_token", access_token),
                ("oauth_consumer_key", self.config.client_id.as_str()),
                ("openid", openid.openid.as_str()),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let fields: QqProfileFields = expect_json(UpstreamCall::Profile, response).await?;

        if fields.ret != 0 {
            return Err(RelayError::UpstreamApi {
                provider: "QQ",
                message: fields.msg,
            });
        }

        let avatar = fields
            .figureurl_qq_2
            .filter(|url| !url.is_empty())
            .or(fields.figureurl_qq_1);
        let mut profile =
            UserProfile::new("qq", openid.openid.clone(), fields.nickname, openid.openid)
                .with_email("")
                .with_extra("gender", json!(fields.gender));
        if let Some(avatar) = avatar {
            profile = profile.with_avatar(avatar);
        }
        Ok(profile)
    }
}

#[derive(Debug, Deserialize)]
struct QqOpenIdResponse {
    #[allow(dead_code)]
    client_id: Option<String>,
    openid: String,
}

#[derive(Debug, Deserialize)]
struct QqProfileFields {
    #[serde(default)]
    ret: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    nickname: String,
    figureurl_qq_1: Option<String>,
    figureurl_qq_2: Option<String>,
    gender: Option<String>,
}
