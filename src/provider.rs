use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::config::OAuthConfig;
use crate::providers::{
    DingtalkProvider, GiteeProvider, GithubProvider, GoogleProvider, QqProvider,
};
use crate::{RelayError, TokenResponse, UserProfile};

/// The closed set of identity services the relay speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Github,
    Google,
    Dingtalk,
    Qq,
    Gitee,
}

impl ProviderKind {
    pub const ALL: [Self; 5] = [
        Self::Github,
        Self::Google,
        Self::Dingtalk,
        Self::Qq,
        Self::Gitee,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
            Self::Dingtalk => "dingtalk",
            Self::Qq => "qq",
            Self::Gitee => "gitee",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::Github),
            "google" => Ok(Self::Google),
            "dingtalk" => Ok(Self::Dingtalk),
            "qq" => Ok(Self::Qq),
            "gitee" => Ok(Self::Gitee),
            other => Err(RelayError::UnsupportedProvider {
                name: other.to_string(),
            }),
        }
    }
}

/// One live adapter instance, dispatching the uniform three-operation
/// contract: build an authorization URL, exchange a code for a token, fetch
/// a normalized profile.
///
/// The provider set is fixed and small, so this is a tagged union rather
/// than trait objects.
#[derive(Debug, Clone)]
pub enum Provider {
    Github(GithubProvider),
    Google(GoogleProvider),
    Dingtalk(DingtalkProvider),
    Qq(QqProvider),
    Gitee(GiteeProvider),
}

impl Provider {
    pub fn new(kind: ProviderKind, config: OAuthConfig, http: reqwest::Client) -> Self {
        match kind {
            ProviderKind::Github => Self::Github(GithubProvider::new(config, http)),
            ProviderKind::Google => Self::Google(GoogleProvider::new(config, http)),
            ProviderKind::Dingtalk => Self::Dingtalk(DingtalkProvider::new(config, http)),
            ProviderKind::Qq => Self::Qq(QqProvider::new(config, http)),
            ProviderKind::Gitee => Self::Gitee(GiteeProvider::new(config, http)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Github(_) => ProviderKind::Github,
            Self::Google(_) => ProviderKind::Google,
            Self::Dingtalk(_) => ProviderKind::Dingtalk,
            Self::Qq(_) => ProviderKind::Qq,
            Self::Gitee(_) => ProviderKind::Gitee,
        }
    }

    /// Pure function, no I/O.
    pub fn authorization_url(&self, state: &str) -> Result<Url, RelayError> {
        match self {
            Self::Github(p) => p.authorization_url(state),
            Self::Google(p) => p.authorization_url(state),
            Self::Dingtalk(p) => p.authorization_url(state),
            Self::Qq(p) => p.authorization_url(state),
            Self::Gitee(p) => p.authorization_url(state),
        }
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, RelayError> {
        match self {
            Self::Github(p) => p.exchange_code(code).await,
            Self::Google(p) => p.exchange_code(code).await,
            Self::Dingtalk(p) => p.exchange_code(code).await,
            Self::Qq(p) => p.exchange_code(code).await,
            Self::Gitee(p) => p.exchange_code(code).await,
        }
    }

    pub async fn fetch_profile(&self, token: &TokenResponse) -> Result<UserProfile, RelayError> {
        match self {
            Self::Github(p) => p.fetch_profile(token).await,
            Self::Google(p) => p.fetch_profile(token).await,
            Self::Dingtalk(p) => p.fetch_profile(token).await,
            Self::Qq(p) => p.fetch_profile(token).await,
            Self::Gitee(p) => p.fetch_profile(token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::ProviderKind;
    use crate::RelayError;

    #[test]
    fn kind_round_trips_through_str() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_unsupported() {
        let err = ProviderKind::from_str("facebook").unwrap_err();
        assert!(matches!(err, RelayError::UnsupportedProvider { name } if name == "facebook"));
    }
}
