mod dingtalk;
mod gitee;
mod github;
mod google;
mod qq;

pub use dingtalk::DingtalkProvider;
pub use gitee::GiteeProvider;
pub use github::GithubProvider;
pub use google::GoogleProvider;
pub use qq::QqProvider;

use serde::de::DeserializeOwned;
use url::Url;

use crate::RelayError;

pub(crate) const USER_AGENT: &str = "oauth-relay/0.1";

/// Which upstream call failed, for error attribution.
#[derive(Debug, Clone, Copy)]
pub(crate) enum UpstreamCall {
    Token,
    Profile,
}

/// Read an upstream response: non-success status becomes the matching error
/// variant carrying status and body, success is decoded as JSON.
pub(crate) async fn expect_json<T: DeserializeOwned>(
    call: UpstreamCall,
    response: reqwest::Response,
) -> Result<T, RelayError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(match call {
            UpstreamCall::Token => RelayError::TokenExchange {
                status: status.as_u16(),
                body,
            },
            UpstreamCall::Profile => RelayError::ProfileFetch {
                status: status.as_u16(),
                body,
            },
        });
    }

    serde_json::from_str(&body).map_err(|err| RelayError::InvalidResponse {
        message: err.to_string(),
        body,
    })
}

/// Append query params to a provider's authorize endpoint.
pub(crate) fn authorize_url(
    base: &str,
    params: &[(&str, &str)],
) -> Result<Url, RelayError> {
    let mut url = Url::parse(base)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}
