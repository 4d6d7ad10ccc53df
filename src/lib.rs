//! Multi-tenant OAuth relay.
//!
//! Several client applications share one deployed edge service for their
//! "login with provider" flows (GitHub, Google, DingTalk, QQ, Gitee). Each
//! application brings its own credentials and allowed browser origins; the
//! relay redirects to the provider's consent screen, exchanges the returned
//! code for a token, normalizes the user profile and hands it back to the
//! opener window via `postMessage`.

pub mod config;
pub mod env;
mod error;
pub mod flow;
mod provider;
mod providers;
pub mod registry;
pub mod router;
pub mod server;
mod types;

pub use error::RelayError;
pub use provider::{Provider, ProviderKind};
pub use providers::{
    DingtalkProvider, GiteeProvider, GithubProvider, GoogleProvider, QqProvider,
};
pub use types::{TokenResponse, UserProfile};
