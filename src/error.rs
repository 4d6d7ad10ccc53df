use axum::http::StatusCode;
use thiserror::Error;

/// Everything that can go wrong while relaying an OAuth flow.
///
/// The display text of the `NotFound`/`BadRequest`-class variants is part of
/// the HTTP surface: the router writes it verbatim into response bodies.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Application not found: {app_id}")]
    AppNotFound { app_id: String },

    #[error("Provider not found for app: {app_id}")]
    ProviderNotMapped { app_id: String },

    #[error("OAuth provider not registered: {provider_id}")]
    ProviderNotRegistered { provider_id: String },

    #[error("Unsupported OAuth provider type: {name}")]
    UnsupportedProvider { name: String },

    #[error("Missing code or state")]
    MissingCallbackParams,

    #[error("Failed to exchange token: {status} {body}")]
    TokenExchange { status: u16, body: String },

    #[error("Failed to get user profile: {status} {body}")]
    ProfileFetch { status: u16, body: String },

    #[error("{field} not found in {provider} response")]
    MissingField {
        provider: &'static str,
        field: &'static str,
    },

    #[error("{provider} API error: {message}")]
    UpstreamApi {
        provider: &'static str,
        message: String,
    },

    #[error("invalid response body: {message}")]
    InvalidResponse { message: String, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// HTTP status the router should answer with when this error escapes a
    /// flow handler. Everything not explicitly a client/lookup error is the
    /// single 500 path, matching how the relay surfaces upstream failures.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AppNotFound { .. }
            | Self::ProviderNotMapped { .. }
            | Self::ProviderNotRegistered { .. } => StatusCode::NOT_FOUND,
            Self::MissingCallbackParams => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
