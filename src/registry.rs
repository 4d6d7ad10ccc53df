use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use uuid::Uuid;

use crate::config::OAuthConfig;
use crate::{Provider, ProviderKind, RelayError};

/// Outbound calls hang only as long as this; a stalled provider should not
/// pin a browser window open forever.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Synthetic key disambiguating per-application credentials for the same
/// provider type.
pub fn provider_id(app_id: &str, kind: ProviderKind) -> String {
    format!("{app_id}_{kind}")
}

/// Live adapter instances keyed by provider id.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Provider>,
    http: Client,
}

impl ProviderRegistry {
    pub fn new() -> Result<Self, RelayError> {
        let http = Client::builder().timeout(UPSTREAM_TIMEOUT).build()?;
        Ok(Self::with_http_client(http))
    }

    /// All adapters share the supplied client (connection pool and timeout).
    pub fn with_http_client(http: Client) -> Self {
        Self {
            providers: HashMap::new(),
            http,
        }
    }

    /// Construct and store the adapter for `kind` under `provider_id`
    /// (default: the kind name itself).
    pub fn register(&mut self, kind: ProviderKind, config: OAuthConfig, provider_id: Option<&str>) {
        let id = provider_id.unwrap_or(kind.as_str()).to_string();
        let provider = Provider::new(kind, config, self.http.clone());
        self.providers.insert(id, provider);
    }

    /// Store a pre-built adapter, e.g. one pointed at a mock upstream.
    pub fn insert(&mut self, provider_id: impl Into<String>, provider: Provider) {
        self.providers.insert(provider_id.into(), provider);
    }

    pub fn provider(&self, provider_id: &str) -> Result<&Provider, RelayError> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| RelayError::ProviderNotRegistered {
                provider_id: provider_id.to_string(),
            })
    }

    /// One opaque CSRF state token per login attempt.
    pub fn generate_state() -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{ProviderRegistry, provider_id};
    use crate::RelayError;
    use crate::config::OAuthConfig;
    use crate::provider::ProviderKind;

    fn config() -> OAuthConfig {
        OAuthConfig::new("id", "secret", "https://relay/cb")
    }

    #[test]
    fn registered_provider_resolves() {
        let mut registry = ProviderRegistry::new().unwrap();
        let id = provider_id("app1", ProviderKind::Github);
        registry.register(ProviderKind::Github, config(), Some(&id));

        let provider = registry.provider("app1_github").unwrap();
        assert_eq!(provider.kind(), ProviderKind::Github);
    }

    #[test]
    fn default_provider_id_is_kind_name() {
        let mut registry = ProviderRegistry::new().unwrap();
        registry.register(ProviderKind::Gitee, config(), None);
        assert!(registry.provider("gitee").is_ok());
    }

    #[test]
    fn unregistered_provider_fails() {
        let registry = ProviderRegistry::new().unwrap();
        let err = registry.provider("app1_github").unwrap_err();
        assert!(matches!(err, RelayError::ProviderNotRegistered { .. }));
    }

    #[test]
    fn state_tokens_are_unique_uuids() {
        let a = ProviderRegistry::generate_state();
        let b = ProviderRegistry::generate_state();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}
