use std::collections::HashMap;

use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_SECURITY_POLICY, HeaderMap, HeaderValue, REFERRER_POLICY,
    X_CONTENT_TYPE_OPTIONS,
};

use crate::ProviderKind;
use crate::env::EnvVars;

const DEFAULT_CSP: &str = "default-src 'self'; script-src 'self' 'unsafe-inline'";

/// Credentials for one `(application, provider)` pair.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: Option<Vec<String>>,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scope: None,
        }
    }

    pub fn with_scope<S: Into<String>>(mut self, scope: impl IntoIterator<Item = S>) -> Self {
        self.scope = Some(scope.into_iter().map(Into::into).collect());
        self
    }

    /// Scope string for the authorize URL: configured entries joined by
    /// `separator` (providers disagree between space and comma), or
    /// `default` when no scope was configured.
    pub fn scope_joined(&self, separator: &str, default: &str) -> String {
        match &self.scope {
            Some(scope) if !scope.is_empty() => scope.join(separator),
            _ => default.to_string(),
        }
    }
}

/// One tenant of the relay: allowed browser origins plus per-provider
/// credentials.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub id: String,
    pub name: String,
    pub allowed_origins: Vec<String>,
    pub oauth_providers: HashMap<ProviderKind, OAuthConfig>,
}

/// Static per-application configuration, built once from environment values.
///
/// Insertion order is preserved so "first registered application" is a
/// stable notion for default CORS resolution.
#[derive(Debug, Clone, Default)]
pub struct AppConfigTable {
    apps: Vec<AppConfig>,
}

impl AppConfigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by id. Last write wins; no origin validation.
    pub fn register_app(&mut self, config: AppConfig) {
        match self.apps.iter_mut().find(|app| app.id == config.id) {
            Some(existing) => *existing = config,
            None => self.apps.push(config),
        }
    }

    pub fn app(&self, app_id: &str) -> Option<&AppConfig> {
        self.apps.iter().find(|app| app.id == app_id)
    }

    pub fn apps(&self) -> impl Iterator<Item = &AppConfig> {
        self.apps.iter()
    }

    /// First registered application, used for preflight and not-found CORS
    /// headers. Falls back to `"main"` when nothing is configured.
    pub fn default_app_id(&self) -> &str {
        self.apps.first().map_or("main", |app| app.id.as_str())
    }

    /// Build the table from environment variables. Each application slot is
    /// registered only when its required variables are all present; a
    /// missing pair is a silent skip, not an error. Redirect URIs point back
    /// at this relay: `{origin}/app/{app_id}/callback/{provider}`.
    pub fn from_env(env: &EnvVars, origin: &str) -> Self {
        let mut table = Self::new();

        table.register_github_only_app(env, origin, "app1", "Application 1", "APP1", "http://localhost:3000");
        table.register_github_only_app(env, origin, "app2", "Application 2", "APP2", "http://localhost:8080");
        table.register_palmdocs(env, origin);

        table
    }

    fn register_github_only_app(
        &mut self,
        env: &EnvVars,
        origin: &str,
        id: &str,
        name: &str,
        prefix: &str,
        allowed_origin: &str,
    ) {
        let Some(config) = github_config(env, origin, prefix, id) else {
            return;
        };
        self.register_app(AppConfig {
            id: id.to_string(),
            name: name.to_string(),
            allowed_origins: vec![allowed_origin.to_string()],
            oauth_providers: HashMap::from([(ProviderKind::Github, config)]),
        });
    }

    fn register_palmdocs(&mut self, env: &EnvVars, origin: &str) {
        // The whole tenant is gated on its GitHub pair; the remaining
        // providers are added individually as their credentials appear.
        let Some(github) = github_config(env, origin, "PALMDOCS", "palmdocs") else {
            return;
        };

        let mut providers = HashMap::from([(ProviderKind::Github, github)]);
        let extras: [(ProviderKind, Option<Vec<&str>>); 4] = [
            (ProviderKind::Google, None),
            (
                ProviderKind::Dingtalk,
                Some(vec!["Contact.User.mobile", "Contact.User.Read"]),
            ),
            (ProviderKind::Qq, Some(vec!["get_user_info"])),
            (ProviderKind::Gitee, Some(vec!["user_info", "emails"])),
        ];
        for (kind, scope) in extras {
            let upper = kind.as_str().to_uppercase();
            let Some(mut config) = credential_pair(
                env,
                &format!("PALMDOCS_{upper}_CLIENT_ID"),
                &format!("PALMDOCS_{upper}_CLIENT_SECRET"),
                origin,
                "palmdocs",
                kind,
            ) else {
                continue;
            };
            if let Some(scope) = scope {
                config = config.with_scope(scope);
            }
            providers.insert(kind, config);
        }

        self.register_app(AppConfig {
            id: "palmdocs".to_string(),
            name: "Palm Docs".to_string(),
            allowed_origins: vec![
                "http://localhost:5180".to_string(),
                "http://localhost:4173".to_string(),
                "http://127.0.0.1:8787".to_string(),
                "https://palmdocs.gocheers.fun".to_string(),
            ],
            oauth_providers: providers,
        });
    }

    /// CORS headers for a response, computed purely from `(app_id, origin)`.
    ///
    /// Known app + matched origin echoes the origin and adds the strict
    /// security headers. Known app without a match falls back to the
    /// comma-joined allowed-origins list, which is not a valid single-origin
    /// value per the CORS wire format but is the relay's long-standing
    /// observable behavior. Unknown app omits the origin header entirely.
    pub fn cors_headers(&self, app_id: &str, request_origin: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization, Cookie"),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
        headers.insert(
            REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );

        let Some(app) = self.app(app_id) else {
            return headers;
        };

        let allow_origin = match request_origin {
            Some(origin) if app.allowed_origins.iter().any(|allowed| allowed == origin) => {
                origin.to_string()
            }
            _ => app.allowed_origins.join(","),
        };
        if let Ok(value) = HeaderValue::from_str(&allow_origin) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        headers.insert(CONTENT_SECURITY_POLICY, HeaderValue::from_static(DEFAULT_CSP));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

        headers
    }
}

fn github_config(env: &EnvVars, origin: &str, prefix: &str, app_id: &str) -> Option<OAuthConfig> {
    credential_pair(
        env,
        &format!("{prefix}_GITHUB_CLIENT_ID"),
        &format!("{prefix}_GITHUB_CLIENT_SECRET"),
        origin,
        app_id,
        ProviderKind::Github,
    )
}

fn credential_pair(
    env: &EnvVars,
    id_var: &str,
    secret_var: &str,
    origin: &str,
    app_id: &str,
    kind: ProviderKind,
) -> Option<OAuthConfig> {
    let client_id = env.get(id_var)?;
    let client_secret = env.get(secret_var)?;
    Some(OAuthConfig::new(
        client_id,
        client_secret,
        format!("{origin}/app/{app_id}/callback/{kind}"),
    ))
}
