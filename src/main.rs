use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use oauth_relay::config::AppConfigTable;
use oauth_relay::env::EnvVars;
use oauth_relay::flow::FlowHandler;
use oauth_relay::router::RelayState;
use oauth_relay::{RelayError, server};

#[derive(Debug, Parser)]
#[command(
    name = "oauth-relay",
    about = "Multi-tenant OAuth relay for login-with-provider browser flows."
)]
struct Cli {
    #[arg(long, env = "RELAY_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "RELAY_PORT", default_value_t = 8787)]
    port: u16,

    /// Public origin callers reach this relay at; redirect URIs are
    /// synthesized as {origin}/app/{app_id}/callback/{provider}.
    #[arg(long, env = "RELAY_PUBLIC_ORIGIN")]
    public_origin: Option<String>,

    /// Log filter, e.g. "info" or "oauth_relay=debug".
    #[arg(long, env = "RELAY_LOG", default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let origin = cli
        .public_origin
        .clone()
        .unwrap_or_else(|| format!("http://{}:{}", cli.host, cli.port));

    let env = EnvVars::from_process();
    let table = AppConfigTable::from_env(&env, &origin);
    for app in table.apps() {
        tracing::info!(
            app_id = %app.id,
            providers = app.oauth_providers.len(),
            "registered application"
        );
    }
    if table.apps().count() == 0 {
        tracing::warn!("no applications configured; every request will 404");
    }

    let flow = FlowHandler::from_table(&table)?;
    let state = Arc::new(RelayState { table, flow });

    server::serve(&cli.host, cli.port, state).await
}
