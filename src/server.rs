use std::sync::Arc;

use crate::RelayError;
use crate::router::{RelayState, relay_router};

/// Bind and serve until ctrl-c.
pub async fn serve(host: &str, port: u16, state: Arc<RelayState>) -> Result<(), RelayError> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "oauth relay listening");

    axum::serve(listener, relay_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}
