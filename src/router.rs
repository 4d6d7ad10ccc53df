use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::header::ORIGIN;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::RelayError;
use crate::config::AppConfigTable;
use crate::flow::FlowHandler;

/// Everything a request needs, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct RelayState {
    pub table: AppConfigTable,
    pub flow: FlowHandler,
}

/// A parsed relay path: `/app/{app_id}/{action}/{provider}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub app_id: String,
    pub action: Action,
    pub provider: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Login,
    Callback,
}

/// Anything that is not exactly an `/app/...` login or callback path is a
/// non-match (the router answers 404 for those).
pub fn parse_path(path: &str) -> Option<Route> {
    let rest = path.strip_prefix("/app/")?;
    let mut parts = rest.splitn(4, '/');
    let app_id = parts.next().filter(|s| !s.is_empty())?;
    let action = match parts.next()? {
        "login" => Action::Login,
        "callback" => Action::Callback,
        _ => return None,
    };
    let provider = parts.next().filter(|s| !s.is_empty())?;

    Some(Route {
        app_id: app_id.to_string(),
        action,
        provider: provider.to_string(),
    })
}

/// The relay is one catch-all handler: path parsing, CORS resolution and
/// dispatch all happen per request, mirroring an edge-worker fetch loop.
pub fn relay_router(state: Arc<RelayState>) -> Router {
    Router::new().fallback(handle_request).with_state(state)
}

async fn handle_request(State(state): State<Arc<RelayState>>, request: Request) -> Response {
    let request_origin = request
        .headers()
        .get(ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let default_app_id = state.table.default_app_id().to_string();

    if request.method() == Method::OPTIONS {
        let cors = state
            .table
            .cors_headers(&default_app_id, request_origin.as_deref());
        return stamped(StatusCode::OK.into_response(), &cors);
    }

    let path = request.uri().path().to_string();
    let Some(route) = parse_path(&path) else {
        let cors = state
            .table
            .cors_headers(&default_app_id, request_origin.as_deref());
        return stamped((StatusCode::NOT_FOUND, "Not Found").into_response(), &cors);
    };

    if state.table.app(&route.app_id).is_none() {
        let cors = state.table.cors_headers(&default_app_id, None);
        let err = RelayError::AppNotFound {
            app_id: route.app_id,
        };
        return stamped((err.status(), err.to_string()).into_response(), &cors);
    }

    // The dispatched response carries the app's own CORS set; no origin is
    // passed here, so the joined-list fallback applies.
    let cors = state.table.cors_headers(&route.app_id, None);

    let result = match route.action {
        Action::Login => state.flow.login(&route.app_id, &route.provider),
        Action::Callback => {
            let query = request.uri().query().unwrap_or("").to_string();
            state
                .flow
                .callback(&route.app_id, &route.provider, &query)
                .await
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(
                app_id = %route.app_id,
                provider = %route.provider,
                error = %err,
                "oauth flow failed"
            );
            (err.status(), err.to_string()).into_response()
        }
    };

    stamped(response, &cors)
}

/// Overwrite every CORS header onto the response, whatever the handler set.
fn stamped(mut response: Response, cors: &HeaderMap) -> Response {
    for (name, value) in cors {
        response.headers_mut().insert(name, value.clone());
    }
    response
}
