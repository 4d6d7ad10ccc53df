use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, LOCATION,
};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use tower::ServiceExt;
use url::Url;

use oauth_relay::config::AppConfigTable;
use oauth_relay::env::EnvVars;
use oauth_relay::flow::FlowHandler;
use oauth_relay::router::{RelayState, relay_router};

fn app1_state() -> Arc<RelayState> {
    let env = EnvVars::from([
        ("APP1_GITHUB_CLIENT_ID", "gh-id"),
        ("APP1_GITHUB_CLIENT_SECRET", "gh-secret"),
    ]);
    let table = AppConfigTable::from_env(&env, "http://127.0.0.1:8787");
    let flow = FlowHandler::from_table(&table).unwrap();
    Arc::new(RelayState { table, flow })
}

async fn send(state: Arc<RelayState>, request: Request<Body>) -> Response {
    relay_router(state).oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn preflight_echoes_allowed_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/anything")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = send(app1_state(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn login_redirects_to_github_with_uuid_state() {
    let request = Request::builder()
        .uri("/app/app1/login/github")
        .body(Body::empty())
        .unwrap();
    let response = send(app1_state(), request).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = Url::parse(response.headers()[LOCATION].to_str().unwrap()).unwrap();
    assert_eq!(location.host_str(), Some("github.com"));

    let pairs: std::collections::HashMap<String, String> =
        location.query_pairs().into_owned().collect();
    assert_eq!(pairs["client_id"], "gh-id");
    assert_eq!(pairs["scope"], "read:user user:email");
    assert!(uuid::Uuid::parse_str(&pairs["state"]).is_ok());
}

#[tokio::test]
async fn login_response_carries_app_cors_headers() {
    let request = Request::builder()
        .uri("/app/app1/login/github")
        .body(Body::empty())
        .unwrap();
    let response = send(app1_state(), request).await;

    // Dispatched responses get the joined-list fallback (no origin is
    // consulted), which for a single allowed origin is the origin itself.
    assert_eq!(
        response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let request = Request::builder()
        .uri("/foo/bar")
        .body(Body::empty())
        .unwrap();
    let response = send(app1_state(), request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Not Found");
}

#[tokio::test]
async fn unknown_app_is_not_found_with_app_id_in_body() {
    let request = Request::builder()
        .uri("/app/nope/login/github")
        .body(Body::empty())
        .unwrap();
    let response = send(app1_state(), request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Application not found: nope");
}

#[tokio::test]
async fn unmapped_provider_is_not_found() {
    for action in ["login", "callback"] {
        let request = Request::builder()
            .uri(format!("/app/app1/{action}/google?code=a&state=b"))
            .body(Body::empty())
            .unwrap();
        let response = send(app1_state(), request).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "Provider not found for app: app1");
    }
}

#[tokio::test]
async fn callback_without_state_is_bad_request() {
    let request = Request::builder()
        .uri("/app/app1/callback/github?code=abc")
        .body(Body::empty())
        .unwrap();
    let response = send(app1_state(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Missing code or state");
}

#[tokio::test]
async fn empty_table_serves_default_cors_without_origin() {
    let table = AppConfigTable::new();
    let flow = FlowHandler::from_table(&table).unwrap();
    let state = Arc::new(RelayState { table, flow });

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = send(state, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key(ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
