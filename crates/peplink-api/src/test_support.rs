//! Device stand-in for tests: an axum router on an ephemeral port.

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::routing::post;
use peplink_auth::TOKEN_GRANT_PATH;
use tokio::net::TcpListener;

use crate::client::Client;
use crate::config::ClientConfig;

/// Grant endpoint reply for `token` valid for `ttl_secs`.
pub(crate) fn grant_body(token: &str, ttl_secs: u64) -> ([(axum::http::HeaderName, &'static str); 1], String) {
    (
        [(CONTENT_TYPE, "application/json")],
        serde_json::json!({
            "stat": "ok",
            "response": {
                "accessToken": token,
                "authorizationType": "3",
                "scope": "api",
                "expiresIn": ttl_secs.to_string(),
            }
        })
        .to_string(),
    )
}

/// Add a grant endpoint issuing `device-token` for two days.
pub(crate) fn with_grant(router: Router) -> Router {
    router.route(
        TOKEN_GRANT_PATH,
        post(|| async { grant_body("device-token", 172_800) }),
    )
}

/// Serve `router` on 127.0.0.1 and return its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Serve `routes` plus the standard grant endpoint and connect a client to it.
pub(crate) async fn connect_to(routes: Router) -> Client {
    let base = serve(with_grant(routes)).await;
    let config = ClientConfig::new("client_id", "client_secret").with_base_url(base);
    Client::connect(&config).await.unwrap()
}
