//! Device API client and request executor
//!
//! A `Client` is only handed out after the first token grant succeeds. From
//! then on it owns exactly one background task, the renewal loop, which is
//! the sole writer of the credential store. Requests read the current token
//! once, at send time, and never wait on the loop.
//!
//! The token travels as the `accessToken` query parameter on every call.

use std::sync::Arc;

use peplink_auth::{
    Authenticator, Credential, CredentialStore, HttpAuthenticator, TokenManager,
    spawn_renewal_task,
};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::ordered::decode_ordered_items;

const ACCESS_TOKEN_PARAM: &str = "accessToken";
const JSON: &str = "application/json";

/// Authenticated client for one device.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
    cancel: CancellationToken,
    renewal: Option<JoinHandle<peplink_auth::Result<()>>>,
}

impl Client {
    /// Validate `config`, grant the first token over HTTP and start renewal.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))?;
        let authenticator = Arc::new(HttpAuthenticator::new(http.clone(), &config.base_url));

        Self::start(config, http, authenticator).await
    }

    /// Like `connect`, but grants tokens through `authenticator`.
    pub async fn connect_with(
        config: &ClientConfig,
        http: reqwest::Client,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        config.validate()?;
        Self::start(config, http, authenticator).await
    }

    async fn start(
        config: &ClientConfig,
        http: reqwest::Client,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        let store = Arc::new(CredentialStore::new());
        let manager = Arc::new(
            TokenManager::new(authenticator, Arc::clone(&store))
                .with_margin(config.renewal_margin),
        );

        let credentials = config.credentials();
        let ttl = manager.initialize(&credentials).await?;

        let cancel = CancellationToken::new();
        let renewal = spawn_renewal_task(manager, credentials, cancel.clone());

        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!(base_url = %base_url, ttl_secs = ttl.as_secs(), "device API client ready");

        Ok(Self {
            http,
            base_url,
            store,
            cancel,
            renewal: Some(renewal),
        })
    }

    /// Currently published credential.
    pub fn credential(&self) -> Option<Arc<Credential>> {
        self.store.get()
    }

    /// Whether the renewal loop is still running.
    ///
    /// `false` after a failed renewal: requests keep using the last token
    /// until the device starts rejecting it.
    pub fn renewal_active(&self) -> bool {
        self.renewal.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Issue a GET or POST against `path` and unwrap the envelope.
    ///
    /// Returns the raw `response` payload, or `None` for an ok envelope that
    /// carries none. Any other verb fails with `Error::UnsupportedMethod`
    /// before anything is sent.
    pub async fn execute<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<Box<RawValue>>>
    where
        B: Serialize + ?Sized,
    {
        if method != Method::GET && method != Method::POST {
            return Err(Error::UnsupportedMethod(method));
        }

        let result = self.send(&method, path, body).await;
        metrics::counter!(
            "peplink_requests_total",
            "method" => method.to_string(),
            "outcome" => outcome_label(&result)
        )
        .increment(1);
        result
    }

    async fn send<B>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Option<Box<RawValue>>>
    where
        B: Serialize + ?Sized,
    {
        // Read once; a renewal landing mid-request is picked up by the next call.
        let credential = self
            .store
            .get()
            .ok_or(peplink_auth::Error::NotAuthenticated)?;

        let url = format!("{}{path}", self.base_url);
        debug!(%method, path, "sending device API request");

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .query(&[(ACCESS_TOKEN_PARAM, credential.token.expose_str())]);
        // GET never carries a body.
        if let Some(body) = body.filter(|_| *method == Method::POST) {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{method} {path}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("reading {method} {path} response: {e}")))?;

        let envelope = match Envelope::parse(&text) {
            Ok(envelope) => envelope,
            // Proxies and web servers answer errors with HTML, not envelopes.
            Err(_) if !status.is_success() => {
                return Err(Error::Transport(format!(
                    "{method} {path}: HTTP {status}: {text}"
                )));
            }
            Err(e) => return Err(e),
        };

        envelope.into_payload().inspect_err(|e| {
            warn!(%method, path, http_status = status.as_u16(), error = %e, "device rejected request");
        })
    }

    /// GET `path` and decode the payload as `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let payload = self.execute(Method::GET, path, None::<&()>).await?;
        decode_payload(path, payload)
    }

    /// POST `body` to `path` and decode the payload as `T`.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = self.execute(Method::POST, path, Some(body)).await?;
        decode_payload(path, payload)
    }

    /// GET `path` and decode the payload as an ordered-index collection of `T`.
    pub async fn get_ordered<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let payload = self.execute(Method::GET, path, None::<&()>).await?;
        let raw = require_payload(path, payload)?;
        decode_ordered_items(raw.get())
    }

    /// Stop the renewal loop and wait for it to exit.
    ///
    /// A loop that already ended on a failed renewal is not an error here;
    /// that failure was logged when it happened.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        let Some(handle) = self.renewal.take() else {
            return Ok(());
        };

        match handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                debug!(error = %e, "renewal loop had already stopped");
                Ok(())
            }
            Err(e) => Err(Error::Shutdown(e.to_string())),
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("renewal_active", &self.renewal_active())
            .finish_non_exhaustive()
    }
}

fn require_payload(path: &str, payload: Option<Box<RawValue>>) -> Result<Box<RawValue>> {
    payload.ok_or_else(|| Error::Schema(format!("{path}: ok response carried no payload")))
}

fn decode_payload<T: DeserializeOwned>(path: &str, payload: Option<Box<RawValue>>) -> Result<T> {
    let raw = require_payload(path, payload)?;
    serde_json::from_str(raw.get()).map_err(|e| {
        warn!(path, error = %e, "payload does not match the requested type");
        Error::Decode {
            index: None,
            source: Box::new(e),
        }
    })
}

fn outcome_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(Error::Transport(_)) => "transport_error",
        Err(Error::Envelope { .. }) => "device_error",
        Err(Error::Schema(_)) => "schema_error",
        Err(Error::Decode { .. }) => "decode_error",
        Err(_) => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{connect_to, grant_body, serve};
    use axum::Json;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use peplink_auth::TOKEN_GRANT_PATH;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn connect_publishes_first_token() {
        let client = connect_to(Router::new()).await;

        let credential = client.credential().unwrap();
        assert_eq!(credential.token.expose_str(), "device-token");
        assert_eq!(credential.ttl(), Duration::from_secs(172_800));
        assert!(client.renewal_active());

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn connect_fails_when_grant_is_refused() {
        let router = Router::new().route(
            TOKEN_GRANT_PATH,
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    r#"{"stat":"fail","code":401,"message":"Unauthorized"}"#,
                )
            }),
        );
        let base = serve(router).await;

        let config = ClientConfig::new("client_id", "wrong").with_base_url(base);
        let err = Client::connect(&config).await.unwrap_err();
        assert!(
            matches!(err, Error::Auth(peplink_auth::Error::Auth(_))),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn connect_rejects_invalid_config_before_any_request() {
        let config = ClientConfig::new("client_id", "secret").with_base_url("ftp://router");
        let err = Client::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "got: {err:?}");
    }

    #[tokio::test]
    async fn requests_carry_token_and_json_headers() {
        let router = Router::new().route(
            "/api/echo",
            get(
                |Query(query): Query<HashMap<String, String>>, headers: HeaderMap| async move {
                    let header = |name: reqwest::header::HeaderName| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    Json(serde_json::json!({
                        "stat": "ok",
                        "response": {
                            "token": query.get("accessToken"),
                            "accept": header(ACCEPT),
                            "contentType": header(CONTENT_TYPE),
                        }
                    }))
                },
            ),
        );
        let client = connect_to(router).await;

        let echoed: serde_json::Value = client.get("/api/echo").await.unwrap();
        assert_eq!(echoed["token"], "device-token");
        assert_eq!(echoed["accept"], "application/json");
        assert_eq!(echoed["contentType"], "application/json");
    }

    #[tokio::test]
    async fn post_serializes_body() {
        let router = Router::new().route(
            "/api/config.echo",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({"stat": "ok", "response": body}))
            }),
        );
        let client = connect_to(router).await;

        let echoed: serde_json::Value = client
            .post("/api/config.echo", &serde_json::json!({"enable": true}))
            .await
            .unwrap();
        assert_eq!(echoed, serde_json::json!({"enable": true}));
    }

    #[tokio::test]
    async fn get_never_sends_a_body() {
        let router = Router::new().route(
            "/api/echo",
            get(|body: String| async move {
                Json(serde_json::json!({"stat": "ok", "response": body}))
            }),
        );
        let client = connect_to(router).await;

        let payload = client
            .execute(Method::GET, "/api/echo", Some(&serde_json::json!({"enable": 1})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.get(), r#""""#);
    }

    #[tokio::test]
    async fn other_verbs_are_rejected_without_sending() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/api/thing",
            axum::routing::any(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { r#"{"stat":"ok"}"# }
            }),
        );
        let client = connect_to(router).await;

        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let err = client
                .execute(method.clone(), "/api/thing", None::<&()>)
                .await
                .unwrap_err();
            assert!(
                matches!(&err, Error::UnsupportedMethod(m) if *m == method),
                "got: {err:?}"
            );
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fail_envelope_surfaces_code_and_message() {
        let router = Router::new().route(
            "/api/status.wan.connection",
            get(|| async { r#"{"stat":"fail","code":401,"message":"Unauthorized"}"# }),
        );
        let client = connect_to(router).await;

        let err = client
            .get::<serde_json::Value>("/api/status.wan.connection")
            .await
            .unwrap_err();
        match err {
            Error::Envelope { code, message, .. } => {
                assert_eq!(code, Some(401));
                assert_eq!(message.as_deref(), Some("Unauthorized"));
            }
            other => panic!("expected envelope error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_envelope_error_page_is_transport_error() {
        let router = Router::new().route(
            "/api/down",
            get(|| async { (StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>") }),
        );
        let client = connect_to(router).await;

        let err = client
            .get::<serde_json::Value>("/api/down")
            .await
            .unwrap_err();
        match err {
            Error::Transport(msg) => assert!(msg.contains("HTTP 502"), "got: {msg}"),
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_envelope_success_is_schema_error() {
        let router = Router::new().route("/api/odd", get(|| async { "plain text" }));
        let client = connect_to(router).await;

        assert!(matches!(
            client.get::<serde_json::Value>("/api/odd").await,
            Err(Error::Schema(_))
        ));
    }

    #[tokio::test]
    async fn ok_without_payload_is_schema_error_for_typed_get() {
        let router = Router::new().route("/api/empty", get(|| async { r#"{"stat":"ok"}"# }));
        let client = connect_to(router).await;

        assert!(
            client
                .execute(Method::GET, "/api/empty", None::<&()>)
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            client.get::<serde_json::Value>("/api/empty").await,
            Err(Error::Schema(_))
        ));
    }

    #[tokio::test]
    async fn mistyped_payload_is_decode_error_not_schema_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Counter {
            #[allow(dead_code)]
            x: u32,
        }

        let router = Router::new().route(
            "/api/counter",
            get(|| async { r#"{"stat":"ok","response":{"x":"not-a-number"}}"# }),
        );
        let client = connect_to(router).await;

        let err = client.get::<Counter>("/api/counter").await.unwrap_err();
        assert!(
            matches!(err, Error::Decode { index: None, .. }),
            "got: {err:?}"
        );
        assert!(err.to_string().contains("expected u32"), "got: {err}");
    }

    #[tokio::test]
    async fn get_ordered_follows_order_array() {
        let router = Router::new().route(
            "/api/list",
            get(|| async {
                r#"{"stat":"ok","response":{"1":"a","2":"b","3":"c","order":[3,1,2]}}"#
            }),
        );
        let client = connect_to(router).await;

        let items: Vec<String> = client.get_ordered("/api/list").await.unwrap();
        assert_eq!(items, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn renewed_token_is_used_by_later_requests() {
        let grants = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&grants);
        let router = Router::new()
            .route(
                TOKEN_GRANT_PATH,
                post(move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move { grant_body(&format!("token-{n}"), 4) }
                }),
            )
            .route(
                "/api/whoami",
                get(|Query(query): Query<HashMap<String, String>>| async move {
                    Json(serde_json::json!({"stat": "ok", "response": query.get("accessToken")}))
                }),
            );
        let base = serve(router).await;

        // 4s tokens with a 2s margin: renewals land 2s apart.
        let config = ClientConfig::new("client_id", "client_secret")
            .with_base_url(base)
            .with_renewal_margin(Duration::from_secs(2));
        let client = Client::connect(&config).await.unwrap();

        let before: String = client.get("/api/whoami").await.unwrap();
        assert_eq!(before, "token-1");

        let renewed = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let token: String = client.get("/api/whoami").await.unwrap();
                if token != "token-1" {
                    return token;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
        .expect("renewed token was never used");
        assert_eq!(renewed, "token-2");
        assert!(grants.load(Ordering::SeqCst) >= 2);

        client.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_renewal() {
        let client = connect_to(Router::new()).await;
        assert!(client.renewal_active());
        tokio::time::timeout(Duration::from_secs(1), client.shutdown())
            .await
            .expect("shutdown must not wait for the next renewal")
            .unwrap();
    }

    #[tokio::test]
    async fn failed_renewal_leaves_stale_token_in_use() {
        let grants = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&grants);
        let router = Router::new()
            .route(
                TOKEN_GRANT_PATH,
                post(move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            grant_body("token-1", 4).into_response()
                        } else {
                            (
                                StatusCode::SERVICE_UNAVAILABLE,
                                r#"{"stat":"fail","code":503,"message":"busy"}"#,
                            )
                                .into_response()
                        }
                    }
                }),
            )
            .route(
                "/api/whoami",
                get(|Query(query): Query<HashMap<String, String>>| async move {
                    Json(serde_json::json!({"stat": "ok", "response": query.get("accessToken")}))
                }),
            );
        let base = serve(router).await;

        let config = ClientConfig::new("client_id", "client_secret")
            .with_base_url(base)
            .with_renewal_margin(Duration::from_secs(2));
        let client = Client::connect(&config).await.unwrap();

        tokio::time::timeout(Duration::from_secs(10), async {
            while client.renewal_active() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
        .expect("loop must stop after one failure");
        assert_eq!(grants.load(Ordering::SeqCst), 2, "no retry");
        let token: String = client.get("/api/whoami").await.unwrap();
        assert_eq!(token, "token-1");

        client.shutdown().await.unwrap();
    }
}
