use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use session_token::Signer;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{Span, debug_span, info};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod authz;
pub mod config;
pub mod cookie;
pub mod domains;
pub mod handlers;
pub mod idp;
pub mod nonce;
pub mod types;

use self::config::Config;
use self::idp::Provider;
use self::nonce::NonceStore;

const OUTBOUND_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const OUTBOUND_TOTAL_TIMEOUT: Duration = Duration::from_secs(10);
const HANDLER_TIMEOUT: Duration = Duration::from_secs(15);
const NONCE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::healthcheck,
        handlers::validate::validate,
        handlers::login::login,
        handlers::callback::callback,
        handlers::logout::logout,
    ),
    components(schemas(handlers::health::Health)),
    tags(
        (name = "auth", description = "SSO authentication state machine"),
        (name = "health", description = "Service probes"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Everything a handler needs, composed once at startup. Immutable except
/// for the interior-mutable nonce store; shared via `Arc` across requests.
pub struct Services {
    pub config: Config,
    pub signer: Signer,
    pub provider: Provider,
    pub nonces: NonceStore,
    pub http: reqwest::Client,
}

impl Services {
    /// Compose the service state from a validated configuration and signing
    /// key material.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is inconsistent, the provider
    /// name is unknown, or the outbound HTTP client cannot be built.
    pub fn new(config: Config, signer: Signer) -> Result<Self> {
        config.validate()?;
        let provider = config
            .oauth
            .provider
            .parse::<Provider>()
            .map_err(|err| anyhow!(err))?;
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(OUTBOUND_CONNECT_TIMEOUT)
            .timeout(OUTBOUND_TOTAL_TIMEOUT)
            .build()
            .context("failed to build outbound HTTP client")?;
        let nonces = NonceStore::new(Duration::from_secs(config.nonce_ttl_seconds));
        Ok(Self {
            config,
            signer,
            provider,
            nonces,
            http,
        })
    }

    /// Test-support constructor: HS256 with a fixed secret, provider and
    /// outbound client built without config validation.
    #[doc(hidden)]
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn for_tests(config: Config) -> Self {
        let signer = Signer::hs256(b"not-so-secret-test-key").expect("static secret is non-empty");
        let provider = config
            .oauth
            .provider
            .parse::<Provider>()
            .expect("test provider name");
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .connect_timeout(OUTBOUND_CONNECT_TIMEOUT)
            .timeout(OUTBOUND_TOTAL_TIMEOUT)
            .build()
            .expect("test HTTP client");
        let nonces = NonceStore::new(Duration::from_secs(config.nonce_ttl_seconds));
        Self {
            config,
            signer,
            provider,
            nonces,
            http,
        }
    }
}

/// Build the router with the shared middleware stack.
pub fn app(services: Arc<Services>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route("/validate", get(handlers::validate))
        .route("/login", get(handlers::login))
        .route("/auth", get(handlers::callback))
        .route("/logout", get(handlers::logout))
        .route("/healthcheck", get(handlers::healthcheck))
        .fallback(external_auth)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(TimeoutLayer::new(HANDLER_TIMEOUT))
                .layer(cors)
                .layer(Extension(services)),
        )
}

/// `/_external-auth-{id}` aliases of `/validate`, one per upstream. The id
/// is embedded in the path segment, so these are matched by prefix here
/// rather than in the route table.
async fn external_auth(
    Extension(services): Extension<Arc<Services>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if uri.path().starts_with("/_external-auth-") {
        return handlers::validate(Extension(services), headers).await;
    }
    StatusCode::NOT_FOUND.into_response()
}

/// Bind, serve, and sweep nonces until shutdown.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn new(services: Services) -> Result<()> {
    let listen = format!("{}:{}", services.config.listen, services.config.port);
    let services = Arc::new(services);

    let sweeper = Arc::clone(&services);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(NONCE_SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweeper.nonces.sweep().await;
        }
    });

    let app = app(Arc::clone(&services));

    let listener = TcpListener::bind(&listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;

    info!("Listening on {}", listen);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(Arc::new(Services::for_tests(Config::default())))
    }

    async fn send(app: Router, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
    }

    #[tokio::test]
    async fn healthcheck_returns_ok_true() {
        let response = send(test_app(), "/healthcheck").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), 1024).await.expect("body");
        assert_eq!(&body[..], br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn validate_without_cookie_is_unauthorized() {
        let response = send(test_app(), "/validate").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("x-vouch-err").is_some());
    }

    #[tokio::test]
    async fn external_auth_alias_behaves_like_validate() {
        let response = send(test_app(), "/_external-auth-app1").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = send(test_app(), "/definitely-not-a-route").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_without_url_is_bad_request() {
        let response = send(test_app(), "/login").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn openapi_document_lists_every_endpoint() {
        let doc = openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in ["/validate", "/login", "/auth", "/logout", "/healthcheck"] {
            assert!(
                paths.iter().any(|path| *path == expected),
                "missing {expected} in {paths:?}"
            );
        }
    }
}
