//! Service assembly: router, shared state, and the admission sweep task.
//!
//! Two independent cores compose at the request boundary. The admission
//! gate runs as route-level middleware before any handler; the credential
//! engine is consulted by the login and current-user handlers. They share
//! no state and are wired here through `Extension` layers.

use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Method, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug, debug_span, info, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod admission;
pub mod credentials;
pub mod errors;
pub mod handlers;
pub mod store;

use admission::{AdmissionGate, RateLimitPolicy};
use credentials::TokenSigner;
use store::{InMemoryUserStore, UserStore};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

// Idle clients are dropped by the background sweep to bound memory.
const SWEEP_INTERVAL: Duration = Duration::from_secs(600);
const SWEEP_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::login::login,
        handlers::me::me,
    ),
    components(schemas(
        handlers::login::LoginRequest,
        handlers::login::LoginResponse,
        handlers::login::LoginUser,
    )),
    tags(
        (name = "gardi", description = "Request admission and credential issuance API"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    debug_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        %request_id,
    )
}

/// Build the application router. Kept apart from `new` so tests can drive
/// it with `tower::ServiceExt::oneshot`.
#[must_use]
pub fn router(
    gate: Arc<AdmissionGate>,
    signer: Arc<TokenSigner>,
    users: Arc<dyn UserStore>,
) -> Router {
    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    let auth_routes = Router::new()
        .route("/login", post(handlers::login))
        .route_layer(middleware::from_fn_with_state(
            RateLimitPolicy::auth(),
            handlers::admit,
        ));

    let api_routes = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(
            RateLimitPolicy::general(),
            handlers::admit,
        ));

    Router::new()
        .merge(auth_routes)
        .merge(api_routes)
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
                .layer(cors)
                .layer(Extension(gate))
                .layer(Extension(signer))
                .layer(Extension(users)),
        )
        .route("/health", get(handlers::health).options(handlers::health))
}

/// Start the service.
///
/// # Errors
/// Returns an error when the token secret is invalid or the listener cannot
/// bind.
pub async fn new(port: u16, globals: &GlobalArgs) -> Result<()> {
    let gate = Arc::new(AdmissionGate::new());
    let signer = Arc::new(TokenSigner::new(
        &globals.token_secret,
        Duration::from_secs(globals.token_ttl_seconds),
    )?);
    let users: Arc<dyn UserStore> = Arc::new(InMemoryUserStore::new());

    let sweeper = Arc::clone(&gate);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweeper.sweep(SWEEP_MAX_AGE).await;
            let clients = sweeper.tracked_clients().await;
            debug!(clients, "admission sweep finished");
        }
    });

    let app = router(gate, signer, users);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
