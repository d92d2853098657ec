pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod me;
pub use self::me::me;

// common functions for the handlers
use crate::gardi::admission::{AdmissionGate, Decision, RateLimitPolicy, UNKNOWN_CLIENT};
use crate::gardi::errors::AuthError;
use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{Extensions, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Client identity for rate limiting: proxy headers first, then the socket
/// peer address, then the shared `unknown` bucket.
#[must_use]
pub fn client_id(headers: &HeaderMap, extensions: &Extensions) -> String {
    header_value(headers, "x-forwarded-for")
        .or_else(|| header_value(headers, "x-real-ip"))
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Route-level admission check. The route's policy rides in as middleware
/// state; the gate is injected by the outer `Extension` layer. A reject
/// surfaces as 429 carrying the policy's limits for backoff guidance.
pub async fn admit(
    State(policy): State<RateLimitPolicy>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let gate = request
        .extensions()
        .get::<Arc<AdmissionGate>>()
        .cloned()
        .ok_or_else(|| {
            AuthError::Internal(anyhow::anyhow!(
                "admission gate missing from request extensions"
            ))
        })?;

    let client = client_id(request.headers(), request.extensions());

    // Matched route, not the raw path, so `/items/1` and `/items/2` land in
    // the same bucket.
    let route = request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |path| path.as_str().to_string(),
    );

    match gate.check(&client, &route, &policy).await {
        Decision::Allow => Ok(next.run(request).await),
        Decision::Reject => {
            debug!(%client, %route, "rejecting over-limit request");
            Err(AuthError::RateLimitExceeded {
                max_requests: policy.max_requests(),
                window_seconds: policy.window_seconds(),
            })
        }
    }
}
