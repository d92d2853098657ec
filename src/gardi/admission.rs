//! Sliding-window request admission.
//!
//! Per-client request history is pruned on every check instead of being
//! bucketed, so a burst straddling a bucket boundary can never get double
//! allowance. The cost is O(entries-in-window) per check, which is fine
//! while windows are short and limits small. State is in-process only; a
//! multi-instance deployment needs a shared store, out of scope here.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Bucket for callers whose address could not be determined. They all share
/// one window instead of bypassing the limits.
pub const UNKNOWN_CLIENT: &str = "unknown";

const AUTH_MAX_REQUESTS: u32 = 5;
const AUTH_WINDOW: Duration = Duration::from_secs(300);
const GENERAL_MAX_REQUESTS: u32 = 100;
const GENERAL_WINDOW: Duration = Duration::from_secs(60);

/// Immutable rate-limit configuration. Callers pass the policy they want
/// enforced; nothing here is a singleton.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_requests: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Both fields are clamped to at least one so a zeroed policy can
    /// neither close a route entirely nor disable the window.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window: window.max(Duration::from_secs(1)),
        }
    }

    /// Strict policy for authentication routes.
    #[must_use]
    pub const fn auth() -> Self {
        Self {
            max_requests: AUTH_MAX_REQUESTS,
            window: AUTH_WINDOW,
        }
    }

    /// Lenient policy for general API routes.
    #[must_use]
    pub const fn general() -> Self {
        Self {
            max_requests: GENERAL_MAX_REQUESTS,
            window: GENERAL_WINDOW,
        }
    }

    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub const fn window_seconds(&self) -> u64 {
        self.window.as_secs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Reject,
}

/// In-memory sliding-window admission gate.
///
/// One mutex guards the whole map so the prune-count-append sequence for a
/// client is atomic with respect to every other caller, including `sweep`.
/// Nothing under the lock blocks.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    windows: Mutex<HashMap<String, Vec<(Instant, String)>>>,
}

impl AdmissionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a request from `client_id` against `route_id` may
    /// proceed under `policy`.
    ///
    /// Entries older than the window are discarded first; a rejected attempt
    /// is not recorded, so hammering a blocked route does not extend the
    /// block.
    pub async fn check(
        &self,
        client_id: &str,
        route_id: &str,
        policy: &RateLimitPolicy,
    ) -> Decision {
        let client = if client_id.is_empty() {
            UNKNOWN_CLIENT
        } else {
            client_id
        };
        let now = Instant::now();

        let mut windows = self.windows.lock().await;
        let entries = windows.entry(client.to_string()).or_default();

        entries.retain(|(seen, _)| now.duration_since(*seen) < policy.window);

        let recent = entries
            .iter()
            .filter(|(_, route)| route.as_str() == route_id)
            .count();

        if recent >= policy.max_requests as usize {
            debug!(client, route_id, recent, "request rejected by rate limit");
            return Decision::Reject;
        }

        entries.push((now, route_id.to_string()));

        Decision::Allow
    }

    /// Drop every per-client record whose newest entry is older than
    /// `max_age`, deleting emptied records to bound memory when clients go
    /// quiet. Runs under the same mutex as `check`.
    pub async fn sweep(&self, max_age: Duration) {
        let now = Instant::now();

        let mut windows = self.windows.lock().await;
        windows.retain(|_, entries| {
            entries.retain(|(seen, _)| now.duration_since(*seen) < max_age);
            !entries.is_empty()
        });
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.windows.lock().await.len()
    }
}
