//! # Access Gate
//!
//! Decides whether the current caller may use the system: whitelisted users
//! always may; everyone else needs an active subscription.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  check_access()                                                         │
//! │     │                                                                   │
//! │     ├── current_user() ─────────── None ──► Unauthenticated             │
//! │     │                                                                   │
//! │     ├── WhitelistCache (session) ─ hit ───► cached answer               │
//! │     │        └── miss ──► WhitelistSource, then cache                   │
//! │     │                                                                   │
//! │     ├── whitelisted ──────────────────────► Whitelisted                 │
//! │     │                                                                   │
//! │     └── SubscriptionBilling (RetryPolicy)                               │
//! │              ├── active ──────────────────► Subscribed                  │
//! │              ├── inactive ────────────────► Denied                      │
//! │              └── retries exhausted ───────► SubscriptionUnavailable     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache belongs to one session id. A different session (new login or
//! another user) starts from an empty cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{SalesError, SalesResult};
use crate::traits::{CurrentUser, IdentityProvider, SubscriptionBilling, WhitelistSource};

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential backoff for calls to external backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Runs `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. Only [`SalesError::is_retryable`] errors are retried.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> SalesResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SalesResult<T>>,
    {
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                warn!(attempts = attempt, error = %err, "Retry budget exhausted");
                return Err(err);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!(attempt, ?delay, error = %err, "Transient failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                None => return Err(err),
            }
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };
        // current_interval starts from the crate default otherwise
        backoff.reset();
        backoff
    }
}

// =============================================================================
// Whitelist Cache
// =============================================================================

/// Whitelist answers for a single session.
#[derive(Debug, Clone, Default)]
pub struct WhitelistCache {
    session_id: Option<String>,
    entries: HashMap<String, bool>,
}

impl WhitelistCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached answer for `user_id`, if it was stored under `session_id`.
    pub fn get(&self, session_id: &str, user_id: &str) -> Option<bool> {
        if self.session_id.as_deref() != Some(session_id) {
            return None;
        }
        self.entries.get(user_id).copied()
    }

    /// Stores an answer; switching sessions drops everything cached before.
    pub fn insert(&mut self, session_id: &str, user_id: &str, whitelisted: bool) {
        if self.session_id.as_deref() != Some(session_id) {
            self.entries.clear();
            self.session_id = Some(session_id.to_string());
        }
        self.entries.insert(user_id.to_string(), whitelisted);
    }

    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Access Gate
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum AccessDecision {
    Whitelisted,
    Subscribed { plan: Option<String> },
    Denied,
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, AccessDecision::Denied)
    }
}

pub struct AccessGate {
    identity: Arc<dyn IdentityProvider>,
    whitelist: Arc<dyn WhitelistSource>,
    billing: Arc<dyn SubscriptionBilling>,
    cache: Mutex<WhitelistCache>,
    policy: RetryPolicy,
}

impl AccessGate {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        whitelist: Arc<dyn WhitelistSource>,
        billing: Arc<dyn SubscriptionBilling>,
        policy: RetryPolicy,
    ) -> Self {
        AccessGate {
            identity,
            whitelist,
            billing,
            cache: Mutex::new(WhitelistCache::new()),
            policy,
        }
    }

    pub async fn check_access(&self) -> SalesResult<AccessDecision> {
        let user = self
            .identity
            .current_user()
            .await
            .ok_or(SalesError::Unauthenticated)?;

        if self.is_whitelisted(&user).await? {
            debug!(user_id = %user.id, "Access granted by whitelist");
            return Ok(AccessDecision::Whitelisted);
        }

        let status = self
            .policy
            .run(|| self.billing.check_subscription(&user.id))
            .await?;

        let decision = if status.active {
            AccessDecision::Subscribed { plan: status.plan }
        } else {
            AccessDecision::Denied
        };
        info!(user_id = %user.id, ?decision, "Access checked");
        Ok(decision)
    }

    /// Drops every cached whitelist answer.
    pub async fn invalidate_cache(&self) {
        self.cache.lock().await.invalidate();
    }

    async fn is_whitelisted(&self, user: &CurrentUser) -> SalesResult<bool> {
        if let Some(hit) = self.cache.lock().await.get(&user.session_id, &user.id) {
            return Ok(hit);
        }

        let whitelisted = self.whitelist.is_whitelisted(&user.id).await?;
        self.cache
            .lock()
            .await
            .insert(&user.session_id, &user.id, whitelisted);
        Ok(whitelisted)
    }
}
