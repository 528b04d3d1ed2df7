//! Token resolution entry point
//!
//! Composes classification, evaluation and the store's atomic consume into
//! one `resolve` call. Nothing here returns an error: every failure is a
//! [`BlockReason`], and callers only ever see an [`ExternalSignal`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use super::clock::{Clock, SystemClock};
use super::policy::{AccessContext, BlockReason, Decision, evaluate};
use super::prefetch::{AccessKind, RequestHeaders, classify_request};
use crate::storage::{ConsumeOutcome, LinkStore};
use crate::utils::is_valid_token;
use crate::utils::password::verify_password;

/// What the resolver knows about the incoming request
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub headers: RequestHeaders,
    pub is_head: bool,
    /// Link password supplied by the visitor, if any
    pub password: Option<String>,
}

impl RequestMetadata {
    pub fn from_headers(headers: RequestHeaders) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// `counted` is false for speculative access
    Redirect { target_url: String, counted: bool },
    Blocked(BlockReason),
}

/// The only distinctions a visitor can observe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalSignal {
    Redirect { target_url: String, kind: AccessKind },
    /// Disabled, expired, exhausted, unknown, password or store failure
    Blocked,
    NotYetAvailable { reveal_at: Option<DateTime<Utc>> },
}

impl ResolveOutcome {
    pub fn external(&self) -> ExternalSignal {
        match self {
            ResolveOutcome::Redirect {
                target_url,
                counted,
            } => ExternalSignal::Redirect {
                target_url: target_url.clone(),
                kind: if *counted {
                    AccessKind::Real
                } else {
                    AccessKind::Speculative
                },
            },
            ResolveOutcome::Blocked(BlockReason::NotYetAvailable { reveal_at }) => {
                ExternalSignal::NotYetAvailable {
                    reveal_at: Some(*reveal_at),
                }
            }
            ResolveOutcome::Blocked(_) => ExternalSignal::Blocked,
        }
    }
}

#[derive(Clone)]
pub struct TokenResolver {
    /// `None` when no store is configured; every token is refused
    store: Option<Arc<dyn LinkStore>>,
    clock: Arc<dyn Clock>,
    head_is_speculative: bool,
}

impl TokenResolver {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self {
            store: Some(store),
            clock: Arc::new(SystemClock),
            head_is_speculative: true,
        }
    }

    /// Resolver for a process that has no usable store
    pub fn fail_closed() -> Self {
        Self {
            store: None,
            clock: Arc::new(SystemClock),
            head_is_speculative: true,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_head_is_speculative(mut self, head_is_speculative: bool) -> Self {
        self.head_is_speculative = head_is_speculative;
        self
    }

    pub fn is_fail_closed(&self) -> bool {
        self.store.is_none()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn resolve(&self, token: &str, request: &RequestMetadata) -> ResolveOutcome {
        let Some(store) = self.store.as_deref() else {
            return ResolveOutcome::Blocked(BlockReason::Unavailable);
        };

        if !is_valid_token(token) {
            return ResolveOutcome::Blocked(BlockReason::NotFound);
        }

        let kind = classify_request(request.is_head, &request.headers, self.head_is_speculative);
        let now = self.clock.now();

        let outcome = match kind {
            AccessKind::Speculative => self.peek(store, token, now, request).await,
            AccessKind::Real => self.consume(store, token, now, request).await,
        };

        match &outcome {
            ResolveOutcome::Redirect { counted, .. } => {
                debug!("Resolved {} ({:?}, counted: {})", token, kind, counted);
            }
            ResolveOutcome::Blocked(reason) => {
                debug!("Blocked {} ({:?}): {}", token, kind, reason);
            }
        }
        outcome
    }

    /// Read-only path: never touches the consuming half of the store
    async fn peek(
        &self,
        store: &dyn LinkStore,
        token: &str,
        now: DateTime<Utc>,
        request: &RequestMetadata,
    ) -> ResolveOutcome {
        let link = match store.get(token).await {
            Ok(Some(link)) => link,
            Ok(None) => return ResolveOutcome::Blocked(BlockReason::NotFound),
            Err(e) => {
                error!("Read of {} failed for speculative access: {}", token, e);
                return ResolveOutcome::Blocked(BlockReason::TransientError);
            }
        };

        let verified =
            match password_matches(token, request.password.as_deref(), link.password.as_deref())
                .await
            {
                Ok(verified) => verified,
                Err(reason) => return ResolveOutcome::Blocked(reason),
            };
        let access = AccessContext::with_password_verified(verified);

        match evaluate(&link, now, &access) {
            Decision::Allow => ResolveOutcome::Redirect {
                target_url: link.target_url,
                counted: false,
            },
            Decision::Block(reason) => ResolveOutcome::Blocked(reason),
        }
    }

    async fn consume(
        &self,
        store: &dyn LinkStore,
        token: &str,
        now: DateTime<Utc>,
        request: &RequestMetadata,
    ) -> ResolveOutcome {
        // 密码不可变，可在原子单元之外校验；无密码提交时不需要额外读取
        let access = match request.password.as_deref() {
            None => AccessContext::anonymous(),
            Some(supplied) => match store.get(token).await {
                Ok(Some(link)) => {
                    match password_matches(token, Some(supplied), link.password.as_deref()).await
                    {
                        Ok(verified) => AccessContext::with_password_verified(verified),
                        Err(reason) => return ResolveOutcome::Blocked(reason),
                    }
                }
                Ok(None) => return ResolveOutcome::Blocked(BlockReason::NotFound),
                Err(e) => {
                    error!("Read of {} failed before consume: {}", token, e);
                    return ResolveOutcome::Blocked(BlockReason::TransientError);
                }
            },
        };

        match store.resolve_and_consume(token, now, &access).await {
            ConsumeOutcome::Redirect(target_url) => ResolveOutcome::Redirect {
                target_url,
                counted: true,
            },
            ConsumeOutcome::Blocked(reason) => ResolveOutcome::Blocked(reason),
        }
    }
}

/// Argon2 校验是 CPU 密集操作，放到阻塞线程池执行，不占用 worker
async fn password_matches(
    token: &str,
    supplied: Option<&str>,
    stored_hash: Option<&str>,
) -> Result<bool, BlockReason> {
    let (supplied, hash) = match (supplied, stored_hash) {
        (Some(supplied), Some(hash)) if !supplied.is_empty() => {
            (supplied.to_string(), hash.to_string())
        }
        _ => return Ok(false),
    };

    tokio::task::spawn_blocking(move || verify_password(&supplied, &hash))
        .await
        .map_err(|e| {
            error!("Password check for {} failed to complete: {}", token, e);
            BlockReason::TransientError
        })
}
