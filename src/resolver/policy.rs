//! Access policy evaluation
//!
//! Pure decision over a link snapshot and an instant. The same function
//! gates read-only (speculative) access and the first half of the atomic
//! consume, so both paths always agree on the reason.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::ShortLink;

/// Why an access was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    /// `active == false` without a reached quota: owner disabled
    Disabled,
    NotYetAvailable { reveal_at: DateTime<Utc> },
    Expired,
    /// Quota reached, including a retired (inactive) exhausted or phantom link
    QuotaExceeded,
    PasswordRequired,
    /// Unknown token; externally identical to `Expired`
    NotFound,
    /// Store failed after bounded retries
    TransientError,
    /// No store configured, every token is refused
    Unavailable,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockReason::Disabled => "disabled",
            BlockReason::NotYetAvailable { .. } => "not_yet_available",
            BlockReason::Expired => "expired",
            BlockReason::QuotaExceeded => "quota_exceeded",
            BlockReason::PasswordRequired => "password_required",
            BlockReason::NotFound => "not_found",
            BlockReason::TransientError => "transient_error",
            BlockReason::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request facts the evaluator needs besides the link itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessContext {
    /// A password was supplied and matched the stored hash
    pub password_verified: bool,
}

impl AccessContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_password_verified(verified: bool) -> Self {
        Self {
            password_verified: verified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block(BlockReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluate a link snapshot at `now`.
///
/// Check order is fixed:
/// 1. inactive (reported as quota exceeded when the quota explains it)
/// 2. before `reveal_at` (the instant itself is eligible)
/// 3. at or after `expires_at`
/// 4. quota reached
/// 5. password required but not verified
pub fn evaluate(link: &ShortLink, now: DateTime<Utc>, access: &AccessContext) -> Decision {
    if !link.active {
        let exhausted = link.max_clicks.is_some_and(|max| link.click_count >= max);
        return Decision::Block(if exhausted {
            BlockReason::QuotaExceeded
        } else {
            BlockReason::Disabled
        });
    }

    if let Some(reveal_at) = link.reveal_at
        && now < reveal_at
    {
        return Decision::Block(BlockReason::NotYetAvailable { reveal_at });
    }

    if let Some(expires_at) = link.expires_at
        && now >= expires_at
    {
        return Decision::Block(BlockReason::Expired);
    }

    if let Some(max_clicks) = link.max_clicks
        && link.click_count >= max_clicks
    {
        return Decision::Block(BlockReason::QuotaExceeded);
    }

    if link.has_password() && !access.password_verified {
        return Decision::Block(BlockReason::PasswordRequired);
    }

    Decision::Allow
}
