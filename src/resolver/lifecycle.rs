//! Link lifecycle
//!
//! Derives the observable state of a link and decides the terminal write
//! that follows a consuming access. Time-based states are observed lazily;
//! nothing here sweeps rows in the background.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::ShortLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// `reveal_at` still in the future
    Scheduled,
    Active,
    /// Quota reached by a consuming access
    Exhausted,
    /// `expires_at` passed; `active` may still be true in storage
    Expired,
    PhantomConsumed,
    /// Deactivated by the owner
    Disabled,
}

impl LinkState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LinkState::Exhausted
                | LinkState::Expired
                | LinkState::PhantomConsumed
                | LinkState::Disabled
        )
    }
}

/// Observed state of `link` at `now`.
///
/// An inactive row is attributed to the lifecycle boundary that explains it
/// (phantom used, quota reached); otherwise the owner disabled it.
pub fn state_of(link: &ShortLink, now: DateTime<Utc>) -> LinkState {
    if !link.active {
        if link.is_phantom && link.click_count >= 1 {
            return LinkState::PhantomConsumed;
        }
        if link.max_clicks.is_some_and(|max| link.click_count >= max) {
            return LinkState::Exhausted;
        }
        return LinkState::Disabled;
    }

    if link.reveal_at.is_some_and(|reveal_at| now < reveal_at) {
        return LinkState::Scheduled;
    }
    if link.expires_at.is_some_and(|expires_at| now >= expires_at) {
        return LinkState::Expired;
    }
    if link.max_clicks.is_some_and(|max| link.click_count >= max) {
        // 仅在旧数据中出现：配额已满但未退役
        return LinkState::Exhausted;
    }
    LinkState::Active
}

/// Boundary crossed by a consuming access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retirement {
    Exhausted,
    PhantomConsumed,
}

/// Write the store performs for a retirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireAction {
    /// `active = false`; converges under concurrent writers
    Deactivate,
    /// Row removed; deleting an absent row is a no-op
    Delete,
}

/// Decides terminal transitions after a granted, already-incremented access
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleAuthority {
    delete_consumed_phantoms: bool,
}

impl LifecycleAuthority {
    pub fn new(delete_consumed_phantoms: bool) -> Self {
        Self {
            delete_consumed_phantoms,
        }
    }

    /// Inspect the post-increment row and return the terminal write, if any.
    pub fn after_consume(&self, link: &ShortLink) -> Option<(Retirement, RetireAction)> {
        if link.is_phantom {
            let action = if self.delete_consumed_phantoms {
                RetireAction::Delete
            } else {
                RetireAction::Deactivate
            };
            return Some((Retirement::PhantomConsumed, action));
        }

        if link.max_clicks.is_some_and(|max| link.click_count >= max) {
            return Some((Retirement::Exhausted, RetireAction::Deactivate));
        }

        None
    }
}
