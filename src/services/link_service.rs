//! Link management service
//!
//! Owner-side operations shared by the HTTP API and the CLI. All creation
//! defaults are resolved here, once; stored records carry no implicit values.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::plan::{PlanPolicy, PlanTier};
use crate::config::LinksConfig;
use crate::errors::{LinkgateError, Result};
use crate::resolver::{Clock, LinkState, SystemClock, state_of};
use crate::storage::{LinkStore, ShortLink};
use crate::utils::TimeParser;
use crate::utils::password::process_new_password;
use crate::utils::token::{
    DEFAULT_TOKEN_LENGTH, MAX_TOKEN_LENGTH, RandomTokenGenerator, TokenGenerator,
};
use crate::utils::url_validator::validate_url;

/// Maximum label length in characters
pub const MAX_LABEL_LEN: usize = 100;

/// Owner listing page size bounds
pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

// ============ Request/Response DTOs ============

/// Request to create a new link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLinkRequest {
    #[serde(default)]
    pub label: Option<String>,
    pub target_url: String,
    #[serde(default)]
    pub max_clicks: Option<i64>,
    /// RFC3339 or relative ("30m", "1d2h")
    #[serde(default)]
    pub expires_at: Option<String>,
    /// RFC3339 or relative ("30m", "1d2h")
    #[serde(default)]
    pub reveal_at: Option<String>,
    #[serde(default)]
    pub is_phantom: bool,
    #[serde(default)]
    pub password: Option<String>,
}

/// A link with its observed lifecycle state
#[derive(Debug, Clone, Serialize)]
pub struct LinkDetails {
    pub link: ShortLink,
    pub state: LinkState,
    pub plan: PlanTier,
}

/// One page of an owner's links
#[derive(Debug, Clone, Serialize)]
pub struct LinkPage {
    pub links: Vec<LinkDetails>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl LinkPage {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size.max(1))
    }
}

// ============ LinkService Implementation ============

pub struct LinkService {
    store: Arc<dyn LinkStore>,
    plans: PlanPolicy,
    generator: Arc<dyn TokenGenerator>,
    clock: Arc<dyn Clock>,
    token_length: usize,
    token_attempts: u32,
}

impl LinkService {
    pub fn new(store: Arc<dyn LinkStore>, plans: PlanPolicy, links: &LinksConfig) -> Self {
        let token_length = if (1..=MAX_TOKEN_LENGTH).contains(&links.token_length) {
            links.token_length
        } else {
            warn!(
                "links.token_length {} out of range, using {}",
                links.token_length, DEFAULT_TOKEN_LENGTH
            );
            DEFAULT_TOKEN_LENGTH
        };

        Self {
            store,
            plans,
            generator: Arc::new(RandomTokenGenerator),
            clock: Arc::new(SystemClock),
            token_length,
            token_attempts: links.token_attempts.max(1),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TokenGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<dyn LinkStore> {
        &self.store
    }

    /// Parse an optional timestamp field that must lie strictly after `now`
    fn parse_future(
        field: &'static str,
        input: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };

        let at = TimeParser::parse_instant(raw, now)
            .map_err(|e| LinkgateError::validation(field, e))?;
        if at <= now {
            return Err(LinkgateError::validation(
                field,
                format!("{} must be in the future", field),
            ));
        }
        Ok(Some(at))
    }

    /// Validate a request and build the record to insert (token left empty)
    fn build_link(&self, owner_id: &str, req: CreateLinkRequest) -> Result<ShortLink> {
        let owner_id = owner_id.trim();
        if owner_id.is_empty() {
            return Err(LinkgateError::validation("owner_id", "owner is required"));
        }

        let label = req
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        if let Some(ref label) = label
            && label.chars().count() > MAX_LABEL_LEN
        {
            return Err(LinkgateError::validation(
                "label",
                format!("label must be at most {} characters", MAX_LABEL_LEN),
            ));
        }

        let target_url = req.target_url.trim().to_string();
        validate_url(&target_url)?;

        let now = self.clock.now();
        let expires_at = Self::parse_future("expires_at", req.expires_at.as_deref(), now)?;
        let reveal_at = Self::parse_future("reveal_at", req.reveal_at.as_deref(), now)?;
        if let (Some(reveal), Some(expires)) = (reveal_at, expires_at)
            && reveal >= expires
        {
            return Err(LinkgateError::validation(
                "reveal_at",
                "reveal_at must be before expires_at",
            ));
        }

        let tier = self.plans.tier_for(owner_id);
        let max_clicks = self
            .plans
            .resolve_max_clicks(tier, req.max_clicks, req.is_phantom)?;

        let password = process_new_password(req.password.as_deref())?;

        Ok(ShortLink {
            token: String::new(),
            owner_id: owner_id.to_string(),
            label,
            target_url,
            active: true,
            created_at: now,
            expires_at,
            reveal_at,
            max_clicks,
            click_count: 0,
            is_phantom: req.is_phantom,
            password,
        })
    }

    /// Create a link owned by `owner_id`.
    ///
    /// A token collision retries with a fresh token up to `token_attempts`
    /// times, then fails with `TokenExhausted`.
    pub async fn create_link(&self, owner_id: &str, req: CreateLinkRequest) -> Result<ShortLink> {
        let mut link = self.build_link(owner_id, req)?;

        for attempt in 1..=self.token_attempts {
            link.token = self.generator.generate(self.token_length);

            match self.store.insert(&link).await {
                Ok(()) => {
                    info!(
                        "LinkService: created link '{}' for owner '{}' (max_clicks: {:?}, phantom: {})",
                        link.token, link.owner_id, link.max_clicks, link.is_phantom
                    );
                    return Ok(link);
                }
                Err(LinkgateError::Conflict(_)) => {
                    warn!(
                        "Token collision on attempt {}/{}",
                        attempt, self.token_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(LinkgateError::token_exhausted(format!(
            "Could not allocate a unique token after {} attempts",
            self.token_attempts
        )))
    }

    /// Fetch a link owned by `owner_id`; other owners' links are reported as absent
    pub async fn get_link(&self, token: &str, owner_id: &str) -> Result<LinkDetails> {
        let link = self
            .store
            .get(token)
            .await?
            .filter(|l| l.owner_id == owner_id)
            .ok_or_else(|| LinkgateError::not_found(format!("Link '{}' not found", token)))?;

        let state = state_of(&link, self.clock.now());
        Ok(LinkDetails {
            plan: self.plans.tier_for(&link.owner_id),
            link,
            state,
        })
    }

    /// List `owner_id`'s links, newest first.
    ///
    /// `page` starts at 1; `page_size` is clamped to `1..=MAX_PAGE_SIZE`.
    /// Every entry carries its state as observed now.
    pub async fn list_links(&self, owner_id: &str, page: u64, page_size: u64) -> Result<LinkPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let (links, total) = self.store.list_by_owner(owner_id, page, page_size).await?;

        let now = self.clock.now();
        let plan = self.plans.tier_for(owner_id);
        let links = links
            .into_iter()
            .map(|link| LinkDetails {
                state: state_of(&link, now),
                plan,
                link,
            })
            .collect();

        Ok(LinkPage {
            links,
            page,
            page_size,
            total,
        })
    }

    /// Owner disable; terminal
    pub async fn disable_link(&self, token: &str, owner_id: &str) -> Result<()> {
        if !self.store.disable(token, owner_id).await? {
            return Err(LinkgateError::not_found(format!(
                "Link '{}' not found",
                token
            )));
        }
        info!("LinkService: disabled link '{}'", token);
        Ok(())
    }

    pub async fn delete_link(&self, token: &str, owner_id: &str) -> Result<()> {
        if !self.store.delete(token, owner_id).await? {
            return Err(LinkgateError::not_found(format!(
                "Link '{}' not found",
                token
            )));
        }
        info!("LinkService: deleted link '{}'", token);
        Ok(())
    }
}
