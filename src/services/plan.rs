//! Plan tiers
//!
//! Ceilings are enforced here, next to the write, whatever the client sent.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::PlansConfig;
use crate::errors::{LinkgateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
}

#[derive(Debug, Clone)]
pub struct PlanPolicy {
    free_max_clicks: i64,
    free_default_max_clicks: i64,
    pro_owners: HashSet<String>,
}

impl Default for PlanPolicy {
    fn default() -> Self {
        Self::from_config(&PlansConfig::default())
    }
}

impl PlanPolicy {
    pub fn from_config(config: &PlansConfig) -> Self {
        let free_max_clicks = config.free_max_clicks.max(1);
        Self {
            free_max_clicks,
            free_default_max_clicks: config.free_default_max_clicks.clamp(1, free_max_clicks),
            pro_owners: config.pro_owners.iter().cloned().collect(),
        }
    }

    pub fn tier_for(&self, owner_id: &str) -> PlanTier {
        if self.pro_owners.contains(owner_id) {
            PlanTier::Pro
        } else {
            PlanTier::Free
        }
    }

    /// Resolve the stored `max_clicks` for a new link.
    ///
    /// Phantom links always get exactly one click. Free links get the
    /// default when none is requested and may not exceed the ceiling.
    /// Pro links keep `None` as unlimited.
    pub fn resolve_max_clicks(
        &self,
        tier: PlanTier,
        requested: Option<i64>,
        is_phantom: bool,
    ) -> Result<Option<i64>> {
        if let Some(n) = requested
            && n < 1
        {
            return Err(LinkgateError::validation(
                "max_clicks",
                "max_clicks must be at least 1",
            ));
        }

        if is_phantom {
            return Ok(Some(1));
        }

        match (tier, requested) {
            (PlanTier::Pro, requested) => Ok(requested),
            (PlanTier::Free, None) => Ok(Some(self.free_default_max_clicks)),
            (PlanTier::Free, Some(n)) if n > self.free_max_clicks => {
                Err(LinkgateError::validation(
                    "max_clicks",
                    format!(
                        "Free plan allows at most {} clicks per link",
                        self.free_max_clicks
                    ),
                ))
            }
            (PlanTier::Free, Some(n)) => Ok(Some(n)),
        }
    }
}
