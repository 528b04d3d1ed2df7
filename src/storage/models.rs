use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row per token.
///
/// `click_count` and the terminal `active` flag are written only by the
/// consuming path of a [`LinkStore`](super::LinkStore) and by owner disable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub token: String,
    pub owner_id: String,
    pub label: Option<String>,
    pub target_url: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reveal_at: Option<DateTime<Utc>>,
    /// `None` means unlimited
    pub max_clicks: Option<i64>,
    #[serde(default)]
    pub click_count: i64,
    #[serde(default)]
    pub is_phantom: bool,
    /// Argon2 PHC string, never serialized out
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl ShortLink {
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Remaining genuine accesses, `None` when unlimited.
    pub fn remaining_clicks(&self) -> Option<i64> {
        self.max_clicks
            .map(|max| (max - self.click_count).max(0))
    }
}
