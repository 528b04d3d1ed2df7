//! In-process store
//!
//! Links live in a sharded `DashMap`. A consuming access holds the write
//! guard of the token's shard across evaluate, increment and retirement,
//! so accesses to one token serialize while other shards stay available.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use super::{ConsumeOutcome, LinkStore, ShortLink};
use crate::errors::{LinkgateError, Result};
use crate::resolver::{
    AccessContext, BlockReason, Decision, LifecycleAuthority, RetireAction, evaluate,
};

/// `database_url` value that selects this store
pub const MEMORY_URL: &str = "memory://";

#[derive(Debug, Default)]
pub struct MemoryStore {
    links: DashMap<String, ShortLink>,
    authority: LifecycleAuthority,
}

impl MemoryStore {
    pub fn new(authority: LifecycleAuthority) -> Self {
        Self {
            links: DashMap::new(),
            authority,
        }
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, token: &str) -> Result<Option<ShortLink>> {
        Ok(self.links.get(token).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, link: &ShortLink) -> Result<()> {
        match self.links.entry(link.token.clone()) {
            Entry::Occupied(_) => Err(LinkgateError::conflict(format!(
                "Token already exists: {}",
                link.token
            ))),
            Entry::Vacant(slot) => {
                slot.insert(link.clone());
                Ok(())
            }
        }
    }

    async fn resolve_and_consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> ConsumeOutcome {
        let (target_url, retirement) = {
            let Some(mut entry) = self.links.get_mut(token) else {
                return ConsumeOutcome::Blocked(BlockReason::NotFound);
            };
            let link = entry.value_mut();

            if let Decision::Block(reason) = evaluate(link, now, access) {
                return ConsumeOutcome::Blocked(reason);
            }

            link.click_count += 1;
            let retirement = self.authority.after_consume(link);
            if retirement.is_some() {
                link.active = false;
            }
            (link.target_url.clone(), retirement)
        };

        if let Some((kind, action)) = retirement {
            debug!("Link {} retired ({:?}, {:?})", token, kind, action);
            if action == RetireAction::Delete {
                // 守卫已释放；行已是 inactive，重复删除无副作用
                self.links.remove_if(token, |_, link| !link.active);
            }
        }

        ConsumeOutcome::Redirect(target_url)
    }

    async fn disable(&self, token: &str, owner_id: &str) -> Result<bool> {
        match self.links.get_mut(token) {
            Some(mut entry) if entry.owner_id == owner_id => {
                entry.active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, token: &str, owner_id: &str) -> Result<bool> {
        Ok(self
            .links
            .remove_if(token, |_, link| link.owner_id == owner_id)
            .is_some())
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let mut owned: Vec<ShortLink> = self
            .links
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.token.cmp(&b.token))
        });

        let total = owned.len() as u64;
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        let items = owned
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(page_size).unwrap_or(usize::MAX))
            .collect();
        Ok((items, total))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.links.len() as u64)
    }
}
