use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DatabaseConfig;
use crate::errors::{LinkgateError, Result};
use crate::resolver::{AccessContext, BlockReason, LifecycleAuthority};

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use memory::MemoryStore;
pub use models::ShortLink;

/// Result of one genuine access against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Granted and counted exactly once
    Redirect(String),
    /// Refused with no mutation
    Blocked(BlockReason),
}

/// Persistence boundary for links.
///
/// `resolve_and_consume` is the only writer of `click_count` and of the
/// lifecycle `active` flag. It runs evaluate-and-consume as one indivisible
/// unit per token and never returns an error: a store failure that survives
/// bounded retries becomes `Blocked(TransientError)`.
#[async_trait]
pub trait LinkStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn get(&self, token: &str) -> Result<Option<ShortLink>>;

    /// Insert a new link; `Conflict` when the token is taken.
    async fn insert(&self, link: &ShortLink) -> Result<()>;

    async fn resolve_and_consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> ConsumeOutcome;

    /// Owner disable. `false` when no row with this token belongs to `owner_id`.
    async fn disable(&self, token: &str, owner_id: &str) -> Result<bool>;

    /// Owner delete. `false` when no row with this token belongs to `owner_id`.
    async fn delete(&self, token: &str, owner_id: &str) -> Result<bool>;

    /// One page of `owner_id`'s links, newest first, with the owner's total.
    /// `page` starts at 1.
    async fn list_by_owner(
        &self,
        owner_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)>;

    async fn count(&self) -> Result<u64>;
}

pub struct StorageFactory;

impl StorageFactory {
    /// Build the store selected by `database_url`.
    ///
    /// - `memory://`: process-local [`MemoryStore`]
    /// - empty: `DatabaseConfig` error, callers fail closed
    /// - anything else: [`SeaOrmStorage`], backend inferred from the URL
    pub async fn create(
        config: &DatabaseConfig,
        authority: LifecycleAuthority,
    ) -> Result<Arc<dyn LinkStore>> {
        let database_url = config.database_url.trim();

        if database_url.is_empty() {
            return Err(LinkgateError::database_config("database_url is not set"));
        }

        if database_url == memory::MEMORY_URL {
            return Ok(Arc::new(MemoryStore::new(authority)));
        }

        let backend_type = backend::infer_backend_from_url(database_url)?;
        let storage = SeaOrmStorage::new(config, &backend_type, authority).await?;
        Ok(Arc::new(storage))
    }
}
