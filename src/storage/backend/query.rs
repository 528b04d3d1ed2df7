//! Query operations for SeaOrmStorage
//!
//! This module contains all read-only database operations.

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};

use super::converters::model_to_shortlink;
use super::{SeaOrmStorage, retry};
use crate::errors::{LinkgateError, Result};
use crate::storage::ShortLink;

use migration::entities::link;

impl SeaOrmStorage {
    pub(super) async fn find(&self, token: &str) -> Result<Option<ShortLink>> {
        let db = &self.db;
        let name = format!("get({})", token);

        let model = retry::with_retry_timeout(&name, self.retry_config, self.timeout_ms, || async {
            link::Entity::find_by_id(token).one(db).await
        })
        .await
        .map_err(|e| LinkgateError::transient_store(format!("Failed to load link: {}", e)))?;

        Ok(model.map(model_to_shortlink))
    }

    /// 按 owner 分页加载，最新创建的在前
    pub(super) async fn list_owned(
        &self,
        owner_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        let db = &self.db;
        let page_offset = page.saturating_sub(1);
        let page_size = page_size.max(1);

        let owned = || {
            link::Entity::find()
                .filter(link::Column::OwnerId.eq(owner_id))
                .order_by_desc(link::Column::CreatedAt)
                .order_by_asc(link::Column::Token)
        };

        let total = retry::with_retry_timeout(
            "list_owned(count)",
            self.retry_config,
            self.timeout_ms,
            || async { owned().count(db).await },
        )
        .await
        .map_err(|e| LinkgateError::transient_store(format!("Failed to count links: {}", e)))?;

        let models = retry::with_retry_timeout(
            "list_owned(data)",
            self.retry_config,
            self.timeout_ms,
            || async {
                owned()
                    .paginate(db, page_size)
                    .fetch_page(page_offset)
                    .await
            },
        )
        .await
        .map_err(|e| LinkgateError::transient_store(format!("Failed to list links: {}", e)))?;

        Ok((models.into_iter().map(model_to_shortlink).collect(), total))
    }

    pub(super) async fn count_links(&self) -> Result<u64> {
        let db = &self.db;

        retry::with_retry_timeout("count", self.retry_config, self.timeout_ms, || async {
            link::Entity::find().count(db).await
        })
        .await
        .map_err(|e| LinkgateError::transient_store(format!("Failed to count links: {}", e)))
    }
}
