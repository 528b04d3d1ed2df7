//! Mutation operations for SeaOrmStorage
//!
//! Owner-initiated writes. Consumption lives in `consume.rs`.

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, SqlErr, sea_query::Expr};
use tracing::{info, warn};

use super::converters::shortlink_to_active_model;
use super::{SeaOrmStorage, retry};
use crate::errors::{LinkgateError, Result};
use crate::storage::ShortLink;

use migration::entities::link;

impl SeaOrmStorage {
    /// 插入新链接；token 冲突返回 `Conflict`，不覆盖已有行
    ///
    /// 重试期间前一次尝试可能已提交（如提交后连接断开），此时唯一约束冲突
    /// 对应的就是本次要插入的记录，按成功处理。
    pub(super) async fn insert_link(&self, new_link: &ShortLink) -> Result<()> {
        let db = &self.db;

        let result = retry::with_retry(
            &format!("insert({})", new_link.token),
            self.retry_config,
            || async {
                link::Entity::insert(shortlink_to_active_model(new_link))
                    .exec_without_returning(db)
                    .await
            },
        )
        .await;

        match result {
            Ok(_) => {
                info!("Link created: {}", new_link.token);
                Ok(())
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                match self.find(&new_link.token).await? {
                    Some(existing) if is_same_record(&existing, new_link) => {
                        warn!(
                            "Link {} was already committed by an earlier attempt",
                            new_link.token
                        );
                        Ok(())
                    }
                    _ => Err(LinkgateError::conflict(format!(
                        "Token already exists: {}",
                        new_link.token
                    ))),
                }
            }
            Err(e) => Err(LinkgateError::database_operation(format!(
                "Failed to insert link '{}': {}",
                new_link.token, e
            ))),
        }
    }

    /// 所有者停用：active 只会从 true 变为 false
    pub(super) async fn deactivate_owned(&self, token: &str, owner_id: &str) -> Result<bool> {
        let db = &self.db;

        let result = retry::with_retry(&format!("disable({})", token), self.retry_config, || async {
            link::Entity::update_many()
                .col_expr(link::Column::Active, Expr::val(false))
                .filter(link::Column::Token.eq(token))
                .filter(link::Column::OwnerId.eq(owner_id))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkgateError::database_operation(format!("Failed to disable link: {}", e)))?;

        if result.rows_affected == 0 {
            // 已停用的行在 MySQL 上 rows_affected 为 0，需要确认是否存在
            return Ok(self
                .find(token)
                .await?
                .is_some_and(|l| l.owner_id == owner_id));
        }

        info!("Link disabled by owner: {}", token);
        Ok(true)
    }

    pub(super) async fn delete_owned(&self, token: &str, owner_id: &str) -> Result<bool> {
        let db = &self.db;

        let result = retry::with_retry(&format!("delete({})", token), self.retry_config, || async {
            link::Entity::delete_many()
                .filter(link::Column::Token.eq(token))
                .filter(link::Column::OwnerId.eq(owner_id))
                .exec(db)
                .await
        })
        .await
        .map_err(|e| LinkgateError::database_operation(format!("Failed to delete link: {}", e)))?;

        if result.rows_affected > 0 {
            info!("Link deleted by owner: {}", token);
        }
        Ok(result.rows_affected > 0)
    }
}

/// 已存储的行是否就是 `intended` 这次插入写下的记录
///
/// 密码哈希带随机盐，创建时间精确到微秒，不同请求不会同时吻合。
fn is_same_record(stored: &ShortLink, intended: &ShortLink) -> bool {
    stored.owner_id == intended.owner_id
        && stored.target_url == intended.target_url
        && stored.label == intended.label
        && stored.password == intended.password
        && stored.max_clicks == intended.max_clicks
        && stored.is_phantom == intended.is_phantom
        && stored.created_at.timestamp_micros() == intended.created_at.timestamp_micros()
}
