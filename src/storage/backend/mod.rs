//! SeaORM storage backend
//!
//! This module provides database storage using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod consume;
mod converters;
mod mutations;
mod query;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::warn;

use super::{ConsumeOutcome, LinkStore, ShortLink};
use crate::config::DatabaseConfig;
use crate::errors::{LinkgateError, Result};
use crate::resolver::{AccessContext, LifecycleAuthority};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_shortlink, shortlink_to_active_model};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(LinkgateError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://, memory://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: &'static str,
    retry_config: retry::RetryConfig,
    /// 单次消费尝试的超时（毫秒）
    timeout_ms: u64,
    authority: LifecycleAuthority,
}

impl SeaOrmStorage {
    pub async fn new(
        config: &DatabaseConfig,
        backend_name: &str,
        authority: LifecycleAuthority,
    ) -> Result<Self> {
        let database_url = config.database_url.trim();
        if database_url.is_empty() {
            return Err(LinkgateError::database_config("database_url is not set"));
        }

        // 根据不同数据库类型配置连接选项
        let (db, backend_name) = match backend_name {
            "sqlite" => (connect_sqlite(database_url).await?, "sqlite"),
            "mysql" | "mariadb" => (
                connect_generic(database_url, "mysql", config.pool_size).await?,
                "mysql",
            ),
            _ => (
                connect_generic(database_url, "postgres", config.pool_size).await?,
                "postgres",
            ),
        };

        let storage = SeaOrmStorage {
            db,
            backend_name,
            retry_config: config.retry_config(),
            timeout_ms: config.timeout_ms,
            authority,
        };

        // 运行迁移
        run_migrations(&storage.db).await?;

        warn!("{} Storage initialized.", storage.backend_name.to_uppercase());
        Ok(storage)
    }
}

#[async_trait]
impl LinkStore for SeaOrmStorage {
    fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    async fn get(&self, token: &str) -> Result<Option<ShortLink>> {
        self.find(token).await
    }

    async fn insert(&self, link: &ShortLink) -> Result<()> {
        self.insert_link(link).await
    }

    async fn resolve_and_consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> ConsumeOutcome {
        self.consume(token, now, access).await
    }

    async fn disable(&self, token: &str, owner_id: &str) -> Result<bool> {
        self.deactivate_owned(token, owner_id).await
    }

    async fn delete(&self, token: &str, owner_id: &str) -> Result<bool> {
        self.delete_owned(token, owner_id).await
    }

    async fn list_by_owner(
        &self,
        owner_id: &str,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<ShortLink>, u64)> {
        self.list_owned(owner_id, page, page_size).await
    }

    async fn count(&self) -> Result<u64> {
        self.count_links().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("links.db").unwrap(), "sqlite");
        assert_eq!(
            infer_backend_from_url("sqlite:///tmp/x.db?mode=rwc").unwrap(),
            "sqlite"
        );
        assert_eq!(
            infer_backend_from_url("mariadb://u:p@localhost/db").unwrap(),
            "mysql"
        );
        assert_eq!(
            infer_backend_from_url("postgresql://localhost/db").unwrap(),
            "postgres"
        );
        assert!(matches!(
            infer_backend_from_url("redis://localhost"),
            Err(LinkgateError::DatabaseConfig(_))
        ));
    }
}
