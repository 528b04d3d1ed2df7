//! Atomic evaluate-and-consume on SQL backends
//!
//! One attempt:
//! 1. read the row and evaluate the snapshot; a block returns with no write
//! 2. `BEGIN`, then a guarded increment whose `WHERE` clause repeats the
//!    mutable half of the evaluator (`active`, quota). The row write lock
//!    makes check-and-increment indivisible across concurrent requests
//! 3. zero rows affected: the state moved under us, roll back and report the
//!    evaluator's reason for the fresh row
//! 4. otherwise read the post-increment row inside the transaction, apply
//!    the lifecycle retirement, `COMMIT`
//!
//! Everything before `COMMIT` runs under the per-attempt timeout and is
//! retried on transient errors; a dropped transaction rolls back, so an
//! abandoned attempt never leaves a partial increment. `COMMIT` itself is
//! never retried.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait, ExprTrait, QueryFilter,
    TransactionTrait, sea_query::Expr,
};
use tracing::{debug, error};

use super::converters::model_to_shortlink;
use super::{SeaOrmStorage, retry};
use crate::resolver::{
    AccessContext, BlockReason, Decision, RetireAction, Retirement, evaluate,
};
use crate::storage::ConsumeOutcome;

use migration::entities::link;

/// Outcome of the transactional half of an attempt
enum Granted {
    /// Increment applied; carries the target and the retirement written
    Yes(String, Option<(Retirement, RetireAction)>),
    /// Guard rejected the increment
    No,
}

impl SeaOrmStorage {
    pub(super) async fn consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> ConsumeOutcome {
        let name = format!("consume({})", token);

        let result = retry::with_retry(&name, self.retry_config, || {
            self.consume_attempt(token, now, access)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    "Consume of {} failed after bounded retries, refusing access: {}",
                    token, e
                );
                ConsumeOutcome::Blocked(BlockReason::TransientError)
            }
        }
    }

    async fn consume_attempt(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> Result<ConsumeOutcome, DbErr> {
        let timeout = std::time::Duration::from_millis(self.timeout_ms);

        let prepared = tokio::time::timeout(timeout, self.prepare_consume(token, now, access))
            .await
            .map_err(|_| retry::attempt_timeout(token, self.timeout_ms))??;

        let (txn, granted) = match prepared {
            Prepared::Done(outcome) => return Ok(outcome),
            Prepared::InTxn(txn, granted) => (txn, granted),
        };

        match granted {
            Granted::Yes(target_url, retirement) => {
                txn.commit()
                    .await
                    .map_err(|e| DbErr::Custom(format!("commit failed: {}", e)))?;
                if let Some((kind, action)) = retirement {
                    debug!("Link {} retired ({:?}, {:?})", token, kind, action);
                }
                Ok(ConsumeOutcome::Redirect(target_url))
            }
            Granted::No => {
                txn.rollback().await?;
                self.blocked_reason(token, now, access).await
            }
        }
    }

    /// Steps 1-4 up to, not including, `COMMIT`
    async fn prepare_consume(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> Result<Prepared, DbErr> {
        let Some(model) = link::Entity::find_by_id(token).one(&self.db).await? else {
            return Ok(Prepared::Done(ConsumeOutcome::Blocked(BlockReason::NotFound)));
        };

        if let Decision::Block(reason) = evaluate(&model_to_shortlink(model), now, access) {
            return Ok(Prepared::Done(ConsumeOutcome::Blocked(reason)));
        }

        let txn = self.db.begin().await?;
        let granted = self.increment_and_retire(&txn, token).await?;
        Ok(Prepared::InTxn(txn, granted))
    }

    async fn increment_and_retire(
        &self,
        txn: &DatabaseTransaction,
        token: &str,
    ) -> Result<Granted, DbErr> {
        // 写语句放在事务的第一条，SQLite 直接取得写锁，避免读后升级失败
        let updated = link::Entity::update_many()
            .col_expr(
                link::Column::ClickCount,
                Expr::col(link::Column::ClickCount).add(1i64),
            )
            .filter(link::Column::Token.eq(token))
            .filter(link::Column::Active.eq(true))
            .filter(
                Condition::any()
                    .add(link::Column::MaxClicks.is_null())
                    .add(Expr::col(link::Column::ClickCount).lt(Expr::col(link::Column::MaxClicks))),
            )
            .exec(txn)
            .await?;

        if updated.rows_affected == 0 {
            return Ok(Granted::No);
        }

        let Some(model) = link::Entity::find_by_id(token).one(txn).await? else {
            return Ok(Granted::No);
        };
        let current = model_to_shortlink(model);

        let retirement = self.authority.after_consume(&current);
        match retirement {
            Some((_, RetireAction::Deactivate)) => {
                link::Entity::update_many()
                    .col_expr(link::Column::Active, Expr::val(false))
                    .filter(link::Column::Token.eq(token))
                    .exec(txn)
                    .await?;
            }
            Some((_, RetireAction::Delete)) => {
                link::Entity::delete_by_id(token).exec(txn).await?;
            }
            None => {}
        }

        Ok(Granted::Yes(current.target_url, retirement))
    }

    /// Reason for a guard rejection, from a fresh read
    async fn blocked_reason(
        &self,
        token: &str,
        now: DateTime<Utc>,
        access: &AccessContext,
    ) -> Result<ConsumeOutcome, DbErr> {
        let reason = match link::Entity::find_by_id(token).one(&self.db).await? {
            None => BlockReason::NotFound,
            Some(model) => match evaluate(&model_to_shortlink(model), now, access) {
                Decision::Block(reason) => reason,
                // 守卫拒绝而快照评估通过：按配额耗尽处理，绝不在未计数时放行
                Decision::Allow => BlockReason::QuotaExceeded,
            },
        };
        Ok(ConsumeOutcome::Blocked(reason))
    }
}

enum Prepared {
    Done(ConsumeOutcome),
    InTxn(DatabaseTransaction, Granted),
}
