//! Engine operations.
//!
//! Each public operation runs inside one database transaction with a
//! wall-clock budget: the transaction either commits with all of its effects
//! or is dropped (rolled back) on the first error or on timeout. Rates are
//! fetched while the transaction is open, so the budget also caps how long
//! row locks are held waiting on the currency normalizer.

use std::{sync::Arc, time::Duration};

use sea_orm::{ActiveValue, DatabaseConnection, DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, RateProvider, ResultEngine};

mod accounts;
mod balances;
mod transactions;

pub use transactions::{TransactionOutcome, TransactionPage};

/// Run a block inside a DB transaction with the engine's wall-clock budget,
/// committing on success. On error or timeout the transaction is dropped,
/// which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let op = async {
            let $tx = $self.database.begin().await?;
            let result = $body;
            match result {
                Ok(value) => {
                    $tx.commit().await?;
                    Ok(value)
                }
                Err(err) => Err(err),
            }
        };
        match tokio::time::timeout($self.op_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err($crate::EngineError::Timeout(format!(
                "unit of work exceeded {:?}",
                $self.op_timeout
            ))),
        }
    }};
}

pub(crate) use with_tx;

const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    rates: Arc<dyn RateProvider>,
    op_timeout: Duration,
}

impl Engine {
    /// Return a builder for `Engine`.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Loads an account inside the open transaction, scoped to its owner.
    pub(crate) async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<crate::accounts::Model> {
        crate::accounts::Entity::find_by_id(account_id.to_string())
            .filter(crate::accounts::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("account".to_string()))
    }

    /// Applies a signed delta to one account balance, enforcing the
    /// overdraft rule. Every balance change in the engine funnels through
    /// here.
    pub(crate) async fn apply_account_delta(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
        delta_minor: i64,
    ) -> ResultEngine<crate::accounts::Model> {
        let model = self.require_account(db_tx, user_id, account_id).await?;
        let new_balance = model
            .balance_minor
            .checked_add(delta_minor)
            .ok_or_else(|| EngineError::InvalidAmount("balance overflow".to_string()))?;

        if !model.is_credit && new_balance < 0 {
            return Err(EngineError::InsufficientBalance(model.name));
        }

        let active = crate::accounts::ActiveModel {
            id: ActiveValue::Set(model.id.clone()),
            balance_minor: ActiveValue::Set(new_balance),
            ..Default::default()
        };
        Ok(active.update(db_tx).await?)
    }
}

/// The builder for `Engine`.
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    rates: Option<Arc<dyn RateProvider>>,
    op_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the required currency normalizer.
    pub fn rates(mut self, rates: Arc<dyn RateProvider>) -> EngineBuilder {
        self.rates = Some(rates);
        self
    }

    /// Override the per-operation wall-clock budget (default 10 s).
    pub fn operation_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.op_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`.
    pub async fn build(self) -> ResultEngine<Engine> {
        let rates = self
            .rates
            .ok_or_else(|| EngineError::Configuration("missing rate provider".to_string()))?;
        Ok(Engine {
            database: self.database,
            rates,
            op_timeout: self.op_timeout.unwrap_or(DEFAULT_OPERATION_TIMEOUT),
        })
    }
}
