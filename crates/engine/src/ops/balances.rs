//! The aggregate balance updater.
//!
//! Recomputes a user's normalized total balance from all live accounts and
//! records the change with an audit event. The recomputation is full, never
//! incremental: summing the accounts from scratch on every mutation is what
//! keeps drift from accumulating across repeated edits.

use chrono::Utc;
use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    BalanceUpdateEvent, BalanceUpdateReason, Currency, EngineError, Money, Period, ResultEngine,
    UserBalance, accounts, balance_events, balances,
};

use super::{Engine, with_tx};

/// What triggered a reconciliation, for the audit event.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BalanceUpdate {
    pub reason: BalanceUpdateReason,
    /// The signed change that triggered the update, in `update_currency`
    /// minor units.
    pub update_amount_minor: i64,
    pub update_currency: Currency,
    pub account_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
}

impl Engine {
    /// Recomputes the user's total balance for `period` and appends one
    /// audit event describing the change.
    ///
    /// Zero balances contribute zero without a normalizer call; every other
    /// balance is converted to the reporting currency. A failed conversion
    /// aborts the whole unit of work, so a partial total is never persisted.
    pub(crate) async fn update_total_balance(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        period: Period,
        update: BalanceUpdate,
    ) -> ResultEngine<UserBalance> {
        let reporting = self.rates.reporting_currency();

        let account_models = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .all(db_tx)
            .await?;

        let mut total = Money::ZERO;
        for model in &account_models {
            if model.balance_minor == 0 {
                continue;
            }
            let currency = Currency::try_from(model.currency.as_str())?;
            let converted = self
                .rates
                .to_reporting(currency, Money::new(model.balance_minor))
                .await
                .map_err(|err| EngineError::ConversionFailure(err.to_string()))?;
            total = total
                .checked_add(converted)
                .ok_or_else(|| EngineError::InvalidAmount("total balance overflow".to_string()))?;
        }

        debug!(
            user = user_id,
            %period,
            reason = update.reason.as_str(),
            total = total.minor(),
            "reconciled total balance"
        );

        // Read-or-initialize the period row, then append the event as a
        // separate ordered write within the same transaction.
        let existing = balances::Entity::find()
            .filter(balances::Column::UserId.eq(user_id))
            .filter(balances::Column::Year.eq(period.year()))
            .filter(balances::Column::Month.eq(period.month() as i32))
            .one(db_tx)
            .await?;

        let model = match existing {
            Some(model) => {
                let active = balances::ActiveModel {
                    id: ActiveValue::Set(model.id.clone()),
                    balance_minor: ActiveValue::Set(total.minor()),
                    ..Default::default()
                };
                active.update(db_tx).await?
            }
            None => {
                let active = balances::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    year: ActiveValue::Set(period.year()),
                    month: ActiveValue::Set(period.month() as i32),
                    currency: ActiveValue::Set(reporting.code().to_string()),
                    balance_minor: ActiveValue::Set(total.minor()),
                };
                active.insert(db_tx).await.map_err(crate::util::storage_error)?
            }
        };

        balance_events::active_model(
            &model.id,
            update.reason,
            update.update_amount_minor,
            update.update_currency,
            total.minor(),
            update.account_id,
            update.transaction_id,
            Utc::now(),
        )
        .insert(db_tx)
        .await?;

        UserBalance::try_from(model)
    }

    /// The stored aggregate balance for a period, if the period was ever
    /// touched.
    pub async fn user_balance(
        &self,
        user_id: &str,
        period: Period,
    ) -> ResultEngine<Option<UserBalance>> {
        with_tx!(self, |db_tx| {
            let model = balances::Entity::find()
                .filter(balances::Column::UserId.eq(user_id))
                .filter(balances::Column::Year.eq(period.year()))
                .filter(balances::Column::Month.eq(period.month() as i32))
                .one(&db_tx)
                .await?;
            model.map(UserBalance::try_from).transpose()
        })
    }

    /// The audit trail for a period, in append order.
    pub async fn balance_events(
        &self,
        user_id: &str,
        period: Period,
    ) -> ResultEngine<Vec<BalanceUpdateEvent>> {
        with_tx!(self, |db_tx| {
            let Some(balance_model) = balances::Entity::find()
                .filter(balances::Column::UserId.eq(user_id))
                .filter(balances::Column::Year.eq(period.year()))
                .filter(balances::Column::Month.eq(period.month() as i32))
                .one(&db_tx)
                .await?
            else {
                return Ok(Vec::new());
            };

            let event_models = balance_events::Entity::find()
                .filter(balance_events::Column::UserBalanceId.eq(balance_model.id.clone()))
                .order_by_asc(balance_events::Column::Id)
                .all(&db_tx)
                .await?;

            let mut events = Vec::with_capacity(event_models.len());
            for model in event_models {
                events.push(BalanceUpdateEvent::try_from(model)?);
            }
            Ok(events)
        })
    }
}
