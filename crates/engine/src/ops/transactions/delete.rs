use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    BalanceUpdateReason, Currency, EngineError, Period, ResultEngine, TransactionKind, UserBalance,
    ledger::{plan_transfer_delete, signed_effect},
    transaction_tags, transactions,
    util::parse_uuid,
};

use super::super::{Engine, balances::BalanceUpdate, with_tx};
use super::transfer_legs_of;

impl Engine {
    /// Deletes a transaction, reversing its balance effect first.
    ///
    /// Deposits and withdrawals reverse on their one account; transfers roll
    /// back both legs (sender refunded, receiver debited). The reversal goes
    /// through the overdraft check like any other mutation, then the record
    /// is removed and the aggregate reconciled with `REMOVE_TRANSACTION`.
    pub async fn delete_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
        period: Period,
    ) -> ResultEngine<UserBalance> {
        with_tx!(self, |db_tx| {
            let stored = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let kind = TransactionKind::try_from(stored.kind.as_str())?;
            let from_account_id = parse_uuid(&stored.from_account_id, "account")?;

            let sender_model = match kind {
                TransactionKind::Deposit | TransactionKind::Withdrawal => {
                    self.apply_account_delta(
                        &db_tx,
                        user_id,
                        from_account_id,
                        -signed_effect(kind, stored.amount_minor),
                    )
                    .await?
                }
                TransactionKind::Transfer => {
                    let legs = transfer_legs_of(&stored)?;
                    let mut sender = None;
                    for (account_id, delta_minor) in plan_transfer_delete(&legs) {
                        let model = self
                            .apply_account_delta(&db_tx, user_id, account_id, delta_minor)
                            .await?;
                        if account_id == legs.from_account_id {
                            sender = Some(model);
                        }
                    }
                    sender.ok_or_else(|| EngineError::NotFound("account".to_string()))?
                }
            };
            let currency = Currency::try_from(sender_model.currency.as_str())?;

            transaction_tags::Entity::delete_many()
                .filter(transaction_tags::Column::TransactionId.eq(transaction_id.to_string()))
                .exec(&db_tx)
                .await?;
            transactions::Entity::delete_by_id(stored.id.clone())
                .exec(&db_tx)
                .await?;

            let user_balance = self
                .update_total_balance(
                    &db_tx,
                    user_id,
                    period,
                    BalanceUpdate {
                        reason: BalanceUpdateReason::RemoveTransaction,
                        update_amount_minor: stored.amount_minor,
                        update_currency: currency,
                        account_id: Some(from_account_id),
                        transaction_id: Some(transaction_id),
                    },
                )
                .await?;

            debug!(user = user_id, transaction = %transaction_id, "deleted transaction");
            Ok(user_balance)
        })
    }
}
