use sea_orm::{ActiveValue, TransactionTrait, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{
    Account, BalanceUpdateReason, Currency, EngineError, ResultEngine, Transaction,
    TransactionEffect, TransactionKind, UpdateTransactionCmd, UpdateTransferCmd,
    ledger::{TransferLegs, edited_balance, plan_transfer_edit, signed_effect},
    transactions,
    util::{normalize_optional_text, parse_uuid},
};

use super::super::{Engine, balances::BalanceUpdate, with_tx};
use super::{TransactionOutcome, transfer_legs_of};

impl Engine {
    /// Replaces a deposit/withdrawal with a new shape.
    ///
    /// Kind, amount and account may all change at once:
    /// - same account: the balance moves by exactly the difference between
    ///   the old and new effect, and one `UPDATE_TRANSACTION` event carries
    ///   that difference;
    /// - account changed: the edit becomes remove-from-old + create-on-new
    ///   inside the same unit of work, with `REMOVE_TRANSACTION` and
    ///   `CREATE_TRANSACTION` events (the replacement row gets a fresh id).
    pub async fn update_transaction(
        &self,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<TransactionOutcome> {
        if cmd.kind == TransactionKind::Transfer {
            return Err(EngineError::InvalidAmount(
                "transfers are edited with update_transfer".to_string(),
            ));
        }
        if cmd.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let stored = self
                .require_transaction(&db_tx, &cmd.user_id, cmd.transaction_id)
                .await?;
            let old_kind = TransactionKind::try_from(stored.kind.as_str())?;
            if old_kind == TransactionKind::Transfer {
                return Err(EngineError::InvalidAmount(
                    "transfers are edited with update_transfer".to_string(),
                ));
            }
            let old_account_id = parse_uuid(&stored.from_account_id, "account")?;

            if old_account_id == cmd.from_account_id {
                self.update_in_place(&db_tx, cmd, stored, old_kind).await
            } else {
                self.update_with_account_change(&db_tx, cmd, stored, old_kind, old_account_id)
                    .await
            }
        })
    }

    /// Same-account edit: apply the net difference between old and new
    /// effect.
    async fn update_in_place(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        cmd: UpdateTransactionCmd,
        stored: transactions::Model,
        old_kind: TransactionKind,
    ) -> ResultEngine<TransactionOutcome> {
        let account_model = self
            .require_account(db_tx, &cmd.user_id, cmd.from_account_id)
            .await?;
        let old_balance = account_model.balance_minor;
        let new_balance = edited_balance(
            old_balance,
            (old_kind, stored.amount_minor),
            (cmd.kind, cmd.amount_minor),
        );

        let account_model = self
            .apply_account_delta(
                db_tx,
                &cmd.user_id,
                cmd.from_account_id,
                new_balance - old_balance,
            )
            .await?;
        let currency = Currency::try_from(account_model.currency.as_str())?;

        let active = transactions::ActiveModel {
            id: ActiveValue::Set(stored.id.clone()),
            kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(cmd.amount_minor),
            occurred_at: ActiveValue::Set(cmd.meta.occurred_at),
            description: ActiveValue::Set(normalize_optional_text(cmd.meta.description.as_deref())),
            category: ActiveValue::Set(normalize_optional_text(cmd.meta.category.as_deref())),
            payee: ActiveValue::Set(normalize_optional_text(cmd.meta.payee.as_deref())),
            ..Default::default()
        };
        let updated = active.update(db_tx).await?;

        let mut transaction = Transaction::try_from(updated)?;
        transaction.tags = self
            .set_transaction_tags(db_tx, &cmd.user_id, cmd.transaction_id, &cmd.meta.tags)
            .await?;

        // The aggregate moves by the balance difference, not the raw amount.
        let user_balance = self
            .update_total_balance(
                db_tx,
                &cmd.user_id,
                cmd.period,
                BalanceUpdate {
                    reason: BalanceUpdateReason::UpdateTransaction,
                    update_amount_minor: new_balance - old_balance,
                    update_currency: currency,
                    account_id: Some(cmd.from_account_id),
                    transaction_id: Some(cmd.transaction_id),
                },
            )
            .await?;

        debug!(user = %cmd.user_id, transaction = %cmd.transaction_id, "updated transaction");
        Ok(TransactionOutcome {
            transaction,
            from_account: Account::try_from(account_model)?,
            to_account: None,
            user_balance,
        })
    }

    /// Account-changed edit: remove the transaction from the old account,
    /// then recreate it on the new one. Two reconciliations, one unit of
    /// work.
    async fn update_with_account_change(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        cmd: UpdateTransactionCmd,
        stored: transactions::Model,
        old_kind: TransactionKind,
        old_account_id: Uuid,
    ) -> ResultEngine<TransactionOutcome> {
        // Remove from the old account.
        let old_account = self
            .apply_account_delta(
                db_tx,
                &cmd.user_id,
                old_account_id,
                -signed_effect(old_kind, stored.amount_minor),
            )
            .await?;
        let old_currency = Currency::try_from(old_account.currency.as_str())?;

        self.set_transaction_tags(db_tx, &cmd.user_id, cmd.transaction_id, &[])
            .await?;
        transactions::Entity::delete_by_id(stored.id.clone())
            .exec(db_tx)
            .await?;

        self.update_total_balance(
            db_tx,
            &cmd.user_id,
            cmd.period,
            BalanceUpdate {
                reason: BalanceUpdateReason::RemoveTransaction,
                update_amount_minor: stored.amount_minor,
                update_currency: old_currency,
                account_id: Some(old_account_id),
                transaction_id: Some(cmd.transaction_id),
            },
        )
        .await?;

        // Recreate on the new account under a fresh id.
        let effect = match cmd.kind {
            TransactionKind::Deposit => TransactionEffect::Deposit {
                amount_minor: cmd.amount_minor,
            },
            TransactionKind::Withdrawal => TransactionEffect::Withdrawal {
                amount_minor: cmd.amount_minor,
            },
            TransactionKind::Transfer => unreachable!("rejected above"),
        };
        let mut transaction = Transaction::new(
            cmd.user_id.clone(),
            cmd.from_account_id,
            effect,
            cmd.meta.occurred_at,
        )?;
        transaction.description = normalize_optional_text(cmd.meta.description.as_deref());
        transaction.category = normalize_optional_text(cmd.meta.category.as_deref());
        transaction.payee = normalize_optional_text(cmd.meta.payee.as_deref());

        transactions::ActiveModel::from(&transaction)
            .insert(db_tx)
            .await
            .map_err(crate::util::storage_error)?;
        transaction.tags = self
            .set_transaction_tags(db_tx, &cmd.user_id, transaction.id, &cmd.meta.tags)
            .await?;

        let new_account = self
            .apply_account_delta(
                db_tx,
                &cmd.user_id,
                cmd.from_account_id,
                signed_effect(cmd.kind, cmd.amount_minor),
            )
            .await?;
        let new_currency = Currency::try_from(new_account.currency.as_str())?;

        let user_balance = self
            .update_total_balance(
                db_tx,
                &cmd.user_id,
                cmd.period,
                BalanceUpdate {
                    reason: BalanceUpdateReason::CreateTransaction,
                    update_amount_minor: cmd.amount_minor,
                    update_currency: new_currency,
                    account_id: Some(cmd.from_account_id),
                    transaction_id: Some(transaction.id),
                },
            )
            .await?;

        debug!(
            user = %cmd.user_id,
            old_transaction = %cmd.transaction_id,
            new_transaction = %transaction.id,
            "moved transaction to another account"
        );
        Ok(TransactionOutcome {
            transaction,
            from_account: Account::try_from(new_account)?,
            to_account: None,
            user_balance,
        })
    }

    /// Replaces a transfer with a new shape. Sender, receiver and both
    /// amounts may each change independently; every touched account receives
    /// exactly one net balance mutation, each through the overdraft check.
    pub async fn update_transfer(&self, cmd: UpdateTransferCmd) -> ResultEngine<TransactionOutcome> {
        if cmd.from_amount_minor <= 0 || cmd.to_amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "transfer amounts must be > 0".to_string(),
            ));
        }
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidAmount(
                "from_account_id and to_account_id must differ".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let stored = self
                .require_transaction(&db_tx, &cmd.user_id, cmd.transaction_id)
                .await?;
            let kind = TransactionKind::try_from(stored.kind.as_str())?;
            if kind != TransactionKind::Transfer {
                return Err(EngineError::InvalidAmount(
                    "deposits and withdrawals are edited with update_transaction".to_string(),
                ));
            }

            let old_legs = transfer_legs_of(&stored)?;
            let new_legs = TransferLegs {
                from_account_id: cmd.from_account_id,
                to_account_id: cmd.to_account_id,
                from_amount_minor: cmd.from_amount_minor,
                to_amount_minor: cmd.to_amount_minor,
            };

            self.require_account(&db_tx, &cmd.user_id, new_legs.from_account_id)
                .await?;
            self.require_account(&db_tx, &cmd.user_id, new_legs.to_account_id)
                .await?;

            for (account_id, delta_minor) in plan_transfer_edit(&old_legs, &new_legs) {
                self.apply_account_delta(&db_tx, &cmd.user_id, account_id, delta_minor)
                    .await?;
            }

            let active = transactions::ActiveModel {
                id: ActiveValue::Set(stored.id.clone()),
                from_account_id: ActiveValue::Set(cmd.from_account_id.to_string()),
                amount_minor: ActiveValue::Set(cmd.from_amount_minor),
                to_account_id: ActiveValue::Set(Some(cmd.to_account_id.to_string())),
                to_amount_minor: ActiveValue::Set(Some(cmd.to_amount_minor)),
                occurred_at: ActiveValue::Set(cmd.occurred_at),
                description: ActiveValue::Set(normalize_optional_text(cmd.description.as_deref())),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;
            let transaction = Transaction::try_from(updated)?;

            let from_account = self
                .require_account(&db_tx, &cmd.user_id, cmd.from_account_id)
                .await?;
            let to_account = self
                .require_account(&db_tx, &cmd.user_id, cmd.to_account_id)
                .await?;
            let currency = Currency::try_from(from_account.currency.as_str())?;

            let user_balance = self
                .update_total_balance(
                    &db_tx,
                    &cmd.user_id,
                    cmd.period,
                    BalanceUpdate {
                        reason: BalanceUpdateReason::UpdateTransaction,
                        update_amount_minor: cmd.from_amount_minor - old_legs.from_amount_minor,
                        update_currency: currency,
                        account_id: Some(cmd.from_account_id),
                        transaction_id: Some(cmd.transaction_id),
                    },
                )
                .await?;

            debug!(user = %cmd.user_id, transaction = %cmd.transaction_id, "updated transfer");
            Ok(TransactionOutcome {
                transaction,
                from_account: Account::try_from(from_account)?,
                to_account: Some(Account::try_from(to_account)?),
                user_balance,
            })
        })
    }
}
