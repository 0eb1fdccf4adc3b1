use sea_orm::{TransactionTrait, prelude::*};
use tracing::debug;

use crate::{
    Account, BalanceUpdateReason, CreateTransactionCmd, CreateTransferCmd, Currency, EngineError,
    ResultEngine, Transaction, TransactionEffect, TransactionKind,
    ledger::{TransferLegs, plan_transfer_create, signed_effect},
    transactions,
    util::{normalize_optional_text, storage_error},
};

use super::super::{Engine, balances::BalanceUpdate, with_tx};
use super::TransactionOutcome;

impl Engine {
    /// Creates a deposit or withdrawal and reconciles the aggregate.
    pub async fn create_transaction(
        &self,
        cmd: CreateTransactionCmd,
    ) -> ResultEngine<TransactionOutcome> {
        let effect = match cmd.kind {
            TransactionKind::Deposit => TransactionEffect::Deposit {
                amount_minor: cmd.amount_minor,
            },
            TransactionKind::Withdrawal => TransactionEffect::Withdrawal {
                amount_minor: cmd.amount_minor,
            },
            TransactionKind::Transfer => {
                return Err(EngineError::InvalidAmount(
                    "transfers are created with create_transfer".to_string(),
                ));
            }
        };

        let mut tx = Transaction::new(
            cmd.user_id.clone(),
            cmd.from_account_id,
            effect,
            cmd.meta.occurred_at,
        )?;
        tx.description = normalize_optional_text(cmd.meta.description.as_deref());
        tx.category = normalize_optional_text(cmd.meta.category.as_deref());
        tx.payee = normalize_optional_text(cmd.meta.payee.as_deref());

        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, &cmd.user_id, cmd.from_account_id)
                .await?;

            transactions::ActiveModel::from(&tx)
                .insert(&db_tx)
                .await
                .map_err(storage_error)?;
            tx.tags = self
                .set_transaction_tags(&db_tx, &cmd.user_id, tx.id, &cmd.meta.tags)
                .await?;

            let account_model = self
                .apply_account_delta(
                    &db_tx,
                    &cmd.user_id,
                    cmd.from_account_id,
                    signed_effect(cmd.kind, cmd.amount_minor),
                )
                .await?;
            let currency = Currency::try_from(account_model.currency.as_str())?;

            let user_balance = self
                .update_total_balance(
                    &db_tx,
                    &cmd.user_id,
                    cmd.period,
                    BalanceUpdate {
                        reason: BalanceUpdateReason::CreateTransaction,
                        update_amount_minor: cmd.amount_minor,
                        update_currency: currency,
                        account_id: Some(cmd.from_account_id),
                        transaction_id: Some(tx.id),
                    },
                )
                .await?;

            debug!(user = %cmd.user_id, transaction = %tx.id, "created transaction");
            Ok(TransactionOutcome {
                transaction: tx.clone(),
                from_account: Account::try_from(account_model)?,
                to_account: None,
                user_balance,
            })
        })
    }

    /// Creates a two-account transfer: the sender is debited by the from
    /// amount (through the overdraft check), the receiver credited by the to
    /// amount, then the aggregate is reconciled.
    pub async fn create_transfer(
        &self,
        cmd: CreateTransferCmd,
    ) -> ResultEngine<TransactionOutcome> {
        let mut tx = Transaction::new(
            cmd.user_id.clone(),
            cmd.from_account_id,
            TransactionEffect::Transfer {
                to_account_id: cmd.to_account_id,
                from_amount_minor: cmd.from_amount_minor,
                to_amount_minor: cmd.to_amount_minor,
            },
            cmd.occurred_at,
        )?;
        tx.description = normalize_optional_text(cmd.description.as_deref());

        let legs = TransferLegs {
            from_account_id: cmd.from_account_id,
            to_account_id: cmd.to_account_id,
            from_amount_minor: cmd.from_amount_minor,
            to_amount_minor: cmd.to_amount_minor,
        };

        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, &cmd.user_id, cmd.from_account_id)
                .await?;
            self.require_account(&db_tx, &cmd.user_id, cmd.to_account_id)
                .await?;

            transactions::ActiveModel::from(&tx)
                .insert(&db_tx)
                .await
                .map_err(storage_error)?;

            let mut from_account = None;
            let mut to_account = None;
            for (account_id, delta_minor) in plan_transfer_create(&legs) {
                let model = self
                    .apply_account_delta(&db_tx, &cmd.user_id, account_id, delta_minor)
                    .await?;
                if account_id == cmd.from_account_id {
                    from_account = Some(model);
                } else {
                    to_account = Some(model);
                }
            }
            let from_account = from_account
                .ok_or_else(|| EngineError::NotFound("account".to_string()))?;
            let to_account = to_account
                .ok_or_else(|| EngineError::NotFound("account".to_string()))?;
            let currency = Currency::try_from(from_account.currency.as_str())?;

            let user_balance = self
                .update_total_balance(
                    &db_tx,
                    &cmd.user_id,
                    cmd.period,
                    BalanceUpdate {
                        reason: BalanceUpdateReason::CreateTransaction,
                        update_amount_minor: cmd.from_amount_minor,
                        update_currency: currency,
                        account_id: Some(cmd.from_account_id),
                        transaction_id: Some(tx.id),
                    },
                )
                .await?;

            debug!(user = %cmd.user_id, transaction = %tx.id, "created transfer");
            Ok(TransactionOutcome {
                transaction: tx.clone(),
                from_account: Account::try_from(from_account)?,
                to_account: Some(Account::try_from(to_account)?),
                user_balance,
            })
        })
    }
}
