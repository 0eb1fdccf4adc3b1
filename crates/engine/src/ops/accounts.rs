//! Account lifecycle operations.
//!
//! Accounts join and leave the aggregate balance here: creating or deleting
//! an account reconciles the user's total with a `CREATE_ACCOUNT` /
//! `DELETE_ACCOUNT` audit event. Metadata edits never touch balances.

use sea_orm::{ActiveValue, Condition, QueryFilter, TransactionTrait, prelude::*};
use tracing::info;
use uuid::Uuid;

use crate::{
    Account, BalanceUpdateReason, CreateAccountCmd, Currency, EngineError, Period, ResultEngine,
    UpdateAccountCmd, UserBalance, accounts, transaction_tags, transactions,
    util::{normalize_required_name, storage_error},
};

use super::{Engine, balances::BalanceUpdate, with_tx};

impl Engine {
    /// Creates an account and folds its opening balance into the aggregate.
    pub async fn create_account(
        &self,
        cmd: CreateAccountCmd,
    ) -> ResultEngine<(Account, UserBalance)> {
        let name = normalize_required_name(&cmd.name, "account")?;
        if !cmd.is_credit && cmd.balance_minor < 0 {
            return Err(EngineError::InsufficientBalance(name));
        }

        let account = Account::new(
            cmd.user_id.clone(),
            name,
            cmd.balance_minor,
            cmd.currency,
            cmd.is_credit,
            cmd.icon,
        );

        with_tx!(self, |db_tx| {
            accounts::ActiveModel::from(&account)
                .insert(&db_tx)
                .await
                .map_err(storage_error)?;

            let user_balance = self
                .update_total_balance(
                    &db_tx,
                    &cmd.user_id,
                    cmd.period,
                    BalanceUpdate {
                        reason: BalanceUpdateReason::CreateAccount,
                        update_amount_minor: account.balance_minor,
                        update_currency: account.currency,
                        account_id: Some(account.id),
                        transaction_id: None,
                    },
                )
                .await?;

            info!(user = %cmd.user_id, account = %account.id, "created account");
            Ok((account.clone(), user_balance))
        })
    }

    /// Edits account metadata (name, icon, credit flag).
    ///
    /// Clearing the credit flag while the balance is negative would put the
    /// account in violation of the overdraft rule, so it is rejected.
    pub async fn update_account(&self, cmd: UpdateAccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account")?;

        with_tx!(self, |db_tx| {
            let model = self
                .require_account(&db_tx, &cmd.user_id, cmd.account_id)
                .await?;
            let is_credit = cmd.is_credit.unwrap_or(model.is_credit);

            if !is_credit && model.balance_minor < 0 {
                return Err(EngineError::InsufficientBalance(name));
            }

            let active = accounts::ActiveModel {
                id: ActiveValue::Set(model.id.clone()),
                name: ActiveValue::Set(name.clone()),
                icon: ActiveValue::Set(cmd.icon.as_str().to_string()),
                is_credit: ActiveValue::Set(is_credit),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;
            Account::try_from(updated)
        })
    }

    /// Deletes an account, its transactions (either leg), and reconciles the
    /// aggregate without the removed balance.
    pub async fn delete_account(
        &self,
        user_id: &str,
        account_id: Uuid,
        period: Period,
    ) -> ResultEngine<UserBalance> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            let currency = Currency::try_from(model.currency.as_str())?;
            let removed_balance = model.balance_minor;

            // Remove tag links first: the join rows reference transactions
            // about to go away.
            let involved = Condition::any()
                .add(transactions::Column::FromAccountId.eq(account_id.to_string()))
                .add(transactions::Column::ToAccountId.eq(account_id.to_string()));
            let tx_models = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(involved.clone())
                .all(&db_tx)
                .await?;
            let tx_ids: Vec<String> = tx_models.iter().map(|tx| tx.id.clone()).collect();
            if !tx_ids.is_empty() {
                transaction_tags::Entity::delete_many()
                    .filter(transaction_tags::Column::TransactionId.is_in(tx_ids))
                    .exec(&db_tx)
                    .await?;
            }
            transactions::Entity::delete_many()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(involved)
                .exec(&db_tx)
                .await?;

            accounts::Entity::delete_by_id(model.id.clone())
                .exec(&db_tx)
                .await?;

            let user_balance = self
                .update_total_balance(
                    &db_tx,
                    user_id,
                    period,
                    BalanceUpdate {
                        reason: BalanceUpdateReason::DeleteAccount,
                        update_amount_minor: removed_balance,
                        update_currency: currency,
                        account_id: Some(account_id),
                        transaction_id: None,
                    },
                )
                .await?;

            info!(user = user_id, account = %account_id, "deleted account");
            Ok(user_balance)
        })
    }

    /// Returns one account, scoped to its owner.
    pub async fn account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            Account::try_from(model)
        })
    }

    /// Returns all of the user's accounts.
    pub async fn accounts(&self, user_id: &str) -> ResultEngine<Vec<Account>> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?;
            let mut out = Vec::with_capacity(models.len());
            for model in models {
                out.push(Account::try_from(model)?);
            }
            Ok(out)
        })
    }
}
