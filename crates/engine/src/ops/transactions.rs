//! Transaction lifecycle operations.
//!
//! The submodules hold the write paths (create / update / delete); this hub
//! keeps the shared plumbing: scoped loads, tag upkeep, and the paginated
//! per-account listing.

use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Account, EngineError, ResultEngine, Transaction, UserBalance, ledger::TransferLegs, tags,
    transaction_tags, transactions,
    util::{normalize_tag_names, parse_uuid, storage_error},
};

use super::{Engine, with_tx};

mod create;
mod delete;
mod update;

/// Result of a transaction write: the transaction, the touched account
/// state(s) and the reconciled aggregate balance.
#[derive(Clone, Debug)]
pub struct TransactionOutcome {
    pub transaction: Transaction,
    pub from_account: Account,
    /// Receiver state; only set for transfers.
    pub to_account: Option<Account>,
    pub user_balance: UserBalance,
}

/// One page of a per-account transaction listing, newest first.
#[derive(Clone, Debug)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub total: u64,
    /// Offset of the next page, or `None` past the end.
    pub next_offset: Option<u64>,
}

/// The two legs of a stored transfer row.
pub(super) fn transfer_legs_of(model: &transactions::Model) -> ResultEngine<TransferLegs> {
    let to_account_id = model
        .to_account_id
        .as_deref()
        .ok_or_else(|| EngineError::InvalidAmount("transfer missing to_account_id".to_string()))
        .and_then(|raw| parse_uuid(raw, "account"))?;
    let to_amount_minor = model
        .to_amount_minor
        .ok_or_else(|| EngineError::InvalidAmount("transfer missing to_amount_minor".to_string()))?;

    Ok(TransferLegs {
        from_account_id: parse_uuid(&model.from_account_id, "account")?,
        to_account_id,
        from_amount_minor: model.amount_minor,
        to_amount_minor,
    })
}

impl Engine {
    /// Loads a transaction inside the open unit of work, scoped to its
    /// owner.
    pub(super) async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id.to_string())
            .filter(transactions::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("transaction".to_string()))
    }

    /// Replaces a transaction's tag set, upserting tags by `(user, name)`.
    pub(super) async fn set_transaction_tags(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        transaction_id: Uuid,
        names: &[String],
    ) -> ResultEngine<Vec<String>> {
        transaction_tags::Entity::delete_many()
            .filter(transaction_tags::Column::TransactionId.eq(transaction_id.to_string()))
            .exec(db_tx)
            .await?;

        let names = normalize_tag_names(names);
        for name in &names {
            let existing = tags::Entity::find()
                .filter(tags::Column::UserId.eq(user_id))
                .filter(tags::Column::Name.eq(name.clone()))
                .one(db_tx)
                .await?;
            let tag_id = match existing {
                Some(tag) => tag.id,
                None => {
                    let id = Uuid::new_v4().to_string();
                    let tag = tags::ActiveModel {
                        id: ActiveValue::Set(id.clone()),
                        user_id: ActiveValue::Set(user_id.to_string()),
                        name: ActiveValue::Set(name.clone()),
                    };
                    tag.insert(db_tx).await.map_err(storage_error)?;
                    id
                }
            };

            let link = transaction_tags::ActiveModel {
                transaction_id: ActiveValue::Set(transaction_id.to_string()),
                tag_id: ActiveValue::Set(tag_id),
            };
            link.insert(db_tx).await.map_err(storage_error)?;
        }

        Ok(names)
    }

    /// Tag names attached to a transaction.
    pub(super) async fn transaction_tag_names(
        &self,
        db_tx: &DatabaseTransaction,
        transaction_id: &str,
    ) -> ResultEngine<Vec<String>> {
        let rows: Vec<(transaction_tags::Model, Option<tags::Model>)> =
            transaction_tags::Entity::find()
                .filter(transaction_tags::Column::TransactionId.eq(transaction_id))
                .find_also_related(tags::Entity)
                .all(db_tx)
                .await?;

        let mut names: Vec<String> = rows
            .into_iter()
            .filter_map(|(_, tag)| tag.map(|tag| tag.name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Lists an account's transactions, newest first.
    pub async fn transactions_by_account(
        &self,
        user_id: &str,
        account_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> ResultEngine<TransactionPage> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, user_id, account_id).await?;

            let query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(transactions::Column::FromAccountId.eq(account_id.to_string()));

            let total = query.clone().count(&db_tx).await?;
            let models = query
                .order_by_desc(transactions::Column::OccurredAt)
                .offset(offset)
                .limit(limit)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(models.len());
            for model in models {
                let tag_names = self.transaction_tag_names(&db_tx, &model.id).await?;
                let mut tx = Transaction::try_from(model)?;
                tx.tags = tag_names;
                out.push(tx);
            }

            let next = offset.saturating_add(limit);
            Ok(TransactionPage {
                transactions: out,
                total,
                next_offset: (next < total).then_some(next),
            })
        })
    }
}
