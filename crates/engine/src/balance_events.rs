//! Append-only audit records of aggregate balance changes.
//!
//! Every reconciliation appends exactly one event carrying the reason, the
//! update amount that triggered it, and a snapshot of the resulting total.
//! The integer primary key is the append order: the latest event's snapshot
//! must equal the owning `user_balances` row.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::parse_uuid};

/// Why the aggregate balance was recomputed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceUpdateReason {
    CreateAccount,
    DeleteAccount,
    CreateTransaction,
    UpdateTransaction,
    RemoveTransaction,
}

impl BalanceUpdateReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateAccount => "CREATE_ACCOUNT",
            Self::DeleteAccount => "DELETE_ACCOUNT",
            Self::CreateTransaction => "CREATE_TRANSACTION",
            Self::UpdateTransaction => "UPDATE_TRANSACTION",
            Self::RemoveTransaction => "REMOVE_TRANSACTION",
        }
    }
}

impl TryFrom<&str> for BalanceUpdateReason {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "CREATE_ACCOUNT" => Ok(Self::CreateAccount),
            "DELETE_ACCOUNT" => Ok(Self::DeleteAccount),
            "CREATE_TRANSACTION" => Ok(Self::CreateTransaction),
            "UPDATE_TRANSACTION" => Ok(Self::UpdateTransaction),
            "REMOVE_TRANSACTION" => Ok(Self::RemoveTransaction),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid balance update reason: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceUpdateEvent {
    /// Append-order sequence number assigned by the store.
    pub seq: i64,
    pub user_balance_id: Uuid,
    pub reason: BalanceUpdateReason,
    /// The signed change that triggered this reconciliation, in
    /// `update_currency` minor units. Not the new total.
    pub update_amount_minor: i64,
    pub update_currency: Currency,
    /// Snapshot of the normalized total right after this update.
    pub total_balance_minor: i64,
    pub account_id: Option<Uuid>,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_balance_id: String,
    pub reason: String,
    pub update_amount_minor: i64,
    pub update_currency: String,
    pub total_balance_minor: i64,
    pub account_id: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::balances::Entity",
        from = "Column::UserBalanceId",
        to = "super::balances::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UserBalances,
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserBalances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for BalanceUpdateEvent {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            seq: model.id,
            user_balance_id: parse_uuid(&model.user_balance_id, "user balance")?,
            reason: BalanceUpdateReason::try_from(model.reason.as_str())?,
            update_amount_minor: model.update_amount_minor,
            update_currency: Currency::try_from(model.update_currency.as_str())?,
            total_balance_minor: model.total_balance_minor,
            account_id: model
                .account_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "account"))
                .transpose()?,
            transaction_id: model
                .transaction_id
                .as_deref()
                .map(|raw| parse_uuid(raw, "transaction"))
                .transpose()?,
            created_at: model.created_at,
        })
    }
}

pub(crate) fn active_model(
    user_balance_id: &str,
    reason: BalanceUpdateReason,
    update_amount_minor: i64,
    update_currency: Currency,
    total_balance_minor: i64,
    account_id: Option<Uuid>,
    transaction_id: Option<Uuid>,
    created_at: DateTime<Utc>,
) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::NotSet,
        user_balance_id: ActiveValue::Set(user_balance_id.to_string()),
        reason: ActiveValue::Set(reason.as_str().to_string()),
        update_amount_minor: ActiveValue::Set(update_amount_minor),
        update_currency: ActiveValue::Set(update_currency.code().to_string()),
        total_balance_minor: ActiveValue::Set(total_balance_minor),
        account_id: ActiveValue::Set(account_id.map(|id| id.to_string())),
        transaction_id: ActiveValue::Set(transaction_id.map(|id| id.to_string())),
        created_at: ActiveValue::Set(created_at),
    }
}
