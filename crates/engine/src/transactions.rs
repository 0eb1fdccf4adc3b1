//! Transaction primitives.
//!
//! A transaction either moves value in or out of one account (deposit /
//! withdrawal) or moves value between two accounts (transfer). The two
//! transfer amounts are independent so cross-currency transfers can record
//! what actually left the sender and what actually arrived at the receiver.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// What a transaction does to balances, as a tagged variant.
///
/// Amounts are strictly positive minor units; the sign of the balance change
/// is carried by the variant, not the number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionEffect {
    Deposit {
        amount_minor: i64,
    },
    Withdrawal {
        amount_minor: i64,
    },
    Transfer {
        to_account_id: Uuid,
        from_amount_minor: i64,
        to_amount_minor: i64,
    },
}

impl TransactionEffect {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Self::Deposit { .. } => TransactionKind::Deposit,
            Self::Withdrawal { .. } => TransactionKind::Withdrawal,
            Self::Transfer { .. } => TransactionKind::Transfer,
        }
    }

    /// The from-side amount: the deposit/withdrawal amount, or what leaves
    /// the sender of a transfer.
    pub fn amount_minor(&self) -> i64 {
        match *self {
            Self::Deposit { amount_minor } | Self::Withdrawal { amount_minor } => amount_minor,
            Self::Transfer {
                from_amount_minor, ..
            } => from_amount_minor,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub from_account_id: Uuid,
    pub effect: TransactionEffect,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
    pub tags: Vec<String>,
}

impl Transaction {
    pub fn new(
        user_id: String,
        from_account_id: Uuid,
        effect: TransactionEffect,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        match effect {
            TransactionEffect::Deposit { amount_minor }
            | TransactionEffect::Withdrawal { amount_minor } => {
                if amount_minor <= 0 {
                    return Err(EngineError::InvalidAmount(
                        "amount_minor must be > 0".to_string(),
                    ));
                }
            }
            TransactionEffect::Transfer {
                to_account_id,
                from_amount_minor,
                to_amount_minor,
            } => {
                if from_amount_minor <= 0 || to_amount_minor <= 0 {
                    return Err(EngineError::InvalidAmount(
                        "transfer amounts must be > 0".to_string(),
                    ));
                }
                if to_account_id == from_account_id {
                    return Err(EngineError::InvalidAmount(
                        "from_account_id and to_account_id must differ".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            from_account_id,
            effect,
            occurred_at,
            description: None,
            category: None,
            payee: None,
            tags: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub from_account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub to_account_id: Option<String>,
    pub to_amount_minor: Option<i64>,
    pub occurred_at: DateTimeUtc,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transaction_tags::Entity")]
    TransactionTags,
}

impl Related<super::transaction_tags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransactionTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let (amount_minor, to_account_id, to_amount_minor) = match tx.effect {
            TransactionEffect::Deposit { amount_minor }
            | TransactionEffect::Withdrawal { amount_minor } => (amount_minor, None, None),
            TransactionEffect::Transfer {
                to_account_id,
                from_amount_minor,
                to_amount_minor,
            } => (
                from_amount_minor,
                Some(to_account_id.to_string()),
                Some(to_amount_minor),
            ),
        };

        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            from_account_id: ActiveValue::Set(tx.from_account_id.to_string()),
            kind: ActiveValue::Set(tx.effect.kind().as_str().to_string()),
            amount_minor: ActiveValue::Set(amount_minor),
            to_account_id: ActiveValue::Set(to_account_id),
            to_amount_minor: ActiveValue::Set(to_amount_minor),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            description: ActiveValue::Set(tx.description.clone()),
            category: ActiveValue::Set(tx.category.clone()),
            payee: ActiveValue::Set(tx.payee.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let kind = TransactionKind::try_from(model.kind.as_str())?;
        let effect = match kind {
            TransactionKind::Deposit => TransactionEffect::Deposit {
                amount_minor: model.amount_minor,
            },
            TransactionKind::Withdrawal => TransactionEffect::Withdrawal {
                amount_minor: model.amount_minor,
            },
            TransactionKind::Transfer => {
                let to_account_id = model
                    .to_account_id
                    .as_deref()
                    .ok_or_else(|| {
                        EngineError::InvalidAmount("transfer missing to_account_id".to_string())
                    })
                    .and_then(|raw| parse_uuid(raw, "account"))?;
                let to_amount_minor = model.to_amount_minor.ok_or_else(|| {
                    EngineError::InvalidAmount("transfer missing to_amount_minor".to_string())
                })?;
                TransactionEffect::Transfer {
                    to_account_id,
                    from_amount_minor: model.amount_minor,
                    to_amount_minor,
                }
            }
        };

        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            from_account_id: parse_uuid(&model.from_account_id, "account")?,
            effect,
            occurred_at: model.occurred_at,
            description: model.description,
            category: model.category,
            payee: model.payee,
            tags: Vec::new(),
        })
    }
}
