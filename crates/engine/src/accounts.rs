//! Account primitives.
//!
//! An account is a user-owned monetary container with a balance in one
//! currency. Non-credit accounts obey the overdraft rule: no engine
//! operation may leave them with a negative balance.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::parse_uuid};

/// Display icon attached to an account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountIcon {
    #[default]
    Bank,
    Card,
    Money,
    Bill,
    Savings,
    Wallet,
    Usd,
    Eur,
    Btc,
    Payments,
    Shopping,
    Travel,
}

impl AccountIcon {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bank => "BANK",
            Self::Card => "CARD",
            Self::Money => "MONEY",
            Self::Bill => "BILL",
            Self::Savings => "SAVINGS",
            Self::Wallet => "WALLET",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Btc => "BTC",
            Self::Payments => "PAYMENTS",
            Self::Shopping => "SHOPPING",
            Self::Travel => "TRAVEL",
        }
    }
}

impl TryFrom<&str> for AccountIcon {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "BANK" => Ok(Self::Bank),
            "CARD" => Ok(Self::Card),
            "MONEY" => Ok(Self::Money),
            "BILL" => Ok(Self::Bill),
            "SAVINGS" => Ok(Self::Savings),
            "WALLET" => Ok(Self::Wallet),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "BTC" => Ok(Self::Btc),
            "PAYMENTS" => Ok(Self::Payments),
            "SHOPPING" => Ok(Self::Shopping),
            "TRAVEL" => Ok(Self::Travel),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid account icon: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    /// Signed balance in minor units of `currency`.
    pub balance_minor: i64,
    pub currency: Currency,
    /// Credit accounts may carry a negative balance.
    pub is_credit: bool,
    pub icon: AccountIcon,
}

impl Account {
    pub fn new(
        user_id: String,
        name: String,
        balance_minor: i64,
        currency: Currency,
        is_credit: bool,
        icon: AccountIcon,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            balance_minor,
            currency,
            is_credit,
            icon,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub balance_minor: i64,
    pub currency: String,
    pub is_credit: bool,
    pub icon: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            user_id: ActiveValue::Set(account.user_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            balance_minor: ActiveValue::Set(account.balance_minor),
            currency: ActiveValue::Set(account.currency.code().to_string()),
            is_credit: ActiveValue::Set(account.is_credit),
            icon: ActiveValue::Set(account.icon.as_str().to_string()),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            user_id: model.user_id,
            name: model.name,
            balance_minor: model.balance_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            is_credit: model.is_credit,
            icon: AccountIcon::try_from(model.icon.as_str()).unwrap_or_default(),
        })
    }
}
