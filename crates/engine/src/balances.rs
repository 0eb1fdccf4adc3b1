//! The per-user, per-month aggregate balance.
//!
//! `UserBalance` is a cached projection: it is recomputed in full from the
//! user's accounts on every reconciliation and never trusted as a source of
//! truth. One row exists per `(user, year, month)`; the row for the current
//! period is upserted on first touch and never deleted by the engine.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Currency, EngineError, ResultEngine, util::parse_uuid};
use uuid::Uuid;

/// A reporting period (one calendar month).
///
/// The engine never reads the wall clock to decide which period a mutation
/// belongs to; callers pass the period explicitly, which keeps operations
/// deterministic and replayable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> ResultEngine<Self> {
        if !(1..=12).contains(&month) {
            return Err(EngineError::InvalidAmount(format!(
                "invalid month: {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// The period a timestamp falls in.
    #[must_use]
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// 1-based calendar month.
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }
}

impl core::fmt::Display for Period {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub id: Uuid,
    pub user_id: String,
    pub period: Period,
    /// Always the reporting currency.
    pub currency: Currency,
    /// Normalized total of all the user's account balances, minor units.
    pub balance_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub year: i32,
    pub month: i32,
    pub currency: String,
    pub balance_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::balance_events::Entity")]
    BalanceEvents,
}

impl Related<super::balance_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&UserBalance> for ActiveModel {
    fn from(balance: &UserBalance) -> Self {
        Self {
            id: ActiveValue::Set(balance.id.to_string()),
            user_id: ActiveValue::Set(balance.user_id.clone()),
            year: ActiveValue::Set(balance.period.year()),
            month: ActiveValue::Set(balance.period.month() as i32),
            currency: ActiveValue::Set(balance.currency.code().to_string()),
            balance_minor: ActiveValue::Set(balance.balance_minor),
        }
    }
}

impl TryFrom<Model> for UserBalance {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "user balance")?,
            user_id: model.user_id,
            period: Period::new(model.year, model.month as u32)?,
            currency: Currency::try_from(model.currency.as_str())?,
            balance_minor: model.balance_minor,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn period_rejects_invalid_month() {
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2024, 13).is_err());
        assert!(Period::new(2024, 12).is_ok());
    }

    #[test]
    fn period_containing_uses_calendar_month() {
        let at = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let period = Period::containing(at);
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 3);
    }
}
