//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. Updates carry the complete new
//! shape of the transaction rather than field patches: the engine compares
//! it against the stored row to decide what balances must move.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountIcon, Currency, Period, TransactionKind};

/// Shared metadata for deposit/withdrawal creation and editing.
#[derive(Clone, Debug)]
pub struct TxMeta {
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payee: Option<String>,
    pub tags: Vec<String>,
}

impl TxMeta {
    #[must_use]
    pub fn new(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            description: None,
            category: None,
            payee: None,
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn payee(mut self, payee: impl Into<String>) -> Self {
        self.payee = Some(payee.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Create an account.
#[derive(Clone, Debug)]
pub struct CreateAccountCmd {
    pub user_id: String,
    pub name: String,
    /// Opening balance in minor units; may be negative only for credit
    /// accounts.
    pub balance_minor: i64,
    pub currency: Currency,
    pub is_credit: bool,
    pub icon: AccountIcon,
    pub period: Period,
}

impl CreateAccountCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
        period: Period,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            balance_minor: 0,
            currency,
            is_credit: false,
            icon: AccountIcon::default(),
            period,
        }
    }

    #[must_use]
    pub fn balance_minor(mut self, balance_minor: i64) -> Self {
        self.balance_minor = balance_minor;
        self
    }

    #[must_use]
    pub fn is_credit(mut self, is_credit: bool) -> Self {
        self.is_credit = is_credit;
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: AccountIcon) -> Self {
        self.icon = icon;
        self
    }
}

/// Edit account metadata (never the balance).
#[derive(Clone, Debug)]
pub struct UpdateAccountCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub name: String,
    pub icon: AccountIcon,
    /// `None` leaves the flag unchanged.
    pub is_credit: Option<bool>,
}

impl UpdateAccountCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        name: impl Into<String>,
        icon: AccountIcon,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            name: name.into(),
            icon,
            is_credit: None,
        }
    }

    #[must_use]
    pub fn is_credit(mut self, is_credit: bool) -> Self {
        self.is_credit = Some(is_credit);
        self
    }
}

/// Create a deposit or withdrawal.
#[derive(Clone, Debug)]
pub struct CreateTransactionCmd {
    pub user_id: String,
    pub from_account_id: Uuid,
    /// `Deposit` or `Withdrawal`; transfers use [`CreateTransferCmd`].
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub meta: TxMeta,
    pub period: Period,
}

impl CreateTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        period: Period,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            from_account_id,
            kind,
            amount_minor,
            meta: TxMeta::new(occurred_at),
            period,
        }
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.meta.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn payee(mut self, payee: impl Into<String>) -> Self {
        self.meta.payee = Some(payee.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Create a two-account transfer. The two amounts are independent so
/// cross-currency transfers can record both sides exactly.
#[derive(Clone, Debug)]
pub struct CreateTransferCmd {
    pub user_id: String,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub from_amount_minor: i64,
    pub to_amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub period: Period,
}

impl CreateTransferCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        to_account_id: Uuid,
        from_amount_minor: i64,
        to_amount_minor: i64,
        occurred_at: DateTime<Utc>,
        period: Period,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            from_account_id,
            to_account_id,
            from_amount_minor,
            to_amount_minor,
            occurred_at,
            description: None,
            period,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Replace a deposit/withdrawal with a new shape.
///
/// Kind, amount and account may all change at once. When the account
/// changes, the engine treats the edit as remove-from-old + create-on-new
/// inside one unit of work.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub from_account_id: Uuid,
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub meta: TxMeta,
    pub period: Period,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        transaction_id: Uuid,
        from_account_id: Uuid,
        kind: TransactionKind,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
        period: Period,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            from_account_id,
            kind,
            amount_minor,
            meta: TxMeta::new(occurred_at),
            period,
        }
    }

    #[must_use]
    pub fn meta(mut self, meta: TxMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Replace a transfer with a new shape: sender, receiver and both amounts
/// may each change independently.
#[derive(Clone, Debug)]
pub struct UpdateTransferCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub from_amount_minor: i64,
    pub to_amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
    pub period: Period,
}

impl UpdateTransferCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        transaction_id: Uuid,
        from_account_id: Uuid,
        to_account_id: Uuid,
        from_amount_minor: i64,
        to_amount_minor: i64,
        occurred_at: DateTime<Utc>,
        period: Period,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            from_account_id,
            to_account_id,
            from_amount_minor,
            to_amount_minor,
            occurred_at,
            description: None,
            period,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
