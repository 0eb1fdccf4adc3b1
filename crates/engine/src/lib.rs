//! Moneta ledger engine.
//!
//! The engine keeps per-account balances, double-entry transfers and the
//! per-user monthly aggregate balance mutually consistent. Every write
//! operation runs inside a single database transaction: either all of its
//! effects (account balances, transaction rows, the aggregate balance row and
//! its audit event) commit together, or none do.
//!
//! The engine does not schedule, authenticate or serve HTTP; callers hand it
//! commands (see [`commands`]) together with an authenticated user id and an
//! explicit reporting [`Period`].

pub use accounts::{Account, AccountIcon};
pub use balance_events::{BalanceUpdateEvent, BalanceUpdateReason};
pub use balances::{Period, UserBalance};
pub use commands::{
    CreateAccountCmd, CreateTransactionCmd, CreateTransferCmd, TxMeta, UpdateAccountCmd,
    UpdateTransactionCmd, UpdateTransferCmd,
};
pub use currency::Currency;
pub use error::EngineError;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, TransactionOutcome, TransactionPage};
pub use rates::{CurrencyApiClient, FailingRates, FixedRates, RateError, RateProvider};
pub use transactions::{Transaction, TransactionEffect, TransactionKind};

mod accounts;
mod balance_events;
mod balances;
mod commands;
mod currency;
mod error;
mod ledger;
mod money;
mod ops;
mod rates;
mod tags;
mod transaction_tags;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
