use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountIcon, CreateAccountCmd, CreateTransactionCmd, CreateTransferCmd, Currency, Engine,
    EngineError, FixedRates, Period, RateProvider, TransactionKind, UpdateTransactionCmd,
    UpdateTransferCmd,
};
use migration::MigratorTrait;

const USER: &str = "alice";

fn period() -> Period {
    Period::new(2026, 3).unwrap()
}

async fn engine_with_rates(rates: Arc<dyn RateProvider>) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (id, email, password) VALUES (?, ?, ?)",
        vec![USER.into(), "alice@example.com".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .rates(rates)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let rates = Arc::new(FixedRates::new().with_rate(Currency::Eur, Decimal::new(110, 2)));
    engine_with_rates(rates).await
}

async fn usd_account(engine: &Engine, name: &str, balance_minor: i64) -> Uuid {
    let (account, _) = engine
        .create_account(
            CreateAccountCmd::new(USER, name, Currency::Usd, period())
                .balance_minor(balance_minor)
                .icon(AccountIcon::Card),
        )
        .await
        .unwrap();
    account.id
}

#[tokio::test]
async fn deposit_raises_account_and_total_balance() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;

    let outcome = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Deposit,
            50_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.from_account.balance_minor, 150_00);
    assert_eq!(outcome.user_balance.balance_minor, 150_00);

    let events = engine.balance_events(USER, period()).await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.reason, engine::BalanceUpdateReason::CreateTransaction);
    assert_eq!(last.update_amount_minor, 50_00);
    assert_eq!(last.total_balance_minor, 150_00);
    assert_eq!(last.transaction_id, Some(outcome.transaction.id));
}

#[tokio::test]
async fn withdrawal_overdraft_rolls_everything_back() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 10_00).await;

    let err = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Withdrawal,
            50_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance("Checking".to_string()));

    let account = engine.account(USER, account_id).await.unwrap();
    assert_eq!(account.balance_minor, 10_00);

    // Only the account-creation event exists; the failed operation left no
    // trace.
    let events = engine.balance_events(USER, period()).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reason, engine::BalanceUpdateReason::CreateAccount);

    let page = engine
        .transactions_by_account(USER, account_id, 0, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn credit_account_may_go_negative() {
    let (engine, _db) = engine_with_db().await;
    let (account, _) = engine
        .create_account(
            CreateAccountCmd::new(USER, "Credit card", Currency::Usd, period()).is_credit(true),
        )
        .await
        .unwrap();

    let outcome = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account.id,
            TransactionKind::Withdrawal,
            25_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.from_account.balance_minor, -25_00);
    assert_eq!(outcome.user_balance.balance_minor, -25_00);
}

#[tokio::test]
async fn edit_amount_same_kind_moves_balance_by_difference() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;

    let outcome = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Deposit,
            20_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.from_account.balance_minor, 120_00);

    let outcome = engine
        .update_transaction(UpdateTransactionCmd::new(
            USER,
            outcome.transaction.id,
            account_id,
            TransactionKind::Deposit,
            30_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    // 120 - 20 + 30.
    assert_eq!(outcome.from_account.balance_minor, 130_00);
    assert_eq!(outcome.user_balance.balance_minor, 130_00);

    let events = engine.balance_events(USER, period()).await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.reason, engine::BalanceUpdateReason::UpdateTransaction);
    // The audit carries the balance delta, not the raw amount.
    assert_eq!(last.update_amount_minor, 10_00);
}

#[tokio::test]
async fn edit_kind_same_amount_reverses_twice() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 140_00).await;

    let outcome = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Withdrawal,
            20_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();
    assert_eq!(outcome.from_account.balance_minor, 120_00);

    let outcome = engine
        .update_transaction(UpdateTransactionCmd::new(
            USER,
            outcome.transaction.id,
            account_id,
            TransactionKind::Deposit,
            20_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    // 120 + 20 * 2.
    assert_eq!(outcome.from_account.balance_minor, 160_00);
}

#[tokio::test]
async fn edit_back_to_original_restores_balance() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;

    let created = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Withdrawal,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();
    assert_eq!(created.from_account.balance_minor, 60_00);

    engine
        .update_transaction(UpdateTransactionCmd::new(
            USER,
            created.transaction.id,
            account_id,
            TransactionKind::Deposit,
            15_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let outcome = engine
        .update_transaction(UpdateTransactionCmd::new(
            USER,
            created.transaction.id,
            account_id,
            TransactionKind::Withdrawal,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.from_account.balance_minor, 60_00);
}

#[tokio::test]
async fn edit_with_account_change_is_remove_plus_create() {
    let (engine, _db) = engine_with_db().await;
    let first = usd_account(&engine, "Checking", 100_00).await;
    let second = usd_account(&engine, "Savings", 50_00).await;

    let created = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            first,
            TransactionKind::Deposit,
            30_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let outcome = engine
        .update_transaction(UpdateTransactionCmd::new(
            USER,
            created.transaction.id,
            second,
            TransactionKind::Deposit,
            30_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    // The replacement row lives on the other account under a fresh id.
    assert_ne!(outcome.transaction.id, created.transaction.id);
    assert_eq!(outcome.from_account.id, second);
    assert_eq!(outcome.from_account.balance_minor, 80_00);

    let old_account = engine.account(USER, first).await.unwrap();
    assert_eq!(old_account.balance_minor, 100_00);

    let events = engine.balance_events(USER, period()).await.unwrap();
    let reasons: Vec<_> = events.iter().map(|event| event.reason).collect();
    assert_eq!(
        &reasons[reasons.len() - 2..],
        &[
            engine::BalanceUpdateReason::RemoveTransaction,
            engine::BalanceUpdateReason::CreateTransaction,
        ]
    );

    // The total is unchanged: the deposit just lives elsewhere now.
    assert_eq!(outcome.user_balance.balance_minor, 180_00);
}

#[tokio::test]
async fn delete_withdrawal_refunds_the_account() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;

    let created = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Withdrawal,
            30_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();
    assert_eq!(created.from_account.balance_minor, 70_00);

    let user_balance = engine
        .delete_transaction(USER, created.transaction.id, period())
        .await
        .unwrap();
    assert_eq!(user_balance.balance_minor, 100_00);

    let account = engine.account(USER, account_id).await.unwrap();
    assert_eq!(account.balance_minor, 100_00);

    let err = engine
        .delete_transaction(USER, created.transaction.id, period())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotFound("transaction".to_string()));
}

#[tokio::test]
async fn transfer_moves_value_between_accounts() {
    let (engine, _db) = engine_with_db().await;
    let sender = usd_account(&engine, "Checking", 100_00).await;
    let receiver = usd_account(&engine, "Savings", 0).await;

    let outcome = engine
        .create_transfer(CreateTransferCmd::new(
            USER,
            sender,
            receiver,
            30_00,
            30_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.from_account.balance_minor, 70_00);
    assert_eq!(outcome.to_account.as_ref().unwrap().balance_minor, 30_00);
    // An internal move never changes the total.
    assert_eq!(outcome.user_balance.balance_minor, 100_00);

    engine
        .delete_transaction(USER, outcome.transaction.id, period())
        .await
        .unwrap();
    let sender_account = engine.account(USER, sender).await.unwrap();
    let receiver_account = engine.account(USER, receiver).await.unwrap();
    assert_eq!(sender_account.balance_minor, 100_00);
    assert_eq!(receiver_account.balance_minor, 0);
}

#[tokio::test]
async fn transfer_overdraft_on_sender_aborts() {
    let (engine, _db) = engine_with_db().await;
    let sender = usd_account(&engine, "Checking", 10_00).await;
    let receiver = usd_account(&engine, "Savings", 0).await;

    let err = engine
        .create_transfer(CreateTransferCmd::new(
            USER,
            sender,
            receiver,
            30_00,
            30_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance("Checking".to_string()));

    let receiver_account = engine.account(USER, receiver).await.unwrap();
    assert_eq!(receiver_account.balance_minor, 0);
}

#[tokio::test]
async fn cross_currency_transfer_keeps_both_sides() {
    let (engine, _db) = engine_with_db().await;
    let sender = usd_account(&engine, "Checking", 200_00).await;
    let (euro_account, _) = engine
        .create_account(CreateAccountCmd::new(
            USER,
            "Euro savings",
            Currency::Eur,
            period(),
        ))
        .await
        .unwrap();
    let receiver = euro_account.id;

    let outcome = engine
        .create_transfer(CreateTransferCmd::new(
            USER,
            sender,
            receiver,
            110_00,
            100_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.from_account.balance_minor, 90_00);
    assert_eq!(outcome.to_account.as_ref().unwrap().balance_minor, 100_00);
    // 90.00 USD + 100.00 EUR * 1.10.
    assert_eq!(outcome.user_balance.balance_minor, 200_00);
}

#[tokio::test]
async fn transfer_edit_sender_only_rolls_back_old_sender() {
    let (engine, _db) = engine_with_db().await;
    let old_sender = usd_account(&engine, "Checking", 100_00).await;
    let new_sender = usd_account(&engine, "Savings", 100_00).await;
    let receiver = usd_account(&engine, "Vault", 0).await;

    let created = engine
        .create_transfer(CreateTransferCmd::new(
            USER,
            old_sender,
            receiver,
            40_00,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let outcome = engine
        .update_transfer(UpdateTransferCmd::new(
            USER,
            created.transaction.id,
            new_sender,
            receiver,
            40_00,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let old = engine.account(USER, old_sender).await.unwrap();
    assert_eq!(old.balance_minor, 100_00);
    assert_eq!(outcome.from_account.balance_minor, 60_00);
    // Receiver untouched by a sender-only edit.
    assert_eq!(outcome.to_account.as_ref().unwrap().balance_minor, 40_00);
}

#[tokio::test]
async fn transfer_edit_amounts_nets_per_account() {
    let (engine, _db) = engine_with_db().await;
    let sender = usd_account(&engine, "Checking", 100_00).await;
    let receiver = usd_account(&engine, "Savings", 0).await;

    let created = engine
        .create_transfer(CreateTransferCmd::new(
            USER,
            sender,
            receiver,
            40_00,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let outcome = engine
        .update_transfer(UpdateTransferCmd::new(
            USER,
            created.transaction.id,
            sender,
            receiver,
            55_00,
            55_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    assert_eq!(outcome.from_account.balance_minor, 45_00);
    assert_eq!(outcome.to_account.as_ref().unwrap().balance_minor, 55_00);

    let events = engine.balance_events(USER, period()).await.unwrap();
    let last = events.last().unwrap();
    assert_eq!(last.reason, engine::BalanceUpdateReason::UpdateTransaction);
    assert_eq!(last.update_amount_minor, 15_00);
}

#[tokio::test]
async fn transfer_edit_overdraft_aborts_whole_edit() {
    let (engine, _db) = engine_with_db().await;
    let sender = usd_account(&engine, "Checking", 100_00).await;
    let poor_sender = usd_account(&engine, "Pocket", 5_00).await;
    let receiver = usd_account(&engine, "Savings", 0).await;

    let created = engine
        .create_transfer(CreateTransferCmd::new(
            USER,
            sender,
            receiver,
            40_00,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let err = engine
        .update_transfer(UpdateTransferCmd::new(
            USER,
            created.transaction.id,
            poor_sender,
            receiver,
            40_00,
            40_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance("Pocket".to_string()));

    // Nothing moved: the old sender still carries the transfer.
    assert_eq!(
        engine.account(USER, sender).await.unwrap().balance_minor,
        60_00
    );
    assert_eq!(
        engine.account(USER, poor_sender).await.unwrap().balance_minor,
        5_00
    );
    assert_eq!(
        engine.account(USER, receiver).await.unwrap().balance_minor,
        40_00
    );
}

#[tokio::test]
async fn transfer_edit_rejects_wrong_kind() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;
    let other = usd_account(&engine, "Savings", 0).await;

    let created = engine
        .create_transaction(CreateTransactionCmd::new(
            USER,
            account_id,
            TransactionKind::Deposit,
            10_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap();

    let err = engine
        .update_transfer(UpdateTransferCmd::new(
            USER,
            created.transaction.id,
            account_id,
            other,
            10_00,
            10_00,
            Utc::now(),
            period(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn listing_paginates_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;

    for (amount, days_ago) in [(10_00, 3), (20_00, 2), (30_00, 1)] {
        let occurred_at = Utc::now() - chrono::Duration::days(days_ago);
        engine
            .create_transaction(
                CreateTransactionCmd::new(
                    USER,
                    account_id,
                    TransactionKind::Deposit,
                    amount,
                    occurred_at,
                    period(),
                )
                .tags(["salary"]),
            )
            .await
            .unwrap();
    }

    let page = engine
        .transactions_by_account(USER, account_id, 0, 2)
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page.next_offset, Some(2));
    assert_eq!(page.transactions[0].effect.amount_minor(), 30_00);
    assert_eq!(page.transactions[0].tags, vec!["salary".to_string()]);

    let page = engine
        .transactions_by_account(USER, account_id, 2, 2)
        .await
        .unwrap();
    assert_eq!(page.transactions.len(), 1);
    assert_eq!(page.next_offset, None);
}

#[tokio::test]
async fn tags_are_upserted_per_user() {
    let (engine, db) = engine_with_db().await;
    let account_id = usd_account(&engine, "Checking", 100_00).await;

    for _ in 0..2 {
        engine
            .create_transaction(
                CreateTransactionCmd::new(
                    USER,
                    account_id,
                    TransactionKind::Deposit,
                    10_00,
                    Utc::now(),
                    period(),
                )
                .tags(["rent", " rent ", "utilities"]),
            )
            .await
            .unwrap();
    }

    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS count FROM tags WHERE user_id = ?",
            vec![USER.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let count: i64 = row.try_get("", "count").unwrap();
    assert_eq!(count, 2);
}
