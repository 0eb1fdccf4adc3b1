use std::{error::Error, io::Write, sync::Arc};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    AccountIcon, CreateAccountCmd, Currency, CurrencyApiClient, Engine, FixedRates, Money, Period,
    RateProvider,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, QueryFilter, ColumnTrait, Set};
use uuid::Uuid;

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub email: String,
        pub password: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "moneta_admin")]
#[command(about = "Admin utilities for Moneta (bootstrap users/accounts)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./moneta.db?mode=rwc"
    )]
    database_url: String,

    /// currencyapi.com key; without it only USD accounts reconcile.
    #[arg(long, env = "CURRENCY_API_KEY")]
    currency_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Account(Account),
    Balance(Balance),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    email: String,
}

#[derive(Args, Debug)]
struct Account {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create(AccountCreateArgs),
}

#[derive(Args, Debug)]
struct AccountCreateArgs {
    /// Owner user id.
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "USD")]
    currency: String,
    /// Opening balance in minor units (cents).
    #[arg(long, default_value_t = 0)]
    balance_minor: i64,
    #[arg(long, default_value_t = false)]
    credit: bool,
    #[arg(long, default_value = "BANK")]
    icon: String,
}

#[derive(Args, Debug)]
struct Balance {
    #[command(subcommand)]
    command: BalanceCommand,
}

#[derive(Subcommand, Debug)]
enum BalanceCommand {
    Show(BalanceShowArgs),
}

#[derive(Args, Debug)]
struct BalanceShowArgs {
    /// User id.
    #[arg(long)]
    user: String,
    /// Defaults to the current month.
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    month: Option<u32>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    if buf.is_empty() {
        return Err("password must not be empty".into());
    }
    Ok(buf)
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn rate_provider(api_key: Option<String>) -> Arc<dyn RateProvider> {
    match api_key {
        Some(key) => Arc::new(CurrencyApiClient::new(key)),
        None => Arc::new(FixedRates::new()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password("Password: ")?;

            if users::Entity::find()
                .filter(users::Column::Email.eq(args.email.clone()))
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("user already exists: {}", args.email);
                std::process::exit(1);
            }

            let id = Uuid::new_v4().to_string();
            let user = users::ActiveModel {
                id: Set(id.clone()),
                email: Set(args.email.clone()),
                password: Set(password),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {} ({id})", args.email);
        }
        Command::Account(Account {
            command: AccountCommand::Create(args),
        }) => {
            if users::Entity::find_by_id(args.owner.clone())
                .one(&db)
                .await?
                .is_none()
            {
                eprintln!("user not found: {}", args.owner);
                std::process::exit(1);
            }

            let currency = Currency::try_from(args.currency.as_str())?;
            let icon = AccountIcon::try_from(args.icon.as_str())?;

            let engine = Engine::builder()
                .database(db.clone())
                .rates(rate_provider(cli.currency_api_key))
                .build()
                .await?;

            let period = Period::containing(Utc::now());
            let (account, user_balance) = engine
                .create_account(
                    CreateAccountCmd::new(&args.owner, &args.name, currency, period)
                        .balance_minor(args.balance_minor)
                        .is_credit(args.credit)
                        .icon(icon),
                )
                .await?;

            println!("created account: {} ({})", account.name, account.id);
            println!(
                "total balance for {period}: {}",
                Money::new(user_balance.balance_minor).display(user_balance.currency)
            );
        }
        Command::Balance(Balance {
            command: BalanceCommand::Show(args),
        }) => {
            let engine = Engine::builder()
                .database(db.clone())
                .rates(rate_provider(cli.currency_api_key))
                .build()
                .await?;

            let period = match (args.year, args.month) {
                (Some(year), Some(month)) => Period::new(year, month)?,
                _ => Period::containing(Utc::now()),
            };

            match engine.user_balance(&args.user, period).await? {
                Some(balance) => println!(
                    "{period}: {}",
                    Money::new(balance.balance_minor).display(balance.currency)
                ),
                None => println!("{period}: no balance recorded"),
            }

            for event in engine.balance_events(&args.user, period).await? {
                println!(
                    "  #{} {} {} -> {}",
                    event.seq,
                    event.reason.as_str(),
                    Money::new(event.update_amount_minor).display(event.update_currency),
                    Money::new(event.total_balance_minor).display(Currency::Usd),
                );
            }
        }
    }

    Ok(())
}
