use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use homeledger::{
    account::{Account, AccountKind, create_account, current_balance, get_all_accounts},
    aggregation::{
        aggregate_daily, aggregate_monthly, aggregate_quarterly, aggregate_weekly,
        aggregate_yearly,
    },
    bootstrap::bootstrap,
    category::create_category,
    db,
    recurring::{Frequency, Schedule, expand},
    transaction::{Transaction, TransactionKind, count_transactions},
    transfer::transfer,
};

/// A utility for creating a demo ledger database for manual testing of
/// homeledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    db::initialize(&conn)?;
    bootstrap(&conn);

    println!("Seeding demo ledger...");

    let everyday = create_account(
        Account::build("Everyday")
            .kind(AccountKind::Checking)
            .institution("Demo Bank")
            .initial_balance(Decimal::new(2500_00, 2)),
        &conn,
    )?;
    let rainy_day = create_account(
        Account::build("Rainy Day")
            .kind(AccountKind::Savings)
            .institution("Demo Bank"),
        &conn,
    )?;

    let salary = create_category("Salary", TransactionKind::Income, None, "", &conn)?;
    let groceries = create_category("Groceries", TransactionKind::Expense, None, "", &conn)?;
    let household = create_category("Household", TransactionKind::Expense, None, "", &conn)?;
    let rent = create_category(
        "Rent",
        TransactionKind::Expense,
        Some(household.id),
        "",
        &conn,
    )?;

    let today = OffsetDateTime::now_utc().date();
    let month_start = today.replace_day(1)?;

    // This month's salary and rent, plus a weekly shop up to today.
    expand(
        &Schedule {
            start: month_start,
            end: None,
            frequency: Frequency::Monthly,
        },
        Transaction::build(
            everyday.id,
            month_start,
            Decimal::new(3200_00, 2),
            TransactionKind::Income,
            salary.id,
        )
        .description("Monthly pay"),
        &conn,
    )?;
    expand(
        &Schedule {
            start: month_start,
            end: None,
            frequency: Frequency::Monthly,
        },
        Transaction::build(
            everyday.id,
            month_start,
            Decimal::new(1150_00, 2),
            TransactionKind::Expense,
            rent.id,
        )
        .description("Rent"),
        &conn,
    )?;
    expand(
        &Schedule {
            start: month_start,
            end: Some(today),
            frequency: Frequency::Weekly,
        },
        Transaction::build(
            everyday.id,
            month_start,
            Decimal::new(87_45, 2),
            TransactionKind::Expense,
            groceries.id,
        )
        .description("Weekly shop"),
        &conn,
    )?;

    transfer(
        everyday.id,
        rainy_day.id,
        Decimal::new(500_00, 2),
        Decimal::new(2_50, 2),
        &conn,
    )?;

    println!("Rolling up aggregates...");

    aggregate_daily(None, &conn)?;
    aggregate_weekly(None, None, &conn)?;
    aggregate_monthly(None, None, &conn)?;
    aggregate_quarterly(None, None, &conn)?;
    aggregate_yearly(None, &conn)?;

    println!(
        "Created {} transactions across {} accounts:",
        count_transactions(&conn)?,
        get_all_accounts(&conn)?.len()
    );
    for account in get_all_accounts(&conn)? {
        println!(
            "  {:<12} {:>12}",
            account.name,
            current_balance(account.id, &conn)?
        );
    }

    println!("Success!");

    Ok(())
}
