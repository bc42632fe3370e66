//! Balance queries derived from an account's transaction history.
//!
//! Balances are never stored: every query starts from the account's initial
//! balance and folds the signed transaction history on top. Amounts are
//! summed on [`Decimal`] in Rust so no float ever touches them.

use std::collections::BTreeMap;

use rusqlite::{Connection, named_params};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::AccountId,
    money::amount_from_row,
    transaction::{TransactionKind, kind_from_row},
};

use super::core::get_account;

/// An account's running balance at the close of one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBalance {
    /// The day, covering all transactions dated on it.
    pub date: Date,
    /// The balance after that day's transactions.
    pub balance: Decimal,
}

/// Get an account's balance at the end of `as_of`.
///
/// The balance is the initial balance plus all income minus all expenses
/// dated on or before `as_of`. Dates before the first transaction return the
/// initial balance; dates after the last return the final balance.
///
/// # Errors
/// Returns [Error::NotFound] if `account_id` does not refer to a real
/// account, or [Error::SqlError] if a query fails.
pub fn balance_on(
    account_id: AccountId,
    as_of: Date,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let account = get_account(account_id, connection)?;

    let mut balance = account.initial_balance;

    let mut statement = connection.prepare(
        "SELECT kind, amount FROM \"transaction\"
         WHERE account_id = :account_id AND date <= :as_of",
    )?;
    let rows = statement.query_map(
        named_params! { ":account_id": account_id, ":as_of": as_of },
        |row| Ok((kind_from_row(row, 0)?, amount_from_row(row, 1)?)),
    )?;

    for row in rows {
        let (kind, amount) = row?;

        match kind {
            TransactionKind::Income => balance += amount,
            TransactionKind::Expense => balance -= amount,
        }
    }

    Ok(balance)
}

/// Get an account's balance as of today (UTC).
///
/// # Errors
/// Same as [balance_on].
pub fn current_balance(account_id: AccountId, connection: &Connection) -> Result<Decimal, Error> {
    balance_on(account_id, OffsetDateTime::now_utc().date(), connection)
}

/// Get the full running-balance series for an account.
///
/// One entry per date that has at least one transaction (not every calendar
/// day), in ascending date order. Each entry is the previous balance plus
/// that day's net movement, seeded at the initial balance. When the account
/// has no future-dated rows, the final entry equals [current_balance].
///
/// # Errors
/// Returns [Error::NotFound] if `account_id` does not refer to a real
/// account, or [Error::SqlError] if a query fails.
pub fn daily_balances(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<DailyBalance>, Error> {
    let account = get_account(account_id, connection)?;

    let mut statement = connection.prepare(
        "SELECT date, kind, amount FROM \"transaction\"
         WHERE account_id = :account_id ORDER BY date ASC",
    )?;
    let rows = statement.query_map(&[(":account_id", &account_id)], |row| {
        Ok((
            row.get::<usize, Date>(0)?,
            kind_from_row(row, 1)?,
            amount_from_row(row, 2)?,
        ))
    })?;

    // Per-day net movement; the BTreeMap keeps the dates sorted.
    let mut daily_nets: BTreeMap<Date, Decimal> = BTreeMap::new();

    for row in rows {
        let (date, kind, amount) = row?;
        let signed = match kind {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        };

        *daily_nets.entry(date).or_insert(Decimal::ZERO) += signed;
    }

    let mut balance = account.initial_balance;
    let mut series = Vec::with_capacity(daily_nets.len());

    for (date, net) in daily_nets {
        balance += net;
        series.push(DailyBalance { date, balance });
    }

    Ok(series)
}

#[cfg(test)]
mod balance_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::{Duration, OffsetDateTime, macros::date};

    use crate::{
        Error,
        account::{Account, AccountKind, create_account},
        category::create_category,
        database_id::{AccountId, CategoryId},
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction, delete_transaction},
    };

    use super::{balance_on, current_balance, daily_balances};

    fn get_test_connection() -> (Connection, AccountId, CategoryId, CategoryId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let account = create_account(
            Account::build("Test Account")
                .kind(AccountKind::Checking)
                .institution("Test Bank")
                .initial_balance(dec!(1000.00)),
            &conn,
        )
        .unwrap();
        let income = create_category("Salary", TransactionKind::Income, None, "", &conn).unwrap();
        let expense =
            create_category("Groceries", TransactionKind::Expense, None, "", &conn).unwrap();

        (conn, account.id, income.id, expense.id)
    }

    #[test]
    fn balance_without_transactions_is_initial_balance() {
        let (conn, account_id, _, _) = get_test_connection();

        assert_eq!(
            balance_on(account_id, date!(1999 - 01 - 01), &conn),
            Ok(dec!(1000.00))
        );
        assert_eq!(current_balance(account_id, &conn), Ok(dec!(1000.00)));
        assert_eq!(
            balance_on(account_id, date!(2999 - 12 - 31), &conn),
            Ok(dec!(1000.00))
        );
    }

    #[test]
    fn balance_fails_on_invalid_account() {
        let (conn, account_id, _, _) = get_test_connection();

        assert_eq!(current_balance(account_id + 1, &conn), Err(Error::NotFound));
    }

    #[test]
    fn income_increases_balance() {
        let (conn, account_id, income_id, _) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();

        create_transaction(
            Transaction::build(account_id, today, dec!(500.00), TransactionKind::Income, income_id),
            &conn,
        )
        .unwrap();

        assert_eq!(current_balance(account_id, &conn), Ok(dec!(1500.00)));
    }

    #[test]
    fn expense_decreases_balance() {
        let (conn, account_id, _, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();

        create_transaction(
            Transaction::build(
                account_id,
                today,
                dec!(200.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(current_balance(account_id, &conn), Ok(dec!(800.00)));
    }

    #[test]
    fn mixed_transactions_on_one_day_combine() {
        let (conn, account_id, income_id, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();

        create_transaction(
            Transaction::build(account_id, today, dec!(500.00), TransactionKind::Income, income_id),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(
                account_id,
                today,
                dec!(200.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(current_balance(account_id, &conn), Ok(dec!(1300.00)));
    }

    #[test]
    fn future_transactions_are_not_included() {
        let (conn, account_id, _, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();
        let future = today + Duration::days(10);

        create_transaction(
            Transaction::build(
                account_id,
                future,
                dec!(100.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(current_balance(account_id, &conn), Ok(dec!(1000.00)));
        assert_eq!(balance_on(account_id, future, &conn), Ok(dec!(900.00)));
    }

    #[test]
    fn historical_balances_only_count_rows_up_to_the_date() {
        let (conn, account_id, income_id, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();
        let past = today - Duration::days(5);
        let future = today + Duration::days(5);

        create_transaction(
            Transaction::build(account_id, past, dec!(200.00), TransactionKind::Income, income_id),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(
                account_id,
                future,
                dec!(300.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(balance_on(account_id, past, &conn), Ok(dec!(1200.00)));
        assert_eq!(balance_on(account_id, today, &conn), Ok(dec!(1200.00)));
        assert_eq!(balance_on(account_id, future, &conn), Ok(dec!(900.00)));
    }

    #[test]
    fn deleting_a_transaction_restores_the_balance() {
        let (conn, account_id, _, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();

        let transaction = create_transaction(
            Transaction::build(
                account_id,
                today,
                dec!(150.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();
        assert_eq!(current_balance(account_id, &conn), Ok(dec!(850.00)));

        delete_transaction(transaction.id, &conn).unwrap();

        assert_eq!(current_balance(account_id, &conn), Ok(dec!(1000.00)));
    }

    #[test]
    fn accounts_do_not_influence_each_other() {
        let (conn, account_id, _, expense_id) = get_test_connection();
        let second = create_account(
            Account::build("Second Account")
                .kind(AccountKind::Savings)
                .institution("Test Bank")
                .initial_balance(dec!(500.00)),
            &conn,
        )
        .unwrap();
        let today = OffsetDateTime::now_utc().date();

        create_transaction(
            Transaction::build(
                account_id,
                today,
                dec!(100.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(current_balance(account_id, &conn), Ok(dec!(900.00)));
        assert_eq!(current_balance(second.id, &conn), Ok(dec!(500.00)));
    }

    #[test]
    fn daily_series_tracks_running_balance_per_transaction_day() {
        let (conn, account_id, income_id, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();
        let two_days_ago = today - Duration::days(2);

        create_transaction(
            Transaction::build(
                account_id,
                two_days_ago,
                dec!(500.00),
                TransactionKind::Income,
                income_id,
            ),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(
                account_id,
                two_days_ago,
                dec!(50.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(
                account_id,
                today,
                dec!(200.00),
                TransactionKind::Expense,
                expense_id,
            ),
            &conn,
        )
        .unwrap();

        let series = daily_balances(account_id, &conn).unwrap();

        // Only the two dates with transactions appear, in ascending order.
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, two_days_ago);
        assert_eq!(series[0].balance, dec!(1450.00));
        assert_eq!(series[1].date, today);
        assert_eq!(series[1].balance, dec!(1250.00));
    }

    #[test]
    fn daily_series_final_entry_matches_current_balance() {
        let (conn, account_id, income_id, expense_id) = get_test_connection();
        let today = OffsetDateTime::now_utc().date();

        for i in 1..=5 {
            let kind = if i % 2 == 0 {
                TransactionKind::Expense
            } else {
                TransactionKind::Income
            };
            let category_id = if i % 2 == 0 { expense_id } else { income_id };
            create_transaction(
                Transaction::build(
                    account_id,
                    today - Duration::days(i),
                    rust_decimal::Decimal::from(i * 10),
                    kind,
                    category_id,
                ),
                &conn,
            )
            .unwrap();
        }

        let series = daily_balances(account_id, &conn).unwrap();

        assert_eq!(
            series.last().unwrap().balance,
            current_balance(account_id, &conn).unwrap()
        );
    }

    #[test]
    fn daily_series_is_empty_without_transactions() {
        let (conn, account_id, _, _) = get_test_connection();

        assert_eq!(daily_balances(account_id, &conn), Ok(vec![]));
    }
}
