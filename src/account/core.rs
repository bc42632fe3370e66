//! Defines the core data model and database queries for accounts.

use std::fmt;

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::AccountId,
    money::{amount_from_row, amount_to_sql},
};

use super::balance::current_balance;

/// The kind of real-world account a ledger account mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// An everyday bank account.
    Checking,
    /// A savings account.
    Savings,
    /// A fixed-term deposit.
    Deposit,
    /// Physical cash.
    Cash,
}

impl AccountKind {
    /// The code the kind is stored under in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Deposit => "deposit",
            AccountKind::Cash => "cash",
        }
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn account_kind_from_row(row: &Row, index: usize) -> Result<AccountKind, rusqlite::Error> {
    let raw: String = row.get(index)?;

    match raw.as_str() {
        "checking" => Ok(AccountKind::Checking),
        "savings" => Ok(AccountKind::Savings),
        "deposit" => Ok(AccountKind::Deposit),
        "cash" => Ok(AccountKind::Cash),
        _ => Err(rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown account kind {raw:?}").into(),
        )),
    }
}

/// A place money is kept, e.g. a bank account or a cash wallet.
///
/// To create a new `Account`, use [Account::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The display name of the account.
    pub name: String,
    /// The kind of account.
    pub kind: AccountKind,
    /// The institution holding the account.
    pub institution: String,
    /// The balance the account opened with. Every balance query starts here.
    pub initial_balance: Decimal,
    /// The date the account row was created.
    pub created_at: Date,
    /// Whether the account is still in use. Inactive accounts keep their
    /// history but are hidden from transfer and entry pickers.
    pub is_active: bool,
}

impl Account {
    /// Create a new account.
    ///
    /// Shortcut for [AccountBuilder] for discoverability.
    pub fn build(name: &str) -> AccountBuilder {
        AccountBuilder {
            name: name.to_owned(),
            kind: AccountKind::Checking,
            institution: String::new(),
            initial_balance: Decimal::ZERO,
            is_active: true,
        }
    }
}

/// A builder for creating [Account] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct AccountBuilder {
    /// The display name of the account.
    pub name: String,
    /// The kind of account, defaults to [AccountKind::Checking].
    pub kind: AccountKind,
    /// The institution holding the account.
    pub institution: String,
    /// The balance the account opens with, defaults to zero.
    pub initial_balance: Decimal,
    /// Whether the account starts out active, defaults to `true`.
    pub is_active: bool,
}

impl AccountBuilder {
    /// Set the kind of the account.
    pub fn kind(mut self, kind: AccountKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the institution holding the account.
    pub fn institution(mut self, institution: &str) -> Self {
        self.institution = institution.to_owned();
        self
    }

    /// Set the balance the account opens with.
    pub fn initial_balance(mut self, initial_balance: Decimal) -> Self {
        self.initial_balance = initial_balance;
        self
    }

    /// Set whether the account starts out active.
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// Create a new account in the database from a builder.
///
/// The creation date is set to today (UTC).
///
/// # Errors
/// Returns [Error::SqlError] if the insert fails.
pub fn create_account(builder: AccountBuilder, connection: &Connection) -> Result<Account, Error> {
    let account = connection
        .prepare(
            "INSERT INTO account (name, kind, institution, initial_balance, created_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, name, kind, institution, initial_balance, created_at, is_active",
        )?
        .query_row(
            (
                &builder.name,
                builder.kind.as_str(),
                &builder.institution,
                amount_to_sql(builder.initial_balance),
                OffsetDateTime::now_utc().date(),
                builder.is_active,
            ),
            map_account_row,
        )?;

    Ok(account)
}

/// Retrieve a single account by ID.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a valid account.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, institution, initial_balance, created_at, is_active
             FROM account WHERE id = :id;",
        )?
        .query_row(&[(":id", &id)], map_account_row)
        .map_err(|error| error.into())
}

/// Retrieve all accounts ordered alphabetically by name.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_all_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, institution, initial_balance, created_at, is_active
             FROM account ORDER BY name ASC;",
        )?
        .query_map([], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the accounts still open for new entries, ordered by name.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_active_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, institution, initial_balance, created_at, is_active
             FROM account WHERE is_active = 1 ORDER BY name ASC;",
        )?
        .query_map([], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Get the number of accounts in the database.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn count_accounts(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM account;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Update an account's fields.
///
/// The creation date is kept; use the builder's `is_active` to retire an
/// account instead of deleting it.
///
/// # Errors
/// Returns [Error::UpdateMissingAccount] if `id` does not refer to a real row.
pub fn update_account(
    id: AccountId,
    builder: AccountBuilder,
    connection: &Connection,
) -> Result<Account, Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET name = ?1, kind = ?2, institution = ?3, initial_balance = ?4, is_active = ?5
         WHERE id = ?6",
        (
            &builder.name,
            builder.kind.as_str(),
            &builder.institution,
            amount_to_sql(builder.initial_balance),
            builder.is_active,
            id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingAccount);
    }

    get_account(id, connection)
}

/// Delete an account by ID.
///
/// Deletion is protective: an account that still has transactions cannot be
/// removed, only retired via [update_account].
///
/// # Errors
/// Returns [Error::DeleteMissingAccount] if the account doesn't exist, or
/// [Error::AccountInUse] if transactions still reference it.
pub fn delete_account(id: AccountId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM account WHERE id = ?1", [id])
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::AccountInUse,
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingAccount);
    }

    Ok(())
}

/// Get the combined current balance across all accounts.
///
/// # Errors
/// Returns [Error::SqlError] if a query fails.
pub fn get_total_balance(connection: &Connection) -> Result<Decimal, Error> {
    let mut total = Decimal::ZERO;

    for account in get_all_accounts(connection)? {
        total += current_balance(account.id, connection)?;
    }

    Ok(total)
}

/// Initialize the account table and indexes.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            institution TEXT NOT NULL,
            initial_balance TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_account_kind_active ON account(kind, is_active);",
    )?;

    Ok(())
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: account_kind_from_row(row, 2)?,
        institution: row.get(3)?,
        initial_balance: amount_from_row(row, 4)?,
        created_at: row.get(5)?,
        is_active: row.get(6)?,
    })
}

#[cfg(test)]
mod account_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{
        Account, AccountKind, count_accounts, create_account, delete_account, get_account,
        get_active_accounts, get_all_accounts, get_total_balance, update_account,
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    #[test]
    fn create_account_succeeds() {
        let conn = get_test_connection();

        let account = create_account(
            Account::build("Everyday")
                .kind(AccountKind::Checking)
                .institution("Test Bank")
                .initial_balance(dec!(1000.00)),
            &conn,
        )
        .unwrap();

        assert!(account.id > 0);
        assert_eq!(account.name, "Everyday");
        assert_eq!(account.kind, AccountKind::Checking);
        assert_eq!(account.institution, "Test Bank");
        assert_eq!(account.initial_balance, dec!(1000.00));
        assert!(account.is_active);
    }

    #[test]
    fn get_account_returns_created_row() {
        let conn = get_test_connection();
        let created = create_account(Account::build("Everyday"), &conn).unwrap();

        let selected = get_account(created.id, &conn).unwrap();

        assert_eq!(created, selected);
    }

    #[test]
    fn get_account_fails_with_invalid_id() {
        let conn = get_test_connection();

        assert_eq!(get_account(1337, &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_all_accounts_sorts_by_name() {
        let conn = get_test_connection();
        create_account(Account::build("Savings"), &conn).unwrap();
        create_account(Account::build("Everyday"), &conn).unwrap();

        let accounts = get_all_accounts(&conn).unwrap();

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Everyday");
        assert_eq!(accounts[1].name, "Savings");
    }

    #[test]
    fn get_active_accounts_skips_retired_rows() {
        let conn = get_test_connection();
        create_account(Account::build("Everyday"), &conn).unwrap();
        create_account(Account::build("Old Savings").is_active(false), &conn).unwrap();

        let accounts = get_active_accounts(&conn).unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Everyday");
    }

    #[test]
    fn count_accounts_matches_inserts() {
        let conn = get_test_connection();
        assert_eq!(count_accounts(&conn), Ok(0));

        create_account(Account::build("Everyday"), &conn).unwrap();
        create_account(Account::build("Savings"), &conn).unwrap();

        assert_eq!(count_accounts(&conn), Ok(2));
    }

    #[test]
    fn update_account_overwrites_fields() {
        let conn = get_test_connection();
        let created = create_account(Account::build("Everyday"), &conn).unwrap();

        let updated = update_account(
            created.id,
            Account::build("Emergency Fund")
                .kind(AccountKind::Savings)
                .institution("Test Bank")
                .initial_balance(dec!(250.00))
                .is_active(false),
            &conn,
        )
        .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Emergency Fund");
        assert_eq!(updated.kind, AccountKind::Savings);
        assert_eq!(updated.initial_balance, dec!(250.00));
        assert_eq!(updated.created_at, created.created_at);
        assert!(!updated.is_active);
    }

    #[test]
    fn update_account_fails_on_missing_row() {
        let conn = get_test_connection();

        let result = update_account(42, Account::build("Everyday"), &conn);

        assert_eq!(result, Err(Error::UpdateMissingAccount));
    }

    #[test]
    fn delete_account_succeeds_without_transactions() {
        let conn = get_test_connection();
        let created = create_account(Account::build("Everyday"), &conn).unwrap();

        delete_account(created.id, &conn).unwrap();

        assert_eq!(get_account(created.id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn delete_account_with_transactions_is_blocked() {
        let conn = get_test_connection();
        let account = create_account(Account::build("Everyday"), &conn).unwrap();
        let category = crate::category::create_category(
            "Groceries",
            TransactionKind::Expense,
            None,
            "",
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(
                account.id,
                date!(2025 - 10 - 05),
                dec!(12.30),
                TransactionKind::Expense,
                category.id,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(delete_account(account.id, &conn), Err(Error::AccountInUse));
        assert!(get_account(account.id, &conn).is_ok());
    }

    #[test]
    fn delete_account_fails_on_missing_row() {
        let conn = get_test_connection();

        assert_eq!(delete_account(42, &conn), Err(Error::DeleteMissingAccount));
    }

    #[test]
    fn total_balance_sums_all_accounts() {
        let conn = get_test_connection();
        create_account(Account::build("Everyday").initial_balance(dec!(100.50)), &conn).unwrap();
        create_account(Account::build("Savings").initial_balance(dec!(250.75)), &conn).unwrap();
        create_account(Account::build("Credit").initial_balance(dec!(-50.25)), &conn).unwrap();

        let total = get_total_balance(&conn).unwrap();

        assert_eq!(total, dec!(301.00));
    }

    #[test]
    fn total_balance_is_zero_with_no_accounts() {
        let conn = get_test_connection();

        assert_eq!(get_total_balance(&conn), Ok(dec!(0)));
    }
}
