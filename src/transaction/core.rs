//! Defines the core data model and database queries for transactions.

use std::fmt;

use rusqlite::{Connection, Row, types::Type};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::get_category,
    database_id::{AccountId, CategoryId, TransactionId},
    money::{amount_from_row, amount_to_sql},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction adds money to its account or takes money out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money earned, increases the account balance.
    Income,
    /// Money spent, decreases the account balance.
    Expense,
}

impl TransactionKind {
    /// The code the kind is stored under in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read a transaction kind from a TEXT column.
pub(crate) fn kind_from_row(row: &Row, index: usize) -> Result<TransactionKind, rusqlite::Error> {
    let raw: String = row.get(index)?;

    match raw.as_str() {
        "income" => Ok(TransactionKind::Income),
        "expense" => Ok(TransactionKind::Expense),
        _ => Err(rusqlite::Error::FromSqlConversionFailure(
            index,
            Type::Text,
            format!("unknown transaction kind {raw:?}").into(),
        )),
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the money moved in or out of.
    pub account_id: AccountId,
    /// When the transaction happened.
    pub date: Date,
    /// The amount of money spent or earned, always positive.
    pub amount: Decimal,
    /// Whether the amount was earned or spent.
    pub kind: TransactionKind,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the row was first written.
    pub created_at: OffsetDateTime,
    /// When the row was last changed.
    pub modified_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        account_id: AccountId,
        date: Date,
        amount: Decimal,
        kind: TransactionKind,
        category_id: CategoryId,
    ) -> TransactionBuilder {
        TransactionBuilder {
            account_id,
            date,
            amount,
            kind,
            category_id,
            description: String::new(),
        }
    }
}

/// A builder for creating [Transaction] instances.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The account the money moves in or out of.
    pub account_id: AccountId,
    /// The date the transaction occurred.
    pub date: Date,
    /// The monetary amount, must be greater than zero.
    pub amount: Decimal,
    /// Whether the amount is earned or spent.
    pub kind: TransactionKind,
    /// The category of the transaction. Its kind must match `kind`.
    pub category_id: CategoryId,
    /// A human-readable description of the transaction.
    pub description: String,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Check the invariants the validation layer should already have enforced.
fn validate_builder(builder: &TransactionBuilder, connection: &Connection) -> Result<(), Error> {
    if builder.amount <= Decimal::ZERO {
        return Err(Error::NonPositiveAmount(builder.amount));
    }

    let category = get_category(builder.category_id, connection).map_err(|error| match error {
        // A 'not found' error does not make sense on a write, so we instead
        // indicate that the category ID (a foreign key) is invalid.
        Error::NotFound => Error::InvalidCategory(builder.category_id),
        error => error,
    })?;

    if category.kind != builder.kind {
        return Err(Error::CategoryKindMismatch {
            category: category.kind,
            transaction: builder.kind,
        });
    }

    Ok(())
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - [Error::CategoryKindMismatch] if the category's kind differs from the transaction's,
/// - [Error::InvalidAccount] if the account ID does not refer to a real account,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_builder(&builder, connection)?;

    let now = OffsetDateTime::now_utc();

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (account_id, date, amount, kind, category_id, description, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, account_id, date, amount, kind, category_id, description, created_at, modified_at",
        )?
        .query_row(
            (
                builder.account_id,
                builder.date,
                amount_to_sql(builder.amount),
                builder.kind.as_str(),
                builder.category_id,
                &builder.description,
                now,
                now,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidAccount(builder.account_id),
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, account_id, date, amount, kind, category_id, description, created_at, modified_at
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Overwrite the transaction `id` with the contents of `builder`.
///
/// The row's `modified_at` timestamp is refreshed; `created_at` is kept.
///
/// # Errors
/// Validates `builder` the same way as [create_transaction], and returns
/// [Error::UpdateMissingTransaction] if `id` does not refer to a real row.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    validate_builder(&builder, connection)?;

    let rows_affected = connection
        .execute(
            "UPDATE \"transaction\"
             SET account_id = ?1, date = ?2, amount = ?3, kind = ?4, category_id = ?5, description = ?6, modified_at = ?7
             WHERE id = ?8",
            (
                builder.account_id,
                builder.date,
                amount_to_sql(builder.amount),
                builder.kind.as_str(),
                builder.category_id,
                &builder.description,
                OffsetDateTime::now_utc(),
                id,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidAccount(builder.account_id),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    get_transaction(id, connection)
}

/// Delete a transaction by ID.
///
/// Balances are derived from the remaining rows, so deleting a transaction
/// restores the account balance to its pre-creation value.
///
/// # Errors
/// Returns [Error::DeleteMissingTransaction] if the transaction doesn't exist.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Create the transaction table and its indexes in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            amount TEXT NOT NULL,
            kind TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_at TEXT NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_account_date_kind
            ON \"transaction\"(account_id, date, kind);
        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        date: row.get(2)?,
        amount: amount_from_row(row, 3)?,
        kind: kind_from_row(row, 4)?,
        category_id: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
        modified_at: row.get(8)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================
