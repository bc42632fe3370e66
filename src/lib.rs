//! Homeledger is a personal-finance ledger engine.
//!
//! It tracks bank and cash [accounts](account::Account), categorized
//! income/expense [transactions](transaction::Transaction), fund
//! [transfers](transfer::transfer) between accounts, [recurring
//! transaction](recurring) expansion, and periodic
//! [aggregation rollups](aggregation) for reporting, all on top of an
//! embedded SQLite database.
//!
//! The crate deliberately has no HTTP or UI surface: callers hand every
//! operation a [`rusqlite::Connection`] and get plain data back.

#![warn(missing_docs)]

use rust_decimal::Decimal;
use time::Date;

pub mod account;
pub mod aggregation;
pub mod bootstrap;
pub mod category;
mod database_id;
pub mod db;
mod money;
pub mod recurring;
pub mod transaction;
pub mod transfer;

pub use database_id::{AccountId, CategoryId, DatabaseId, TransactionId};

use crate::transaction::TransactionKind;

/// The errors that may occur in the ledger.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A transaction amount was zero or negative.
    ///
    /// Amounts carry their direction in the transaction kind, so the amount
    /// itself must always be positive.
    #[error("transaction amounts must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// A transaction referenced a category of the opposite kind.
    #[error("a {transaction} transaction cannot use a {category} category")]
    CategoryKindMismatch {
        /// The kind of the referenced category.
        category: TransactionKind,
        /// The kind of the transaction being written.
        transaction: TransactionKind,
    },

    /// A transfer named the same account as both source and destination.
    #[error("the source and destination accounts of a transfer must differ")]
    SameAccountTransfer,

    /// A transfer was given a commission below zero.
    #[error("transfer commissions cannot be negative, got {0}")]
    NegativeCommission(Decimal),

    /// A recurring schedule's end date precedes its start date.
    #[error("the end date {end} is before the start date {start}")]
    InvalidDateRange {
        /// The schedule's start date.
        start: Date,
        /// The offending end date.
        end: Date,
    },

    /// A period filter did not name a real calendar period.
    #[error("invalid period filter: {0}")]
    InvalidPeriod(String),

    /// The source account cannot cover the transfer amount plus commission.
    ///
    /// The operation aborts before any row is written.
    #[error("insufficient funds: {available} available, {required} required")]
    InsufficientFunds {
        /// The source account's balance at the time of the transfer.
        available: Decimal,
        /// Transfer amount plus commission.
        required: Decimal,
    },

    /// Tried to delete an account that still has transactions.
    #[error("the account still has transactions and cannot be deleted")]
    AccountInUse,

    /// Tried to delete a category still referenced by transactions or
    /// child categories.
    #[error("the category is still referenced and cannot be deleted")]
    CategoryInUse,

    /// The account ID used for a write does not refer to a real account.
    #[error("the account ID {0} does not refer to a valid account")]
    InvalidAccount(AccountId),

    /// The category ID used for a write does not refer to a real category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// A category's parent chain looped back on itself.
    ///
    /// The store does not enforce acyclicity, so the hierarchy walk guards
    /// against it and reports the category where the loop closed.
    #[error("the parent chain of category {0} contains a cycle")]
    CategoryCycle(CategoryId),

    /// A default category required by the transfer operation is missing.
    ///
    /// The bootstrap routine creates these at process setup; hitting this
    /// error means it never ran or was skipped.
    #[error("the default category \"{0}\" is missing, run the bootstrap routine first")]
    MissingDefaultCategory(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update an account that does not exist
    #[error("tried to update an account that is not in the database")]
    UpdateMissingAccount,

    /// Tried to delete an account that does not exist
    #[error("tried to delete an account that is not in the database")]
    DeleteMissingAccount,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
