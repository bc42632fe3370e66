//! Database query helpers for transaction lists.

use rusqlite::Connection;
use time::Date;

use crate::Error;

use super::core::{Transaction, TransactionKind, map_transaction_row};

/// An inclusive range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first date in the range.
    pub start: Date,
    /// The last date in the range.
    pub end: Date,
}

/// Get all transactions of one kind, newest first.
///
/// Rows are ordered by date, then creation time, then ID, descending. This
/// is the order the income and expense listings display them in.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_transactions_by_kind(
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, account_id, date, amount, kind, category_id, description, created_at, modified_at
             FROM \"transaction\"
             WHERE kind = :kind
             ORDER BY date DESC, created_at DESC, id DESC",
        )?
        .query_map(&[(":kind", kind.as_str())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
        .collect()
}

/// Get transactions within an inclusive date range, oldest first.
///
/// With no range, every transaction is returned. The ID tie-break keeps the
/// order stable across updates.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_transactions_in_range(
    range: Option<DateRange>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let columns =
        "id, account_id, date, amount, kind, category_id, description, created_at, modified_at";

    match range {
        Some(range) => connection
            .prepare(&format!(
                "SELECT {columns} FROM \"transaction\"
                 WHERE date BETWEEN ?1 AND ?2
                 ORDER BY date ASC, id ASC"
            ))?
            .query_map(
                [range.start.to_string(), range.end.to_string()],
                map_transaction_row,
            )?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
            .collect(),
        None => connection
            .prepare(&format!(
                "SELECT {columns} FROM \"transaction\" ORDER BY date ASC, id ASC"
            ))?
            .query_map([], map_transaction_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
            .collect(),
    }
}
