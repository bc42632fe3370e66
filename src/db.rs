//! Database schema initialization.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error, account::create_account_table, aggregation::create_aggregation_tables,
    category::create_category_table, transaction::create_transaction_table,
};

/// Create every ledger table and index.
///
/// All tables are created inside one exclusive transaction so a half-built
/// schema is never left behind. Safe to call on an already-initialized
/// database.
///
/// # Errors
/// Returns [Error::SqlError] if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Protective references rely on FK enforcement; the pragma cannot be
    // changed inside a transaction.
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction =
        SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_aggregation_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}
