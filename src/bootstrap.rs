//! Idempotent process-setup defaults.
//!
//! The transfer operation files its rows under three well-known categories,
//! and a fresh install should have somewhere to record cash from day one.
//! This module creates both at initialization time. It is deliberately
//! forgiving: if the schema is not ready yet the failure is logged and
//! skipped so the caller's startup sequence continues, and the next
//! initialization retries.

use rusqlite::Connection;

use crate::{
    account::{Account, AccountKind, count_accounts, create_account},
    category::get_or_create_category,
    transaction::TransactionKind,
};

/// The category transfer expense rows are filed under.
pub const TRANSFER_EXPENSE_CATEGORY: &str = "Transfer Expense";
/// The category transfer income rows are filed under.
pub const TRANSFER_INCOME_CATEGORY: &str = "Transfer Income";
/// The category transfer commission rows are filed under.
pub const TRANSFER_COMMISSION_CATEGORY: &str = "Transfer Commission";

/// The name of the account created for a fresh install.
pub const DEFAULT_ACCOUNT_NAME: &str = "Cash";

/// Ensure the default categories and account exist.
///
/// Safe to call on every startup; existing rows are left untouched and
/// failures never propagate.
pub fn bootstrap(connection: &Connection) {
    ensure_default_categories(connection);
    ensure_default_account(connection);
}

/// Get-or-create the three categories the transfer operation depends on.
pub fn ensure_default_categories(connection: &Connection) {
    let defaults = [
        (TRANSFER_EXPENSE_CATEGORY, TransactionKind::Expense),
        (TRANSFER_INCOME_CATEGORY, TransactionKind::Income),
        (TRANSFER_COMMISSION_CATEGORY, TransactionKind::Expense),
    ];

    for (name, kind) in defaults {
        if let Err(error) = get_or_create_category(name, kind, connection) {
            tracing::error!(
                "could not create default category \"{name}\", \
                 the tables may not be ready yet: {error}"
            );
        }
    }
}

/// Create the default cash account when no account exists at all.
pub fn ensure_default_account(connection: &Connection) {
    match count_accounts(connection) {
        Ok(0) => {
            let builder = Account::build(DEFAULT_ACCOUNT_NAME)
                .kind(AccountKind::Cash)
                .institution("None");

            match create_account(builder, connection) {
                Ok(_) => tracing::info!("created default cash account"),
                Err(error) => tracing::error!("could not create default account: {error}"),
            }
        }
        Ok(_) => {}
        Err(error) => {
            tracing::error!(
                "could not check for existing accounts, \
                 the tables may not be ready yet: {error}"
            );
        }
    }
}
