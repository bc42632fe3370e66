//! Categorized income and expense transactions.

mod core;
mod query;

pub use core::{
    Transaction, TransactionBuilder, TransactionKind, count_transactions, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, map_transaction_row,
    update_transaction,
};
pub(crate) use core::kind_from_row;
pub use query::{DateRange, get_transactions_by_kind, get_transactions_in_range};
