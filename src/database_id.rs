//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of an [account](crate::account::Account) row.
pub type AccountId = i64;

/// The ID of a [category](crate::category::Category) row.
pub type CategoryId = i64;

/// The ID of a [transaction](crate::transaction::Transaction) row.
pub type TransactionId = i64;
