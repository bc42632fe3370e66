//! Fixed-point money handling shared by the ledger tables.
//!
//! Amounts are stored in SQLite as canonical decimal strings and all
//! arithmetic happens on [`Decimal`] in Rust, so no amount ever passes
//! through a float.

use rusqlite::{Row, types::Type};
use rust_decimal::{Decimal, RoundingStrategy};

/// Read a decimal amount from a TEXT column.
pub(crate) fn amount_from_row(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    parse_amount(&raw, index)
}

fn parse_amount(raw: &str, index: usize) -> Result<Decimal, rusqlite::Error> {
    raw.parse::<Decimal>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// The canonical string form an amount is stored under.
pub(crate) fn amount_to_sql(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Round a derived measure to whole cents, away from zero on midpoints.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
