//! The rollup engine shared by all five granularities.

use std::collections::HashMap;

use rusqlite::{Connection, params_from_iter, types::Value};
use rust_decimal::Decimal;
use time::{Date, Duration, Month, Weekday};

use crate::{
    Error,
    database_id::{AccountId, CategoryId},
    money::{amount_from_row, amount_to_sql, round_cents},
    transaction::{DateRange, TransactionKind, get_transactions_in_range, kind_from_row},
};

use super::period::{Granularity, PeriodKey};

/// One stored aggregate: the rolled-up measures for a (period, account,
/// category, kind) group.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    /// The reporting period the group covers.
    pub period: PeriodKey,
    /// The account the transactions belong to.
    pub account_id: AccountId,
    /// The category of the transactions; `None` is the uncategorized bucket.
    pub category_id: Option<CategoryId>,
    /// Whether the group covers income or expenses.
    pub kind: TransactionKind,
    /// The sum of the group's transaction amounts.
    pub total_amount: Decimal,
    /// How many transactions the group covers.
    pub transaction_count: u32,
    /// The mean transaction amount, rounded to cents.
    pub average_amount: Decimal,
}

/// Roll transactions up at one granularity and store the results.
///
/// Transactions inside `range` (all of them when `range` is `None`) are
/// grouped by (period, account, category, kind); each group's total, count,
/// and average is then written with update-or-insert semantics keyed on that
/// tuple, inside a single database transaction. Re-running over the same
/// range is idempotent: existing rows are overwritten in place and nothing
/// is ever double-counted.
///
/// Returns the number of groups written.
///
/// # Errors
/// Returns [Error::SqlError] if a query or write fails; nothing is committed
/// in that case.
pub fn aggregate(
    granularity: Granularity,
    range: Option<DateRange>,
    connection: &Connection,
) -> Result<usize, Error> {
    let transactions = get_transactions_in_range(range, connection)?;

    type GroupKey = (PeriodKey, AccountId, Option<CategoryId>, TransactionKind);
    let mut groups: HashMap<GroupKey, (Decimal, u32)> = HashMap::new();

    for transaction in &transactions {
        let key = (
            granularity.bucket(transaction.date),
            transaction.account_id,
            Some(transaction.category_id),
            transaction.kind,
        );
        let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
        entry.0 += transaction.amount;
        entry.1 += 1;
    }

    let sql_transaction = connection.unchecked_transaction()?;

    for (&(period, account_id, category_id, kind), &(total, count)) in &groups {
        let row = AggregateRow {
            period,
            account_id,
            category_id,
            kind,
            total_amount: total,
            transaction_count: count,
            average_amount: round_cents(total / Decimal::from(count)),
        };

        upsert_group(granularity, &row, &sql_transaction)?;
    }

    sql_transaction.commit()?;

    tracing::debug!(
        "rolled up {} transactions into {} {:?} groups",
        transactions.len(),
        groups.len(),
        granularity
    );

    Ok(groups.len())
}

/// Write one group with update-or-insert semantics.
///
/// The lookup uses `IS` for the category so the NULL (uncategorized) bucket
/// matches its own row instead of inserting a duplicate.
fn upsert_group(
    granularity: Granularity,
    row: &AggregateRow,
    connection: &Connection,
) -> Result<(), Error> {
    let table = granularity.table();
    let key_columns = granularity.key_columns();

    let category_param = match row.category_id {
        Some(id) => Value::Integer(id),
        None => Value::Null,
    };

    let key_predicate = key_columns
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ");

    let mut update_params = vec![
        Value::Text(amount_to_sql(row.total_amount)),
        Value::Integer(row.transaction_count.into()),
        Value::Text(amount_to_sql(row.average_amount)),
    ];
    update_params.extend(row.period.params());
    update_params.push(Value::Integer(row.account_id));
    update_params.push(category_param.clone());
    update_params.push(Value::Text(row.kind.as_str().to_owned()));

    let rows_affected = connection.execute(
        &format!(
            "UPDATE {table}
             SET total_amount = ?, transaction_count = ?, average_amount = ?
             WHERE {key_predicate} AND account_id = ? AND category_id IS ? AND kind = ?"
        ),
        params_from_iter(update_params),
    )?;

    if rows_affected == 0 {
        let key_list = key_columns.join(", ");
        let placeholders = vec!["?"; key_columns.len() + 6].join(", ");

        let mut insert_params = row.period.params();
        insert_params.push(Value::Integer(row.account_id));
        insert_params.push(category_param);
        insert_params.push(Value::Text(row.kind.as_str().to_owned()));
        insert_params.push(Value::Text(amount_to_sql(row.total_amount)));
        insert_params.push(Value::Integer(row.transaction_count.into()));
        insert_params.push(Value::Text(amount_to_sql(row.average_amount)));

        connection.execute(
            &format!(
                "INSERT INTO {table} ({key_list}, account_id, category_id, kind, total_amount, transaction_count, average_amount)
                 VALUES ({placeholders})"
            ),
            params_from_iter(insert_params),
        )?;
    }

    Ok(())
}

/// Read every stored aggregate at one granularity, ordered by period, then
/// account, category, and kind.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_aggregates(
    granularity: Granularity,
    connection: &Connection,
) -> Result<Vec<AggregateRow>, Error> {
    let table = granularity.table();
    let key_list = granularity.key_columns().join(", ");
    let offset = granularity.key_columns().len();

    connection
        .prepare(&format!(
            "SELECT {key_list}, account_id, category_id, kind, total_amount, transaction_count, average_amount
             FROM {table}
             ORDER BY {key_list}, account_id, category_id, kind"
        ))?
        .query_map([], |row| {
            Ok(AggregateRow {
                period: granularity.key_from_row(row)?,
                account_id: row.get(offset)?,
                category_id: row.get(offset + 1)?,
                kind: kind_from_row(row, offset + 2)?,
                total_amount: amount_from_row(row, offset + 3)?,
                transaction_count: row.get(offset + 4)?,
                average_amount: amount_from_row(row, offset + 5)?,
            })
        })?
        .map(|maybe_row| maybe_row.map_err(Error::SqlError))
        .collect()
}

// ============================================================================
// PERIOD FILTERS
// ============================================================================

/// Roll up daily aggregates, optionally restricted to a date range.
pub fn aggregate_daily(range: Option<DateRange>, connection: &Connection) -> Result<usize, Error> {
    aggregate(Granularity::Daily, range, connection)
}

/// Roll up weekly aggregates.
///
/// With a year and a week, only that ISO week (Monday through Sunday) is
/// aggregated; with just a year, the whole calendar year. A week without a
/// year is rejected.
///
/// # Errors
/// Returns [Error::InvalidPeriod] if the filter does not name a real week.
pub fn aggregate_weekly(
    year: Option<i32>,
    week: Option<u8>,
    connection: &Connection,
) -> Result<usize, Error> {
    let range = match (year, week) {
        (Some(year), Some(week)) => {
            let monday =
                Date::from_iso_week_date(year, week, Weekday::Monday).map_err(|_| {
                    Error::InvalidPeriod(format!("{year} has no ISO week {week}"))
                })?;

            Some(DateRange {
                start: monday,
                end: monday + Duration::days(6),
            })
        }
        (Some(year), None) => Some(year_range(year)?),
        (None, Some(_)) => {
            return Err(Error::InvalidPeriod(
                "a week filter requires a year".to_owned(),
            ));
        }
        (None, None) => None,
    };

    aggregate(Granularity::Weekly, range, connection)
}

/// Roll up monthly aggregates.
///
/// With a year and a month, only that month is aggregated; with just a
/// year, the whole year. A month without a year is rejected.
///
/// # Errors
/// Returns [Error::InvalidPeriod] if the filter does not name a real month.
pub fn aggregate_monthly(
    year: Option<i32>,
    month: Option<u8>,
    connection: &Connection,
) -> Result<usize, Error> {
    let range = match (year, month) {
        (Some(year), Some(month)) => {
            let month = Month::try_from(month)
                .map_err(|_| Error::InvalidPeriod(format!("{month} is not a month")))?;

            Some(DateRange {
                start: first_of(year, month)?,
                end: last_of(year, month)?,
            })
        }
        (Some(year), None) => Some(year_range(year)?),
        (None, Some(_)) => {
            return Err(Error::InvalidPeriod(
                "a month filter requires a year".to_owned(),
            ));
        }
        (None, None) => None,
    };

    aggregate(Granularity::Monthly, range, connection)
}

/// Roll up quarterly aggregates.
///
/// With a year and a quarter, only that quarter's three months are
/// aggregated; with just a year, the whole year. A quarter without a year
/// is rejected.
///
/// # Errors
/// Returns [Error::InvalidPeriod] if the filter does not name a real
/// quarter.
pub fn aggregate_quarterly(
    year: Option<i32>,
    quarter: Option<u8>,
    connection: &Connection,
) -> Result<usize, Error> {
    let range = match (year, quarter) {
        (Some(year), Some(quarter)) => {
            if !(1..=4).contains(&quarter) {
                return Err(Error::InvalidPeriod(format!(
                    "{quarter} is not a quarter"
                )));
            }

            // Quarters are month-aligned: Q1 = months 1-3, Q4 = months 10-12.
            let first = Month::try_from(3 * quarter - 2).expect("quarter start month is valid");
            let last = Month::try_from(3 * quarter).expect("quarter end month is valid");

            Some(DateRange {
                start: first_of(year, first)?,
                end: last_of(year, last)?,
            })
        }
        (Some(year), None) => Some(year_range(year)?),
        (None, Some(_)) => {
            return Err(Error::InvalidPeriod(
                "a quarter filter requires a year".to_owned(),
            ));
        }
        (None, None) => None,
    };

    aggregate(Granularity::Quarterly, range, connection)
}

/// Roll up yearly aggregates, optionally restricted to one calendar year.
///
/// # Errors
/// Returns [Error::InvalidPeriod] if the year is outside the calendar.
pub fn aggregate_yearly(year: Option<i32>, connection: &Connection) -> Result<usize, Error> {
    let range = year.map(year_range).transpose()?;

    aggregate(Granularity::Yearly, range, connection)
}

/// Create the five aggregate tables and their unique key indexes.
pub fn create_aggregation_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for granularity in Granularity::ALL {
        let table = granularity.table();
        let key_definitions = granularity.key_column_definitions();
        let key_list = granularity.key_columns().join(", ");

        connection.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                {key_definitions},
                account_id INTEGER NOT NULL,
                category_id INTEGER,
                kind TEXT NOT NULL,
                total_amount TEXT NOT NULL,
                transaction_count INTEGER NOT NULL,
                average_amount TEXT NOT NULL,
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_group
                ON {table}({key_list}, account_id, category_id, kind);
            CREATE INDEX IF NOT EXISTS idx_{table}_account ON {table}(account_id);",
        ))?;
    }

    Ok(())
}

fn year_range(year: i32) -> Result<DateRange, Error> {
    Ok(DateRange {
        start: first_of(year, Month::January)?,
        end: last_of(year, Month::December)?,
    })
}

fn first_of(year: i32, month: Month) -> Result<Date, Error> {
    Date::from_calendar_date(year, month, 1)
        .map_err(|_| Error::InvalidPeriod(format!("{year} is outside the calendar")))
}

fn last_of(year: i32, month: Month) -> Result<Date, Error> {
    Date::from_calendar_date(year, month, month.length(year))
        .map_err(|_| Error::InvalidPeriod(format!("{year} is outside the calendar")))
}

// ============================================================================
// TESTS
// ============================================================================
