//! Expands a recurring schedule into discrete transactions.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::{
    Error,
    transaction::{Transaction, TransactionBuilder, create_transaction},
};

/// How often a recurring transaction repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every seven days.
    Weekly,
    /// Every calendar month.
    Monthly,
    /// Every six calendar months.
    SemiAnnual,
    /// Every calendar year.
    Annual,
}

/// When a recurring transaction starts, stops, and repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// The date of the first transaction.
    pub start: Date,
    /// The last date a transaction may fall on. With no end date, only the
    /// starting transaction is created.
    pub end: Option<Date>,
    /// The step between consecutive transactions.
    pub frequency: Frequency,
}

/// Step a date forward by one frequency interval.
///
/// Month-based steps are calendar-aware: the day of month is preserved where
/// the target month is long enough and clamped to its last day otherwise.
/// Each step starts from the date the previous step produced, so a schedule
/// starting on Jan 31 lands on Feb 29 (leap year) and stays on the 29th from
/// then on.
pub fn advance(date: Date, frequency: Frequency) -> Date {
    match frequency {
        Frequency::Daily => date + Duration::days(1),
        Frequency::Weekly => date + Duration::weeks(1),
        Frequency::Monthly => add_months(date, 1),
        Frequency::SemiAnnual => add_months(date, 6),
        Frequency::Annual => add_months(date, 12),
    }
}

fn add_months(date: Date, months: i32) -> Date {
    let zero_based = i32::from(u8::from(date.month())) - 1 + months;
    let year = date.year() + zero_based.div_euclid(12);
    let month = Month::try_from((zero_based.rem_euclid(12) + 1) as u8)
        .expect("month index is always in 1..=12");
    let day = date.day().min(month.length(year));

    Date::from_calendar_date(year, month, day).expect("clamped day always fits the month")
}

/// Materialize a schedule as a series of transactions.
///
/// The `template` provides the account, amount, kind, category, and
/// description shared by every generated row; its date is replaced with each
/// occurrence's date. One transaction is always created at the schedule's
/// start; further transactions follow at each frequency step until the end
/// date is passed. An end date equal to the start yields exactly one row.
///
/// Rows are written one at a time, so a failure part-way through leaves the
/// rows already created in place and propagates the error.
///
/// # Errors
/// Returns [Error::InvalidDateRange] if the end date is before the start
/// date (nothing is written), or any error [create_transaction] returns.
pub fn expand(
    schedule: &Schedule,
    template: TransactionBuilder,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    if let Some(end) = schedule.end
        && end < schedule.start
    {
        return Err(Error::InvalidDateRange {
            start: schedule.start,
            end,
        });
    }

    let occurrence = |date: Date| {
        let mut builder = template.clone();
        builder.date = date;
        builder
    };

    let mut created = vec![create_transaction(occurrence(schedule.start), connection)?];

    if let Some(end) = schedule.end {
        let mut current = schedule.start;

        loop {
            current = advance(current, schedule.frequency);

            if current > end {
                break;
            }

            created.push(create_transaction(occurrence(current), connection)?);
        }
    }

    Ok(created)
}
