//! Period buckets shared by the aggregate tables.

use rusqlite::{Row, types::Value};
use time::Date;

/// The identifier of one reporting period.
///
/// Weeks follow ISO 8601, so a week's year can differ from the calendar
/// year of the dates inside it. Quarters map months 1-3 to Q1, 4-6 to Q2,
/// 7-9 to Q3, and 10-12 to Q4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKey {
    /// A single calendar day.
    Day(Date),
    /// An ISO-8601 week of a year.
    Week {
        /// The ISO week-based year.
        year: i32,
        /// The ISO week number, 1-53.
        week: u8,
    },
    /// A calendar month of a year.
    Month {
        /// The calendar year.
        year: i32,
        /// The month number, 1-12.
        month: u8,
    },
    /// A quarter of a calendar year.
    Quarter {
        /// The calendar year.
        year: i32,
        /// The quarter number, 1-4.
        quarter: u8,
    },
    /// A whole calendar year.
    Year(i32),
}

impl PeriodKey {
    /// The values of the period's key columns, in column order.
    pub(super) fn params(self) -> Vec<Value> {
        match self {
            PeriodKey::Day(date) => vec![Value::Text(date.to_string())],
            PeriodKey::Week { year, week } => {
                vec![Value::Integer(year.into()), Value::Integer(week.into())]
            }
            PeriodKey::Month { year, month } => {
                vec![Value::Integer(year.into()), Value::Integer(month.into())]
            }
            PeriodKey::Quarter { year, quarter } => {
                vec![Value::Integer(year.into()), Value::Integer(quarter.into())]
            }
            PeriodKey::Year(year) => vec![Value::Integer(year.into())],
        }
    }
}

/// The time granularities transactions are rolled up at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One aggregate row per day.
    Daily,
    /// One aggregate row per ISO week.
    Weekly,
    /// One aggregate row per calendar month.
    Monthly,
    /// One aggregate row per quarter.
    Quarterly,
    /// One aggregate row per calendar year.
    Yearly,
}

impl Granularity {
    /// Every granularity, in rollup order.
    pub const ALL: [Granularity; 5] = [
        Granularity::Daily,
        Granularity::Weekly,
        Granularity::Monthly,
        Granularity::Quarterly,
        Granularity::Yearly,
    ];

    /// The period a date falls into at this granularity.
    pub fn bucket(self, date: Date) -> PeriodKey {
        match self {
            Granularity::Daily => PeriodKey::Day(date),
            Granularity::Weekly => {
                let (year, week, _) = date.to_iso_week_date();
                PeriodKey::Week { year, week }
            }
            Granularity::Monthly => PeriodKey::Month {
                year: date.year(),
                month: u8::from(date.month()),
            },
            Granularity::Quarterly => PeriodKey::Quarter {
                year: date.year(),
                quarter: u8::from(date.month()).div_ceil(3),
            },
            Granularity::Yearly => PeriodKey::Year(date.year()),
        }
    }

    /// The aggregate table this granularity stores its rows in.
    pub(super) fn table(self) -> &'static str {
        match self {
            Granularity::Daily => "daily_aggregation",
            Granularity::Weekly => "weekly_aggregation",
            Granularity::Monthly => "monthly_aggregation",
            Granularity::Quarterly => "quarterly_aggregation",
            Granularity::Yearly => "yearly_aggregation",
        }
    }

    /// The period key columns of the aggregate table, in order.
    pub(super) fn key_columns(self) -> &'static [&'static str] {
        match self {
            Granularity::Daily => &["date"],
            Granularity::Weekly => &["year", "week"],
            Granularity::Monthly => &["year", "month"],
            Granularity::Quarterly => &["year", "quarter"],
            Granularity::Yearly => &["year"],
        }
    }

    /// The DDL fragment declaring the period key columns.
    pub(super) fn key_column_definitions(self) -> &'static str {
        match self {
            Granularity::Daily => "date TEXT NOT NULL",
            Granularity::Weekly => "year INTEGER NOT NULL, week INTEGER NOT NULL",
            Granularity::Monthly => "year INTEGER NOT NULL, month INTEGER NOT NULL",
            Granularity::Quarterly => "year INTEGER NOT NULL, quarter INTEGER NOT NULL",
            Granularity::Yearly => "year INTEGER NOT NULL",
        }
    }

    /// Read a period key from the leading columns of an aggregate row.
    pub(super) fn key_from_row(self, row: &Row) -> Result<PeriodKey, rusqlite::Error> {
        match self {
            Granularity::Daily => Ok(PeriodKey::Day(row.get(0)?)),
            Granularity::Weekly => Ok(PeriodKey::Week {
                year: row.get(0)?,
                week: row.get(1)?,
            }),
            Granularity::Monthly => Ok(PeriodKey::Month {
                year: row.get(0)?,
                month: row.get(1)?,
            }),
            Granularity::Quarterly => Ok(PeriodKey::Quarter {
                year: row.get(0)?,
                quarter: row.get(1)?,
            }),
            Granularity::Yearly => Ok(PeriodKey::Year(row.get(0)?)),
        }
    }
}
