//! Periodic rollups of the transaction history for reporting.
//!
//! One aggregate table per granularity (day, ISO week, month, quarter,
//! year), each row keyed by (period, account, category, kind) and holding
//! the total, count, and average transaction amount for that group. The
//! tables are caches: fully derived from the transaction table and safe to
//! rebuild at any time.

mod core;
mod period;

pub use core::{
    AggregateRow, aggregate, aggregate_daily, aggregate_monthly, aggregate_quarterly,
    aggregate_weekly, aggregate_yearly, create_aggregation_tables, get_aggregates,
};
pub use period::{Granularity, PeriodKey};
