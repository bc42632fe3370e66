//! Bank and cash accounts, plus the balance queries derived from their
//! transaction history.

mod balance;
mod core;

pub use balance::{DailyBalance, balance_on, current_balance, daily_balances};
pub use core::{
    Account, AccountBuilder, AccountKind, count_accounts, create_account, create_account_table,
    delete_account, get_account, get_active_accounts, get_all_accounts, get_total_balance,
    update_account,
};
