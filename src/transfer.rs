//! Moves funds between two accounts as a compound ledger operation.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error,
    account::{current_balance, get_account},
    bootstrap::{
        TRANSFER_COMMISSION_CATEGORY, TRANSFER_EXPENSE_CATEGORY, TRANSFER_INCOME_CATEGORY,
    },
    category::{Category, find_category},
    database_id::AccountId,
    transaction::{Transaction, TransactionKind, create_transaction},
};

/// The transactions a completed transfer wrote to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// The expense row on the source account.
    pub expense: Transaction,
    /// The income row on the destination account.
    pub income: Transaction,
    /// The commission expense row on the source account, when a commission
    /// was charged.
    pub commission: Option<Transaction>,
}

/// Move `amount` from one account to another, charging an optional
/// `commission` to the source.
///
/// A transfer is recorded as linked transactions dated today: an expense on
/// the source, an income on the destination, and a second expense on the
/// source when `commission` is above zero. All rows are written inside a
/// single database transaction; either every row commits or none do, so no
/// reader ever observes a partial transfer.
///
/// Preconditions are checked before anything is written: the accounts must
/// differ, and the source's current balance must cover the amount plus
/// commission.
///
/// # Errors
/// This function will return a:
/// - [Error::SameAccountTransfer] if `source_id == destination_id`,
/// - [Error::NonPositiveAmount] if `amount` is zero or negative,
/// - [Error::NegativeCommission] if `commission` is below zero,
/// - [Error::InvalidAccount] if either account does not exist,
/// - [Error::InsufficientFunds] if the source balance cannot cover the
///   transfer,
/// - [Error::MissingDefaultCategory] if the bootstrap categories are absent,
/// - or [Error::SqlError] if a write fails (after which nothing is
///   committed).
pub fn transfer(
    source_id: AccountId,
    destination_id: AccountId,
    amount: Decimal,
    commission: Decimal,
    connection: &Connection,
) -> Result<Transfer, Error> {
    if source_id == destination_id {
        return Err(Error::SameAccountTransfer);
    }
    if amount <= Decimal::ZERO {
        return Err(Error::NonPositiveAmount(amount));
    }
    if commission < Decimal::ZERO {
        return Err(Error::NegativeCommission(commission));
    }

    let source = get_account(source_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidAccount(source_id),
        error => error,
    })?;
    let destination = get_account(destination_id, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidAccount(destination_id),
        error => error,
    })?;

    let available = current_balance(source_id, connection)?;
    let required = amount + commission;
    if available < required {
        return Err(Error::InsufficientFunds {
            available,
            required,
        });
    }

    let today = OffsetDateTime::now_utc().date();

    let sql_transaction = connection.unchecked_transaction()?;

    let expense_category = transfer_category(TRANSFER_EXPENSE_CATEGORY, &sql_transaction)?;
    let income_category = transfer_category(TRANSFER_INCOME_CATEGORY, &sql_transaction)?;

    let expense = create_transaction(
        Transaction::build(
            source_id,
            today,
            amount,
            TransactionKind::Expense,
            expense_category.id,
        )
        .description(&format!("Transfer to {}", destination.name)),
        &sql_transaction,
    )?;

    let income = create_transaction(
        Transaction::build(
            destination_id,
            today,
            amount,
            TransactionKind::Income,
            income_category.id,
        )
        .description(&format!("Transfer from {}", source.name)),
        &sql_transaction,
    )?;

    let commission_row = if commission > Decimal::ZERO {
        let commission_category =
            transfer_category(TRANSFER_COMMISSION_CATEGORY, &sql_transaction)?;

        Some(create_transaction(
            Transaction::build(
                source_id,
                today,
                commission,
                TransactionKind::Expense,
                commission_category.id,
            )
            .description(&format!("Transfer commission for {}", destination.name)),
            &sql_transaction,
        )?)
    } else {
        None
    };

    sql_transaction.commit()?;

    tracing::info!(
        "transferred {amount} from \"{}\" to \"{}\" (commission {commission})",
        source.name,
        destination.name
    );

    Ok(Transfer {
        expense,
        income,
        commission: commission_row,
    })
}

/// Look up one of the bootstrap categories the transfer rows are filed under.
fn transfer_category(name: &str, connection: &Connection) -> Result<Category, Error> {
    let kind = if name == TRANSFER_INCOME_CATEGORY {
        TransactionKind::Income
    } else {
        TransactionKind::Expense
    };

    find_category(name, kind, connection)?
        .ok_or_else(|| Error::MissingDefaultCategory(name.to_owned()))
}

#[cfg(test)]
mod transfer_tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        account::{Account, AccountKind, create_account, current_balance},
        bootstrap::{TRANSFER_COMMISSION_CATEGORY, ensure_default_categories},
        database_id::AccountId,
        db::initialize,
        transaction::{TransactionKind, count_transactions},
    };

    use super::transfer;

    fn get_test_connection() -> (Connection, AccountId, AccountId) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        ensure_default_categories(&conn);

        let source = create_account(
            Account::build("Everyday")
                .kind(AccountKind::Checking)
                .institution("Test Bank")
                .initial_balance(dec!(1000.00)),
            &conn,
        )
        .unwrap();
        let destination = create_account(
            Account::build("Savings")
                .kind(AccountKind::Savings)
                .institution("Test Bank")
                .initial_balance(dec!(0.00)),
            &conn,
        )
        .unwrap();

        (conn, source.id, destination.id)
    }

    #[test]
    fn transfer_moves_funds_and_charges_commission() {
        let (conn, source_id, destination_id) = get_test_connection();

        let result = transfer(source_id, destination_id, dec!(300.00), dec!(10.00), &conn).unwrap();

        assert_eq!(current_balance(source_id, &conn), Ok(dec!(690.00)));
        assert_eq!(current_balance(destination_id, &conn), Ok(dec!(300.00)));

        assert_eq!(result.expense.account_id, source_id);
        assert_eq!(result.expense.kind, TransactionKind::Expense);
        assert_eq!(result.expense.description, "Transfer to Savings");

        assert_eq!(result.income.account_id, destination_id);
        assert_eq!(result.income.kind, TransactionKind::Income);
        assert_eq!(result.income.description, "Transfer from Everyday");

        let commission = result.commission.expect("commission row should exist");
        assert_eq!(commission.account_id, source_id);
        assert_eq!(commission.amount, dec!(10.00));
        assert_eq!(commission.description, "Transfer commission for Savings");
    }

    #[test]
    fn transfer_without_commission_writes_two_rows() {
        let (conn, source_id, destination_id) = get_test_connection();

        let result = transfer(source_id, destination_id, dec!(250.00), dec!(0.00), &conn).unwrap();

        assert_eq!(result.commission, None);
        assert_eq!(count_transactions(&conn), Ok(2));
        assert_eq!(current_balance(source_id, &conn), Ok(dec!(750.00)));
        assert_eq!(current_balance(destination_id, &conn), Ok(dec!(250.00)));
    }

    #[test]
    fn transfer_can_spend_the_entire_balance() {
        let (conn, source_id, destination_id) = get_test_connection();

        transfer(source_id, destination_id, dec!(990.00), dec!(10.00), &conn).unwrap();

        assert_eq!(current_balance(source_id, &conn), Ok(dec!(0.00)));
    }

    #[test]
    fn insufficient_funds_writes_nothing() {
        let (conn, source_id, destination_id) = get_test_connection();

        let result = transfer(source_id, destination_id, dec!(995.00), dec!(10.00), &conn);

        assert_eq!(
            result,
            Err(Error::InsufficientFunds {
                available: dec!(1000.00),
                required: dec!(1005.00),
            })
        );
        assert_eq!(count_transactions(&conn), Ok(0));
        assert_eq!(current_balance(source_id, &conn), Ok(dec!(1000.00)));
        assert_eq!(current_balance(destination_id, &conn), Ok(dec!(0.00)));
    }

    #[test]
    fn same_account_is_rejected() {
        let (conn, source_id, _) = get_test_connection();

        let result = transfer(source_id, source_id, dec!(100.00), dec!(0.00), &conn);

        assert_eq!(result, Err(Error::SameAccountTransfer));
        assert_eq!(count_transactions(&conn), Ok(0));
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let (conn, source_id, destination_id) = get_test_connection();

        let result = transfer(source_id, destination_id, dec!(0.00), dec!(0.00), &conn);

        assert_eq!(result, Err(Error::NonPositiveAmount(dec!(0.00))));
    }

    #[test]
    fn negative_commission_is_rejected() {
        let (conn, source_id, destination_id) = get_test_connection();

        let result = transfer(source_id, destination_id, dec!(100.00), dec!(-1.00), &conn);

        assert_eq!(result, Err(Error::NegativeCommission(dec!(-1.00))));
    }

    #[test]
    fn missing_destination_account_is_rejected() {
        let (conn, source_id, destination_id) = get_test_connection();
        let missing = destination_id + 100;

        let result = transfer(source_id, missing, dec!(100.00), dec!(0.00), &conn);

        assert_eq!(result, Err(Error::InvalidAccount(missing)));
    }

    #[test]
    fn missing_default_category_aborts_with_no_rows() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        // No bootstrap: the transfer categories are absent except for the
        // commission one, which is irrelevant for this amount-only transfer.
        crate::category::create_category(
            TRANSFER_COMMISSION_CATEGORY,
            TransactionKind::Expense,
            None,
            "",
            &conn,
        )
        .unwrap();

        let source = create_account(
            Account::build("Everyday").initial_balance(dec!(500.00)),
            &conn,
        )
        .unwrap();
        let destination = create_account(Account::build("Savings"), &conn).unwrap();

        let result = transfer(source.id, destination.id, dec!(100.00), dec!(0.00), &conn);

        assert_eq!(
            result,
            Err(Error::MissingDefaultCategory(
                "Transfer Expense".to_owned()
            ))
        );
        assert_eq!(count_transactions(&conn), Ok(0));
    }
}
