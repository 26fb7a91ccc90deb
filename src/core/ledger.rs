//! Ledger business logic - Accounts and the transactions that move their balances.
//!
//! Every transaction insert adjusts its account's `current_balance` in the same database
//! transaction: credits add the amount, debits subtract it.

use crate::{
    entities::{
        Account, Transaction, account,
        account::AccountKind,
        transaction::{self, TransactionKind},
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Currency used when an account is created without one.
pub const DEFAULT_CURRENCY: &str = "AED";

/// Fields of the "new account" form.
#[derive(Clone, Debug, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    #[serde(default)]
    pub initial_balance: f64,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Fields of a manually entered transaction.
#[derive(Clone, Debug, Deserialize)]
pub struct NewTransaction {
    pub account_id: i64,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A transaction with the name of its account.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransactionEntry {
    #[serde(flatten)]
    pub transaction: transaction::Model,
    pub account_name: String,
}

/// Income and expense totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct LedgerSummary {
    /// Sum of credits
    pub total_income: f64,
    /// Sum of debits
    pub total_expense: f64,
    /// Income minus expense
    pub net: f64,
}

/// Sums a list of transactions.
#[must_use]
pub fn summarize(transactions: &[transaction::Model]) -> LedgerSummary {
    let (total_income, total_expense) =
        transactions
            .iter()
            .fold((0.0, 0.0), |(income, expense), t| match t.kind {
                TransactionKind::Credit => (income + t.amount, expense),
                TransactionKind::Debit => (income, expense + t.amount),
            });
    LedgerSummary {
        total_income,
        total_expense,
        net: total_income - total_expense,
    }
}

/// Creates an account whose current balance starts at its initial balance.
///
/// # Errors
/// Returns `Error::Config` for an empty name and `Error::InvalidAmount` for a balance that
/// is not finite.
pub async fn create_account(
    db: &DatabaseConnection,
    owner_id: &str,
    new: NewAccount,
) -> Result<account::Model> {
    if new.name.trim().is_empty() {
        return Err(Error::invalid("Account name cannot be empty"));
    }
    if !new.initial_balance.is_finite() {
        return Err(Error::InvalidAmount {
            amount: new.initial_balance,
        });
    }
    let currency = new
        .currency
        .filter(|c| !c.trim().is_empty())
        .map_or_else(|| DEFAULT_CURRENCY.to_string(), |c| c.trim().to_uppercase());

    let account = account::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(new.name.trim().to_string()),
        kind: Set(new.kind),
        initial_balance: Set(new.initial_balance),
        current_balance: Set(new.initial_balance),
        currency: Set(currency),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let account = account.insert(db).await?;
    info!(account_id = account.id, "Account created");
    Ok(account)
}

/// An owner's accounts, oldest first.
pub async fn list_accounts(db: &DatabaseConnection, owner_id: &str) -> Result<Vec<account::Model>> {
    Account::find()
        .filter(account::Column::OwnerId.eq(owner_id))
        .order_by_asc(account::Column::CreatedAt)
        .order_by_asc(account::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an account the owner can see.
pub async fn get_account<C>(
    db: &C,
    owner_id: &str,
    account_id: i64,
) -> Result<Option<account::Model>>
where
    C: ConnectionTrait,
{
    Account::find_by_id(account_id)
        .filter(account::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

pub(crate) async fn require_account<C>(
    db: &C,
    owner_id: &str,
    account_id: i64,
) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    get_account(db, owner_id, account_id)
        .await?
        .ok_or_else(|| Error::not_found("Account", account_id))
}

/// Atomically adds `amount_delta` to an account's current balance.
///
/// Uses `current_balance = current_balance + delta` in SQL so concurrent updates compose.
pub(crate) async fn adjust_account_balance_atomic<C>(
    db: &C,
    account_id: i64,
    amount_delta: f64,
) -> Result<()>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let result = Account::update_many()
        .col_expr(
            account::Column::CurrentBalance,
            Expr::col(account::Column::CurrentBalance).add(amount_delta),
        )
        .filter(account::Column::Id.eq(account_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Account", account_id));
    }
    debug!(account_id, amount_delta, "Account balance adjusted");
    Ok(())
}

/// Inserts a transaction and applies it to the account balance.
///
/// Callers run this inside their own database transaction.
pub(crate) async fn insert_transaction<C>(
    db: &C,
    account_id: i64,
    kind: TransactionKind,
    category: String,
    amount: f64,
    description: String,
    created_by: Option<String>,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }

    let transaction = transaction::ActiveModel {
        account_id: Set(account_id),
        kind: Set(kind),
        category: Set(category),
        amount: Set(amount),
        description: Set(description),
        created_by: Set(created_by),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let transaction = transaction.insert(db).await?;
    adjust_account_balance_atomic(db, account_id, kind.signed(amount)).await?;
    Ok(transaction)
}

/// Records a transaction against one of the owner's accounts.
///
/// # Errors
/// Returns `Error::InvalidAmount` unless the amount is positive and finite,
/// `Error::Config` for an empty category, and `Error::NotFound` for an unknown account.
#[instrument(skip(db, new), fields(account_id = new.account_id))]
pub async fn record_transaction(
    db: &DatabaseConnection,
    owner_id: &str,
    new: NewTransaction,
) -> Result<transaction::Model> {
    if new.amount <= 0.0 || !new.amount.is_finite() {
        return Err(Error::InvalidAmount { amount: new.amount });
    }
    if new.category.trim().is_empty() {
        return Err(Error::invalid("Transaction category cannot be empty"));
    }

    let txn = db.begin().await?;
    require_account(&txn, owner_id, new.account_id).await?;
    let transaction = insert_transaction(
        &txn,
        new.account_id,
        new.kind,
        new.category.trim().to_string(),
        new.amount,
        new.description,
        new.created_by,
    )
    .await?;
    txn.commit().await?;

    info!(
        transaction_id = transaction.id,
        "Recorded {:?} of {:.2}", transaction.kind, transaction.amount
    );
    Ok(transaction)
}

/// All transactions on an owner's accounts, newest first.
pub async fn list_transactions(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<TransactionEntry>> {
    let rows = Transaction::find()
        .find_also_related(Account)
        .filter(account::Column::OwnerId.eq(owner_id))
        .order_by_desc(transaction::Column::CreatedAt)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(transaction, account)| {
            account.map(|a| TransactionEntry {
                transaction,
                account_name: a.name,
            })
        })
        .collect())
}

/// Income, expense, and net over all of an owner's transactions.
pub async fn transaction_summary(db: &DatabaseConnection, owner_id: &str) -> Result<LedgerSummary> {
    let transactions: Vec<transaction::Model> = list_transactions(db, owner_id)
        .await?
        .into_iter()
        .map(|entry| entry.transaction)
        .collect();
    Ok(summarize(&transactions))
}
