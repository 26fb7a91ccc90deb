//! Invoice business logic - Issued invoices, payments, and overdue tracking.
//!
//! Invoices are issued when a quotation is approved. Payments post a credit transaction
//! to an account and accumulate in `amount_paid`.

use crate::{
    core::{
        ledger::{self, require_account},
        quotation::{LineItem, Totals},
    },
    entities::{
        Customer, Invoice, InvoiceItem, customer,
        invoice::{self, InvoiceStatus},
        invoice_item, transaction,
        transaction::TransactionKind,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Ledger category of payments received against invoices.
pub const PAYMENT_CATEGORY: &str = "client_payment";

/// An invoice with its line items.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: invoice::Model,
    pub items: Vec<invoice_item::Model>,
}

/// An invoice as listed, with the customer details printed on it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InvoiceSummary {
    #[serde(flatten)]
    pub invoice: invoice::Model,
    pub customer_name: String,
    pub customer_trn: Option<String>,
}

/// A payment received against an invoice.
#[derive(Clone, Debug, Deserialize)]
pub struct Payment {
    /// Account the money went into
    pub account_id: i64,
    pub amount: f64,
    /// Bank reference, cheque number, or similar
    #[serde(default)]
    pub reference: String,
}

/// Result of recording a payment.
#[derive(Clone, Debug, Serialize)]
pub struct PaymentOutcome {
    pub invoice: invoice::Model,
    pub transaction: transaction::Model,
}

/// `INV-` followed by the last six digits of the millisecond timestamp.
#[must_use]
pub fn invoice_number_for(millis: i64) -> String {
    format!("INV-{:06}", millis.rem_euclid(1_000_000))
}

/// Status after a payment brings `amount_paid` to the given value.
#[must_use]
pub fn payment_status(amount_paid: f64, total: f64) -> InvoiceStatus {
    // Sub-fil differences count as settled
    if amount_paid + 0.005 >= total {
        InvoiceStatus::Paid
    } else {
        InvoiceStatus::Partial
    }
}

/// Picks an invoice number from the clock that the owner has not used yet.
async fn generate_invoice_number<C>(db: &C, owner_id: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let candidate = invoice_number_for(millis);
        let taken = Invoice::find()
            .filter(invoice::Column::OwnerId.eq(owner_id))
            .filter(invoice::Column::InvoiceNumber.eq(candidate.as_str()))
            .one(db)
            .await?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
        millis += 1;
    }
}

/// Inserts a draft invoice with a fresh number and the given items.
///
/// Callers run this inside their own database transaction.
pub(crate) async fn insert_invoice<C>(
    db: &C,
    owner_id: &str,
    customer_id: i64,
    application_id: Option<i64>,
    totals: Totals,
    due_date: NaiveDate,
    items: &[LineItem],
) -> Result<InvoiceWithItems>
where
    C: ConnectionTrait,
{
    let invoice_number = generate_invoice_number(db, owner_id).await?;
    let invoice = invoice::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        customer_id: Set(customer_id),
        application_id: Set(application_id),
        invoice_number: Set(invoice_number),
        status: Set(InvoiceStatus::Draft),
        subtotal: Set(totals.subtotal),
        vat: Set(totals.vat),
        total: Set(totals.total),
        amount_paid: Set(0.0),
        due_date: Set(due_date),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut stored = Vec::with_capacity(items.len());
    for item in items {
        stored.push(
            invoice_item::ActiveModel {
                invoice_id: Set(invoice.id),
                description: Set(item.description.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total: Set(item.total()),
                ..Default::default()
            }
            .insert(db)
            .await?,
        );
    }

    Ok(InvoiceWithItems {
        invoice,
        items: stored,
    })
}

async fn require_invoice<C>(db: &C, owner_id: &str, invoice_id: i64) -> Result<invoice::Model>
where
    C: ConnectionTrait,
{
    Invoice::find_by_id(invoice_id)
        .filter(invoice::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invoice", invoice_id))
}

/// Finds an invoice with its items.
pub async fn get_invoice(
    db: &DatabaseConnection,
    owner_id: &str,
    invoice_id: i64,
) -> Result<InvoiceWithItems> {
    let invoice = require_invoice(db, owner_id, invoice_id).await?;
    let items = InvoiceItem::find()
        .filter(invoice_item::Column::InvoiceId.eq(invoice.id))
        .order_by_asc(invoice_item::Column::Id)
        .all(db)
        .await?;
    Ok(InvoiceWithItems { invoice, items })
}

/// An owner's invoices, newest first, optionally only those with one status.
pub async fn list_invoices(
    db: &DatabaseConnection,
    owner_id: &str,
    status: Option<InvoiceStatus>,
) -> Result<Vec<InvoiceSummary>> {
    let mut query = Invoice::find().filter(invoice::Column::OwnerId.eq(owner_id));
    if let Some(status) = status {
        query = query.filter(invoice::Column::Status.eq(status));
    }
    let rows = query
        .find_also_related(Customer)
        .order_by_desc(invoice::Column::CreatedAt)
        .order_by_desc(invoice::Column::Id)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(invoice, customer)| {
            let (customer_name, customer_trn) = customer
                .map(|c: customer::Model| (c.name, c.trn))
                .unwrap_or_default();
            InvoiceSummary {
                invoice,
                customer_name,
                customer_trn,
            }
        })
        .collect())
}

/// Records a payment: posts a credit to the account and updates the invoice.
///
/// # Errors
/// Returns `Error::InvalidAmount` unless the amount is positive and finite,
/// `Error::InvalidTransition` for an invoice that is already paid, and `Error::NotFound`
/// for an unknown invoice or account.
#[instrument(skip(db, payment), fields(account_id = payment.account_id, amount = payment.amount))]
pub async fn record_payment(
    db: &DatabaseConnection,
    owner_id: &str,
    invoice_id: i64,
    payment: Payment,
) -> Result<PaymentOutcome> {
    if payment.amount <= 0.0 || !payment.amount.is_finite() {
        return Err(Error::InvalidAmount {
            amount: payment.amount,
        });
    }

    let txn = db.begin().await?;

    let invoice = require_invoice(&txn, owner_id, invoice_id).await?;
    if invoice.status == InvoiceStatus::Paid {
        return Err(Error::InvalidTransition {
            entity: "invoice",
            action: "pay",
            status: invoice.status.to_string(),
        });
    }
    require_account(&txn, owner_id, payment.account_id).await?;

    let description = if payment.reference.trim().is_empty() {
        format!("Payment for Invoice {}", invoice.invoice_number)
    } else {
        format!(
            "Payment for Invoice {} - {}",
            invoice.invoice_number,
            payment.reference.trim()
        )
    };
    let transaction = ledger::insert_transaction(
        &txn,
        payment.account_id,
        TransactionKind::Credit,
        PAYMENT_CATEGORY.to_string(),
        payment.amount,
        description,
        Some(owner_id.to_string()),
    )
    .await?;

    let amount_paid = invoice.amount_paid + payment.amount;
    let status = payment_status(amount_paid, invoice.total);
    let mut active: invoice::ActiveModel = invoice.into();
    active.amount_paid = Set(amount_paid);
    active.status = Set(status);
    let invoice = active.update(&txn).await?;

    txn.commit().await?;
    info!(
        invoice_number = %invoice.invoice_number,
        status = %invoice.status,
        "Payment recorded"
    );
    Ok(PaymentOutcome {
        invoice,
        transaction,
    })
}

/// Marks every open invoice due before `today` as overdue. Returns how many changed.
pub async fn mark_overdue_invoices(
    db: &DatabaseConnection,
    owner_id: &str,
    today: NaiveDate,
) -> Result<u64> {
    let result = Invoice::update_many()
        .col_expr(
            invoice::Column::Status,
            Expr::value(InvoiceStatus::Overdue),
        )
        .filter(invoice::Column::OwnerId.eq(owner_id))
        .filter(invoice::Column::Status.is_in([
            InvoiceStatus::Draft,
            InvoiceStatus::Unpaid,
            InvoiceStatus::Partial,
        ]))
        .filter(invoice::Column::DueDate.lt(today))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!(count = result.rows_affected, "Invoices marked overdue");
    }
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::ledger::get_account;
    use crate::test_utils::*;
    use chrono::Duration;

    fn pay(account_id: i64, amount: f64) -> Payment {
        Payment {
            account_id,
            amount,
            reference: "TT-001".to_string(),
        }
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(invoice_number_for(1_700_000_123_456), "INV-123456");
        assert_eq!(invoice_number_for(1_700_000_000_042), "INV-000042");
    }

    #[test]
    fn test_payment_status() {
        assert_eq!(payment_status(100.0, 100.0), InvoiceStatus::Paid);
        assert_eq!(payment_status(120.0, 100.0), InvoiceStatus::Paid);
        assert_eq!(payment_status(99.0, 100.0), InvoiceStatus::Partial);
    }

    #[tokio::test]
    async fn test_full_and_partial_payments() -> Result<()> {
        let db = setup_test_db().await?;
        let invoice = create_test_invoice(&db, TEST_OWNER, 1000.0).await?;
        let account = create_test_account(&db, TEST_OWNER, 0.0).await?;

        let first = record_payment(
            &db,
            TEST_OWNER,
            invoice.invoice.id,
            pay(account.id, 400.0),
        )
        .await?;
        assert_eq!(first.invoice.status, InvoiceStatus::Partial);
        assert_eq!(first.invoice.amount_paid, 400.0);
        assert_eq!(first.transaction.kind, TransactionKind::Credit);
        assert_eq!(first.transaction.category, PAYMENT_CATEGORY);
        assert_eq!(
            first.transaction.description,
            format!("Payment for Invoice {} - TT-001", invoice.invoice.invoice_number)
        );

        let second = record_payment(
            &db,
            TEST_OWNER,
            invoice.invoice.id,
            pay(account.id, invoice.invoice.total - 400.0),
        )
        .await?;
        assert_eq!(second.invoice.status, InvoiceStatus::Paid);

        let account = get_account(&db, TEST_OWNER, account.id).await?.unwrap();
        assert_eq!(account.current_balance, invoice.invoice.total);

        let result = record_payment(
            &db,
            TEST_OWNER,
            invoice.invoice.id,
            pay(account.id, 1.0),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_payment_validation_leaves_invoice_untouched() -> Result<()> {
        let db = setup_test_db().await?;
        let invoice = create_test_invoice(&db, TEST_OWNER, 500.0).await?;

        let result = record_payment(&db, TEST_OWNER, invoice.invoice.id, pay(1, 0.0)).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        // Unknown account rolls back
        let result = record_payment(&db, TEST_OWNER, invoice.invoice.id, pay(999, 10.0)).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        let stored = get_invoice(&db, TEST_OWNER, invoice.invoice.id).await?;
        assert_eq!(stored.invoice.amount_paid, 0.0);
        assert_eq!(stored.invoice.status, InvoiceStatus::Draft);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_overdue() -> Result<()> {
        let db = setup_test_db().await?;
        let invoice = create_test_invoice(&db, TEST_OWNER, 100.0).await?;
        let due = invoice.invoice.due_date;

        assert_eq!(mark_overdue_invoices(&db, TEST_OWNER, due).await?, 0);
        assert_eq!(
            mark_overdue_invoices(&db, TEST_OWNER, due + Duration::days(1)).await?,
            1
        );
        let overdue = list_invoices(&db, TEST_OWNER, Some(InvoiceStatus::Overdue)).await?;
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].customer_name, "Layla Haddad");
        Ok(())
    }
}
