//! Shared test utilities for Trust Flow.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test records with sensible defaults.

use crate::{
    core::{
        customer::{self, NewCustomer},
        invoice::{self, InvoiceWithItems},
        ledger::{self, NewAccount},
        notify::{Notifier, NotifyOutcome, StepNotification},
        quotation::{LineItem, compute_totals},
        template::{self, TemplateStepInput, TemplateUpdate, TemplateWithSteps},
    },
    entities::{self, AccountKind, CustomerKind},
    errors::{Error, Result},
};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, TransactionTrait};
use std::sync::Mutex;

/// Owner id used by most tests.
pub const TEST_OWNER: &str = "owner-1";
/// Base charge of templates made by [`create_test_template`].
pub const TEST_BASE_CHARGE: f64 = 500.0;
/// Charge of every step made by [`create_test_template`].
pub const TEST_STEP_CHARGE: f64 = 100.0;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Form input for an individual customer; the email is derived from the name.
#[must_use]
pub fn new_customer(name: &str) -> NewCustomer {
    let local = name.trim().to_lowercase().replace(' ', ".");
    NewCustomer {
        name: name.to_string(),
        kind: CustomerKind::Individual,
        email: format!("{local}@example.com"),
        phone: "+971500000000".to_string(),
        whatsapp: None,
        details: None,
        trn: None,
    }
}

/// Creates a customer with sensible defaults.
pub async fn create_test_customer(
    db: &DatabaseConnection,
    owner_id: &str,
    name: &str,
) -> Result<entities::customer::Model> {
    customer::create_customer(db, owner_id, new_customer(name)).await
}

/// Creates a template with one step per label.
///
/// # Defaults
/// * base charge: [`TEST_BASE_CHARGE`]
/// * step charge: [`TEST_STEP_CHARGE`], not outsourced
pub async fn create_test_template(
    db: &DatabaseConnection,
    owner_id: &str,
    name: &str,
    labels: &[&str],
) -> Result<TemplateWithSteps> {
    let created =
        template::create_template(db, owner_id, name.to_string(), None, TEST_BASE_CHARGE).await?;
    template::update_template(
        db,
        owner_id,
        created.id,
        TemplateUpdate {
            name: created.name,
            description: Some(format!("{name} processing")),
            base_charge: TEST_BASE_CHARGE,
            steps: labels
                .iter()
                .map(|label| TemplateStepInput {
                    label: (*label).to_string(),
                    description: None,
                    is_outsource: false,
                    charge: TEST_STEP_CHARGE,
                })
                .collect(),
        },
    )
    .await
}

/// Creates the customer "Layla Haddad" and a three-step "Golden Visa" template.
pub async fn setup_with_customer_and_template(
    db: &DatabaseConnection,
) -> Result<(entities::customer::Model, TemplateWithSteps)> {
    let customer = create_test_customer(db, TEST_OWNER, "Layla Haddad").await?;
    let template = create_test_template(
        db,
        TEST_OWNER,
        "Golden Visa",
        &["Medical Test", "Emirates ID", "Visa Stamping"],
    )
    .await?;
    Ok((customer, template))
}

/// Creates a bank account in AED.
pub async fn create_test_account(
    db: &DatabaseConnection,
    owner_id: &str,
    initial_balance: f64,
) -> Result<entities::account::Model> {
    ledger::create_account(
        db,
        owner_id,
        NewAccount {
            name: "Main Account".to_string(),
            kind: AccountKind::Bank,
            initial_balance,
            currency: None,
        },
    )
    .await
}

/// Issues a one-line draft invoice for a new customer "Layla Haddad", due in a week.
pub async fn create_test_invoice(
    db: &DatabaseConnection,
    owner_id: &str,
    subtotal: f64,
) -> Result<InvoiceWithItems> {
    let customer = create_test_customer(db, owner_id, "Layla Haddad").await?;
    let items = [LineItem {
        description: "Service".to_string(),
        quantity: 1.0,
        unit_price: subtotal,
    }];
    let due_date = chrono::Utc::now().date_naive() + chrono::Duration::days(7);

    let txn = db.begin().await?;
    let invoice = invoice::insert_invoice(
        &txn,
        owner_id,
        customer.id,
        None,
        compute_totals(&items),
        due_date,
        &items,
    )
    .await?;
    txn.commit().await?;
    Ok(invoice)
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<StepNotification>>,
}

impl RecordingNotifier {
    /// Notifications received so far.
    #[allow(clippy::unwrap_used)]
    pub fn sent(&self) -> Vec<StepNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    async fn notify_step_completed(
        &self,
        notification: &StepNotification,
    ) -> Result<NotifyOutcome> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(NotifyOutcome {
            email: notification.customer_email.is_some(),
            whatsapp: notification.customer_whatsapp.is_some(),
        })
    }
}

/// Notifier whose delivery always fails.
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_step_completed(
        &self,
        _notification: &StepNotification,
    ) -> Result<NotifyOutcome> {
        Err(Error::invalid("delivery refused"))
    }
}
