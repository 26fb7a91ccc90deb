//! Quotation business logic - Pricing, the quotation lifecycle, and approval.
//!
//! Creating a quotation also creates a `Proposed` application with the template's steps.
//! Approving it activates that application and issues a draft invoice carrying the
//! quotation's items, all in one database transaction.

use crate::{
    core::{
        application::{insert_application, set_application_status},
        customer::require_customer,
        invoice::{self, InvoiceWithItems},
        template::{self, TemplateWithSteps},
    },
    entities::{
        Application, Customer, Quotation, QuotationItem, application,
        application::ApplicationStatus, customer,
        quotation::{self, QuotationStatus},
        quotation_item,
    },
    errors::{Error, Result},
};
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// VAT charged on every quotation and invoice.
pub const VAT_RATE: f64 = 0.05;
/// Days a quotation stays valid when no date is given.
pub const VALIDITY_DAYS: i64 = 30;
/// Days until an invoice issued on approval is due.
pub const INVOICE_DUE_DAYS: i64 = 7;

/// One priced line, as entered or derived from a template.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl LineItem {
    /// `quantity * unit_price`
    #[must_use]
    pub fn total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

impl From<&quotation_item::Model> for LineItem {
    fn from(item: &quotation_item::Model) -> Self {
        Self {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

/// Subtotal, VAT, and grand total of a set of items.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub vat: f64,
    pub total: f64,
}

/// Sums the items and applies [`VAT_RATE`].
#[must_use]
pub fn compute_totals(items: &[LineItem]) -> Totals {
    let subtotal: f64 = items.iter().map(LineItem::total).sum();
    let vat = subtotal * VAT_RATE;
    Totals {
        subtotal,
        vat,
        total: subtotal + vat,
    }
}

/// Default line items for a template: the base fee, one line per charged step, or a
/// single zero-priced line when the template carries no charges at all.
#[must_use]
pub fn items_from_template(template: &TemplateWithSteps) -> Vec<LineItem> {
    let mut items = Vec::new();
    if template.template.base_charge > 0.0 {
        items.push(LineItem {
            description: format!("{}: Base Service Fee", template.template.name),
            quantity: 1.0,
            unit_price: template.template.base_charge,
        });
    }
    items.extend(
        template
            .steps
            .iter()
            .filter(|step| step.charge > 0.0)
            .map(|step| LineItem {
                description: format!("Phase: {}", step.label),
                quantity: 1.0,
                unit_price: step.charge,
            }),
    );
    if items.is_empty() {
        items.push(LineItem {
            description: template.template.name.clone(),
            quantity: 1.0,
            unit_price: 0.0,
        });
    }
    items
}

fn validate_items(items: &[LineItem]) -> Result<()> {
    if items.is_empty() {
        return Err(Error::invalid("A quotation needs at least one item"));
    }
    for item in items {
        if item.description.trim().is_empty() {
            return Err(Error::invalid("Every item needs a description"));
        }
        if !item.quantity.is_finite() || item.quantity <= 0.0 {
            return Err(Error::InvalidAmount {
                amount: item.quantity,
            });
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(Error::InvalidAmount {
                amount: item.unit_price,
            });
        }
    }
    Ok(())
}

/// Fields of the "new quotation" form.
#[derive(Clone, Debug, Deserialize)]
pub struct NewQuotation {
    pub customer_id: i64,
    #[serde(default)]
    pub service_template_id: Option<i64>,
    /// Items to quote; derived from the template when empty
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Defaults to [`VALIDITY_DAYS`] from today
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

/// A quotation with its items and the application it proposes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotationWithItems {
    #[serde(flatten)]
    pub quotation: quotation::Model,
    pub items: Vec<quotation_item::Model>,
    pub application_id: Option<i64>,
}

/// A quotation as listed, with its customer's name.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotationSummary {
    #[serde(flatten)]
    pub quotation: quotation::Model,
    pub customer_name: String,
}

/// Everything an approval produced.
#[derive(Clone, Debug, Serialize)]
pub struct Approval {
    pub quotation: quotation::Model,
    pub application: application::Model,
    pub invoice: InvoiceWithItems,
}

/// Creates a draft quotation and its proposed application.
///
/// # Errors
/// Returns `Error::NotFound` for an unknown customer or template, `Error::Config` when
/// there are no items or one lacks a description, and `Error::InvalidAmount` for a
/// non-positive quantity or negative price.
#[instrument(skip(db, new), fields(customer_id = new.customer_id))]
pub async fn create_quotation(
    db: &DatabaseConnection,
    owner_id: &str,
    new: NewQuotation,
) -> Result<QuotationWithItems> {
    let txn = db.begin().await?;

    require_customer(&txn, owner_id, new.customer_id).await?;
    let template = match new.service_template_id {
        Some(template_id) => {
            let template = template::get_template(&txn, owner_id, template_id)
                .await?
                .ok_or_else(|| Error::not_found("Template", template_id))?;
            let steps = template::get_template_steps(&txn, template_id).await?;
            Some(TemplateWithSteps { template, steps })
        }
        None => None,
    };

    let items = match (&template, new.items.is_empty()) {
        (Some(template), true) => items_from_template(template),
        _ => new.items,
    };
    validate_items(&items)?;
    let totals = compute_totals(&items);
    let valid_until = new
        .valid_until
        .unwrap_or_else(|| Utc::now().date_naive() + Duration::days(VALIDITY_DAYS));

    let quotation = quotation::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        customer_id: Set(new.customer_id),
        service_template_id: Set(new.service_template_id),
        status: Set(QuotationStatus::Draft),
        subtotal: Set(totals.subtotal),
        vat: Set(totals.vat),
        total: Set(totals.total),
        valid_until: Set(valid_until),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut stored_items = Vec::with_capacity(items.len());
    for item in &items {
        let stored = quotation_item::ActiveModel {
            quotation_id: Set(quotation.id),
            description: Set(item.description.trim().to_string()),
            quantity: Set(item.quantity),
            unit_price: Set(item.unit_price),
            total: Set(item.total()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        stored_items.push(stored);
    }

    let application = insert_application(
        &txn,
        owner_id,
        new.customer_id,
        template.as_ref().map(|t| &t.template),
        Some(quotation.id),
        ApplicationStatus::Proposed,
    )
    .await?;

    txn.commit().await?;
    info!(
        quotation_id = quotation.id,
        application_id = application.id,
        total = quotation.total,
        "Quotation created"
    );
    Ok(QuotationWithItems {
        quotation,
        items: stored_items,
        application_id: Some(application.id),
    })
}

async fn require_quotation<C>(db: &C, owner_id: &str, quotation_id: i64) -> Result<quotation::Model>
where
    C: ConnectionTrait,
{
    Quotation::find_by_id(quotation_id)
        .filter(quotation::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Quotation", quotation_id))
}

async fn quotation_items<C>(db: &C, quotation_id: i64) -> Result<Vec<quotation_item::Model>>
where
    C: ConnectionTrait,
{
    QuotationItem::find()
        .filter(quotation_item::Column::QuotationId.eq(quotation_id))
        .order_by_asc(quotation_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn linked_application<C>(
    db: &C,
    quotation: &quotation::Model,
) -> Result<Option<application::Model>>
where
    C: ConnectionTrait,
{
    Application::find()
        .filter(application::Column::QuotationId.eq(quotation.id))
        .filter(application::Column::OwnerId.eq(quotation.owner_id.as_str()))
        .order_by_asc(application::Column::Id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a quotation with its items.
pub async fn get_quotation(
    db: &DatabaseConnection,
    owner_id: &str,
    quotation_id: i64,
) -> Result<QuotationWithItems> {
    let quotation = require_quotation(db, owner_id, quotation_id).await?;
    let items = quotation_items(db, quotation.id).await?;
    let application_id = linked_application(db, &quotation).await?.map(|a| a.id);
    Ok(QuotationWithItems {
        quotation,
        items,
        application_id,
    })
}

/// An owner's quotations, newest first, optionally filtered by customer name or id.
pub async fn list_quotations(
    db: &DatabaseConnection,
    owner_id: &str,
    search: Option<&str>,
) -> Result<Vec<QuotationSummary>> {
    let rows = Quotation::find()
        .filter(quotation::Column::OwnerId.eq(owner_id))
        .find_also_related(Customer)
        .order_by_desc(quotation::Column::CreatedAt)
        .order_by_desc(quotation::Column::Id)
        .all(db)
        .await?;

    let term = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    Ok(rows
        .into_iter()
        .map(|(quotation, customer)| QuotationSummary {
            quotation,
            customer_name: customer.map(|c: customer::Model| c.name).unwrap_or_default(),
        })
        .filter(|summary| {
            term.is_empty()
                || summary.customer_name.to_lowercase().contains(&term)
                || summary.quotation.id.to_string().contains(&term)
        })
        .collect())
}

async fn transition(
    db: &DatabaseConnection,
    owner_id: &str,
    quotation_id: i64,
    action: &'static str,
    allowed: &[QuotationStatus],
    to: QuotationStatus,
) -> Result<quotation::Model> {
    let quotation = require_quotation(db, owner_id, quotation_id).await?;
    if !allowed.contains(&quotation.status) {
        return Err(Error::InvalidTransition {
            entity: "quotation",
            action,
            status: quotation.status.to_string(),
        });
    }
    let mut active: quotation::ActiveModel = quotation.into();
    active.status = Set(to);
    let quotation = active.update(db).await?;
    info!(quotation_id, status = %quotation.status, "Quotation updated");
    Ok(quotation)
}

/// Marks a draft quotation as sent to the customer.
pub async fn mark_sent(
    db: &DatabaseConnection,
    owner_id: &str,
    quotation_id: i64,
) -> Result<quotation::Model> {
    transition(
        db,
        owner_id,
        quotation_id,
        "send",
        &[QuotationStatus::Draft],
        QuotationStatus::Sent,
    )
    .await
}

/// Rejects a draft or sent quotation.
pub async fn reject(
    db: &DatabaseConnection,
    owner_id: &str,
    quotation_id: i64,
) -> Result<quotation::Model> {
    transition(
        db,
        owner_id,
        quotation_id,
        "reject",
        &[QuotationStatus::Draft, QuotationStatus::Sent],
        QuotationStatus::Rejected,
    )
    .await
}

/// Approves a quotation: activates its application (creating one if it is missing) and
/// issues a draft invoice with the quotation's items and totals.
///
/// # Errors
/// Returns `Error::InvalidTransition` unless the quotation is draft or sent. Nothing is
/// written when any step fails.
#[instrument(skip(db))]
pub async fn approve(
    db: &DatabaseConnection,
    owner_id: &str,
    quotation_id: i64,
) -> Result<Approval> {
    let txn = db.begin().await?;

    let quotation = require_quotation(&txn, owner_id, quotation_id).await?;
    if !matches!(
        quotation.status,
        QuotationStatus::Draft | QuotationStatus::Sent
    ) {
        return Err(Error::InvalidTransition {
            entity: "quotation",
            action: "approve",
            status: quotation.status.to_string(),
        });
    }

    let mut active: quotation::ActiveModel = quotation.into();
    active.status = Set(QuotationStatus::Approved);
    let quotation = active.update(&txn).await?;

    let application = match linked_application(&txn, &quotation).await? {
        Some(application) => application,
        None => {
            let template = match quotation.service_template_id {
                Some(template_id) => template::get_template(&txn, owner_id, template_id).await?,
                None => None,
            };
            insert_application(
                &txn,
                owner_id,
                quotation.customer_id,
                template.as_ref(),
                Some(quotation.id),
                ApplicationStatus::Active,
            )
            .await?
        }
    };
    let application = set_application_status(&txn, application, ApplicationStatus::Active).await?;

    let items: Vec<LineItem> = quotation_items(&txn, quotation.id)
        .await?
        .iter()
        .map(LineItem::from)
        .collect();
    let totals = Totals {
        subtotal: quotation.subtotal,
        vat: quotation.vat,
        total: quotation.total,
    };
    let due_date = Utc::now().date_naive() + Duration::days(INVOICE_DUE_DAYS);
    let invoice = invoice::insert_invoice(
        &txn,
        owner_id,
        quotation.customer_id,
        Some(application.id),
        totals,
        due_date,
        &items,
    )
    .await?;

    txn.commit().await?;
    info!(
        quotation_id,
        application_id = application.id,
        invoice_number = %invoice.invoice.invoice_number,
        "Quotation approved"
    );
    Ok(Approval {
        quotation,
        application,
        invoice,
    })
}

/// Quotations grouped by status, for the quotation list header.
#[must_use]
pub fn count_by_status(quotations: &[QuotationSummary]) -> HashMap<QuotationStatus, usize> {
    let mut counts = HashMap::new();
    for summary in quotations {
        *counts.entry(summary.quotation.status).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::application::{delete_application, get_application, get_steps};
    use crate::entities::InvoiceStatus;
    use crate::test_utils::*;

    fn item(description: &str, quantity: f64, unit_price: f64) -> LineItem {
        LineItem {
            description: description.to_string(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn test_compute_totals() {
        let totals = compute_totals(&[item("a", 2.0, 100.0), item("b", 1.0, 50.0)]);
        assert_eq!(totals.subtotal, 250.0);
        assert_eq!(totals.vat, 12.5);
        assert_eq!(totals.total, 262.5);

        assert_eq!(compute_totals(&[]), Totals::default());
    }

    #[tokio::test]
    async fn test_items_from_template() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, template) = setup_with_customer_and_template(&db).await?;

        let items = items_from_template(&template);
        assert_eq!(items[0].description, "Golden Visa: Base Service Fee");
        assert_eq!(items[0].unit_price, TEST_BASE_CHARGE);
        assert_eq!(items.len(), template.steps.len() + 1);
        assert!(items[1].description.starts_with("Phase: "));

        let mut bare = create_test_template(&db, TEST_OWNER, "Bare", &[]).await?;
        bare.template.base_charge = 0.0;
        let items = items_from_template(&bare);
        assert_eq!(items, [item("Bare", 1.0, 0.0)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_quotation_proposes_application() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;

        let created = create_quotation(
            &db,
            TEST_OWNER,
            NewQuotation {
                customer_id: customer.id,
                service_template_id: Some(template.template.id),
                items: vec![item("Visa fee", 2.0, 100.0)],
                valid_until: None,
            },
        )
        .await?;

        assert_eq!(created.quotation.status, QuotationStatus::Draft);
        assert_eq!(created.quotation.subtotal, 200.0);
        assert_eq!(created.quotation.vat, 10.0);
        assert_eq!(created.quotation.total, 210.0);
        assert_eq!(created.items[0].total, 200.0);
        assert_eq!(
            created.quotation.valid_until,
            Utc::now().date_naive() + Duration::days(VALIDITY_DAYS)
        );

        let application = get_application(&db, TEST_OWNER, created.application_id.unwrap())
            .await?
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::Proposed);
        assert_eq!(application.quotation_id, Some(created.quotation.id));
        assert_eq!(get_steps(&db, application.id).await?.len(), template.steps.len());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_quotation_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, TEST_OWNER, "Layla").await?;
        let quote = |items: Vec<LineItem>| NewQuotation {
            customer_id: customer.id,
            service_template_id: None,
            items,
            valid_until: None,
        };

        let result = create_quotation(&db, TEST_OWNER, quote(Vec::new())).await;
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = create_quotation(&db, TEST_OWNER, quote(vec![item(" ", 1.0, 1.0)])).await;
        assert!(matches!(result, Err(Error::Config { .. })));

        let result = create_quotation(&db, TEST_OWNER, quote(vec![item("x", 0.0, 1.0)])).await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));

        let mut unknown = quote(vec![item("x", 1.0, 1.0)]);
        unknown.customer_id = 999;
        let result = create_quotation(&db, TEST_OWNER, unknown).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        // Nothing was half-written
        assert!(list_quotations(&db, TEST_OWNER, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_quotation_uses_custom_service() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, TEST_OWNER, "Layla").await?;
        let created = create_quotation(
            &db,
            TEST_OWNER,
            NewQuotation {
                customer_id: customer.id,
                service_template_id: None,
                items: vec![item("Consulting", 1.0, 300.0)],
                valid_until: NaiveDate::from_ymd_opt(2031, 5, 1),
            },
        )
        .await?;

        let application = get_application(&db, TEST_OWNER, created.application_id.unwrap())
            .await?
            .unwrap();
        assert_eq!(application.description.as_deref(), Some("Custom Service"));
        assert_eq!(created.quotation.valid_until, NaiveDate::from_ymd_opt(2031, 5, 1).unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_activates_application_and_issues_invoice() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        let created = create_quotation(
            &db,
            TEST_OWNER,
            NewQuotation {
                customer_id: customer.id,
                service_template_id: Some(template.template.id),
                items: Vec::new(),
                valid_until: None,
            },
        )
        .await?;

        let approval = approve(&db, TEST_OWNER, created.quotation.id).await?;
        assert_eq!(approval.quotation.status, QuotationStatus::Approved);
        assert_eq!(Some(approval.application.id), created.application_id);
        assert_eq!(approval.application.status, ApplicationStatus::Active);

        let invoice = &approval.invoice;
        assert_eq!(invoice.invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.invoice.total, created.quotation.total);
        assert_eq!(invoice.invoice.subtotal, created.quotation.subtotal);
        assert_eq!(invoice.invoice.application_id, Some(approval.application.id));
        assert_eq!(
            invoice.invoice.due_date,
            Utc::now().date_naive() + Duration::days(INVOICE_DUE_DAYS)
        );
        let quoted: Vec<(&str, f64)> = created
            .items
            .iter()
            .map(|i| (i.description.as_str(), i.total))
            .collect();
        let invoiced: Vec<(&str, f64)> = invoice
            .items
            .iter()
            .map(|i| (i.description.as_str(), i.total))
            .collect();
        assert_eq!(quoted, invoiced);

        let invoices = crate::core::invoice::list_invoices(&db, TEST_OWNER, None).await?;
        assert_eq!(invoices.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_recreates_missing_application() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        let created = create_quotation(
            &db,
            TEST_OWNER,
            NewQuotation {
                customer_id: customer.id,
                service_template_id: Some(template.template.id),
                items: Vec::new(),
                valid_until: None,
            },
        )
        .await?;
        let proposed = created.application_id.unwrap();
        delete_application(&db, TEST_OWNER, proposed).await?;

        let approval = approve(&db, TEST_OWNER, created.quotation.id).await?;
        let application = &approval.application;
        assert_ne!(application.id, proposed);
        assert_eq!(application.status, ApplicationStatus::Active);
        assert_eq!(application.quotation_id, Some(created.quotation.id));
        assert_eq!(application.service_template_id, Some(template.template.id));
        assert_eq!(approval.invoice.invoice.application_id, Some(application.id));

        let labels: Vec<String> = get_steps(&db, application.id)
            .await?
            .into_iter()
            .map(|s| s.label)
            .collect();
        let expected: Vec<String> = template.steps.iter().map(|s| s.label.clone()).collect();
        assert_eq!(labels, expected);
        assert!(!labels.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_twice_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        let created = create_quotation(
            &db,
            TEST_OWNER,
            NewQuotation {
                customer_id: customer.id,
                service_template_id: Some(template.template.id),
                items: Vec::new(),
                valid_until: None,
            },
        )
        .await?;
        mark_sent(&db, TEST_OWNER, created.quotation.id).await?;
        approve(&db, TEST_OWNER, created.quotation.id).await?;

        let result = approve(&db, TEST_OWNER, created.quotation.id).await;
        assert!(matches!(result, Err(Error::InvalidTransition { .. })));
        let invoices = crate::core::invoice::list_invoices(&db, TEST_OWNER, None).await?;
        assert_eq!(invoices.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_send_and_reject_transitions() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, TEST_OWNER, "Layla").await?;
        let created = create_quotation(
            &db,
            TEST_OWNER,
            NewQuotation {
                customer_id: customer.id,
                service_template_id: None,
                items: vec![item("x", 1.0, 10.0)],
                valid_until: None,
            },
        )
        .await?;
        let id = created.quotation.id;

        assert_eq!(mark_sent(&db, TEST_OWNER, id).await?.status, QuotationStatus::Sent);
        assert!(matches!(
            mark_sent(&db, TEST_OWNER, id).await,
            Err(Error::InvalidTransition { action: "send", .. })
        ));
        assert_eq!(reject(&db, TEST_OWNER, id).await?.status, QuotationStatus::Rejected);
        assert!(matches!(
            approve(&db, TEST_OWNER, id).await,
            Err(Error::InvalidTransition { .. })
        ));

        let listed = list_quotations(&db, TEST_OWNER, Some("layla")).await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(count_by_status(&listed)[&QuotationStatus::Rejected], 1);
        Ok(())
    }
}
