//! Customer business logic - Records, search, and the customer profile page.

use crate::{
    entities::{
        Application, Customer, Document, Invoice, Quotation, ServiceTemplate, application,
        customer, document, invoice, quotation, service_template,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fields of the "new customer" form.
#[derive(Clone, Debug, Deserialize)]
pub struct NewCustomer {
    /// Display name, required
    pub name: String,
    /// Individual or company
    pub kind: customer::CustomerKind,
    /// Contact email, required
    pub email: String,
    /// Contact phone
    #[serde(default)]
    pub phone: String,
    /// WhatsApp number
    #[serde(default)]
    pub whatsapp: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub details: Option<String>,
    /// Tax registration number
    #[serde(default)]
    pub trn: Option<String>,
}

/// One application as listed on a customer's profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileApplication {
    /// The application record
    #[serde(flatten)]
    pub application: application::Model,
    /// Name of the template it came from
    pub service_name: Option<String>,
}

/// Everything shown on a customer's profile page.
#[derive(Clone, Debug, Serialize)]
pub struct CustomerProfile {
    /// The customer
    pub customer: customer::Model,
    /// Their applications, newest first
    pub applications: Vec<ProfileApplication>,
    /// Their documents, newest first
    pub documents: Vec<document::Model>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Creates a customer after validating the required fields.
///
/// # Errors
/// Returns `Error::Config` if the name or email is empty, or a database error.
pub async fn create_customer(
    db: &DatabaseConnection,
    owner_id: &str,
    new: NewCustomer,
) -> Result<customer::Model> {
    if new.name.trim().is_empty() || new.email.trim().is_empty() {
        return Err(Error::invalid("Name and email are required"));
    }

    let customer = customer::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(new.name.trim().to_string()),
        kind: Set(new.kind),
        email: Set(new.email.trim().to_string()),
        phone: Set(new.phone.trim().to_string()),
        whatsapp: Set(non_empty(new.whatsapp)),
        details: Set(non_empty(new.details)),
        trn: Set(non_empty(new.trn)),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let customer = customer.insert(db).await?;
    info!(customer_id = customer.id, "Customer created");
    Ok(customer)
}

/// Finds a customer the owner can see.
pub async fn get_customer<C>(
    db: &C,
    owner_id: &str,
    customer_id: i64,
) -> Result<Option<customer::Model>>
where
    C: ConnectionTrait,
{
    Customer::find_by_id(customer_id)
        .filter(customer::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_customer`], but a missing customer is an error.
pub async fn require_customer<C>(
    db: &C,
    owner_id: &str,
    customer_id: i64,
) -> Result<customer::Model>
where
    C: ConnectionTrait,
{
    get_customer(db, owner_id, customer_id)
        .await?
        .ok_or_else(|| Error::not_found("Customer", customer_id))
}

/// Case-insensitive match on name or email; an empty term matches everything.
#[must_use]
pub fn matches_search(customer: &customer::Model, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || customer.name.to_lowercase().contains(&term)
        || customer.email.to_lowercase().contains(&term)
}

/// Lists an owner's customers, newest first, optionally filtered by a search term.
pub async fn list_customers(
    db: &DatabaseConnection,
    owner_id: &str,
    search: Option<&str>,
) -> Result<Vec<customer::Model>> {
    let customers = Customer::find()
        .filter(customer::Column::OwnerId.eq(owner_id))
        .order_by_desc(customer::Column::CreatedAt)
        .order_by_desc(customer::Column::Id)
        .all(db)
        .await?;

    Ok(match search {
        Some(term) => customers
            .into_iter()
            .filter(|c| matches_search(c, term))
            .collect(),
        None => customers,
    })
}

/// Loads the customer profile: the customer, their applications, and their documents.
///
/// # Errors
/// Returns `Error::NotFound` if the customer does not exist for the owner.
pub async fn get_customer_profile(
    db: &DatabaseConnection,
    owner_id: &str,
    customer_id: i64,
) -> Result<CustomerProfile> {
    let customer = require_customer(db, owner_id, customer_id).await?;

    let applications = Application::find()
        .filter(application::Column::CustomerId.eq(customer_id))
        .find_also_related(ServiceTemplate)
        .order_by_desc(application::Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(|(application, template)| ProfileApplication {
            application,
            service_name: template.map(|t: service_template::Model| t.name),
        })
        .collect();

    let documents = Document::find()
        .filter(document::Column::CustomerId.eq(customer_id))
        .order_by_desc(document::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(CustomerProfile {
        customer,
        applications,
        documents,
    })
}

/// Deletes a customer and their document records.
///
/// # Errors
/// Returns `Error::Conflict` while the customer has applications, quotations, or
/// invoices; `Error::NotFound` if the customer does not exist for the owner.
pub async fn delete_customer(
    db: &DatabaseConnection,
    owner_id: &str,
    customer_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    require_customer(&txn, owner_id, customer_id).await?;

    let applications = Application::find()
        .filter(application::Column::CustomerId.eq(customer_id))
        .count(&txn)
        .await?;
    let quotations = Quotation::find()
        .filter(quotation::Column::CustomerId.eq(customer_id))
        .count(&txn)
        .await?;
    let invoices = Invoice::find()
        .filter(invoice::Column::CustomerId.eq(customer_id))
        .count(&txn)
        .await?;
    if applications + quotations + invoices > 0 {
        return Err(Error::Conflict {
            message: format!(
                "Customer {customer_id} still has {applications} applications, \
                 {quotations} quotations and {invoices} invoices"
            ),
        });
    }

    Document::delete_many()
        .filter(document::Column::CustomerId.eq(customer_id))
        .exec(&txn)
        .await?;
    Customer::delete_by_id(customer_id).exec(&txn).await?;

    txn.commit().await?;
    info!(customer_id, "Customer deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{application, document as documents};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_customer_requires_name_and_email() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let mut new = new_customer("Layla");
        new.email = " ".to_string();
        let result = create_customer(&db, TEST_OWNER, new).await;
        assert!(matches!(result.unwrap_err(), Error::Config { .. }));

        let result = create_customer(&db, TEST_OWNER, new_customer("")).await;
        assert!(matches!(result.unwrap_err(), Error::Config { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_customer_normalises_optional_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let mut new = new_customer("  Omar  ");
        new.whatsapp = Some(String::new());

        let customer = create_customer(&db, TEST_OWNER, new).await?;
        assert_eq!(customer.name, "Omar");
        assert_eq!(customer.whatsapp, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_customers_search_and_scope() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_customer(&db, TEST_OWNER, "Layla Haddad").await?;
        create_test_customer(&db, TEST_OWNER, "Omar Said").await?;
        create_test_customer(&db, "other-owner", "Layla Other").await?;

        let all = list_customers(&db, TEST_OWNER, None).await?;
        assert_eq!(all.len(), 2);

        let found = list_customers(&db, TEST_OWNER, Some("layla")).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Layla Haddad");

        // Email is searched too
        let by_email = list_customers(&db, TEST_OWNER, Some("omar.said@")).await?;
        assert_eq!(by_email.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_profile_lists_applications_and_documents() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        application::create_application(&db, TEST_OWNER, customer.id, template.template.id)
            .await?;
        documents::add_document(
            &db,
            TEST_OWNER,
            customer.id,
            documents::NewDocument {
                name: "Passport".to_string(),
                file_path: format!("{}/passport.pdf", customer.id),
                expiry_date: None,
            },
        )
        .await?;

        let profile = get_customer_profile(&db, TEST_OWNER, customer.id).await?;
        assert_eq!(profile.applications.len(), 1);
        assert_eq!(
            profile.applications[0].service_name.as_deref(),
            Some("Golden Visa")
        );
        assert_eq!(profile.documents.len(), 1);

        let missing = get_customer_profile(&db, "other-owner", customer.id).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_customer_with_applications_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        application::create_application(&db, TEST_OWNER, customer.id, template.template.id)
            .await?;

        let result = delete_customer(&db, TEST_OWNER, customer.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let lonely = create_test_customer(&db, TEST_OWNER, "Lonely").await?;
        delete_customer(&db, TEST_OWNER, lonely.id).await?;
        assert!(get_customer(&db, TEST_OWNER, lonely.id).await?.is_none());
        Ok(())
    }
}
