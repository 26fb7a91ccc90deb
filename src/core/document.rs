//! Document business logic - Metadata records for files kept about a customer.
//!
//! Only the record is stored here; the bytes live in external object storage under
//! `file_path`.

use crate::{
    core::customer::require_customer,
    entities::{Customer, Document, customer, document},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Version label given to newly added documents.
pub const INITIAL_VERSION: &str = "v1.0";

/// Fields of the "add document" form.
#[derive(Clone, Debug, Deserialize)]
pub struct NewDocument {
    /// Display name
    pub name: String,
    /// Storage path of the uploaded file
    pub file_path: String,
    /// Date the document stops being valid
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Records a document for a customer.
///
/// # Errors
/// Returns `Error::Config` for an empty name or path, `Error::NotFound` if the customer
/// does not exist for the owner.
pub async fn add_document(
    db: &DatabaseConnection,
    owner_id: &str,
    customer_id: i64,
    new: NewDocument,
) -> Result<document::Model> {
    if new.name.trim().is_empty() || new.file_path.trim().is_empty() {
        return Err(Error::invalid("Document name and file path are required"));
    }
    require_customer(db, owner_id, customer_id).await?;

    let document = document::ActiveModel {
        customer_id: Set(customer_id),
        name: Set(new.name.trim().to_string()),
        file_path: Set(new.file_path),
        version: Set(INITIAL_VERSION.to_string()),
        expiry_date: Set(new.expiry_date),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let document = document.insert(db).await?;
    info!(document_id = document.id, customer_id, "Document added");
    Ok(document)
}

/// Documents of one customer, newest first.
pub async fn list_documents(
    db: &DatabaseConnection,
    owner_id: &str,
    customer_id: i64,
) -> Result<Vec<document::Model>> {
    require_customer(db, owner_id, customer_id).await?;
    Document::find()
        .filter(document::Column::CustomerId.eq(customer_id))
        .order_by_desc(document::Column::CreatedAt)
        .order_by_desc(document::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a document record.
///
/// # Errors
/// Returns `Error::NotFound` unless the document belongs to one of the owner's customers.
pub async fn delete_document(
    db: &DatabaseConnection,
    owner_id: &str,
    document_id: i64,
) -> Result<()> {
    let found = Document::find_by_id(document_id)
        .find_also_related(Customer)
        .one(db)
        .await?;

    match found {
        Some((document, Some(owner))) if owner.owner_id == owner_id => {
            document.delete(db).await?;
            info!(document_id, "Document deleted");
            Ok(())
        }
        _ => Err(Error::not_found("Document", document_id)),
    }
}

/// All of an owner's documents that carry an expiry date.
pub(crate) async fn documents_with_expiry(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<(document::Model, customer::Model)>> {
    let rows = Document::find()
        .filter(document::Column::ExpiryDate.is_not_null())
        .find_also_related(Customer)
        .filter(customer::Column::OwnerId.eq(owner_id))
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(document, customer)| customer.map(|c| (document, c)))
        .collect())
}
