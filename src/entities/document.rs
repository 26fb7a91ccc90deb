//! Document entity - Metadata for files kept on a customer's record.
//!
//! Only the metadata lives here; `file_path` points into the external object store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Unique identifier for the document
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Customer the document belongs to
    pub customer_id: i64,
    /// Display name (e.g. "Passport copy")
    pub name: String,
    /// Object-store path, conventionally `<customer_id>/<file>`
    pub file_path: String,
    /// Version label, `v1.0` for new uploads
    pub version: String,
    /// Date the document stops being valid, if any
    pub expiry_date: Option<Date>,
    /// When the record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Document and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each document belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
