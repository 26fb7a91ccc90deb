//! Service template entity - Reusable blueprints for applications and quotations.
//!
//! A template's steps live in `template_steps` and are copied (never referenced) when an
//! application or quotation is created from it.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service template database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_templates")]
pub struct Model {
    /// Unique identifier for the template
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this template belongs to
    pub owner_id: String,
    /// Service name (e.g. "Golden Visa")
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Flat fee quoted on top of per-step charges
    pub base_charge: f64,
    /// When the template was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ServiceTemplate` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One template has many default steps
    #[sea_orm(has_many = "super::template_step::Entity")]
    Steps,
    /// Applications created from this template
    #[sea_orm(has_many = "super::application::Entity")]
    Applications,
}

impl Related<super::template_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
