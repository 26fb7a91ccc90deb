//! Service provider entity - Outside parties that outsourced steps are assigned to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service provider database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_providers")]
pub struct Model {
    /// Unique identifier for the provider
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owner (tenant) this provider belongs to
    pub owner_id: String,
    /// Provider name
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// What the provider handles (e.g. "Typing centre")
    pub specialty: Option<String>,
    /// Rating from 0 to 5
    pub rating: f64,
    /// When the provider was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `ServiceProvider` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Steps currently assigned to this provider
    #[sea_orm(has_many = "super::application_step::Entity")]
    Steps,
}

impl Related<super::application_step::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Steps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
