//! Template step entity - One default step of a service template.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Template step database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "template_steps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub template_id: i64,
    pub label: String,
    pub description: Option<String>,
    /// Steps flagged here start out outsourced in new applications
    pub is_outsource: bool,
    /// Amount quoted for this phase; zero means "not itemised"
    pub charge: f64,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_template::Entity",
        from = "Column::TemplateId",
        to = "super::service_template::Column::Id"
    )]
    Template,
}

impl Related<super::service_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
