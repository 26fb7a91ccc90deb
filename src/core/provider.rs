//! Service provider business logic - Outside partners that outsourced steps are assigned to.

use crate::{
    entities::{
        Application, ApplicationStep, Customer, ServiceProvider, ServiceTemplate, application,
        application_step, customer, service_provider, service_template,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Fields of the provider form, used for both create and update.
#[derive(Clone, Debug, Deserialize)]
pub struct ProviderInput {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
    /// 0 to 5
    #[serde(default)]
    pub rating: f64,
}

/// One step assigned to a provider, with where it belongs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderAssignment {
    pub step_id: i64,
    pub label: String,
    pub is_completed: bool,
    pub application_id: i64,
    pub service_name: Option<String>,
    pub customer_name: Option<String>,
}

fn validate(input: &ProviderInput) -> Result<()> {
    if input.name.trim().is_empty() {
        return Err(Error::invalid("Provider name cannot be empty"));
    }
    if !(0.0..=5.0).contains(&input.rating) {
        return Err(Error::invalid(format!(
            "Rating must be between 0 and 5, got {}",
            input.rating
        )));
    }
    Ok(())
}

/// Creates a provider.
pub async fn create_provider(
    db: &DatabaseConnection,
    owner_id: &str,
    input: ProviderInput,
) -> Result<service_provider::Model> {
    validate(&input)?;
    let provider = service_provider::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(input.name.trim().to_string()),
        email: Set(input.email),
        phone: Set(input.phone),
        specialty: Set(input.specialty),
        rating: Set(input.rating),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let provider = provider.insert(db).await?;
    info!(provider_id = provider.id, "Provider created");
    Ok(provider)
}

/// Finds a provider the owner can see.
pub async fn get_provider<C>(
    db: &C,
    owner_id: &str,
    provider_id: i64,
) -> Result<Option<service_provider::Model>>
where
    C: ConnectionTrait,
{
    ServiceProvider::find_by_id(provider_id)
        .filter(service_provider::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_provider<C>(
    db: &C,
    owner_id: &str,
    provider_id: i64,
) -> Result<service_provider::Model>
where
    C: ConnectionTrait,
{
    get_provider(db, owner_id, provider_id)
        .await?
        .ok_or_else(|| Error::not_found("Provider", provider_id))
}

/// An owner's providers, ordered by name.
pub async fn list_providers(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<service_provider::Model>> {
    ServiceProvider::find()
        .filter(service_provider::Column::OwnerId.eq(owner_id))
        .order_by_asc(service_provider::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Overwrites a provider's fields.
pub async fn update_provider(
    db: &DatabaseConnection,
    owner_id: &str,
    provider_id: i64,
    input: ProviderInput,
) -> Result<service_provider::Model> {
    validate(&input)?;
    let provider = require_provider(db, owner_id, provider_id).await?;

    let mut active: service_provider::ActiveModel = provider.into();
    active.name = Set(input.name.trim().to_string());
    active.email = Set(input.email);
    active.phone = Set(input.phone);
    active.specialty = Set(input.specialty);
    active.rating = Set(input.rating);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a provider. Steps assigned to it keep their outsource flag but lose the
/// provider reference.
pub async fn delete_provider(
    db: &DatabaseConnection,
    owner_id: &str,
    provider_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    require_provider(&txn, owner_id, provider_id).await?;

    let unassigned = ApplicationStep::update_many()
        .col_expr(application_step::Column::ProviderId, Expr::value(Option::<i64>::None))
        .col_expr(
            application_step::Column::OutsourceProvider,
            Expr::value(Option::<String>::None),
        )
        .filter(application_step::Column::ProviderId.eq(provider_id))
        .exec(&txn)
        .await?;
    ServiceProvider::delete_by_id(provider_id).exec(&txn).await?;

    txn.commit().await?;
    info!(provider_id, unassigned = unassigned.rows_affected, "Provider deleted");
    Ok(())
}

/// Steps assigned to a provider, with application, customer, and template names.
pub async fn list_assignments(
    db: &DatabaseConnection,
    owner_id: &str,
    provider_id: i64,
) -> Result<Vec<ProviderAssignment>> {
    require_provider(db, owner_id, provider_id).await?;

    let rows = ApplicationStep::find()
        .filter(application_step::Column::ProviderId.eq(provider_id))
        .find_also_related(Application)
        .filter(application::Column::OwnerId.eq(owner_id))
        .order_by_asc(application_step::Column::ApplicationId)
        .order_by_asc(application_step::Column::Position)
        .all(db)
        .await?;

    let applications: Vec<application::Model> =
        rows.iter().filter_map(|(_, a)| a.clone()).collect();
    let customers: HashMap<i64, String> = Customer::find()
        .filter(customer::Column::Id.is_in(applications.iter().map(|a| a.customer_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let templates: HashMap<i64, String> = ServiceTemplate::find()
        .filter(
            service_template::Column::Id
                .is_in(applications.iter().filter_map(|a| a.service_template_id)),
        )
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    Ok(rows
        .into_iter()
        .map(|(step, application)| ProviderAssignment {
            step_id: step.id,
            label: step.label,
            is_completed: step.is_completed,
            application_id: step.application_id,
            service_name: application
                .as_ref()
                .and_then(|a| a.service_template_id)
                .and_then(|id| templates.get(&id).cloned()),
            customer_name: application.and_then(|a| customers.get(&a.customer_id).cloned()),
        })
        .collect())
}
