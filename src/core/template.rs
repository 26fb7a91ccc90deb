//! Service template business logic.
//!
//! Templates are the blueprints applications and quotations are created from. Their step
//! lists are edited as a whole: saving a template replaces every default step.

use crate::{
    entities::{
        Application, Quotation, ServiceTemplate, TemplateStep, application, quotation,
        service_template, template_step,
    },
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// One default step as entered in the template editor.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TemplateStepInput {
    /// Step label
    pub label: String,
    /// Optional details
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the step is normally outsourced
    #[serde(default)]
    pub is_outsource: bool,
    /// Amount quoted for the step
    #[serde(default)]
    pub charge: f64,
}

/// Full replacement of a template's editable fields.
#[derive(Clone, Debug, Deserialize)]
pub struct TemplateUpdate {
    /// New name
    pub name: String,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New base charge
    #[serde(default)]
    pub base_charge: f64,
    /// The complete new step list, in order
    #[serde(default)]
    pub steps: Vec<TemplateStepInput>,
}

/// A template together with its default steps in position order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemplateWithSteps {
    /// The template record
    #[serde(flatten)]
    pub template: service_template::Model,
    /// Default steps, ordered
    pub steps: Vec<template_step::Model>,
}

fn validate_charge(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

/// Creates a template without steps.
///
/// # Errors
/// Returns an error if the name is empty, the base charge is negative or not finite,
/// or the insert fails.
pub async fn create_template(
    db: &DatabaseConnection,
    owner_id: &str,
    name: String,
    description: Option<String>,
    base_charge: f64,
) -> Result<service_template::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid("Template name cannot be empty"));
    }
    validate_charge(base_charge)?;

    let template = service_template::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(name.trim().to_string()),
        description: Set(description),
        base_charge: Set(base_charge),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    template.insert(db).await.map_err(Into::into)
}

/// Finds a template the owner can see.
pub async fn get_template<C>(
    db: &C,
    owner_id: &str,
    template_id: i64,
) -> Result<Option<service_template::Model>>
where
    C: ConnectionTrait,
{
    ServiceTemplate::find_by_id(template_id)
        .filter(service_template::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Default steps of a template, in position order.
pub async fn get_template_steps<C>(db: &C, template_id: i64) -> Result<Vec<template_step::Model>>
where
    C: ConnectionTrait,
{
    TemplateStep::find()
        .filter(template_step::Column::TemplateId.eq(template_id))
        .order_by_asc(template_step::Column::Position)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a template with its steps.
pub async fn get_template_with_steps(
    db: &DatabaseConnection,
    owner_id: &str,
    template_id: i64,
) -> Result<Option<TemplateWithSteps>> {
    let Some(template) = get_template(db, owner_id, template_id).await? else {
        return Ok(None);
    };
    let steps = get_template_steps(db, template.id).await?;
    Ok(Some(TemplateWithSteps { template, steps }))
}

/// All of an owner's templates with steps, newest first.
pub async fn list_templates(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<TemplateWithSteps>> {
    let templates = ServiceTemplate::find()
        .filter(service_template::Column::OwnerId.eq(owner_id))
        .order_by_desc(service_template::Column::CreatedAt)
        .order_by_desc(service_template::Column::Id)
        .all(db)
        .await?;

    let ids: Vec<i64> = templates.iter().map(|t| t.id).collect();
    let mut steps_by_template: HashMap<i64, Vec<template_step::Model>> = HashMap::new();
    for step in TemplateStep::find()
        .filter(template_step::Column::TemplateId.is_in(ids))
        .order_by_asc(template_step::Column::Position)
        .all(db)
        .await?
    {
        steps_by_template
            .entry(step.template_id)
            .or_default()
            .push(step);
    }

    Ok(templates
        .into_iter()
        .map(|template| {
            let steps = steps_by_template.remove(&template.id).unwrap_or_default();
            TemplateWithSteps { template, steps }
        })
        .collect())
}

/// Replaces a template's fields and its complete step list.
///
/// # Errors
/// Returns an error if the template does not exist for the owner, any name or label is
/// empty, any charge is invalid, or the database update fails.
pub async fn update_template(
    db: &DatabaseConnection,
    owner_id: &str,
    template_id: i64,
    update: TemplateUpdate,
) -> Result<TemplateWithSteps> {
    if update.name.trim().is_empty() {
        return Err(Error::invalid("Template name cannot be empty"));
    }
    validate_charge(update.base_charge)?;
    for step in &update.steps {
        if step.label.trim().is_empty() {
            return Err(Error::invalid("Template step label cannot be empty"));
        }
        validate_charge(step.charge)?;
    }

    let txn = db.begin().await?;

    let template = get_template(&txn, owner_id, template_id)
        .await?
        .ok_or_else(|| Error::not_found("Template", template_id))?;

    let mut active: service_template::ActiveModel = template.into();
    active.name = Set(update.name.trim().to_string());
    active.description = Set(update.description);
    active.base_charge = Set(update.base_charge);
    let template = active.update(&txn).await?;

    TemplateStep::delete_many()
        .filter(template_step::Column::TemplateId.eq(template_id))
        .exec(&txn)
        .await?;

    let mut steps = Vec::with_capacity(update.steps.len());
    for (position, step) in (0_i32..).zip(update.steps) {
        let model = template_step::ActiveModel {
            template_id: Set(template_id),
            label: Set(step.label.trim().to_string()),
            description: Set(step.description),
            is_outsource: Set(step.is_outsource),
            charge: Set(step.charge),
            position: Set(position),
            ..Default::default()
        };
        steps.push(model.insert(&txn).await?);
    }

    txn.commit().await?;
    info!(template_id, steps = steps.len(), "Template saved");
    Ok(TemplateWithSteps { template, steps })
}

/// Deletes a template and its steps.
///
/// # Errors
/// Returns `Error::Conflict` while any application or quotation still references the
/// template, `Error::NotFound` if it does not exist for the owner.
pub async fn delete_template(
    db: &DatabaseConnection,
    owner_id: &str,
    template_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;

    get_template(&txn, owner_id, template_id)
        .await?
        .ok_or_else(|| Error::not_found("Template", template_id))?;

    let applications = Application::find()
        .filter(application::Column::ServiceTemplateId.eq(template_id))
        .count(&txn)
        .await?;
    let quotations = Quotation::find()
        .filter(quotation::Column::ServiceTemplateId.eq(template_id))
        .count(&txn)
        .await?;
    if applications > 0 || quotations > 0 {
        return Err(Error::Conflict {
            message: format!(
                "Template {template_id} is used by {applications} applications \
                 and {quotations} quotations"
            ),
        });
    }

    TemplateStep::delete_many()
        .filter(template_step::Column::TemplateId.eq(template_id))
        .exec(&txn)
        .await?;
    ServiceTemplate::delete_by_id(template_id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn step(label: &str, charge: f64) -> TemplateStepInput {
        TemplateStepInput {
            label: label.to_string(),
            description: None,
            is_outsource: false,
            charge,
        }
    }

    #[tokio::test]
    async fn test_create_template_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = create_template(&db, "owner", "  ".to_string(), None, 0.0).await;
        assert!(matches!(result.unwrap_err(), Error::Config { message: _ }));

        let result = create_template(&db, "owner", "Visa".to_string(), None, -1.0).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: -1.0 }
        ));

        let result = create_template(&db, "owner", "Visa".to_string(), None, f64::NAN).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidAmount { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_replaces_steps() -> Result<()> {
        let db = setup_test_db().await?;
        let template = create_test_template(&db, TEST_OWNER, "Visa", &["a", "b", "c"]).await?;
        assert_eq!(template.steps.len(), 3);

        let updated = update_template(
            &db,
            TEST_OWNER,
            template.template.id,
            TemplateUpdate {
                name: "Visa Renewal".to_string(),
                description: Some("Two years".to_string()),
                base_charge: 250.0,
                steps: vec![step("Z", 10.0), step("Y", 0.0)],
            },
        )
        .await?;

        assert_eq!(updated.template.name, "Visa Renewal");
        assert_eq!(updated.template.base_charge, 250.0);
        let stored = get_template_steps(&db, template.template.id).await?;
        let labels: Vec<&str> = stored.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Z", "Y"]);
        assert_eq!(stored[1].position, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_templates_are_owner_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let template = create_test_template(&db, TEST_OWNER, "Visa", &[]).await?;

        assert!(
            get_template_with_steps(&db, "someone-else", template.template.id)
                .await?
                .is_none()
        );
        assert!(list_templates(&db, "someone-else").await?.is_empty());
        assert_eq!(list_templates(&db, TEST_OWNER).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_template_in_use_is_refused() -> Result<()> {
        let db = setup_test_db().await?;
        let (customer, template) = setup_with_customer_and_template(&db).await?;
        crate::core::application::create_application(
            &db,
            TEST_OWNER,
            customer.id,
            template.template.id,
        )
        .await?;

        let result = delete_template(&db, TEST_OWNER, template.template.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let unused = create_test_template(&db, TEST_OWNER, "Unused", &["x"]).await?;
        delete_template(&db, TEST_OWNER, unused.template.id).await?;
        assert!(
            get_template_with_steps(&db, TEST_OWNER, unused.template.id)
                .await?
                .is_none()
        );
        Ok(())
    }
}
