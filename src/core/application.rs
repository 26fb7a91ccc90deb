//! Application business logic - Service workflows delivered to customers.
//!
//! Applications are created from a template (directly, or by a quotation), have their
//! steps edited through a [`WorkflowDraft`], and are shown on a four-column board.

use crate::{
    core::{
        customer::require_customer,
        notify::{self, Notifier},
        provider,
        template,
        workflow::{self, DraftStep, StepState, WorkflowDraft},
    },
    entities::{
        Application, ApplicationStep, Customer, Invoice, ServiceTemplate, application,
        application::ApplicationStatus, application_step, customer, invoice, service_template,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};

/// Description used for applications that do not come from a template.
pub const CUSTOM_SERVICE: &str = "Custom Service";

/// Column of the applications board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardColumn {
    /// Draft or proposed
    Incoming,
    /// Active, below 90%
    InProgress,
    /// Active, at least 90% but not done
    Finalizing,
    /// Fully complete or closed
    Completed,
}

/// An application with what the list and board views show about it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApplicationOverview {
    /// The application record
    #[serde(flatten)]
    pub application: application::Model,
    /// Name of the customer
    pub customer_name: String,
    /// Template name, if the application came from one
    pub service_name: Option<String>,
    /// Template description
    pub service_description: Option<String>,
    /// Steps in position order
    pub steps: Vec<application_step::Model>,
}

/// The applications board, one list per column.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Board {
    pub incoming: Vec<ApplicationOverview>,
    pub in_progress: Vec<ApplicationOverview>,
    pub finalizing: Vec<ApplicationOverview>,
    pub completed: Vec<ApplicationOverview>,
}

/// A stored step together with its display state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepView {
    #[serde(flatten)]
    pub step: application_step::Model,
    pub state: StepState,
}

/// The workflow board of one application.
#[derive(Clone, Debug, Serialize)]
pub struct WorkflowView {
    pub application_id: i64,
    pub progress: i32,
    /// Id of the first incomplete step
    pub active_step_id: Option<i64>,
    pub steps: Vec<StepView>,
}

/// Result of persisting a draft.
#[derive(Clone, Debug, Serialize)]
pub struct SaveOutcome {
    /// The application with its recomputed progress
    pub application: application::Model,
    /// Stored steps after the save, in order
    pub steps: Vec<application_step::Model>,
    /// How many step notifications were delivered
    pub notified: usize,
}

/// Which board column an application belongs to. The first matching column wins.
#[must_use]
pub fn board_column(status: ApplicationStatus, progress: i32) -> BoardColumn {
    match status {
        ApplicationStatus::Draft | ApplicationStatus::Proposed => BoardColumn::Incoming,
        ApplicationStatus::Active if progress < 90 => BoardColumn::InProgress,
        ApplicationStatus::Active if progress < 100 => BoardColumn::Finalizing,
        ApplicationStatus::Active | ApplicationStatus::Closed => BoardColumn::Completed,
    }
}

/// Distributes applications over the board columns, keeping their order.
#[must_use]
pub fn board(applications: Vec<ApplicationOverview>) -> Board {
    let mut board = Board::default();
    for overview in applications {
        let column = board_column(overview.application.status, overview.application.progress);
        match column {
            BoardColumn::Incoming => board.incoming.push(overview),
            BoardColumn::InProgress => board.in_progress.push(overview),
            BoardColumn::Finalizing => board.finalizing.push(overview),
            BoardColumn::Completed => board.completed.push(overview),
        }
    }
    board
}

/// Display states for stored steps that are already in position order.
#[must_use]
pub fn step_views(steps: Vec<application_step::Model>) -> Vec<StepView> {
    let states = workflow::step_states(&steps);
    steps
        .into_iter()
        .zip(states)
        .map(|(step, state)| StepView { step, state })
        .collect()
}

/// Inserts an application row and copies the template's default steps into it.
pub(crate) async fn insert_application<C>(
    db: &C,
    owner_id: &str,
    customer_id: i64,
    template: Option<&service_template::Model>,
    quotation_id: Option<i64>,
    status: ApplicationStatus,
) -> Result<application::Model>
where
    C: ConnectionTrait,
{
    let description = template.map_or_else(|| CUSTOM_SERVICE.to_string(), |t| t.name.clone());
    let application = application::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        customer_id: Set(customer_id),
        service_template_id: Set(template.map(|t| t.id)),
        quotation_id: Set(quotation_id),
        description: Set(Some(description)),
        status: Set(status),
        progress: Set(0),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let application = application.insert(db).await?;

    if let Some(template) = template {
        let now = chrono::Utc::now();
        for step in template::get_template_steps(db, template.id).await? {
            application_step::ActiveModel {
                application_id: Set(application.id),
                label: Set(step.label),
                description: Set(step.description),
                position: Set(step.position),
                is_completed: Set(false),
                is_outsource: Set(step.is_outsource),
                provider_id: Set(None),
                outsource_provider: Set(None),
                expiry_date: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }

    Ok(application)
}

/// Creates an active application for a customer from a template.
///
/// # Errors
/// Returns `Error::NotFound` if the customer or template does not exist for the owner.
pub async fn create_application(
    db: &DatabaseConnection,
    owner_id: &str,
    customer_id: i64,
    template_id: i64,
) -> Result<application::Model> {
    let txn = db.begin().await?;

    require_customer(&txn, owner_id, customer_id).await?;
    let template = template::get_template(&txn, owner_id, template_id)
        .await?
        .ok_or_else(|| Error::not_found("Template", template_id))?;

    let application = insert_application(
        &txn,
        owner_id,
        customer_id,
        Some(&template),
        None,
        ApplicationStatus::Active,
    )
    .await?;

    txn.commit().await?;
    info!(application_id = application.id, customer_id, "Application created");
    Ok(application)
}

/// Finds an application the owner can see.
pub async fn get_application<C>(
    db: &C,
    owner_id: &str,
    application_id: i64,
) -> Result<Option<application::Model>>
where
    C: ConnectionTrait,
{
    Application::find_by_id(application_id)
        .filter(application::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_application`], but a missing application is an error.
pub async fn require_application<C>(
    db: &C,
    owner_id: &str,
    application_id: i64,
) -> Result<application::Model>
where
    C: ConnectionTrait,
{
    get_application(db, owner_id, application_id)
        .await?
        .ok_or_else(|| Error::not_found("Application", application_id))
}

/// Stored steps of an application, in position order.
pub async fn get_steps<C>(db: &C, application_id: i64) -> Result<Vec<application_step::Model>>
where
    C: ConnectionTrait,
{
    let steps = ApplicationStep::find()
        .filter(application_step::Column::ApplicationId.eq(application_id))
        .order_by_asc(application_step::Column::Position)
        .order_by_asc(application_step::Column::Id)
        .all(db)
        .await?;
    Ok(steps)
}

pub(crate) fn matches_search(overview: &ApplicationOverview, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || overview.customer_name.to_lowercase().contains(&term)
        || overview
            .service_name
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(&term))
        || overview.application.id.to_string().contains(&term)
}

/// Lists an owner's applications, newest first, with customer, template, and steps.
pub async fn list_applications(
    db: &DatabaseConnection,
    owner_id: &str,
    search: Option<&str>,
) -> Result<Vec<ApplicationOverview>> {
    let rows = Application::find()
        .filter(application::Column::OwnerId.eq(owner_id))
        .find_also_related(ServiceTemplate)
        .order_by_desc(application::Column::CreatedAt)
        .order_by_desc(application::Column::Id)
        .all(db)
        .await?;

    let customer_ids: HashSet<i64> = rows.iter().map(|(a, _)| a.customer_id).collect();
    let customers: HashMap<i64, String> = Customer::find()
        .filter(customer::Column::Id.is_in(customer_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let application_ids: Vec<i64> = rows.iter().map(|(a, _)| a.id).collect();
    let mut steps: HashMap<i64, Vec<application_step::Model>> = HashMap::new();
    for step in ApplicationStep::find()
        .filter(application_step::Column::ApplicationId.is_in(application_ids))
        .order_by_asc(application_step::Column::Position)
        .order_by_asc(application_step::Column::Id)
        .all(db)
        .await?
    {
        steps.entry(step.application_id).or_default().push(step);
    }

    let overviews = rows
        .into_iter()
        .map(|(application, template)| ApplicationOverview {
            customer_name: customers
                .get(&application.customer_id)
                .cloned()
                .unwrap_or_default(),
            service_name: template.as_ref().map(|t| t.name.clone()),
            service_description: template.and_then(|t| t.description),
            steps: steps.remove(&application.id).unwrap_or_default(),
            application,
        });

    Ok(match search {
        Some(term) => overviews.filter(|o| matches_search(o, term)).collect(),
        None => overviews.collect(),
    })
}

/// Loads the board for all of an owner's applications.
pub async fn get_board(db: &DatabaseConnection, owner_id: &str) -> Result<Board> {
    Ok(board(list_applications(db, owner_id, None).await?))
}

/// Loads the workflow view of one application.
pub async fn get_workflow(
    db: &DatabaseConnection,
    owner_id: &str,
    application_id: i64,
) -> Result<WorkflowView> {
    let application = require_application(db, owner_id, application_id).await?;
    let steps = get_steps(db, application.id).await?;
    let active_step_id = workflow::active_index(&steps).map(|i| steps[i].id);
    Ok(WorkflowView {
        application_id: application.id,
        progress: workflow::progress_of(&steps),
        active_step_id,
        steps: step_views(steps),
    })
}

/// Opens an editable draft of an application's steps.
pub async fn open_workflow(
    db: &DatabaseConnection,
    owner_id: &str,
    application_id: i64,
) -> Result<WorkflowDraft> {
    let application = require_application(db, owner_id, application_id).await?;
    let steps = get_steps(db, application.id).await?;
    Ok(WorkflowDraft::open(application.id, steps))
}

/// Step columns to write; the provider name always comes from the stored provider.
fn step_columns(
    step: &DraftStep,
    provider_names: &HashMap<i64, String>,
) -> application_step::ActiveModel {
    let outsource_provider = match step.provider_id {
        Some(id) => provider_names.get(&id).cloned(),
        None => step.outsource_provider.clone(),
    };
    application_step::ActiveModel {
        label: Set(step.label.clone()),
        description: Set(step.description.clone()),
        position: Set(step.position),
        is_completed: Set(step.is_completed),
        is_outsource: Set(step.is_outsource),
        provider_id: Set(step.provider_id),
        outsource_provider: Set(outsource_provider),
        expiry_date: Set(step.expiry_date),
        ..Default::default()
    }
}

/// Customer and service name that step notifications are sent with.
async fn notification_context(
    db: &DatabaseConnection,
    owner_id: &str,
    application: &application::Model,
) -> Result<(customer::Model, String)> {
    let customer = require_customer(db, owner_id, application.customer_id).await?;
    let service_name = match application.service_template_id {
        Some(template_id) => template::get_template(db, owner_id, template_id)
            .await?
            .map(|t| t.name),
        None => None,
    }
    .or_else(|| application.description.clone())
    .unwrap_or_else(|| CUSTOM_SERVICE.to_string());
    Ok((customer, service_name))
}

/// Persists a draft: deletes removed steps, overwrites kept ones, inserts new ones, and
/// stores the recomputed progress, all in one transaction.
///
/// Afterwards the customer is notified about every newly completed step. Notification
/// failures are logged and do not fail the save.
///
/// # Errors
/// Returns `Error::NotFound` if the application does not exist for the owner, and
/// `Error::Config` if the draft refers to steps that are not the application's or to a
/// provider the owner does not have.
#[instrument(skip(db, draft, notifier), fields(application_id = draft.application_id()))]
pub async fn save_workflow(
    db: &DatabaseConnection,
    owner_id: &str,
    draft: &WorkflowDraft,
    notifier: &dyn Notifier,
) -> Result<SaveOutcome> {
    let diff = draft.diff();
    let txn = db.begin().await?;

    let application = require_application(&txn, owner_id, draft.application_id()).await?;
    let current: HashSet<i64> = get_steps(&txn, application.id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .collect();
    if let Some((id, _)) = diff.updated.iter().find(|(id, _)| !current.contains(id)) {
        return Err(Error::invalid(format!(
            "Step {id} does not belong to application {}",
            application.id
        )));
    }

    let mut provider_names = HashMap::new();
    let assigned = diff
        .updated
        .iter()
        .map(|(_, step)| step)
        .chain(&diff.inserted)
        .filter_map(|step| step.provider_id);
    for provider_id in assigned {
        if provider_names.contains_key(&provider_id) {
            continue;
        }
        let provider = provider::get_provider(&txn, owner_id, provider_id)
            .await?
            .ok_or_else(|| Error::invalid(format!("Unknown provider {provider_id}")))?;
        provider_names.insert(provider.id, provider.name);
    }

    if !diff.removed.is_empty() {
        ApplicationStep::delete_many()
            .filter(application_step::Column::ApplicationId.eq(application.id))
            .filter(application_step::Column::Id.is_in(diff.removed.clone()))
            .exec(&txn)
            .await?;
    }

    for (id, step) in &diff.updated {
        let mut active = step_columns(step, &provider_names);
        active.id = Set(*id);
        active.update(&txn).await?;
    }

    let now = chrono::Utc::now();
    for step in &diff.inserted {
        let mut active = step_columns(step, &provider_names);
        active.application_id = Set(application.id);
        active.created_at = Set(now);
        active.insert(&txn).await?;
    }

    let mut active: application::ActiveModel = application.into();
    active.progress = Set(draft.progress());
    let application = active.update(&txn).await?;
    let steps = get_steps(&txn, application.id).await?;

    txn.commit().await?;
    info!(
        removed = diff.removed.len(),
        updated = diff.updated.len(),
        inserted = diff.inserted.len(),
        progress = application.progress,
        "Workflow saved"
    );

    let notified = match notification_context(db, owner_id, &application).await {
        Ok((customer, service_name)) => {
            notify::notify_newly_completed(notifier, &customer, &service_name, draft).await
        }
        Err(e) => {
            warn!(error = %e, "Workflow saved but notifications were skipped");
            0
        }
    };

    Ok(SaveOutcome {
        application,
        steps,
        notified,
    })
}

/// Changes an application's status.
pub(crate) async fn set_application_status<C>(
    db: &C,
    application: application::Model,
    status: ApplicationStatus,
) -> Result<application::Model>
where
    C: ConnectionTrait,
{
    let mut active: application::ActiveModel = application.into();
    active.status = Set(status);
    active.update(db).await.map_err(Into::into)
}

/// Marks an application closed.
pub async fn close_application(
    db: &DatabaseConnection,
    owner_id: &str,
    application_id: i64,
) -> Result<application::Model> {
    let application = require_application(db, owner_id, application_id).await?;
    let application = set_application_status(db, application, ApplicationStatus::Closed).await?;
    info!(application_id, "Application closed");
    Ok(application)
}

/// Deletes an application and its steps. Invoices that pointed at it are kept and
/// unlinked.
pub async fn delete_application(
    db: &DatabaseConnection,
    owner_id: &str,
    application_id: i64,
) -> Result<()> {
    let txn = db.begin().await?;
    require_application(&txn, owner_id, application_id).await?;

    Invoice::update_many()
        .col_expr(invoice::Column::ApplicationId, Expr::value(Option::<i64>::None))
        .filter(invoice::Column::ApplicationId.eq(application_id))
        .exec(&txn)
        .await?;
    ApplicationStep::delete_many()
        .filter(application_step::Column::ApplicationId.eq(application_id))
        .exec(&txn)
        .await?;
    Application::delete_by_id(application_id).exec(&txn).await?;

    txn.commit().await?;
    info!(application_id, "Application deleted");
    Ok(())
}
