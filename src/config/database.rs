//! Database configuration module for Trust Flow.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust structs
//! without hand-written SQL.

use crate::entities::{
    Account, Application, ApplicationStep, Customer, Document, Invoice, InvoiceItem, Quotation,
    QuotationItem, ServiceProvider, ServiceTemplate, Staff, TemplateStep, Transaction,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::{debug, info};

/// Default connection string used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://trustflow.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database and makes sure every table exists.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {}", database_url);
    let db = Database::connect(database_url).await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Creates all tables that do not exist yet.
///
/// Tables are created parents first so that foreign keys always point at an existing
/// table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, Customer).await?;
    create_table(db, Document).await?;
    create_table(db, ServiceTemplate).await?;
    create_table(db, TemplateStep).await?;
    create_table(db, ServiceProvider).await?;
    create_table(db, Quotation).await?;
    create_table(db, QuotationItem).await?;
    create_table(db, Application).await?;
    create_table(db, ApplicationStep).await?;
    create_table(db, Invoice).await?;
    create_table(db, InvoiceItem).await?;
    create_table(db, Account).await?;
    create_table(db, Transaction).await?;
    create_table(db, Staff).await?;

    info!("Database tables ensured");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}
