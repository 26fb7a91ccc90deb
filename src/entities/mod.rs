//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod application;
pub mod application_step;
pub mod customer;
pub mod document;
pub mod invoice;
pub mod invoice_item;
pub mod quotation;
pub mod quotation_item;
pub mod service_provider;
pub mod service_template;
pub mod staff;
pub mod template_step;
pub mod transaction;

// Re-export specific types to avoid conflicts
pub use account::{AccountKind, Entity as Account, Model as AccountModel};
pub use application::{ApplicationStatus, Entity as Application, Model as ApplicationModel};
pub use application_step::{Entity as ApplicationStep, Model as ApplicationStepModel};
pub use customer::{CustomerKind, Entity as Customer, Model as CustomerModel};
pub use document::{Entity as Document, Model as DocumentModel};
pub use invoice::{Entity as Invoice, InvoiceStatus, Model as InvoiceModel};
pub use invoice_item::{Entity as InvoiceItem, Model as InvoiceItemModel};
pub use quotation::{Entity as Quotation, Model as QuotationModel, QuotationStatus};
pub use quotation_item::{Entity as QuotationItem, Model as QuotationItemModel};
pub use service_provider::{Entity as ServiceProvider, Model as ServiceProviderModel};
pub use service_template::{Entity as ServiceTemplate, Model as ServiceTemplateModel};
pub use staff::{Entity as Staff, Model as StaffModel, SalaryType};
pub use template_step::{Entity as TemplateStep, Model as TemplateStepModel};
pub use transaction::{Entity as Transaction, Model as TransactionModel, TransactionKind};
