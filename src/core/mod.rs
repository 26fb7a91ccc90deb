//! Business logic, independent of the HTTP layer.
//!
//! Every operation takes a database connection and the caller's owner id; records of
//! other owners behave as if they did not exist.

/// Applications, their workflow saves, and the board
pub mod application;
/// Customers and their profile page
pub mod customer;
/// Owner dashboard figures
pub mod dashboard;
/// Customer document records
pub mod document;
/// Invoices and payments
pub mod invoice;
/// Accounts and transactions
pub mod ledger;
/// Step completion notifications
pub mod notify;
/// Read-only customer portal
pub mod portal;
/// Outsourcing providers
pub mod provider;
/// Quotations and approval
pub mod quotation;
/// Staff members
pub mod staff;
/// Service templates
pub mod template;
/// In-memory workflow step engine
pub mod workflow;
