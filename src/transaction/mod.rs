//! Transactions: the model, how it is stored as documents, the form and the
//! table, and the endpoints that act on them.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod document;
mod edit_endpoint;
mod form;
mod table;

pub use core::{Transaction, TransactionDraft, TransactionId, TransactionType, TypeFilter};
pub use create_endpoint::{reset_form_endpoint, submit_transaction_endpoint};
pub use delete_endpoint::delete_transaction_endpoint;
pub use document::{transactions_collection, transactions_from_snapshot, transactions_query};
pub use edit_endpoint::edit_transaction_endpoint;
pub use form::{FORM_CONTAINER_ID, TransactionForm, ValidationErrors, transaction_form_view};
pub use table::transactions_table_view;
