//! Sets up the SQLite database that backs the identity provider and the document store.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    identity::{create_account_table, create_client_session_table},
    store::create_document_table,
};

/// Create the tables for accounts, client sessions and documents if they do
/// not exist yet.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_account_table(&transaction)?;
    create_client_session_table(&transaction)?;
    create_document_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
