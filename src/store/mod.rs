//! The document store: schemaless documents in per-user collections, with
//! one-shot and live ordered queries.
//!
//! A live query is a [tokio::sync::watch] channel of complete result sets.
//! Every write to a collection re-runs the queries that are listening on it
//! and replaces the value in their channel, so a listener only ever sees the
//! latest full snapshot and never a diff.

mod sqlite;

use std::{fmt::Display, sync::Arc};

use async_trait::async_trait;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tokio::sync::watch;

pub use sqlite::{SqliteDocumentStore, create_document_table};

use crate::identity::UserId;

/// The number of characters in a generated document id.
pub const DOCUMENT_ID_LENGTH: usize = 20;

/// The fields of a document.
pub type Fields = Map<String, Value>;

/// The opaque id the store assigns to a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a random alphanumeric id.
    pub fn generate() -> Self {
        let id = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(DOCUMENT_ID_LENGTH)
            .map(char::from)
            .collect();

        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The address of a collection, e.g. "users/{uid}/transactions".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// The collection `name` that belongs to `user`.
    pub fn for_user(user: &UserId, name: &str) -> Self {
        Self(format!("users/{user}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored document with the timestamps the store manages.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub fields: Fields,
    pub created_at: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// All documents of a collection, optionally ordered by one top-level field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub collection: CollectionPath,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_owned(),
            direction,
        });
        self
    }
}

/// The complete result set of a query at one point in time.
pub type QuerySnapshot = Arc<Vec<Document>>;

/// What a live query delivers: the latest snapshot, or why it could not be produced.
pub type SnapshotEvent = Result<QuerySnapshot, StoreError>;

/// The receiving end of a live query.
pub type SnapshotReceiver = watch::Receiver<SnapshotEvent>;

/// Errors reported by the document store.
///
/// The message is shown to the user as is.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("Document {0} bestaat niet (meer).")]
    NotFound(DocumentId),

    #[error("Document {id} is ongeldig: {reason}")]
    InvalidDocument { id: DocumentId, reason: String },

    #[error("Ongeldige veldnaam \"{0}\" in de query.")]
    InvalidField(String),

    #[error("De live verbinding met de database is verbroken.")]
    StreamClosed,

    #[error("De database is niet beschikbaar: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred in the document store: {value}");
        StoreError::Unavailable(value.to_string())
    }
}

/// A document store addressed by collection path.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Start a live query.
    ///
    /// The channel holds the current result set straight away and a new one
    /// after every write to the collection. Dropping every receiver ends the
    /// live query.
    fn listen(&self, query: Query) -> SnapshotReceiver;

    /// Run `query` once.
    async fn get_documents(&self, query: &Query) -> Result<QuerySnapshot, StoreError>;

    /// Add a document with a generated id and return that id.
    async fn add_document(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentId, StoreError>;

    /// Replace the fields of an existing document.
    ///
    /// # Errors
    /// Returns [StoreError::NotFound] if the document does not exist.
    async fn update_document(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Fields,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting a document that does not exist succeeds.
    async fn delete_document(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod document_id_tests {
    use super::{DOCUMENT_ID_LENGTH, DocumentId};

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = DocumentId::generate();

        assert_eq!(id.as_str().len(), DOCUMENT_ID_LENGTH);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }
}
